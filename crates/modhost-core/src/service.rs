//! The capability every pluggable service implements.
//!
//! A service turns a [`Query`] into a lazily pulled stream of
//! [`ResultRecord`]s. The dispatch layer decides how much of the stream is
//! consumed; dropping the stream is the only cancellation signal a service
//! receives.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;

use futures_core::Stream;
use futures_util::{future, stream};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::error::ServiceError;

/// Stream of records produced by one `process` call.
///
/// An `Err` item means the service raised mid-stream; nothing after it is
/// pulled.
pub type RecordStream = Pin<Box<dyn Stream<Item = Result<ResultRecord, ServiceError>> + Send>>;

/// A pluggable unit behind the uniform request/stream protocol.
pub trait Service: Send + Sync + fmt::Debug {
    /// Start processing `query`. Work should not begin before the first poll.
    fn process(&self, query: Query) -> RecordStream;
}

// =============================================================================
// Query
// =============================================================================

/// Opaque, string-keyed request parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Query(Map<String, Value>);

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for tests and embedding callers.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// String parameter. Numbers and booleans are rendered as text.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Unsigned integer parameter; numeric strings such as `"50"` are accepted.
    pub fn u64(&self, key: &str) -> Option<u64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Boolean parameter; `"true"`/`"false"` strings are accepted.
    pub fn bool(&self, key: &str) -> Option<bool> {
        match self.0.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Some(true),
                "false" | "0" | "no" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Query {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

// =============================================================================
// Result records
// =============================================================================

/// Media kind of a result payload, used by the UI to pick a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Text,
    Image,
    Audio,
}

/// One item of a service's output, serialized as a flat JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultRecord {
    /// `{"result": ..., "type": ..., ...extra}`
    Result {
        result: Value,
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        kind: Option<RecordKind>,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    /// `{"error": message}`
    Error { error: String },
}

impl ResultRecord {
    /// Untyped result.
    pub fn value(result: impl Into<Value>) -> Self {
        Self::Result {
            result: result.into(),
            kind: None,
            extra: Map::new(),
        }
    }

    /// Text result (`"type": "text"`).
    pub fn text(result: impl Into<String>) -> Self {
        Self::Result {
            result: Value::String(result.into()),
            kind: Some(RecordKind::Text),
            extra: Map::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    /// Attach an extra top-level key. No-op on error records.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if let Self::Result { extra, .. } = &mut self {
            extra.insert(key.into(), value.into());
        }
        self
    }

    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

// =============================================================================
// Stream helpers
// =============================================================================

/// A stream yielding exactly one record.
pub fn once_record(record: ResultRecord) -> RecordStream {
    Box::pin(stream::once(future::ready(Ok::<_, ServiceError>(record))))
}

/// Producer handle passed to [`blocking_records`] closures.
#[derive(Debug)]
pub struct RecordSink {
    tx: mpsc::Sender<Result<ResultRecord, ServiceError>>,
}

impl RecordSink {
    /// Hand one record to the consumer, blocking while the buffer is full.
    ///
    /// Returns `false` once the consumer has dropped the stream; the producer
    /// should stop at that point.
    pub fn send(&self, record: ResultRecord) -> bool {
        self.tx.blocking_send(Ok(record)).is_ok()
    }
}

enum Feed<F> {
    Pending(F),
    Running(mpsc::Receiver<Result<ResultRecord, ServiceError>>),
}

/// Run blocking producer code on Tokio's blocking pool and expose its output
/// as a [`RecordStream`].
///
/// The producer starts on the first poll. The channel holds a single record,
/// so the producer never runs more than one item ahead of the consumer. An
/// `Err` return or a panic becomes a terminal `Err` item.
pub fn blocking_records<F>(producer: F) -> RecordStream
where
    F: FnOnce(&RecordSink) -> Result<(), ServiceError> + Send + 'static,
{
    let feed = stream::unfold(Feed::Pending(producer), |state| async move {
        let mut rx = match state {
            Feed::Running(rx) => rx,
            Feed::Pending(producer) => {
                let (tx, rx) = mpsc::channel(1);
                tokio::task::spawn_blocking(move || {
                    let sink = RecordSink { tx };
                    let outcome = catch_unwind(AssertUnwindSafe(|| producer(&sink)))
                        .unwrap_or_else(|_| Err(ServiceError::failed("service panicked")));
                    if let Err(e) = outcome {
                        // Consumer may already be gone.
                        let _ = sink.tx.blocking_send(Err(e));
                    }
                });
                rx
            }
        };
        rx.recv().await.map(|item| (item, Feed::Running(rx)))
    });
    Box::pin(feed)
}
