//! `word-stream`: one text record per word of the query's `text`.
//!
//! An optional `delay_ms` spaces the records out, which makes the SSE path
//! observable from a browser. Missing or blank text raises an error.

use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use modhost_core::{Query, RecordStream, ResultRecord, Service, ServiceError};
use tracing::debug;

pub const NAME: &str = "word_stream";

/// Upper bound on `delay_ms` so a single request cannot park a task for long.
const MAX_DELAY_MS: u64 = 5_000;

#[derive(Debug, Default)]
pub struct WordStreamService;

impl WordStreamService {
    pub fn factory() -> Result<Arc<dyn Service>, ServiceError> {
        Ok(Arc::new(Self))
    }
}

impl Service for WordStreamService {
    fn process(&self, query: Query) -> RecordStream {
        let text = query.text("text").unwrap_or_default();
        let delay = query
            .u64("delay_ms")
            .map(|ms| Duration::from_millis(ms.min(MAX_DELAY_MS)));

        Box::pin(stream! {
            let words: Vec<String> = text.split_whitespace().map(str::to_owned).collect();
            if words.is_empty() {
                yield Err(ServiceError::failed("query parameter 'text' is empty"));
                return;
            }

            let total = words.len();
            for (index, word) in words.into_iter().enumerate() {
                if index > 0
                    && let Some(delay) = delay
                {
                    tokio::time::sleep(delay).await;
                }
                debug!(index, total, "word-stream record");
                yield Ok(ResultRecord::text(word)
                    .with_extra("index", index)
                    .with_extra("done", index + 1 == total));
            }
        })
    }
}
