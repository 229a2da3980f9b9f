//! Server-Sent Events framing for service record streams.
//!
//! Each record becomes one `data: <json>\n\n` frame, pulled from the service
//! only when the body is polled. A raised error or a panic inside the
//! service ends the body with a single error frame.

use std::any::Any;
use std::convert::Infallible;
use std::panic::AssertUnwindSafe;

use async_stream::stream;
use axum::body::{Body, Bytes};
use axum::http::{StatusCode, header};
use axum::response::Response;
use futures_util::{Stream, StreamExt};
use modhost_core::{RecordStream, ResultRecord};
use serde_json::json;
use tracing::{debug, warn};

/// Prefix of the message carried by a terminal error frame.
pub const STREAMING_ERROR_PREFIX: &str = "Streaming error: ";

/// Encode a JSON payload as one SSE frame.
pub fn frame(json: &str) -> Bytes {
    Bytes::from(format!("data: {json}\n\n"))
}

/// Terminal frame for a failure that interrupted the stream.
pub fn error_frame(message: &str) -> Bytes {
    let payload = json!({ "error": format!("{STREAMING_ERROR_PREFIX}{message}") });
    frame(&payload.to_string())
}

fn record_frame(record: &ResultRecord) -> Result<Bytes, String> {
    serde_json::to_string(record)
        .map(|json| frame(&json))
        .map_err(|e| format!("failed to encode record: {e}"))
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "service panicked".to_string())
}

/// Turn a record stream into SSE frames.
///
/// Dropping the returned stream drops `records`.
pub fn frames(
    service: String,
    records: RecordStream,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    stream! {
        let mut records = AssertUnwindSafe(records).catch_unwind();
        let mut sent = 0usize;

        while let Some(item) = records.next().await {
            let failure = match item {
                Ok(Ok(record)) => match record_frame(&record) {
                    Ok(bytes) => {
                        sent += 1;
                        yield Ok(bytes);
                        continue;
                    }
                    Err(e) => e,
                },
                Ok(Err(e)) => e.to_string(),
                Err(payload) => panic_message(payload.as_ref()),
            };

            warn!(service = %service, frames = sent, error = %failure, "Service stream failed");
            yield Ok(error_frame(&failure));
            break;
        }

        debug!(service = %service, frames = sent, "Service stream finished");
    }
}

/// Streaming response for `records`.
pub fn stream_response(service: String, records: RecordStream) -> Response {
    let body = Body::from_stream(frames(service, records));
    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(header::CACHE_CONTROL, header::HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, header::HeaderValue::from_static("keep-alive"));
    response
}
