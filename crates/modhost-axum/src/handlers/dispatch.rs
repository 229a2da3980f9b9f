//! `POST /`: run a query against a service.
//!
//! Non-streaming requests get the first record only; the service stream is
//! dropped as soon as that record arrives. Streaming requests get every
//! record as an SSE frame.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures_util::{FutureExt, StreamExt};
use modhost_core::{Query, RecordStream, ResultRecord, Service};
use tracing::{debug, info, warn};

use crate::dto::DispatchRequest;
use crate::error::HttpError;
use crate::sse::{panic_message, stream_response};
use crate::state::AppState;

pub async fn dispatch(State(state): State<AppState>, body: Bytes) -> Result<Response, HttpError> {
    let request: DispatchRequest = serde_json::from_slice(&body)
        .map_err(|e| HttpError::BadRequest(format!("Invalid JSON body: {e}")))?;

    let name = request
        .service
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| HttpError::BadRequest("Missing 'service' field".to_string()))?
        .to_string();

    if !state.config.is_service_enabled(&name) {
        warn!(service = %name, "Rejected request for disabled service");
        return Err(HttpError::Forbidden(format!("Service '{name}' is disabled")));
    }

    let service = resolve(&state, &name).await?;
    info!(service = %name, stream = request.stream, "Dispatching request");

    let query = request.query.unwrap_or_default();
    let records = match start(&name, service.as_ref(), query) {
        Ok(records) => records,
        Err(message) => return Ok(failure(message)),
    };
    if request.stream {
        Ok(stream_response(name, records))
    } else {
        Ok(first_record(&name, records).await)
    }
}

/// Resolve on the blocking pool; a first resolve runs the service's
/// constructor.
async fn resolve(state: &AppState, name: &str) -> Result<Arc<dyn Service>, HttpError> {
    let registry = Arc::clone(&state.registry);
    let owned = name.to_string();
    tokio::task::spawn_blocking(move || registry.resolve(&owned))
        .await
        .map_err(|e| {
            HttpError::Internal(format!("Service '{name}' could not be resolved: {e}"))
        })?
        .map_err(HttpError::from)
}

/// 500 carrying the terminal `{"error": ...}` record.
fn failure(message: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ResultRecord::error(message)),
    )
        .into_response()
}

/// Call `process`, returning the panic message if the call itself panics.
fn start(name: &str, service: &dyn Service, query: Query) -> Result<RecordStream, String> {
    catch_unwind(AssertUnwindSafe(|| service.process(query))).map_err(|payload| {
        let message = panic_message(payload.as_ref());
        warn!(service = %name, error = %message, "Service panicked before streaming");
        message
    })
}

async fn first_record(name: &str, mut records: RecordStream) -> Response {
    let first = AssertUnwindSafe(records.next()).catch_unwind().await;
    drop(records);

    match first {
        Ok(Some(Ok(record))) => {
            debug!(service = %name, "Returning first record");
            Json(record).into_response()
        }
        Ok(Some(Err(e))) => {
            warn!(service = %name, error = %e, "Service raised");
            failure(e.to_string())
        }
        Ok(None) => HttpError::Internal(format!("Service '{name}' produced no result"))
            .into_response(),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(service = %name, error = %message, "Service panicked");
            failure(message)
        }
    }
}
