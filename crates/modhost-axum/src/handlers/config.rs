//! `GET /config`

use axum::Json;
use axum::extract::State;
use serde_json::Value;

use crate::error::HttpError;
use crate::state::AppState;

/// The resolved configuration, disabled services included.
pub async fn get(State(state): State<AppState>) -> Result<Json<Value>, HttpError> {
    Ok(Json(state.config.to_wire()?))
}
