//! `GET /services`

use axum::Json;
use axum::extract::State;

use crate::dto::ServicesResponse;
use crate::error::HttpError;
use crate::state::AppState;

/// Names of the dispatchable services.
pub async fn list(State(state): State<AppState>) -> Result<Json<ServicesResponse>, HttpError> {
    let config = state.config.current();
    let services: Vec<String> = state
        .registry
        .service_names()
        .into_iter()
        .filter(|name| config.is_service_enabled(name))
        .collect();

    if services.is_empty() {
        return Err(HttpError::Internal("No services available".to_string()));
    }
    Ok(Json(ServicesResponse { services }))
}
