//! Route definitions and router construction.

use std::path::Path;

use axum::Router;
use axum::http::{Method, header};
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Wildcard-origin CORS. Answers every `OPTIONS` request itself.
fn build_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

/// API routes without state applied.
pub(crate) fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/services", get(handlers::services::list))
        .route("/config", get(handlers::config::get))
        .route(
            "/",
            post(handlers::dispatch::dispatch).fallback(handlers::not_found),
        )
        .fallback(handlers::not_found)
}

/// Service API router.
///
/// Every response, errors included, carries `Access-Control-Allow-Origin: *`.
pub fn create_router(state: AppState) -> Router {
    api_routes()
        .with_state(state)
        .layer(build_cors_layer())
        .layer(TraceLayer::new_for_http())
}

/// Static UI router serving `static_dir` (`index.html` for directories).
pub fn create_ui_router<P: AsRef<Path>>(static_dir: P) -> Router {
    Router::new()
        .fallback_service(ServeDir::new(static_dir.as_ref()))
        .layer(TraceLayer::new_for_http())
}
