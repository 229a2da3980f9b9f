//! HTTP request handlers for the service API.
//!
//! Handlers are thin: they validate input, consult the configuration store
//! and the registry, and leave record production to the service.

pub mod config;
pub mod dispatch;
pub mod services;

use crate::error::HttpError;

/// Fallback for every unrouted path or method.
pub async fn not_found() -> HttpError {
    HttpError::NotFound("Not found".to_string())
}
