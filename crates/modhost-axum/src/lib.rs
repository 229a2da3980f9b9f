//! Axum adapter for modhost.
//!
//! Two routers share one [`AxumContext`]: the service API (`GET /services`,
//! `GET /config`, `POST /` with optional SSE streaming) and the static UI.
//! [`launch`] hands both to a [`modhost_runtime::ListenerSupervisor`].

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Silence unused dev-dependency warnings; integration tests use them
#[cfg(test)]
use http_body_util as _;
#[cfg(test)]
use modhost_services as _;
#[cfg(test)]
use reqwest as _;
#[cfg(test)]
use tempfile as _;
#[cfg(test)]
use tower as _;

pub mod bootstrap;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod launch;
pub mod routes;
pub mod sse;
pub mod state;

// Re-export primary types
pub use bootstrap::{AxumContext, bootstrap};
pub use error::HttpError;
pub use launch::{LaunchOptions, launch, serve};
pub use routes::{create_router, create_ui_router};
pub use state::AppState;
