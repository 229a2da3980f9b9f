//! Request and response bodies of the service API.

use modhost_core::Query;
use serde::{Deserialize, Serialize};

/// Body of `POST /`.
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchRequest {
    /// Target service name. Missing and empty are both rejected.
    #[serde(default)]
    pub service: Option<String>,
    /// Missing and `null` both mean an empty query.
    #[serde(default)]
    pub query: Option<Query>,
    /// Stream every record as SSE instead of returning the first one.
    #[serde(default)]
    pub stream: bool,
}

/// Body of `GET /services`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServicesResponse {
    pub services: Vec<String>,
}
