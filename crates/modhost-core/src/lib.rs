//! Core domain for modhost: the layered configuration store, the service
//! capability every pluggable service implements, and the registry that
//! hands out one shared instance per service name.
//!
//! Nothing in this crate knows about HTTP or sockets. Adapters
//! (`modhost-axum`, `modhost-cli`) wire these types together at their
//! composition roots.

#![deny(unused_crate_dependencies)]

pub mod config;
pub mod error;
pub mod registry;
pub mod service;

// Re-export commonly used types for convenience
pub use config::{
    Config, ConfigPaths, ConfigStore, DEFAULT_API_PORT, DEFAULT_UI_PORT, LoggingSection,
    ServerSection, ServiceSettings, UiSection, deep_merge,
};
pub use error::{ConfigError, RegistryError, ServiceError};
pub use registry::{ServiceDescriptor, ServiceFactory, ServiceRegistry, canonical_service_name};
pub use service::{
    Query, RecordKind, RecordSink, RecordStream, ResultRecord, Service, blocking_records, once_record,
};

// Silence unused dev-dependency warnings
#[cfg(test)]
use tempfile as _;
