//! Error types for the core domain.
//!
//! None of these escape to an HTTP caller directly. Configuration errors are
//! absorbed by the store, registry errors are mapped to status codes by the
//! adapter, and service errors become terminal `{error}` records.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure while reading or parsing a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file does not exist.
    #[error("config file {0} not found")]
    NotFound(PathBuf),

    /// The process may not read the file.
    #[error("permission denied reading {path}: {reason}")]
    PermissionDenied { path: PathBuf, reason: String },

    /// Any other I/O failure (a directory in place of a file, a broken mount...).
    #[error("failed to read {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    /// The file is not valid JSON or does not have the expected shape.
    #[error("malformed config {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    /// The resolved configuration could not be turned into a wire payload.
    #[error("failed to serialize configuration: {0}")]
    Serialize(String),
}

impl ConfigError {
    /// Classify an I/O error raised while reading `path`.
    pub fn from_io(path: PathBuf, err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                path,
                reason: err.to_string(),
            },
            _ => Self::Io {
                path,
                reason: err.to_string(),
            },
        }
    }

    /// Short, stable name of the failure class used in log lines.
    #[must_use]
    pub const fn failure_class(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not-found",
            Self::PermissionDenied { .. } => "permission-denied",
            Self::Io { .. } => "io",
            Self::Malformed { .. } => "malformed",
            Self::Serialize(_) => "serialize",
        }
    }
}

/// Failure to hand out a service instance.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No service with this name was discovered.
    #[error("Service '{0}' not found")]
    NotFound(String),

    /// The factory failed; the service has been removed from the registry.
    #[error("Service '{name}' failed to start: {reason}")]
    ConstructionFailed { name: String, reason: String },
}

impl RegistryError {
    /// Name of the service the error refers to.
    #[must_use]
    pub fn service_name(&self) -> &str {
        match self {
            Self::NotFound(name) | Self::ConstructionFailed { name, .. } => name,
        }
    }
}

/// Error raised by a service, either while being constructed or mid-stream.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    /// The service could not be initialised.
    #[error("initialisation failed: {0}")]
    Init(String),

    /// Processing a query failed.
    #[error("{0}")]
    Failed(String),
}

impl ServiceError {
    /// Convenience constructor for processing failures.
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}
