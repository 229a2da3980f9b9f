//! Axum bootstrap: wires the configuration store and the service registry
//! into the context every handler receives.

use std::sync::Arc;

use modhost_core::{ConfigStore, ServiceDescriptor, ServiceRegistry};
use tracing::info;

use crate::state::AppState;

/// Everything the HTTP layer needs.
#[derive(Debug)]
pub struct AxumContext {
    /// Resolved configuration (read-only from handlers).
    pub config: Arc<ConfigStore>,
    /// Service table and singleton instances.
    pub registry: Arc<ServiceRegistry>,
}

impl AxumContext {
    pub fn new(config: Arc<ConfigStore>, registry: Arc<ServiceRegistry>) -> Self {
        Self { config, registry }
    }
}

/// Build the registry from `catalog` and run discovery against the loaded
/// configuration.
pub fn bootstrap(config: Arc<ConfigStore>, catalog: Vec<ServiceDescriptor>) -> AppState {
    let loaded = config.current();
    let registry = Arc::new(ServiceRegistry::new(catalog, Arc::clone(&config)));
    registry.discover();

    info!(
        target: "modhost.bootstrap",
        config_path = %config.config_path().display(),
        is_default = loaded.is_default,
        services = ?registry.service_names(),
        "Axum bootstrap complete"
    );

    Arc::new(AxumContext::new(config, registry))
}
