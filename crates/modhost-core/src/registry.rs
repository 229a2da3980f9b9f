//! Service registry: static discovery plus one lazily built instance per name.

use std::collections::BTreeMap;
use std::panic::catch_unwind;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info, warn};

use crate::config::ConfigStore;
use crate::error::{RegistryError, ServiceError};
use crate::service::Service;

/// Builds a service instance. Called at most once per successful resolve.
pub type ServiceFactory = fn() -> Result<Arc<dyn Service>, ServiceError>;

/// One row of the static service table.
#[derive(Debug, Clone, Copy)]
pub struct ServiceDescriptor {
    /// Source name; `_` is normalised to `-` at discovery.
    pub name: &'static str,
    pub factory: ServiceFactory,
}

impl ServiceDescriptor {
    pub const fn new(name: &'static str, factory: ServiceFactory) -> Self {
        Self { name, factory }
    }
}

/// Canonical public name of a service (`text_generator` -> `text-generator`).
pub fn canonical_service_name(name: &str) -> String {
    name.trim().replace('_', "-")
}

/// Build state of one registered service.
enum Build {
    Pending,
    Ready(Arc<dyn Service>),
    Failed(String),
}

/// Registration entry. Its own lock serialises construction, so building
/// one service never holds the registry lock.
struct Slot {
    factory: ServiceFactory,
    build: Mutex<Build>,
}

impl Slot {
    fn new(factory: ServiceFactory) -> Self {
        Self {
            factory,
            build: Mutex::new(Build::Pending),
        }
    }
}

#[derive(Default)]
struct RegistryState {
    discovered: bool,
    entries: BTreeMap<String, Arc<Slot>>,
}

/// Maps service names to factories and caches one instance per name.
pub struct ServiceRegistry {
    catalog: Vec<ServiceDescriptor>,
    config: Arc<ConfigStore>,
    state: Mutex<RegistryState>,
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("ServiceRegistry")
            .field("discovered", &state.discovered)
            .field("services", &state.entries.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl ServiceRegistry {
    pub fn new(catalog: Vec<ServiceDescriptor>, config: Arc<ConfigStore>) -> Self {
        Self {
            catalog,
            config,
            state: Mutex::new(RegistryState::default()),
        }
    }

    /// Register every enabled, valid catalog entry. Runs once; later calls
    /// are no-ops.
    pub fn discover(&self) {
        let mut state = self.lock();
        self.discover_locked(&mut state);
    }

    /// Sorted names of the discovered services.
    pub fn service_names(&self) -> Vec<String> {
        let mut state = self.lock();
        self.discover_locked(&mut state);
        state.entries.keys().cloned().collect()
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        let mut state = self.lock();
        self.discover_locked(&mut state);
        state.entries.contains_key(name)
    }

    /// Shared instance for `name`, building it on first use.
    ///
    /// Blocks while the factory runs; async callers should go through
    /// `spawn_blocking`. Concurrent first calls for one name build exactly
    /// one instance. Other names and the name listing are not held up by a
    /// construction in progress. A failing factory removes the service from
    /// the registry.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Service>, RegistryError> {
        let slot = {
            let mut state = self.lock();
            self.discover_locked(&mut state);
            state.entries.get(name).cloned()
        }
        .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;

        let mut build = slot.build.lock().unwrap_or_else(PoisonError::into_inner);
        match &*build {
            Build::Ready(instance) => return Ok(Arc::clone(instance)),
            Build::Failed(reason) => {
                return Err(RegistryError::ConstructionFailed {
                    name: name.to_string(),
                    reason: reason.clone(),
                });
            }
            Build::Pending => {}
        }

        debug!(service = %name, "Constructing service instance");
        let built = catch_unwind(slot.factory)
            .unwrap_or_else(|_| Err(ServiceError::Init("factory panicked".to_string())));

        match built {
            Ok(instance) => {
                *build = Build::Ready(Arc::clone(&instance));
                info!(service = %name, "Service instance ready");
                Ok(instance)
            }
            Err(e) => {
                let reason = e.to_string();
                *build = Build::Failed(reason.clone());
                drop(build);

                let mut state = self.lock();
                if state
                    .entries
                    .get(name)
                    .is_some_and(|current| Arc::ptr_eq(current, &slot))
                {
                    state.entries.remove(name);
                }
                error!(service = %name, error = %reason, "Service construction failed, removing it");
                Err(RegistryError::ConstructionFailed {
                    name: name.to_string(),
                    reason,
                })
            }
        }
    }

    fn discover_locked(&self, state: &mut RegistryState) {
        if state.discovered {
            return;
        }
        state.discovered = true;

        let config = self.config.current();
        for descriptor in &self.catalog {
            let name = canonical_service_name(descriptor.name);
            if name.is_empty() {
                warn!(source = descriptor.name, "Skipping service with empty name");
                continue;
            }
            if !config.is_service_enabled(&name) {
                info!(service = %name, "Service disabled in configuration, skipping");
                continue;
            }
            if state.entries.contains_key(&name) {
                warn!(service = %name, "Duplicate service name, keeping the first entry");
                continue;
            }
            debug!(service = %name, "Registered service");
            state
                .entries
                .insert(name, Arc::new(Slot::new(descriptor.factory)));
        }
        info!(count = state.entries.len(), "Service discovery complete");
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
