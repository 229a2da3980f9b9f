//! Process-scoped configuration store.
//!
//! Loads once, then hands out an immutable `Arc<Config>` snapshot. A load
//! never fails: every I/O or parse problem is logged with its failure class
//! and the store falls back to a freshly built default configuration.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;
use tracing::{debug, info, warn};

use super::merge::deep_merge;
use super::paths::ConfigPaths;
use super::{Config, ServiceSettings};
use crate::error::ConfigError;

/// Factory for the fallback configuration. Called anew on every fallback so
/// no two loads share one default value.
pub type DefaultConfigFn = fn() -> Config;

struct StoreState {
    paths: ConfigPaths,
    snapshot: Option<Arc<Config>>,
}

/// Loads, merges and caches the configuration.
pub struct ConfigStore {
    state: RwLock<StoreState>,
    default_config: DefaultConfigFn,
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read_state();
        f.debug_struct("ConfigStore")
            .field("paths", &state.paths)
            .field("loaded", &state.snapshot.is_some())
            .finish()
    }
}

impl ConfigStore {
    /// Create a store whose fallback is `Config::default()`.
    pub fn new(paths: ConfigPaths) -> Self {
        Self::with_default(paths, Config::default)
    }

    /// Create a store with a custom fallback factory.
    pub fn with_default(paths: ConfigPaths, default_config: DefaultConfigFn) -> Self {
        Self {
            state: RwLock::new(StoreState {
                paths,
                snapshot: None,
            }),
            default_config,
        }
    }

    /// Create a store that is already loaded with `config` (no file I/O).
    pub fn from_config(paths: ConfigPaths, config: Config) -> Self {
        Self {
            state: RwLock::new(StoreState {
                paths,
                snapshot: Some(Arc::new(config)),
            }),
            default_config: Config::default,
        }
    }

    /// Load the configuration.
    ///
    /// Returns the cached snapshot when already loaded and `path` is `None`
    /// or the current path. A different path invalidates the cache first.
    pub fn load(&self, path: Option<&Path>) -> Arc<Config> {
        {
            let state = self.read_state();
            if let Some(snapshot) = &state.snapshot
                && path.is_none_or(|p| p == state.paths.config_file)
            {
                return Arc::clone(snapshot);
            }
        }

        let mut state = self.write_state();
        if let Some(path) = path
            && path != state.paths.config_file
        {
            debug!(
                old = %state.paths.config_file.display(),
                new = %path.display(),
                "Config path changed, invalidating cached configuration"
            );
            state.paths.config_file = path.to_path_buf();
            state.snapshot = None;
        }

        // Another caller may have finished loading while we waited for the lock.
        if let Some(snapshot) = &state.snapshot {
            return Arc::clone(snapshot);
        }

        let config = Arc::new(self.resolve(&state.paths));
        state.snapshot = Some(Arc::clone(&config));
        config
    }

    /// Drop the cached snapshot and load again from the current path.
    pub fn reload(&self) -> Arc<Config> {
        self.write_state().snapshot = None;
        self.load(None)
    }

    /// Current configuration, loading it on first use.
    pub fn current(&self) -> Arc<Config> {
        self.load(None)
    }

    /// Whether a snapshot is cached.
    pub fn is_loaded(&self) -> bool {
        self.read_state().snapshot.is_some()
    }

    /// Whether a service may be dispatched to (absent services are enabled).
    pub fn is_service_enabled(&self, name: &str) -> bool {
        self.current().is_service_enabled(name)
    }

    /// Path of the base configuration file.
    pub fn config_path(&self) -> PathBuf {
        self.read_state().paths.config_file.clone()
    }

    /// Paths the store reads from.
    pub fn paths(&self) -> ConfigPaths {
        self.read_state().paths.clone()
    }

    /// Host and port of the API listener.
    pub fn server_addr(&self) -> (String, u16) {
        let config = self.current();
        (config.server.host.clone(), config.server.port)
    }

    /// UI directory, resolved against the config file's directory.
    pub fn ui_directory(&self) -> PathBuf {
        let config = self.current();
        self.read_state().paths.resolve(&config.ui.directory)
    }

    /// Browser address of the UI listener.
    pub fn ui_address(&self) -> String {
        let config = self.current();
        format!("http://{}:{}", config.ui.host, config.ui.port)
    }

    /// Resolved configuration as the `GET /config` payload.
    pub fn to_wire(&self) -> Result<Value, ConfigError> {
        serde_json::to_value(&*self.current()).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    fn resolve(&self, paths: &ConfigPaths) -> Config {
        info!(path = %paths.config_file.display(), "Loading configuration");

        let mut config = match read_config_file(&paths.config_file) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    path = %paths.config_file.display(),
                    class = e.failure_class(),
                    error = %e,
                    "Config file unusable, using defaults"
                );
                let mut fallback = (self.default_config)();
                fallback.is_default = true;
                fallback
            }
        };

        apply_service_overrides(paths, &mut config);

        info!(
            host = %config.server.host,
            port = config.server.port,
            ui_dir = %config.ui.directory,
            ui_port = config.ui.port,
            logging_level = %config.logging.level,
            services = config.services.len(),
            is_default = config.is_default,
            "Loaded configuration"
        );
        config
    }

    fn read_state(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn read_json(path: &Path) -> Result<Value, ConfigError> {
    let text =
        std::fs::read_to_string(path).map_err(|e| ConfigError::from_io(path.to_path_buf(), &e))?;
    let value: Value = serde_json::from_str(&text).map_err(|e| ConfigError::Malformed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(ConfigError::Malformed {
            path: path.to_path_buf(),
            reason: "top-level value is not an object".to_string(),
        })
    }
}

fn read_config_file(path: &Path) -> Result<Config, ConfigError> {
    let value = read_json(path)?;
    let mut config: Config = serde_json::from_value(value).map_err(|e| ConfigError::Malformed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    config.is_default = false;
    Ok(config)
}

/// Deep-merge `<service_dir>/<name>.json` into every configured service.
fn apply_service_overrides(paths: &ConfigPaths, config: &mut Config) {
    for (name, settings) in &mut config.services {
        let path = paths.override_file(name);
        match merge_override(&path, settings) {
            Ok(merged) => {
                *settings = merged;
                info!(service = %name, path = %path.display(), "Applied service config override");
            }
            Err(ConfigError::NotFound(_)) => {
                debug!(service = %name, path = %path.display(), "No service config override");
            }
            Err(e) => {
                warn!(
                    service = %name,
                    path = %path.display(),
                    class = e.failure_class(),
                    error = %e,
                    "Skipping service config override"
                );
            }
        }
    }
}

fn merge_override(path: &Path, current: &ServiceSettings) -> Result<ServiceSettings, ConfigError> {
    let incoming = read_json(path)?;
    let mut node = serde_json::to_value(current).map_err(|e| ConfigError::Malformed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    deep_merge(&mut node, incoming);
    serde_json::from_value(node).map_err(|e| ConfigError::Malformed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        path
    }

    fn fallback_with_demo() -> Config {
        Config::default().with_service("demo", ServiceSettings::default())
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(ConfigPaths::new(dir.path().join("missing.json")));

        let config = store.load(None);
        assert!(config.is_default);
        assert_eq!(config.server.port, super::super::DEFAULT_API_PORT);
        assert!(store.is_loaded());
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "config.json", "{mal for mm;sdas meeet!");
        let store = ConfigStore::with_default(ConfigPaths::new(path), fallback_with_demo);

        let config = store.load(None);
        assert!(config.is_default);
        assert!(config.services.contains_key("demo"));
    }

    #[test]
    fn wrong_shape_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let array = write(&dir, "array.json", "[1, 2, 3]");
        let typed = write(&dir, "typed.json", r#"{"server": {"port": "http"}}"#);

        assert!(ConfigStore::new(ConfigPaths::new(array)).load(None).is_default);
        assert!(ConfigStore::new(ConfigPaths::new(typed)).load(None).is_default);
    }

    #[test]
    fn directory_in_place_of_file_falls_back() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(ConfigPaths::new(dir.path()));
        assert!(store.load(None).is_default);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_file_falls_back() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = write(&dir, "config.json", r#"{"server": {"port": 9001}}"#);
        fs::set_permissions(&path, fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users can still read the file; nothing to assert then.
        if fs::read_to_string(&path).is_ok() {
            return;
        }
        let config = ConfigStore::new(ConfigPaths::new(&path)).load(None);
        assert!(config.is_default);
    }

    #[test]
    fn valid_file_is_loaded_with_field_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "config.json",
            r#"{
                "server": {"host": "0.0.0.0", "port": 9001},
                "services": {"text-generator": {"streamable": true, "parameters": []}}
            }"#,
        );
        let store = ConfigStore::new(ConfigPaths::new(path));

        let config = store.load(None);
        assert!(!config.is_default);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.ui.port, super::super::DEFAULT_UI_PORT);
        let service = config.service("text-generator").unwrap();
        assert!(service.streamable);
        assert!(service.enabled);
    }

    #[test]
    fn cached_snapshot_is_reused_until_reload() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "config.json", r#"{"server": {"port": 9001}}"#);
        let store = ConfigStore::new(ConfigPaths::new(&path));

        let first = store.load(None);
        fs::write(&path, r#"{"server": {"port": 9002}}"#).unwrap();

        let cached = store.load(Some(path.as_path()));
        assert!(Arc::ptr_eq(&first, &cached));
        assert_eq!(cached.server.port, 9001);

        let reloaded = store.reload();
        assert_eq!(reloaded.server.port, 9002);
    }

    #[test]
    fn different_path_forces_reload() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.json", r#"{"server": {"port": 9001}}"#);
        let b = write(&dir, "b.json", r#"{"server": {"port": 9002}}"#);
        let store = ConfigStore::new(ConfigPaths::new(&a));

        assert_eq!(store.load(None).server.port, 9001);
        assert_eq!(store.load(Some(b.as_path())).server.port, 9002);
        assert_eq!(store.config_path(), b);
    }

    #[test]
    fn service_override_is_deep_merged() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "config.json",
            r#"{"services": {
                "text-generator": {"enabled": true, "streamable": true, "model": {"id": "small", "device": "cpu"}},
                "echo": {"parameters": [{"name": "text"}]}
            }}"#,
        );
        write(
            &dir,
            "services/text_generator.json",
            r#"{"parameters": [{"name": "prompt", "type": "text"}], "model": {"device": "cuda"}}"#,
        );
        let store = ConfigStore::new(ConfigPaths::new(path));

        let config = store.load(None);
        let generator = config.service("text-generator").unwrap();
        assert_eq!(
            generator.parameters,
            vec![json!({"name": "prompt", "type": "text"})]
        );
        assert!(generator.streamable);
        assert_eq!(
            generator.extra.get("model"),
            Some(&json!({"id": "small", "device": "cuda"}))
        );

        // Untouched service keeps its base settings.
        let echo = config.service("echo").unwrap();
        assert_eq!(echo.parameters, vec![json!({"name": "text"})]);
    }

    #[test]
    fn invalid_override_is_skipped_without_affecting_others() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "config.json",
            r#"{"services": {"alpha": {"streamable": false}, "beta": {"streamable": false}}}"#,
        );
        write(&dir, "services/alpha.json", "not json at all");
        write(&dir, "services/beta.json", r#"{"streamable": true}"#);
        let store = ConfigStore::new(ConfigPaths::new(path));

        let config = store.load(None);
        assert!(!config.is_default);
        assert!(!config.service("alpha").unwrap().streamable);
        assert!(config.service("beta").unwrap().streamable);
    }

    #[test]
    fn overrides_apply_to_fallback_configuration() {
        let dir = TempDir::new().unwrap();
        write(&dir, "services/demo.json", r#"{"enabled": false}"#);
        let store = ConfigStore::with_default(
            ConfigPaths::new(dir.path().join("config.json")),
            fallback_with_demo,
        );

        let config = store.load(None);
        assert!(config.is_default);
        assert!(!config.is_service_enabled("demo"));
    }

    #[test]
    fn fallback_is_built_fresh_on_every_load() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::with_default(
            ConfigPaths::new(dir.path().join("missing.json")),
            fallback_with_demo,
        );

        let first = store.load(None);
        let second = store.reload();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
    }

    #[test]
    fn ui_directory_resolves_against_config_dir() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "config.json", r#"{"ui": {"directory": "web", "port": 8181}}"#);
        let store = ConfigStore::new(ConfigPaths::new(path));

        assert_eq!(store.ui_directory(), dir.path().join("web"));
        assert_eq!(store.ui_address(), "http://localhost:8181");
    }

    #[test]
    fn wire_payload_contains_marker_and_sections() {
        let store = ConfigStore::from_config(ConfigPaths::default(), Config::default());
        let wire = store.to_wire().unwrap();
        assert_eq!(wire["server"]["port"], json!(8000));
        assert_eq!(wire["ui"]["autostart"], json!(true));
        assert_eq!(wire["is_default"], json!(false));
    }
}
