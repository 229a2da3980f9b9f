//! Locations of the base configuration file and per-service override files.

use std::path::{Path, PathBuf};

/// File name used when no config path is given.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Directory (next to the config file) holding per-service override files.
pub const SERVICE_DIR_NAME: &str = "services";

/// Where the configuration store reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    /// Base configuration file.
    pub config_file: PathBuf,
    /// Explicit override directory. `None` means `<config dir>/services`.
    pub service_dir: Option<PathBuf>,
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_FILE)
    }
}

impl ConfigPaths {
    pub fn new(config_file: impl Into<PathBuf>) -> Self {
        Self {
            config_file: config_file.into(),
            service_dir: None,
        }
    }

    #[must_use]
    pub fn with_service_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.service_dir = Some(dir.into());
        self
    }

    /// Directory containing the config file (`.` for a bare file name).
    pub fn config_dir(&self) -> PathBuf {
        match self.config_file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Resolved override directory.
    pub fn service_dir(&self) -> PathBuf {
        self.service_dir
            .clone()
            .unwrap_or_else(|| self.config_dir().join(SERVICE_DIR_NAME))
    }

    /// Override file for a service: hyphens in the name become underscores.
    pub fn override_file(&self, service_name: &str) -> PathBuf {
        self.service_dir()
            .join(format!("{}.json", service_name.replace('-', "_")))
    }

    /// Resolve a possibly relative path against the config file's directory.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config_dir().join(path)
        }
    }
}
