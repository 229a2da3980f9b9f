//! Configuration domain types and the process-scoped configuration store.
//!
//! The on-disk format is JSON with three required sections (`server`, `ui`,
//! `services`) and an optional `logging` section. Every struct uses
//! per-field defaults, so a file that only sets `server.port` still yields a
//! fully populated [`Config`].

mod merge;
mod paths;
mod store;

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub use merge::deep_merge;
pub use paths::{ConfigPaths, DEFAULT_CONFIG_FILE, SERVICE_DIR_NAME};
pub use store::{ConfigStore, DefaultConfigFn};

/// Default port for the service API listener.
pub const DEFAULT_API_PORT: u16 = 8000;

/// Default port for the static UI listener.
pub const DEFAULT_UI_PORT: u16 = 8080;

const DEFAULT_HOST: &str = "localhost";

/// Fully resolved configuration tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Bind address of the API listener.
    pub server: ServerSection,

    /// Static UI listener settings.
    pub ui: UiSection,

    /// Log sink settings.
    pub logging: LoggingSection,

    /// Per-service settings keyed by canonical service name.
    pub services: BTreeMap<String, ServiceSettings>,

    /// True when the built-in fallback is in use because the file could not be loaded.
    pub is_default: bool,
}

impl Config {
    /// Settings for a service, if the configuration mentions it.
    #[must_use]
    pub fn service(&self, name: &str) -> Option<&ServiceSettings> {
        self.services.get(name)
    }

    /// Whether a service may be dispatched to. Services absent from the
    /// configuration are enabled.
    #[must_use]
    pub fn is_service_enabled(&self, name: &str) -> bool {
        self.services.get(name).is_none_or(|s| s.enabled)
    }

    /// Builder-style helper used by default-config factories.
    #[must_use]
    pub fn with_service(mut self, name: impl Into<String>, settings: ServiceSettings) -> Self {
        self.services.insert(name.into(), settings);
        self
    }
}

/// `server` section: where the API listener binds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    #[serde(deserialize_with = "deserialize_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_API_PORT,
        }
    }
}

/// `ui` section: static file listener.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UiSection {
    /// Directory with the built UI, relative to the config file's directory.
    pub directory: String,
    pub host: String,
    #[serde(deserialize_with = "deserialize_port")]
    pub port: u16,
    /// Start the UI listener together with the API listener.
    pub autostart: bool,
}

impl Default for UiSection {
    fn default() -> Self {
        Self {
            directory: "ui".to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_UI_PORT,
            autostart: true,
        }
    }
}

/// `logging` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingSection {
    /// Level name (`DEBUG`, `INFO`, `WARNING`, `ERROR`), case-insensitive.
    pub level: String,
    pub dir: String,
    pub file_name: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "DEBUG".to_string(),
            dir: ".".to_string(),
            file_name: "app.log".to_string(),
        }
    }
}

impl LoggingSection {
    /// Level as a `tracing` filter directive. Unknown names map to `info`.
    #[must_use]
    pub fn filter_directive(&self) -> &'static str {
        match self.level.trim().to_ascii_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "warn" | "warning" => "warn",
            "error" | "critical" | "fatal" => "error",
            _ => "info",
        }
    }
}

/// Settings node for one service.
///
/// Keys the host does not interpret (model ids, UI hints) are kept in
/// `extra` and round-trip through `GET /config` untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceSettings {
    pub enabled: bool,
    pub streamable: bool,
    /// Parameter descriptors rendered by the UI, in order.
    pub parameters: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            streamable: false,
            parameters: Vec::new(),
            extra: Map::new(),
        }
    }
}

impl ServiceSettings {
    #[must_use]
    pub fn streamable(mut self, streamable: bool) -> Self {
        self.streamable = streamable;
        self
    }

    #[must_use]
    pub fn with_parameter(mut self, descriptor: Value) -> Self {
        self.parameters.push(descriptor);
        self
    }
}

/// Accept ports written either as numbers or as numeric strings.
fn deserialize_port<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawPort {
        Number(u16),
        Text(String),
    }

    match RawPort::deserialize(deserializer)? {
        RawPort::Number(port) => Ok(port),
        RawPort::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid port {text:?}"))),
    }
}
