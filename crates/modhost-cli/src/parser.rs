//! Command-line arguments.

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use modhost_core::ConfigPaths;
use modhost_core::config::DEFAULT_CONFIG_FILE;

/// Host pluggable services behind a JSON/SSE API and a static UI.
#[derive(Debug, Parser)]
#[command(name = "modhost")]
#[command(about = "Host pluggable services behind a JSON/SSE API and a static UI")]
#[command(version)]
pub struct Cli {
    /// Base configuration file
    #[arg(long, env = "MODHOST_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Directory with per-service override files [default: <config dir>/services]
    #[arg(long = "service-dir", env = "MODHOST_SERVICE_DIR")]
    pub service_dir: Option<PathBuf>,

    /// Start the UI listener (overrides `ui.autostart`)
    #[arg(long = "ui-autostart", value_name = "BOOL", action = ArgAction::Set)]
    pub ui_autostart: Option<bool>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl Cli {
    pub fn config_paths(&self) -> ConfigPaths {
        let paths = ConfigPaths::new(&self.config);
        match &self.service_dir {
            Some(dir) => paths.with_service_dir(dir),
            None => paths,
        }
    }
}
