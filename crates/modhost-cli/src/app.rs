//! The application run loop.
//!
//! Loads configuration, installs logging, launches the listeners and then
//! idles with a periodic heartbeat until Ctrl-C. Every listener is closed
//! before `run` returns.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use modhost_axum::{LaunchOptions, bootstrap, launch};
use modhost_core::ConfigStore;
use modhost_runtime::{ListenerSupervisor, RetryPolicy};
use modhost_services::{builtin_catalog, default_config};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::logging;
use crate::parser::Cli;

const HEARTBEAT: Duration = Duration::from_secs(30);

/// Log a heartbeat every `period` until `shutdown` resolves. Returns the
/// number of heartbeats emitted.
pub async fn heartbeat_until<F: Future<Output = ()>>(period: Duration, shutdown: F) -> u64 {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately.
    ticker.tick().await;

    tokio::pin!(shutdown);
    let mut beats = 0;
    loop {
        tokio::select! {
            () = &mut shutdown => return beats,
            _ = ticker.tick() => {
                beats += 1;
                debug!(beats, "Application running");
            }
        }
    }
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    info!("Ctrl-C received, shutting down");
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let paths = cli.config_paths();
    let store = Arc::new(ConfigStore::with_default(paths.clone(), default_config));

    // Load under a scoped stderr subscriber: the file sink depends on the
    // configuration being loaded.
    let config =
        tracing::subscriber::with_default(logging::bootstrap_subscriber(cli.verbose), || {
            store.load(None)
        });

    let log_dir = paths.resolve(&config.logging.dir);
    let _guard = logging::init(&config.logging, &log_dir, cli.verbose)?;

    info!(
        config = %paths.config_file.display(),
        service_dir = %paths.service_dir().display(),
        is_default = config.is_default,
        log_file = %log_dir.join(&config.logging.file_name).display(),
        "modhost starting"
    );

    let state = bootstrap(Arc::clone(&store), builtin_catalog());
    let supervisor = ListenerSupervisor::new();
    let options = LaunchOptions {
        ui_autostart: cli.ui_autostart.unwrap_or(config.ui.autostart),
        retry: RetryPolicy::default(),
    };
    launch(state, &supervisor, options).await?;

    heartbeat_until(HEARTBEAT, ctrl_c()).await;

    let report = supervisor.shutdown().await;
    for (role, reason) in &report.failed {
        warn!(%role, %reason, "Listener did not close cleanly");
    }
    info!(closed = report.closed.len(), failed = report.failed.len(), "modhost stopped");
    Ok(())
}
