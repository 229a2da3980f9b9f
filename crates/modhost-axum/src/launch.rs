//! Starting the listeners under a supervisor.

use modhost_runtime::{
    ListenerRole, ListenerSpec, ListenerSupervisor, RetryPolicy, SupervisorError,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::routes::{create_router, create_ui_router};
use crate::state::AppState;

#[derive(Debug, Clone, Copy)]
pub struct LaunchOptions {
    /// Start the UI listener alongside the API listener.
    pub ui_autostart: bool,
    pub retry: RetryPolicy,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            ui_autostart: true,
            retry: RetryPolicy::default(),
        }
    }
}

/// Serve `app` on `listener` until `cancel` fires.
pub async fn serve(
    listener: TcpListener,
    app: axum::Router,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;
    Ok(())
}

/// Spawn the API listener and, when enabled, the UI listener.
///
/// Returns once both tasks are spawned; binding and retries happen in the
/// background. Watch progress through the supervisor.
pub async fn launch(
    state: AppState,
    supervisor: &ListenerSupervisor,
    options: LaunchOptions,
) -> Result<(), SupervisorError> {
    let (host, port) = state.config.server_addr();
    info!(address = %format!("http://{host}:{port}"), "Starting API listener");
    let api = create_router(state.clone());
    supervisor
        .spawn(
            ListenerSpec::new(ListenerRole::Api, host, port),
            options.retry,
            move |listener, cancel| serve(listener, api, cancel),
        )
        .await?;

    if !options.ui_autostart {
        info!("UI autostart disabled");
        return Ok(());
    }

    let config = state.config.current();
    let ui_dir = state.config.ui_directory();
    if !ui_dir.is_dir() {
        warn!(path = %ui_dir.display(), "UI directory does not exist; UI requests will 404");
    }
    info!(
        address = %state.config.ui_address(),
        path = %ui_dir.display(),
        "Starting UI listener"
    );
    let ui = create_ui_router(&ui_dir);
    supervisor
        .spawn(
            ListenerSpec::new(ListenerRole::Ui, config.ui.host.clone(), config.ui.port),
            options.retry,
            move |listener, cancel| serve(listener, ui, cancel),
        )
        .await?;

    Ok(())
}
