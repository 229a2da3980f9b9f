//! Listener supervisor.
//!
//! Owns one task per listener role. Each task acquires its socket with
//! [`acquire_listener`], hands it to the adapter's serve future and reports
//! its lifecycle on a `watch` channel. Shutdown cancels and awaits every
//! task in turn; one task failing to close never stops the rest.

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result as AnyResult;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::startup::{ListenerRole, ListenerSpec, ListenerState, RetryPolicy, acquire_listener};

/// How long shutdown waits for a task before aborting it.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

struct ListenerHandle {
    role: ListenerRole,
    cancel_token: CancellationToken,
    join_handle: JoinHandle<AnyResult<()>>,
    state: Arc<watch::Sender<ListenerState>>,
}

#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("{0} listener is already running")]
    AlreadyRunning(ListenerRole),

    #[error("{0} listener is not running")]
    NotRunning(ListenerRole),

    #[error("{role} listener is not serving: {state}")]
    NotServing {
        role: ListenerRole,
        state: ListenerState,
    },

    #[error("timed out waiting for {0} listener")]
    Timeout(ListenerRole),
}

/// Outcome of [`ListenerSupervisor::shutdown`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    pub closed: Vec<ListenerRole>,
    pub failed: Vec<(ListenerRole, String)>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Supervises the process's listeners.
pub struct ListenerSupervisor {
    handles: Mutex<Vec<ListenerHandle>>,
}

impl Default for ListenerSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ListenerSupervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSupervisor").finish_non_exhaustive()
    }
}

impl ListenerSupervisor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Spawn a listener task for `spec`.
    ///
    /// Returns immediately; start-up (including retries) happens inside the
    /// task. `serve` receives the bound listener and a token that fires on
    /// shutdown, and should return once the token is cancelled.
    pub async fn spawn<F, Fut>(
        &self,
        spec: ListenerSpec,
        policy: RetryPolicy,
        serve: F,
    ) -> Result<watch::Receiver<ListenerState>, SupervisorError>
    where
        F: FnOnce(TcpListener, CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = AnyResult<()>> + Send + 'static,
    {
        let role = spec.role;
        let mut guard = self.handles.lock().await;

        if let Some(pos) = guard.iter().position(|h| h.role == role) {
            if !guard[pos].join_handle.is_finished() {
                return Err(SupervisorError::AlreadyRunning(role));
            }
            let old = guard.swap_remove(pos);
            match old.join_handle.await {
                Ok(Ok(())) => debug!(%role, "Previous listener task completed normally"),
                Ok(Err(e)) => warn!(%role, "Previous listener task ended with error: {e}"),
                Err(e) => warn!(%role, "Previous listener task panicked: {e}"),
            }
        }

        let (tx, rx) = watch::channel(ListenerState::Pending);
        let state = Arc::new(tx);
        let cancel_token = CancellationToken::new();

        let task_state = Arc::clone(&state);
        let task_cancel = cancel_token.clone();
        let join_handle: JoinHandle<AnyResult<()>> = tokio::spawn(async move {
            let listener = acquire_listener(&spec, policy, &task_cancel, &task_state).await?;
            let addr = listener.local_addr()?;
            info!(%role, %addr, "Listener serving");
            task_state.send_replace(ListenerState::Serving { addr });

            match serve(listener, task_cancel).await {
                Ok(()) => {
                    task_state.send_replace(ListenerState::Stopped);
                    Ok(())
                }
                Err(e) => {
                    error!(%role, error = %e, "Listener ended with error");
                    task_state.send_replace(ListenerState::Failed {
                        reason: e.to_string(),
                    });
                    Err(e)
                }
            }
        });

        guard.push(ListenerHandle {
            role,
            cancel_token,
            join_handle,
            state,
        });
        Ok(rx)
    }

    /// Latest state of a listener, if one was spawned for `role`.
    pub async fn state(&self, role: ListenerRole) -> Option<ListenerState> {
        let guard = self.handles.lock().await;
        guard
            .iter()
            .find(|h| h.role == role)
            .map(|h| h.state.borrow().clone())
    }

    /// Roles with a tracked task.
    pub async fn roles(&self) -> Vec<ListenerRole> {
        self.handles.lock().await.iter().map(|h| h.role).collect()
    }

    /// Wait until `role` is serving and return its bound address.
    pub async fn wait_for_serving(
        &self,
        role: ListenerRole,
        timeout: Duration,
    ) -> Result<SocketAddr, SupervisorError> {
        let mut rx = {
            let guard = self.handles.lock().await;
            guard
                .iter()
                .find(|h| h.role == role)
                .map(|h| h.state.subscribe())
                .ok_or(SupervisorError::NotRunning(role))?
        };

        let settled = tokio::time::timeout(
            timeout,
            rx.wait_for(|s| matches!(s, ListenerState::Serving { .. }) || s.is_terminal()),
        )
        .await
        .map_err(|_| SupervisorError::Timeout(role))?
        .map(|s| (*s).clone())
        .map_err(|_| SupervisorError::NotRunning(role))?;

        match settled {
            ListenerState::Serving { addr } => Ok(addr),
            state => Err(SupervisorError::NotServing { role, state }),
        }
    }

    /// Cancel and await every listener, one after another.
    pub async fn shutdown(&self) -> ShutdownReport {
        let handles = std::mem::take(&mut *self.handles.lock().await);
        let mut report = ShutdownReport::default();

        for handle in handles {
            let role = handle.role;
            info!(%role, "Closing listener");
            handle.cancel_token.cancel();

            let mut join = handle.join_handle;
            match tokio::time::timeout(SHUTDOWN_GRACE, &mut join).await {
                Ok(Ok(Ok(()))) => {
                    info!(%role, "Listener closed");
                    report.closed.push(role);
                }
                Ok(Ok(Err(e))) => {
                    // Start-up failures and serve errors end the task; the
                    // socket is released either way.
                    warn!(%role, "Listener had already ended with error: {e}");
                    report.closed.push(role);
                }
                Ok(Err(join_err)) => {
                    error!(%role, "Listener task panicked: {join_err}");
                    report.failed.push((role, format!("task panicked: {join_err}")));
                }
                Err(_) => {
                    warn!(%role, "Listener did not stop in time; aborting task");
                    join.abort();
                    report
                        .failed
                        .push((role, "shutdown timed out; task aborted".to_string()));
                }
            }
            handle.state.send_replace(ListenerState::Stopped);
        }

        report
    }
}
