//! Listener start-up with bounded retry.
//!
//! Each attempt probes the port first, then binds. A port that answers the
//! probe belongs to someone else, so the attempt is spent waiting rather
//! than fighting over it. Progress is published on a `watch` channel.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::ports::is_port_occupied;

/// Which listener a task serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerRole {
    /// Service API (JSON + SSE).
    Api,
    /// Static UI files.
    Ui,
}

impl fmt::Display for ListenerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api => write!(f, "api"),
            Self::Ui => write!(f, "ui"),
        }
    }
}

/// Where a listener should bind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerSpec {
    pub role: ListenerRole,
    pub host: String,
    /// 0 lets the OS pick.
    pub port: u16,
}

impl ListenerSpec {
    pub fn new(role: ListenerRole, host: impl Into<String>, port: u16) -> Self {
        Self {
            role,
            host: host.into(),
            port,
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Lifecycle of one listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerState {
    /// Spawned, start-up not yet begun.
    Pending,
    Probing { attempt: u32 },
    Binding { attempt: u32 },
    Serving { addr: SocketAddr },
    /// Start-up gave up or the server ended with an error.
    Failed { reason: String },
    /// Shut down, or start-up cancelled.
    Stopped,
}

impl ListenerState {
    /// No further transitions will happen.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed { .. } | Self::Stopped)
    }
}

impl fmt::Display for ListenerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Probing { attempt } => write!(f, "probing (attempt {attempt})"),
            Self::Binding { attempt } => write!(f, "binding (attempt {attempt})"),
            Self::Serving { addr } => write!(f, "serving on {addr}"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// How hard to try before giving up on a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Pause between attempts.
    pub retry_wait: Duration,
    /// Connect timeout for the occupancy probe.
    pub probe_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_wait: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("{role} listener could not bind {address} after {attempts} attempts: {last_error}")]
    Exhausted {
        role: ListenerRole,
        address: String,
        attempts: u32,
        last_error: String,
    },

    #[error("{role} listener start-up cancelled")]
    Cancelled { role: ListenerRole },
}

/// Acquire a bound listener for `spec`, retrying per `policy`.
///
/// Every transition is published on `state`. On exhaustion the state is
/// left at `Failed`; on cancellation at `Stopped`.
pub async fn acquire_listener(
    spec: &ListenerSpec,
    policy: RetryPolicy,
    cancel: &CancellationToken,
    state: &watch::Sender<ListenerState>,
) -> Result<TcpListener, StartupError> {
    let role = spec.role;
    let address = spec.address();
    let attempts = policy.max_attempts.max(1);
    let mut last_error = String::from("no attempt made");

    for attempt in 1..=attempts {
        if cancel.is_cancelled() {
            state.send_replace(ListenerState::Stopped);
            return Err(StartupError::Cancelled { role });
        }

        state.send_replace(ListenerState::Probing { attempt });
        if is_port_occupied(&spec.host, spec.port, policy.probe_timeout).await {
            warn!(%role, %address, attempt, "Port already in use");
            last_error = format!("port {} is already in use", spec.port);
        } else {
            state.send_replace(ListenerState::Binding { attempt });
            match TcpListener::bind((spec.host.as_str(), spec.port)).await {
                Ok(listener) => {
                    debug!(%role, %address, attempt, "Listener bound");
                    return Ok(listener);
                }
                Err(e) => {
                    warn!(%role, %address, attempt, error = %e, "Failed to bind listener");
                    last_error = e.to_string();
                }
            }
        }

        if attempt < attempts {
            info!(
                %role,
                wait_secs = policy.retry_wait.as_secs_f32(),
                "Retrying listener start-up"
            );
            tokio::select! {
                () = tokio::time::sleep(policy.retry_wait) => {}
                () = cancel.cancelled() => {
                    debug!(%role, "Start-up cancelled while waiting to retry");
                    state.send_replace(ListenerState::Stopped);
                    return Err(StartupError::Cancelled { role });
                }
            }
        }
    }

    let err = StartupError::Exhausted {
        role,
        address,
        attempts,
        last_error,
    };
    error!(%role, error = %err, "Giving up on listener");
    state.send_replace(ListenerState::Failed {
        reason: err.to_string(),
    });
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            retry_wait: Duration::from_millis(20),
            probe_timeout: Duration::from_millis(200),
        }
    }

    #[tokio::test]
    async fn free_port_binds_on_first_attempt() {
        let spec = ListenerSpec::new(ListenerRole::Api, "127.0.0.1", 0);
        let (tx, rx) = watch::channel(ListenerState::Pending);

        let listener = acquire_listener(&spec, quick_policy(3), &CancellationToken::new(), &tx)
            .await
            .unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
        assert_eq!(*rx.borrow(), ListenerState::Binding { attempt: 1 });
    }

    #[tokio::test]
    async fn occupied_port_exhausts_attempts() {
        let holder = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = holder.local_addr().unwrap().port();
        let spec = ListenerSpec::new(ListenerRole::Ui, "127.0.0.1", port);
        let (tx, rx) = watch::channel(ListenerState::Pending);

        let err = acquire_listener(&spec, quick_policy(2), &CancellationToken::new(), &tx)
            .await
            .unwrap_err();

        match err {
            StartupError::Exhausted { attempts, role, .. } => {
                assert_eq!(attempts, 2);
                assert_eq!(role, ListenerRole::Ui);
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert!(matches!(*rx.borrow(), ListenerState::Failed { .. }));
    }

    #[tokio::test]
    async fn cancellation_interrupts_retry_wait() {
        let holder = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = holder.local_addr().unwrap().port();
        let spec = ListenerSpec::new(ListenerRole::Api, "127.0.0.1", port);
        let (tx, rx) = watch::channel(ListenerState::Pending);
        let policy = RetryPolicy {
            retry_wait: Duration::from_secs(60),
            ..quick_policy(3)
        };

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let err = acquire_listener(&spec, policy, &cancel, &tx).await.unwrap_err();
        assert!(matches!(err, StartupError::Cancelled { .. }));
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(*rx.borrow(), ListenerState::Stopped);
    }

    #[test]
    fn default_policy_matches_documented_values() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.retry_wait, Duration::from_secs(10));
        assert_eq!(policy.probe_timeout, Duration::from_secs(2));
    }
}
