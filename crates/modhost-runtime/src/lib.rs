//! Runtime concerns for modhost listeners: probing ports, acquiring a bound
//! socket under a retry policy, and supervising the serving tasks.
//!
//! The crate knows nothing about HTTP. A listener task receives a bound
//! `TcpListener` and a `CancellationToken`; what it serves is up to the
//! adapter that spawned it.

#![deny(unused_crate_dependencies)]

pub mod ports;
pub mod startup;
pub mod supervisor;

pub use ports::is_port_occupied;
pub use startup::{
    ListenerRole, ListenerSpec, ListenerState, RetryPolicy, StartupError, acquire_listener,
};
pub use supervisor::{ListenerSupervisor, ShutdownReport, SupervisorError};

