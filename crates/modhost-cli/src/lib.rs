//! modhost command-line application: argument parsing, logging set-up and
//! the run loop that owns the listener supervisor.

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

pub mod app;
pub mod logging;
pub mod parser;

pub use app::{heartbeat_until, run};
pub use parser::Cli;
