//! Built-in services shipped with modhost.
//!
//! These stand in for model-backed services and exercise every dispatch
//! path: a single record, a timed multi-record stream, and a blocking
//! producer. [`builtin_catalog`] is the static table the registry iterates.

#![deny(unused_crate_dependencies)]

mod catalog;
pub mod echo;
pub mod reverse;
pub mod word_stream;

pub use catalog::{builtin_catalog, default_config};
pub use echo::EchoService;
pub use reverse::ReverseService;
pub use word_stream::WordStreamService;
