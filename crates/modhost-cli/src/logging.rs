//! Tracing set-up for the binary.
//!
//! Priority for the filter: `RUST_LOG` > `--verbose` > `logging.level`.
//! Output goes to stdout (compact) and to a non-rotating file at
//! `logging.dir/logging.file_name` (no ANSI colours).

use std::path::Path;

use anyhow::Context;
use modhost_core::LoggingSection;
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Filter directive to use when `RUST_LOG` is unset or invalid.
pub fn default_directive(logging: &LoggingSection, verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        logging.filter_directive()
    }
}

fn env_filter(logging: &LoggingSection, verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(logging, verbose)))
}

/// Short-lived stderr subscriber used while the configuration is loaded,
/// before the file sink is known.
pub fn bootstrap_subscriber(verbose: bool) -> impl Subscriber + Send + Sync {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .compact()
        .finish()
}

/// Install the global subscriber. Keep the returned guard alive for the
/// lifetime of the process or buffered file output is lost.
pub fn init(
    logging: &LoggingSection,
    log_dir: &Path,
    verbose: bool,
) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::never(log_dir, &logging.file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(env_filter(logging, verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .compact(),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .compact(),
        )
        .try_init()
        .context("a global tracing subscriber is already installed")?;

    Ok(guard)
}
