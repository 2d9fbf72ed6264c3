pub mod cli;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod seed;
pub mod server;
pub mod ssot;

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

/// Installs the global subscriber. `RUST_LOG` overrides `default_filter`.
/// With a `log_dir` the output is JSON in a daily rolling file, otherwise
/// compact text on stderr.
pub fn init_tracing(log_dir: Option<&Path>, default_filter: &str) -> Result<(), String> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    match log_dir {
        Some(log_dir) => {
            std::fs::create_dir_all(log_dir).map_err(|error| error.to_string())?;
            let file_appender = tracing_appender::rolling::daily(log_dir, "lifeos.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let _ = LOG_GUARD.set(guard);

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .with_writer(non_blocking)
                .try_init()
                .map_err(|error| error.to_string())
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|error| error.to_string()),
    }
}
