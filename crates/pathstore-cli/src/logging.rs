//! Tracing setup
//!
//! Logs go to stderr, or to `log_file` when one is configured. `RUST_LOG`
//! takes precedence over the configured level.

use std::fs::OpenOptions;

use tracing::debug;
use tracing_subscriber::EnvFilter;

use pathstore_core::Config;

/// Install the global subscriber (ignored if one is already set)
pub fn init(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.log_level)));

    match &config.log_file {
        Some(path) => {
            let log_file = match OpenOptions::new().create(true).append(true).open(path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Warning: Could not open log file {:?}: {}", path, e);
                    return;
                }
            };
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(log_file)
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }

    debug!("Logging initialized at level {}", config.log_level);
}

fn default_directives(level: &str) -> String {
    format!("pathstore_core={},pathstore_cli={}", level, level)
}
