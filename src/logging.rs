//! Logging setup
//!
//! Installs the `tracing` subscriber the shim logs through. The log file is
//! truncated on every start so it only covers the current process.

use std::fs::File;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Install the global subscriber described by `config`.
///
/// `RUST_LOG` takes precedence over `config.log_level`. Returns `Ok(false)`
/// if another subscriber was already installed.
pub fn init(config: &Config) -> Result<bool> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .with_context(|| format!("invalid log filter {:?}", config.log_level))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_ansi(false)
        .with_thread_ids(true);

    let installed = match config.log_file.as_deref().filter(|p| !p.as_os_str().is_empty()) {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            builder.with_writer(Mutex::new(file)).try_init().is_ok()
        }
        None => builder.with_writer(std::io::stderr).try_init().is_ok(),
    };

    Ok(installed)
}
