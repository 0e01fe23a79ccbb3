//! Tracing subscriber setup.
//!
//! The terminal belongs to the wrapped program, so logs never go to
//! stdout/stderr. Logging is off unless `TSR_LOG` holds a filter directive
//! (e.g. `TSR_LOG=debug`); then events are appended to
//! `$TSR_HOME/logs/tsr.log`.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::paths;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "TSR_LOG";

const LOG_FILE_NAME: &str = "tsr.log";

/// Initializes the global subscriber if `TSR_LOG` is set.
///
/// The returned guard flushes the background writer when dropped and must
/// be held until the process is about to exit.
pub fn init() -> Result<Option<WorkerGuard>> {
    let Ok(directives) = std::env::var(LOG_ENV) else {
        return Ok(None);
    };
    let filter = EnvFilter::try_new(&directives)
        .with_context(|| format!("Invalid {LOG_ENV} filter '{directives}'"))?;
    init_in(&paths::logs_dir(), filter).map(Some)
}

/// Installs a file-backed subscriber writing into `dir`.
pub fn init_in(dir: &Path, filter: EnvFilter) -> Result<WorkerGuard> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}
