//! File logging for the Neovim process.
//!
//! Neovim owns stdout and stderr, so every tracing event goes to a log file
//! through a non-blocking appender. The appender guard lives in a static for
//! the lifetime of the process; dropping it would lose buffered lines.

use crate::error::HostError;
use once_cell::sync::OnceCell;
use std::fs::{self, OpenOptions};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

const DEFAULT_LOG_LEVEL: &str = "info";

static LOG_PATH: OnceCell<String> = OnceCell::new();
static APPENDER_GUARD: OnceCell<WorkerGuard> = OnceCell::new();
static PANIC_HOOK_INSTALLED: OnceCell<()> = OnceCell::new();

/// Installs the global subscriber writing to `log_file_path`.
///
/// Only the first call configures anything, later calls return the path
/// chosen by the first one.
pub fn init_tracing(log_file_path: &str, log_level: Option<&str>) -> Result<String, HostError> {
    if let Some(existing) = LOG_PATH.get() {
        return Ok(existing.clone());
    }

    let path = Path::new(log_file_path);
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| {
            HostError::Tracing(format!("cannot create {}: {e}", parent.display()))
        })?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| HostError::Tracing(format!("cannot open {}: {e}", path.display())))?;

    let level = log_level
        .map(str::trim)
        .filter(|level| !level.is_empty())
        .unwrap_or(DEFAULT_LOG_LEVEL);
    let filter = EnvFilter::try_new(level)
        .map_err(|e| HostError::Tracing(format!("invalid log level {level:?}: {e}")))?;

    let (writer, guard) = tracing_appender::non_blocking(file);
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true),
        )
        .try_init()
        .map_err(|e| HostError::Tracing(e.to_string()))?;

    let _ = APPENDER_GUARD.set(guard);
    let _ = LOG_PATH.set(log_file_path.to_string());

    tracing::info!(path = log_file_path, level, "Tracing initialized");
    Ok(log_file_path.to_string())
}

/// Routes panics through tracing before the default hook runs. A panic that
/// unwinds into LuaJIT kills the editor, the log line is often the only trace.
pub fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.get_or_init(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic_info| {
            let location = panic_info
                .location()
                .map(|l| format!("{}:{}", l.file(), l.line()))
                .unwrap_or_else(|| "unknown".to_string());
            let payload = panic_info
                .payload()
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic_info.payload().downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());

            tracing::error!(%location, %payload, "bufrecall panicked");
            previous(panic_info);
        }));
    });
}
