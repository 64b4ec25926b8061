//! Logging infrastructure for Vigil.
//!
//! Structured logging using the `tracing` ecosystem:
//!
//! - JSON lines written to `~/.vigil/logs/vigil.log` (rotated daily)
//! - Compact human-readable output on stderr
//! - `-v` switches the default level to DEBUG
//!
//! Poll failures are reported through this channel rather than as user-facing
//! notifications.
//!
//! ## Example
//!
//! ```no_run
//! use vigil_core::logging;
//!
//! let _guard = logging::init_logging(None, false).expect("logging init");
//! tracing::info!("vigil started");
//! tracing::debug!(resource_id = "runtime-123", "polling");
//! ```

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::error::{Result, VigilError};

/// Guard that must be held to ensure log flushing on shutdown.
///
/// Keep this guard alive for the lifetime of the application.
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize the Vigil logging system.
///
/// * `log_dir` - Optional custom log directory. Defaults to `~/.vigil/logs/`
/// * `verbose` - If true, sets log level to DEBUG. Otherwise uses INFO.
///
/// Returns a [`LogGuard`] that must be held for the application lifetime.
pub fn init_logging(log_dir: Option<PathBuf>, verbose: bool) -> Result<LogGuard> {
    let log_dir = match log_dir {
        Some(dir) => dir,
        None => default_log_dir()?,
    };

    std::fs::create_dir_all(&log_dir).map_err(|e| VigilError::DirectoryCreation {
        path: log_dir.clone(),
        source: e,
    })?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "vigil.log");
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("vigil={default_level}")));

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .json()
        .with_span_events(FmtSpan::CLOSE)
        .with_current_span(true)
        .with_span_list(true);

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(true)
        .with_file(verbose)
        .with_line_number(verbose)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    tracing::debug!(log_dir = %log_dir.display(), verbose, "logging initialized");

    Ok(LogGuard {
        _file_guard: Some(file_guard),
    })
}

/// Initialize minimal console-only logging for tests.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

/// Vigil's home directory, `~/.vigil/`.
pub fn vigil_home() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".vigil"))
        .ok_or_else(|| VigilError::internal("could not determine home directory"))
}

/// Returns `~/.vigil/logs/`
pub fn default_log_dir() -> Result<PathBuf> {
    Ok(vigil_home()?.join("logs"))
}

/// Log a notification that was handed to the display surface.
///
/// ```ignore
/// log_notification!("runtime-123", "error", title = "Error Creating Cloud Environment");
/// ```
#[macro_export]
macro_rules! log_notification {
    ($resource_id:expr, $severity:expr) => {
        tracing::info!(
            target: "vigil::notify",
            resource_id = $resource_id,
            severity = $severity,
            "notification emitted"
        )
    };
    ($resource_id:expr, $severity:expr, $($field:tt)*) => {
        tracing::info!(
            target: "vigil::notify",
            resource_id = $resource_id,
            severity = $severity,
            $($field)*,
            "notification emitted"
        )
    };
}

/// Log a classified status transition.
///
/// ```ignore
/// log_transition!("runtime-123", from = "Creating", to = "Error");
/// ```
#[macro_export]
macro_rules! log_transition {
    ($resource_id:expr, $($field:tt)*) => {
        tracing::debug!(
            target: "vigil::diff",
            resource_id = $resource_id,
            $($field)*,
            "status transition"
        )
    };
}
