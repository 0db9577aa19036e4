//! Logging initialization for binaries embedding the engine.
//!
//! The engine itself only emits `tracing` events; this module wires up a
//! subscriber with a compact stdout layer and an optional file layer.
//! Verbosity is controlled through the `RUST_LOG` environment variable
//! and defaults to `info`.

use std::fs;
use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// File name used for the optional log file.
pub const DEFAULT_LOG_FILE: &str = "gridstream.log";

/// Keeps the non-blocking file writer alive.
///
/// Dropping the guard flushes and closes the log file.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Install the global tracing subscriber.
///
/// Always logs to stdout; when `log_dir` is given, additionally writes
/// `gridstream.log` (no ANSI colors) in that directory, creating it if
/// needed.
///
/// # Errors
///
/// Fails if the log directory cannot be created or if a global
/// subscriber is already installed.
pub fn init_logging(log_dir: Option<&Path>) -> io::Result<LoggingGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_target(false)
        .compact();
    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    let file_guard = if let Some(dir) = log_dir {
        fs::create_dir_all(dir)?;
        let appender = tracing_appender::rolling::never(dir, DEFAULT_LOG_FILE);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false);
        registry
            .with(file_layer)
            .try_init()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        Some(guard)
    } else {
        registry
            .try_init()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        None
    };

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}
