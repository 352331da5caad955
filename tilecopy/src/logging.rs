//! Logging infrastructure for TileCopy.
//!
//! Provides structured logging with file output and console output:
//! - Writes to the configured log file (cleared on session start)
//! - Optionally prints to stdout for interactive runs
//! - `RUST_LOG` overrides the configured level

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping this guard will flush and close the log file writer.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
    log_file: PathBuf,
}

impl LoggingGuard {
    /// Path of the session log file.
    pub fn log_file(&self) -> &Path {
        &self.log_file
    }
}

/// Where and how much to log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingOptions {
    pub log_file: PathBuf,
    /// Filter directive used when `RUST_LOG` is not set, e.g. `info`
    pub level: String,
    /// Also log to stdout
    pub stdout: bool,
}

/// Initialize logging system.
///
/// Creates the log directory if needed, clears the previous log file, and
/// installs the global subscriber.
///
/// # Errors
///
/// Returns error if log directory cannot be created or log file cannot be cleared
pub fn init_logging(options: &LoggingOptions) -> Result<LoggingGuard, io::Error> {
    let (log_dir, file_name) = split_log_path(&options.log_file)?;
    prepare_log_file(&log_dir, &file_name)?;

    let file_appender = tracing_appender::rolling::never(&log_dir, &file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE);

    let stdout_layer = options.stdout.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(io::stdout)
            .with_ansi(true)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(env_filter(&options.level))
        .with(file_layer)
        .with(stdout_layer)
        .init();

    Ok(LoggingGuard {
        _file_guard: file_guard,
        log_file: log_dir.join(file_name),
    })
}

/// Filter from `RUST_LOG`, falling back to `default_level`.
fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn split_log_path(log_file: &Path) -> Result<(PathBuf, String), io::Error> {
    let file_name = log_file
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid log file path: {}", log_file.display()),
            )
        })?
        .to_string();

    let log_dir = match log_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    Ok((log_dir, file_name))
}

/// Creates the directory and truncates the log file.
fn prepare_log_file(log_dir: &Path, file_name: &str) -> Result<(), io::Error> {
    fs::create_dir_all(log_dir)?;
    fs::write(log_dir.join(file_name), "")
}
