//! CLI runner for common setup and operations.
//!
//! Encapsulates config loading, logging initialization and job execution so
//! command handlers stay small.

use crate::error::CliError;
use std::path::{Path, PathBuf};
use tilecopy::config::{resolve_config_path, ConfigFile};
use tilecopy::logging::{init_logging, LoggingGuard, LoggingOptions};
use tilecopy::orchestrator::{CopyJob, JobOrchestrator, RunSummary};
use tracing::{info, warn};

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    logging_guard: LoggingGuard,
    config: ConfigFile,
    config_path: PathBuf,
}

impl CliRunner {
    /// Loads the config file and initializes logging.
    ///
    /// With `debug_mode`, the log level is `debug` unless RUST_LOG says
    /// otherwise.
    pub fn new(config_path: Option<&Path>, debug_mode: bool) -> Result<Self, CliError> {
        let config_path = resolve_config_path(config_path);
        let config = ConfigFile::load_from(&config_path)?;

        let level = if debug_mode {
            "debug".to_string()
        } else {
            config.logging.level.clone()
        };
        let logging_guard = init_logging(&LoggingOptions {
            log_file: config.logging.file.clone(),
            level,
            stdout: true,
        })
        .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        tilecopy::panic::init();

        Ok(Self {
            logging_guard,
            config,
            config_path,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("TileCopy v{}", tilecopy::VERSION);
        info!(
            config = %self.config_path.display(),
            log_file = %self.logging_guard.log_file().display(),
            "TileCopy CLI: {} command",
            command
        );
    }

    /// Runs `jobs` to completion and prints a summary.
    ///
    /// Ctrl-C cancels every running job. Failed jobs only make this return
    /// an error when `fail_on_error` is set.
    pub fn run_jobs(&self, jobs: Vec<CopyJob>, fail_on_error: bool) -> Result<RunSummary, CliError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(CliError::Runtime)?;

        let summary = runtime.block_on(async {
            let orchestrator = JobOrchestrator::new(self.config.orchestrator_config())?;

            let token = orchestrator.cancellation_token();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted, cancelling jobs");
                    token.cancel();
                }
            });

            orchestrator.run_all(jobs).await
        })?;

        summary.log();
        print_summary(&summary);

        let failed = summary.failed().count();
        if failed > 0 && fail_on_error {
            return Err(CliError::JobsFailed {
                failed,
                total: summary.jobs.len(),
            });
        }
        Ok(summary)
    }
}

fn print_summary(summary: &RunSummary) {
    println!();
    for job in &summary.jobs {
        match &job.result {
            Ok(report) => println!(
                "  ok      {:<20} {} tiles in {:.1}s (cache: {} written, {} failed, {} skipped)",
                job.name,
                report.tiles_written,
                report.elapsed.as_secs_f64(),
                report.cache.written,
                report.cache.failed,
                report.cache.skipped,
            ),
            Err(e) => println!("  FAILED  {:<20} {}", job.name, e),
        }
    }
    println!(
        "{} of {} jobs succeeded, {} tiles written",
        summary.succeeded().count(),
        summary.jobs.len(),
        summary.tiles_written()
    );
}
