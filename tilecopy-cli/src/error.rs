//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;
use tilecopy::config::ConfigFileError;
use tilecopy::orchestrator::OrchestratorError;

/// Exit code for a run where jobs failed and failures were asked to count.
pub const EXIT_JOBS_FAILED: i32 = 2;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Config or job file could not be loaded
    ConfigFile(ConfigFileError),
    /// Failed to start the async runtime
    Runtime(std::io::Error),
    /// The run was aborted by an unexpected fault
    Orchestrator(OrchestratorError),
    /// One or more jobs failed
    JobsFailed { failed: usize, total: usize },
    /// Failed to read cache statistics
    CacheStats(String),
    /// Failed to clear the cache
    CacheClear(String),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::JobsFailed { .. } => EXIT_JOBS_FAILED,
            _ => 1,
        }
    }

    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::ConfigFile(ConfigFileError::InvalidValue { .. }) => {
                eprintln!();
                eprintln!("Run 'tilecopy config show' to see the effective settings,");
                eprintln!("or 'tilecopy config init --force' to restore the defaults.");
            }
            CliError::JobsFailed { .. } => {
                eprintln!("See the log file for the cause of each failure.");
            }
            _ => {}
        }

        process::exit(self.exit_code())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::ConfigFile(e) => write!(f, "{}", e),
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
            CliError::Orchestrator(e) => write!(f, "Run aborted: {}", e),
            CliError::JobsFailed { failed, total } => {
                write!(f, "{} of {} jobs failed", failed, total)
            }
            CliError::CacheStats(msg) => write!(f, "Failed to read cache statistics: {}", msg),
            CliError::CacheClear(msg) => write!(f, "Failed to clear cache: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::ConfigFile(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::Orchestrator(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<OrchestratorError> for CliError {
    fn from(e: OrchestratorError) -> Self {
        CliError::Orchestrator(e)
    }
}
