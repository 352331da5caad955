//! Configuration management CLI commands.

use clap::Subcommand;
use std::path::Path;
use tilecopy::config::{resolve_config_path, ConfigFile};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Write a config file with the default settings
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Show the configuration file path
    Path,

    /// Show the effective settings
    Show,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, config_path: Option<&Path>) -> Result<(), CliError> {
    let path = resolve_config_path(config_path);

    match command {
        ConfigCommands::Init { force } => run_init(&path, force),
        ConfigCommands::Path => {
            println!("{}", path.display());
            Ok(())
        }
        ConfigCommands::Show => run_show(&path),
    }
}

fn run_init(path: &Path, force: bool) -> Result<(), CliError> {
    if force {
        ConfigFile::default().save_to(path)?;
        println!("Wrote default configuration to {}", path.display());
    } else if ConfigFile::ensure_exists(path)? {
        println!("Created {}", path.display());
    } else {
        println!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    Ok(())
}

fn run_show(path: &Path) -> Result<(), CliError> {
    let config = ConfigFile::load_from(path)?;
    let source = if path.exists() {
        path.display().to_string()
    } else {
        "defaults (no config file)".to_string()
    };

    println!("# Effective configuration from {}", source);
    println!();
    println!("[cache]");
    println!("directory = {}", config.cache.directory.display());
    println!("enabled = {}", config.cache.enabled);
    println!();
    println!("[limiter]");
    println!("max_concurrent = {}", config.limiter.max_concurrent);
    println!("min_interval_ms = {}", config.limiter.min_interval_ms);
    println!();
    println!("[pipeline]");
    println!("read_concurrency = {}", config.pipeline.read_concurrency);
    println!("cache_queue_capacity = {}", config.pipeline.cache_queue_capacity);
    println!("progress_interval = {}", config.pipeline.progress_interval);
    println!();
    println!("[http]");
    println!("timeout_secs = {}", config.http.timeout_secs);
    println!("max_retries = {}", config.http.max_retries);
    println!("retry_base_delay_ms = {}", config.http.retry_base_delay_ms);
    println!("user_agent = {}", config.http.user_agent);
    println!();
    println!("[logging]");
    println!("file = {}", config.logging.file.display());
    println!("level = {}", config.logging.level);
    println!();
    println!("[orchestrator]");
    println!("fail_on_job_error = {}", config.orchestrator.fail_on_job_error);
    Ok(())
}
