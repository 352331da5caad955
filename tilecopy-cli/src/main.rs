//! TileCopy CLI - Command-line interface
//!
//! Copies map tiles between backends through a rate-limited, cache-aside
//! fetch path.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::cache::CacheAction;
use commands::config::ConfigCommands;
use commands::copy::CopyArgs;
use commands::run::RunArgs;

#[derive(Parser)]
#[command(name = "tilecopy")]
#[command(version, about = "Copy map tiles through a persistent cache", long_about = None)]
struct Cli {
    /// Config file to use instead of ~/.tilecopy/config.ini
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every job in a job file
    Run {
        /// INI file with one [job.<name>] section per job
        jobs: PathBuf,

        /// Exit with status 2 if any job fails
        #[arg(long)]
        fail_on_error: bool,
    },

    /// Copy one extent from a source to a destination
    Copy {
        /// Source URI (http(s)://.../{z}/{x}/{y}.png, file://..., memory://...)
        source: String,

        /// Destination URI (file://... or memory://...)
        destination: String,

        /// Lowest zoom level to copy
        #[arg(long, default_value = "0")]
        minzoom: u8,

        /// Highest zoom level to copy
        #[arg(long)]
        maxzoom: u8,

        /// Bounding box as minLon,minLat,maxLon,maxLat (default: whole world)
        #[arg(long, allow_hyphen_values = true)]
        bounds: Option<String>,
    },

    /// Inspect or clear the disk cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();
    let config = cli.config;

    let result = match cli.command {
        Commands::Run {
            jobs,
            fail_on_error,
        } => commands::run::run(RunArgs {
            jobs_file: jobs,
            fail_on_error,
            config,
            debug: cli.debug,
        }),
        Commands::Copy {
            source,
            destination,
            minzoom,
            maxzoom,
            bounds,
        } => commands::copy::run(CopyArgs {
            source,
            destination,
            minzoom,
            maxzoom,
            bounds,
            config,
            debug: cli.debug,
        }),
        Commands::Cache { action } => commands::cache::run(action, config.as_deref()),
        Commands::Config { command } => commands::config::run(command, config.as_deref()),
    };

    if let Err(e) = result {
        e.exit();
    }
}
