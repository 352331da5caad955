//! Copy command - one job described on the command line.

use std::path::PathBuf;

use tilecopy::coord::{Bounds, ReadOptions};
use tilecopy::orchestrator::CopyJob;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the copy command.
pub struct CopyArgs {
    pub source: String,
    pub destination: String,
    pub minzoom: u8,
    pub maxzoom: u8,
    pub bounds: Option<String>,
    pub config: Option<PathBuf>,
    pub debug: bool,
}

/// Builds the job for a copy invocation.
pub fn build_job(args: &CopyArgs) -> Result<CopyJob, CliError> {
    let bounds = match &args.bounds {
        Some(text) => text
            .parse::<Bounds>()
            .map_err(|e| CliError::Config(format!("--bounds: {}", e)))?,
        None => Bounds::world(),
    };
    let options = ReadOptions::new(args.minzoom, args.maxzoom, bounds)
        .map_err(|e| CliError::Config(e.to_string()))?;

    Ok(CopyJob::new(
        "copy",
        args.source.as_str(),
        args.destination.as_str(),
        options,
    ))
}

/// Run the copy command.
///
/// A single job that fails always fails the command.
pub fn run(args: CopyArgs) -> Result<(), CliError> {
    let job = build_job(&args)?;

    let runner = CliRunner::new(args.config.as_deref(), args.debug)?;
    runner.log_startup("copy");
    println!(
        "Copying {} tiles from {} to {}",
        job.options.tile_count(),
        job.source,
        job.destination
    );

    runner.run_jobs(vec![job], true)?;
    Ok(())
}
