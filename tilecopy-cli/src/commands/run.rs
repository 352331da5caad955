//! Run command - execute every job in a job file.

use std::path::PathBuf;

use tilecopy::config::load_jobs;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the run command.
pub struct RunArgs {
    pub jobs_file: PathBuf,
    pub fail_on_error: bool,
    pub config: Option<PathBuf>,
    pub debug: bool,
}

/// Run the run command.
pub fn run(args: RunArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(args.config.as_deref(), args.debug)?;
    runner.log_startup("run");

    let jobs = load_jobs(&args.jobs_file)?;
    println!(
        "Running {} job(s) from {}",
        jobs.len(),
        args.jobs_file.display()
    );

    let fail_on_error = args.fail_on_error || runner.config().orchestrator.fail_on_job_error;
    runner.run_jobs(jobs, fail_on_error)?;
    Ok(())
}
