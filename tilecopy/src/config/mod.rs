//! Configuration for TileCopy.
//!
//! User settings live in an INI file (default `~/.tilecopy/config.ini`):
//!
//! - [`ConfigFile`] and its per-section settings structs
//! - [`load_jobs`] for job files with `[job.<name>]` sections
//! - conversions into the runtime configs of each component, e.g.
//!   [`ConfigFile::orchestrator_config`]

mod convert;
mod defaults;
mod file;
mod jobs;
mod parser;
mod settings;
mod writer;

pub use defaults::*;
pub use file::{resolve_config_path, ConfigFileError};
pub use jobs::{load_jobs, parse_jobs, JOB_SECTION_PREFIX};
pub use parser::LOG_LEVELS;
pub use settings::{
    CacheSettings, ConfigFile, HttpSettings, LimiterSettings, LoggingSettings,
    OrchestratorSettings, PipelineSettings,
};
