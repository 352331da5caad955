//! CLI command implementations.
//!
//! - [`cache`] - Cache management (stats, clear)
//! - [`config`] - Configuration management (init, path, show)
//! - [`copy`] - Single copy job from the command line
//! - [`run`] - Run every job in a job file

pub mod cache;
pub mod config;
pub mod copy;
pub mod run;
