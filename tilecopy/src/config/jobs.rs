//! Job files.
//!
//! A job file is an INI file with one `[job.<name>]` section per copy job:
//!
//! ```ini
//! [job.bend]
//! source = https://tiles.example.com/{z}/{x}/{y}.png
//! destination = file:///data/bend?filetype=png
//! minzoom = 6
//! maxzoom = 7
//! bounds = -121.4024,43.9992,-121.2483,44.125
//! ```
//!
//! `bounds` defaults to the whole world. Sections with any other name are
//! ignored.

use ini::{Ini, Properties};
use std::path::Path;

use super::file::ConfigFileError;
use crate::coord::{Bounds, ReadOptions};
use crate::orchestrator::CopyJob;

/// Prefix of job section names.
pub const JOB_SECTION_PREFIX: &str = "job.";

/// Loads every job in the file at `path`, in file order.
pub fn load_jobs(path: &Path) -> Result<Vec<CopyJob>, ConfigFileError> {
    let ini = Ini::load_from_file(path)?;
    parse_jobs(&ini)
}

/// Reads the jobs of an already loaded job file.
///
/// A file without any job section is an error.
pub fn parse_jobs(ini: &Ini) -> Result<Vec<CopyJob>, ConfigFileError> {
    let mut jobs = Vec::new();

    for (section_name, properties) in ini.iter() {
        let Some(section_name) = section_name else {
            continue;
        };
        let Some(name) = section_name.strip_prefix(JOB_SECTION_PREFIX) else {
            continue;
        };
        if name.trim().is_empty() {
            return Err(ConfigFileError::Parse(format!(
                "section [{}] has no job name",
                section_name
            )));
        }
        if jobs.iter().any(|job: &CopyJob| job.name == name) {
            return Err(ConfigFileError::Parse(format!("duplicate job '{}'", name)));
        }

        jobs.push(parse_job(section_name, name, properties)?);
    }

    if jobs.is_empty() {
        return Err(ConfigFileError::Parse(format!(
            "no [{}<name>] sections found",
            JOB_SECTION_PREFIX
        )));
    }

    Ok(jobs)
}

fn parse_job(section: &str, name: &str, properties: &Properties) -> Result<CopyJob, ConfigFileError> {
    let source = required(section, properties, "source")?;
    let destination = required(section, properties, "destination")?;
    let minzoom = zoom(section, properties, "minzoom")?;
    let maxzoom = zoom(section, properties, "maxzoom")?;

    let bounds = match properties.get("bounds") {
        Some(v) => v.parse::<Bounds>().map_err(|e| invalid(section, "bounds", v, e))?,
        None => Bounds::world(),
    };

    let options = ReadOptions::new(minzoom, maxzoom, bounds).map_err(|e| {
        invalid(section, "maxzoom", &maxzoom.to_string(), e)
    })?;

    Ok(CopyJob::new(name, source, destination, options))
}

fn required<'a>(
    section: &str,
    properties: &'a Properties,
    key: &str,
) -> Result<&'a str, ConfigFileError> {
    match properties.get(key).map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ConfigFileError::Parse(format!(
            "[{}] is missing '{}'",
            section, key
        ))),
    }
}

fn zoom(section: &str, properties: &Properties, key: &str) -> Result<u8, ConfigFileError> {
    let v = required(section, properties, key)?;
    v.parse()
        .map_err(|_| invalid(section, key, v, "must be an integer between 0 and 30"))
}

fn invalid(
    section: &str,
    key: &str,
    value: &str,
    reason: impl ToString,
) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
