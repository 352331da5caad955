//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use ini::{Ini, Properties};
use std::path::PathBuf;
use std::str::FromStr;

use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Log levels accepted in `[logging] level`.
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.cache.directory = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("enabled") {
            config.cache.enabled = parse_bool(v);
        }
    }

    // [limiter] section
    if let Some(section) = ini.section(Some("limiter")) {
        if let Some(v) = positive(section, "limiter", "max_concurrent")? {
            config.limiter.max_concurrent = v;
        }
        if let Some(v) = number(
            section,
            "limiter",
            "min_interval_ms",
            "must be a non-negative integer (milliseconds)",
        )? {
            config.limiter.min_interval_ms = v;
        }
    }

    // [pipeline] section
    if let Some(section) = ini.section(Some("pipeline")) {
        if let Some(v) = positive(section, "pipeline", "read_concurrency")? {
            config.pipeline.read_concurrency = v;
        }
        if let Some(v) = positive(section, "pipeline", "cache_queue_capacity")? {
            config.pipeline.cache_queue_capacity = v;
        }
        if let Some(v) = number(
            section,
            "pipeline",
            "progress_interval",
            "must be a non-negative integer (0 disables progress logging)",
        )? {
            config.pipeline.progress_interval = v;
        }
    }

    // [http] section
    if let Some(section) = ini.section(Some("http")) {
        if let Some(v) = section.get("timeout_secs") {
            let secs: u64 = v.trim().parse().unwrap_or(0);
            if secs == 0 {
                return Err(ConfigFileError::InvalidValue {
                    section: "http".to_string(),
                    key: "timeout_secs".to_string(),
                    value: v.to_string(),
                    reason: "must be a positive integer (seconds)".to_string(),
                });
            }
            config.http.timeout_secs = secs;
        }
        if let Some(v) = number(
            section,
            "http",
            "max_retries",
            "must be a non-negative integer",
        )? {
            config.http.max_retries = v;
        }
        if let Some(v) = number(
            section,
            "http",
            "retry_base_delay_ms",
            "must be a non-negative integer (milliseconds)",
        )? {
            config.http.retry_base_delay_ms = v;
        }
        if let Some(v) = section.get("user_agent") {
            let v = v.trim();
            if !v.is_empty() {
                config.http.user_agent = v.to_string();
            }
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("level") {
            let level = v.trim().to_lowercase();
            if !LOG_LEVELS.contains(&level.as_str()) {
                return Err(ConfigFileError::InvalidValue {
                    section: "logging".to_string(),
                    key: "level".to_string(),
                    value: v.to_string(),
                    reason: "must be one of: trace, debug, info, warn, error".to_string(),
                });
            }
            config.logging.level = level;
        }
    }

    // [orchestrator] section
    if let Some(section) = ini.section(Some("orchestrator")) {
        if let Some(v) = section.get("fail_on_job_error") {
            config.orchestrator.fail_on_job_error = parse_bool(v);
        }
    }

    Ok(config)
}

fn number<T: FromStr>(
    section: &Properties,
    section_name: &str,
    key: &str,
    reason: &str,
) -> Result<Option<T>, ConfigFileError> {
    let Some(v) = section.get(key) else {
        return Ok(None);
    };

    v.trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigFileError::InvalidValue {
            section: section_name.to_string(),
            key: key.to_string(),
            value: v.to_string(),
            reason: reason.to_string(),
        })
}

fn positive(
    section: &Properties,
    section_name: &str,
    key: &str,
) -> Result<Option<usize>, ConfigFileError> {
    const REASON: &str = "must be a positive integer";

    match number::<usize>(section, section_name, key, REASON)? {
        Some(0) => Err(ConfigFileError::InvalidValue {
            section: section_name.to_string(),
            key: key.to_string(),
            value: "0".to_string(),
            reason: REASON.to_string(),
        }),
        other => Ok(other),
    }
}

/// Parse a boolean value from a config string.
/// Accepts: true/false, yes/no, 1/0, on/off (case-insensitive)
pub(super) fn parse_bool(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    v == "true" || v == "1" || v == "yes" || v == "on"
}

/// Expand ~ to home directory in paths.
pub(crate) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
