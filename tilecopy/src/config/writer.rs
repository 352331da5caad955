//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! Produces the commented INI representation written to `config.ini`.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    format!(
        r#"[cache]
; Directory for the persistent tile cache. Each source gets its own
; subdirectory named after a hash of its URI.
directory = {}
; Set to false to copy without a cache
enabled = {}

[limiter]
; Maximum origin fetches in flight at once, per origin (default: 16)
max_concurrent = {}
; Minimum milliseconds between two origin fetches, per origin (default: 100)
min_interval_ms = {}

[pipeline]
; Tile fetches kept in flight ahead of the destination writer (default: 16)
read_concurrency = {}
; Tiles queued for the cache writer; when full, cache copies are skipped
; rather than slowing the destination (default: 1024)
cache_queue_capacity = {}
; Log progress every N tiles, 0 to disable (default: 1000)
progress_interval = {}

[http]
; Request timeout in seconds (default: 30)
timeout_secs = {}
; Retries after a timeout, 429 or 5xx response (default: 3)
max_retries = {}
; Base delay for exponential backoff between retries (default: 250)
; Actual delay = base_delay * 2^attempt (e.g., 250ms, 500ms, 1000ms)
retry_base_delay_ms = {}
user_agent = {}

[logging]
; Log file, cleared at the start of each run
file = {}
; Level when RUST_LOG is not set: trace, debug, info, warn, error
level = {}

[orchestrator]
; Exit with status 2 when any job fails (default: false)
fail_on_job_error = {}
"#,
        path_to_string(&config.cache.directory),
        config.cache.enabled,
        config.limiter.max_concurrent,
        config.limiter.min_interval_ms,
        config.pipeline.read_concurrency,
        config.pipeline.cache_queue_capacity,
        config.pipeline.progress_interval,
        config.http.timeout_secs,
        config.http.max_retries,
        config.http.retry_base_delay_ms,
        config.http.user_agent,
        path_to_string(&config.logging.file),
        config.logging.level,
        config.orchestrator.fail_on_job_error,
    )
}

/// Converts a path to a string, replacing home directory with ~.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_section_written() {
        let content = to_config_string(&ConfigFile::default());
        for section in [
            "[cache]",
            "[limiter]",
            "[pipeline]",
            "[http]",
            "[logging]",
            "[orchestrator]",
        ] {
            assert!(content.contains(section), "missing {section}");
        }
        assert!(content.contains("max_concurrent = 16"));
        assert!(content.contains("fail_on_job_error = false"));
    }

    #[test]
    fn test_home_paths_use_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(path_to_string(&home.join("tiles")), "~/tiles");
        }
        assert_eq!(path_to_string(Path::new("/srv/tiles")), "/srv/tiles");
    }
}
