//! Cache management CLI commands.

use clap::Subcommand;
use std::path::Path;
use tilecopy::cache::{clear_disk_cache, disk_cache_stats};
use tilecopy::config::{resolve_config_path, ConfigFile};

use crate::error::CliError;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Show disk cache statistics
    Stats,
    /// Clear the disk cache, removing all cached tiles
    Clear,
}

/// Run a cache subcommand.
pub fn run(action: CacheAction, config_path: Option<&Path>) -> Result<(), CliError> {
    let config = ConfigFile::load_from(&resolve_config_path(config_path))?;
    let cache_dir = &config.cache.directory;

    match action {
        CacheAction::Stats => {
            println!("Disk cache: {}", cache_dir.display());
            if !config.cache.enabled {
                println!("  (caching is disabled in the config file)");
            }

            let stats =
                disk_cache_stats(cache_dir).map_err(|e| CliError::CacheStats(e.to_string()))?;
            println!("  Sources: {}", stats.namespaces);
            println!("  Tiles:   {}", stats.tiles);
            println!("  Size:    {}", format_bytes(stats.bytes));
            Ok(())
        }
        CacheAction::Clear => {
            println!("Clearing disk cache at: {}", cache_dir.display());

            let result =
                clear_disk_cache(cache_dir).map_err(|e| CliError::CacheClear(e.to_string()))?;
            println!(
                "Deleted {} files, freed {}",
                result.files_deleted,
                format_bytes(result.bytes_freed)
            );
            Ok(())
        }
    }
}

/// Formats a byte count with a binary unit suffix.
fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}
