//! Integration tests for running job files end to end.

mod common;

use common::{bend_options, key};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tilecopy::backend::{BackendFactory, FileTileStore, HttpConfig, TileData};
use tilecopy::cache::disk_cache_stats;
use tilecopy::config::{load_jobs, ConfigFile};
use tilecopy::coord::{Bounds, ReadOptions};
use tilecopy::limiter::RateLimitConfig;
use tilecopy::orchestrator::{CopyJob, JobOrchestrator, OrchestratorConfig};
use tilecopy::pipeline::CopyError;

fn fast_config(cache_dir: Option<std::path::PathBuf>) -> OrchestratorConfig {
    OrchestratorConfig {
        limiter: RateLimitConfig {
            max_concurrent: 16,
            min_interval: Duration::ZERO,
        },
        cache_dir,
        ..OrchestratorConfig::default()
    }
}

#[tokio::test]
async fn test_job_file_to_file_destinations() {
    let temp = TempDir::new().unwrap();
    let jobs_path = temp.path().join("jobs.ini");
    let out_a = temp.path().join("out-a");
    let out_b = temp.path().join("out-b");
    std::fs::write(
        &jobs_path,
        format!(
            r#"
[job.a]
source = memory://origin
destination = file://{}?filetype=png
minzoom = 7
maxzoom = 7
bounds = -121.4024,43.9992,-121.2483,44.125

[job.b]
source = memory://origin
destination = file://{}?filetype=png
minzoom = 6
maxzoom = 7
bounds = -121.4024,43.9992,-121.2483,44.125
"#,
            out_a.display(),
            out_b.display()
        ),
    )
    .unwrap();

    let jobs = load_jobs(&jobs_path).unwrap();
    let orchestrator = JobOrchestrator::new(fast_config(Some(temp.path().join("cache")))).unwrap();
    let origin = orchestrator.factory().memory_store("origin");
    for k in bend_options(6, 7).keys() {
        origin.insert(k, TileData::new("X"));
    }

    let summary = orchestrator.run_all(jobs).await.unwrap();

    assert!(summary.is_success());
    assert_eq!(summary.tiles_written(), 3);

    let a = FileTileStore::new(&out_a, "png");
    let b = FileTileStore::new(&out_b, "png");
    assert_eq!(std::fs::read(a.tile_path(&key(7, 20, 46))).unwrap(), b"X");
    assert_eq!(std::fs::read(b.tile_path(&key(6, 10, 23))).unwrap(), b"X");
    assert_eq!(std::fs::read(b.tile_path(&key(7, 20, 46))).unwrap(), b"X");

    let stats = disk_cache_stats(&temp.path().join("cache")).unwrap();
    assert_eq!(stats.namespaces, 1);
    assert_eq!(stats.tiles, 2);
}

#[tokio::test]
async fn test_failed_job_does_not_affect_others() {
    let orchestrator = JobOrchestrator::new(fast_config(None)).unwrap();
    let origin = orchestrator.factory().memory_store("origin");
    let world = ReadOptions::new(0, 1, Bounds::world()).unwrap();
    for k in world.keys() {
        if k != key(1, 1, 1) {
            origin.insert(k, TileData::new("X"));
        }
    }

    let summary = orchestrator
        .run_all(vec![
            CopyJob::new("partial", "memory://origin", "memory://partial", world),
            CopyJob::new(
                "top",
                "memory://origin",
                "memory://top",
                ReadOptions::new(0, 0, Bounds::world()).unwrap(),
            ),
        ])
        .await
        .unwrap();

    assert!(!summary.is_success());
    assert!(matches!(
        summary.job("partial").unwrap().result,
        Err(CopyError::Source(_))
    ));
    assert!(summary.job("top").unwrap().is_success());
    assert_eq!(orchestrator.factory().memory_store("top").len(), 1);
    // Zoom 0 plus the three zoom 1 tiles before the missing one
    assert_eq!(orchestrator.factory().memory_store("partial").len(), 4);
}

#[tokio::test]
async fn test_config_file_drives_orchestrator() {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("config.ini");
    std::fs::write(
        &config_path,
        format!(
            "[cache]\ndirectory = {}\n\n[limiter]\nmax_concurrent = 4\nmin_interval_ms = 0\n",
            temp.path().join("tiles-cache").display()
        ),
    )
    .unwrap();

    let config = ConfigFile::load_from(&config_path).unwrap().orchestrator_config();
    assert_eq!(config.limiter.max_concurrent, 4);

    let factory = Arc::new(BackendFactory::new(HttpConfig::default()).unwrap());
    let orchestrator = JobOrchestrator::with_factory(config, Arc::clone(&factory));
    factory
        .memory_store("src")
        .insert(key(0, 0, 0), TileData::new("root"));

    let summary = orchestrator
        .run_all(vec![CopyJob::new(
            "root",
            "memory://src",
            "memory://dst",
            ReadOptions::default(),
        )])
        .await
        .unwrap();

    assert!(summary.is_success());
    assert_eq!(
        factory.memory_store("dst").get(&key(0, 0, 0)).unwrap().data().as_ref(),
        b"root"
    );
    assert!(temp.path().join("tiles-cache").exists());
}
