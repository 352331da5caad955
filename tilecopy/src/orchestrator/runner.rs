//! Concurrent execution of copy jobs.

use super::job::{CopyJob, JobOutcome, RunSummary};
use crate::backend::{BackendError, BackendFactory, HttpConfig, TileBackend};
use crate::cache::CacheBackend;
use crate::fallback::LockTable;
use crate::limiter::{LimiterRegistry, RateLimitConfig};
use crate::panic::panic_message;
use crate::pipeline::{CopyError, CopyPipeline, CopyReport, PipelineConfig};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

/// Settings shared by every job of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrchestratorConfig {
    pub pipeline: PipelineConfig,
    pub limiter: RateLimitConfig,
    pub http: HttpConfig,
    /// Root of the persistent cache, `None` to disable caching
    pub cache_dir: Option<PathBuf>,
}

/// Faults that abort a whole run.
///
/// A failing job is not one of them; its error is recorded in the
/// [`RunSummary`].
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("failed to initialize backends: {0}")]
    Backend(#[from] BackendError),

    #[error("job '{name}' panicked: {message}")]
    JobPanicked { name: String, message: String },
}

/// State shared by every job task.
struct Shared {
    config: OrchestratorConfig,
    factory: Arc<BackendFactory>,
    locks: Arc<LockTable>,
    limiters: Arc<LimiterRegistry>,
}

/// Runs copy jobs concurrently.
///
/// All jobs share one [`LockTable`] and one [`LimiterRegistry`], so jobs
/// that read the same origin share its rate limit and never fetch the same
/// tile at the same time.
pub struct JobOrchestrator {
    shared: Arc<Shared>,
    cancellation: CancellationToken,
}

impl JobOrchestrator {
    /// Creates an orchestrator with its own backend factory.
    pub fn new(config: OrchestratorConfig) -> Result<Self, OrchestratorError> {
        let factory = BackendFactory::new(config.http.clone())?;
        Ok(Self::with_factory(config, Arc::new(factory)))
    }

    /// Creates an orchestrator that resolves URIs through `factory`.
    pub fn with_factory(config: OrchestratorConfig, factory: Arc<BackendFactory>) -> Self {
        let limiters = Arc::new(LimiterRegistry::new(config.limiter));

        Self {
            shared: Arc::new(Shared {
                config,
                factory,
                locks: Arc::new(LockTable::new()),
                limiters,
            }),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn factory(&self) -> &Arc<BackendFactory> {
        &self.shared.factory
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.shared.config
    }

    /// Token that stops every running job when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Runs every job to completion and collects their outcomes.
    ///
    /// Job failures are logged and recorded; they never make this return
    /// an error. A job that panics does, after the remaining jobs finish.
    pub async fn run_all(&self, jobs: Vec<CopyJob>) -> Result<RunSummary, OrchestratorError> {
        info!(jobs = jobs.len(), "Starting run");

        let handles: Vec<_> = jobs
            .into_iter()
            .map(|job| {
                let name = job.name.clone();
                let span = info_span!("job", job = %name);
                let shared = Arc::clone(&self.shared);
                let token = self.cancellation.child_token();
                let handle = tokio::spawn(run_job(shared, job, token).instrument(span));
                (name, handle)
            })
            .collect();

        let mut summary = RunSummary::default();
        let mut panicked = None;

        for (name, handle) in handles {
            match handle.await {
                Ok(result) => summary.jobs.push(JobOutcome { name, result }),
                Err(e) if e.is_panic() => {
                    let message = panic_message(e.into_panic().as_ref());
                    error!(job = %name, message = %message, "Job task panicked");
                    panicked.get_or_insert(OrchestratorError::JobPanicked { name, message });
                }
                Err(e) => {
                    warn!(job = %name, error = %e, "Job task was cancelled");
                    summary.jobs.push(JobOutcome {
                        name,
                        result: Err(CopyError::Cancelled),
                    });
                }
            }
        }

        self.shared.limiters.log_stats();
        let locks = self.shared.locks.stats();
        info!(
            leaders = locks.leaders,
            waiters = locks.waiters,
            abandoned = locks.abandoned,
            "Lock table statistics"
        );

        match panicked {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }
}

async fn run_job(
    shared: Arc<Shared>,
    job: CopyJob,
    token: CancellationToken,
) -> Result<CopyReport, CopyError> {
    info!(
        source = %job.source,
        destination = %job.destination,
        "Job started"
    );

    let result = copy(&shared, &job, token).await;
    match &result {
        Ok(report) => info!(
            tiles_written = report.tiles_written,
            cache_failed = report.cache.failed,
            "Job finished"
        ),
        Err(e) => error!(error = %e, "Job failed"),
    }
    result
}

async fn copy(
    shared: &Shared,
    job: &CopyJob,
    token: CancellationToken,
) -> Result<CopyReport, CopyError> {
    let source = shared
        .factory
        .open_source(&job.source)
        .map_err(CopyError::Setup)?;
    let sink = shared
        .factory
        .open_sink(&job.destination)
        .map_err(CopyError::Setup)?;
    let cache = CacheBackend::open(shared.config.cache_dir.as_deref(), source.identity())
        .map_err(CopyError::Setup)?;

    let pipeline = CopyPipeline::new(
        shared.config.pipeline,
        Arc::clone(&shared.locks),
        Arc::clone(&shared.limiters),
    )
    .with_cancellation(token);

    pipeline
        .run(source, sink, Arc::new(cache), &job.options)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::TileData;
    use crate::coord::{Bounds, ReadOptions};
    use std::time::Duration;

    fn config(cache_dir: Option<PathBuf>) -> OrchestratorConfig {
        OrchestratorConfig {
            limiter: RateLimitConfig {
                max_concurrent: 16,
                min_interval: Duration::ZERO,
            },
            cache_dir,
            ..OrchestratorConfig::default()
        }
    }

    fn world(zoom: u8) -> ReadOptions {
        ReadOptions::new(zoom, zoom, Bounds::world()).unwrap()
    }

    #[tokio::test]
    async fn test_runs_independent_jobs() {
        let orchestrator = JobOrchestrator::new(config(None)).unwrap();
        let origin = orchestrator.factory().memory_store("origin");
        for key in world(1).keys() {
            origin.insert(key, TileData::new("X"));
        }

        let summary = orchestrator
            .run_all(vec![
                CopyJob::new("good", "memory://origin", "memory://out", world(1)),
                CopyJob::new("missing", "memory://nothing", "memory://out2", world(1)),
                CopyJob::new("bad-scheme", "mbtiles://x.mbtiles", "memory://out3", world(1)),
            ])
            .await
            .unwrap();

        assert_eq!(summary.jobs.len(), 3);
        assert_eq!(summary.succeeded().count(), 1);
        assert_eq!(orchestrator.factory().memory_store("out").len(), 4);

        let bad = summary.job("bad-scheme").unwrap();
        assert_eq!(
            bad.result,
            Err(CopyError::Setup(BackendError::UnsupportedScheme(
                "mbtiles".into()
            )))
        );
        assert!(matches!(
            summary.job("missing").unwrap().result,
            Err(CopyError::Source(BackendError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_http_destination_is_setup_error() {
        let orchestrator = JobOrchestrator::new(config(None)).unwrap();

        let summary = orchestrator
            .run_all(vec![CopyJob::new(
                "upload",
                "memory://a",
                "https://tiles.example.com/{z}/{x}/{y}.png",
                world(0),
            )])
            .await
            .unwrap();

        assert!(matches!(
            summary.jobs[0].result,
            Err(CopyError::Setup(BackendError::ReadOnly(_)))
        ));
    }

    #[tokio::test]
    async fn test_cancelled_run() {
        let orchestrator = JobOrchestrator::new(config(None)).unwrap();
        let origin = orchestrator.factory().memory_store("origin");
        for key in world(2).keys() {
            origin.insert(key, TileData::new("X"));
        }
        orchestrator.cancellation_token().cancel();

        let summary = orchestrator
            .run_all(vec![CopyJob::new(
                "late",
                "memory://origin",
                "memory://out",
                world(2),
            )])
            .await
            .unwrap();

        assert_eq!(summary.jobs[0].result, Err(CopyError::Cancelled));
    }

    #[tokio::test]
    async fn test_disk_cache_is_warmed() {
        let temp = tempfile::TempDir::new().unwrap();
        let orchestrator =
            JobOrchestrator::new(config(Some(temp.path().to_path_buf()))).unwrap();
        let origin = orchestrator.factory().memory_store("origin");
        for key in world(1).keys() {
            origin.insert(key, TileData::new("X"));
        }

        let summary = orchestrator
            .run_all(vec![CopyJob::new(
                "warm",
                "memory://origin",
                "memory://out",
                world(1),
            )])
            .await
            .unwrap();

        let report = summary.jobs[0].result.as_ref().unwrap();
        assert_eq!(report.cache.written, 4);
        let stats = crate::cache::disk_cache_stats(temp.path()).unwrap();
        assert_eq!(stats.tiles, 4);
    }
}
