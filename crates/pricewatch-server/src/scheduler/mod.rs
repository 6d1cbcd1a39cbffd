//! Background job scheduler.
//!
//! Registers the recurring batch tracking run over the tracked products file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pricewatch_scraper::{track_products, Dispatcher, TrackerSettings, TrackingSummary};
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Shared state for the scheduled run. The mutex is held for the duration
/// of a batch so a slow run is never overlapped by the next tick.
#[derive(Clone)]
pub struct BatchRunner {
    dispatcher: Arc<Dispatcher>,
    tracked_products_path: PathBuf,
    settings: TrackerSettings,
    running: Arc<Mutex<()>>,
}

impl BatchRunner {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        tracked_products_path: PathBuf,
        settings: TrackerSettings,
    ) -> Self {
        Self {
            dispatcher,
            tracked_products_path,
            settings,
            running: Arc::new(Mutex::new(())),
        }
    }

    pub fn tracked_products_path(&self) -> &Path {
        &self.tracked_products_path
    }

    /// Run one batch. Returns `None` when the product file could not be
    /// loaded or a previous run is still in progress.
    pub async fn run_once(&self) -> Option<TrackingSummary> {
        let Ok(_guard) = self.running.try_lock() else {
            tracing::warn!("scheduler: previous tracking run still in progress; skipping");
            return None;
        };

        let file = match pricewatch_core::load_tracked_products(&self.tracked_products_path) {
            Ok(file) => file,
            Err(e) => {
                tracing::error!(
                    path = %self.tracked_products_path.display(),
                    error = %e,
                    "scheduler: failed to load tracked products"
                );
                return None;
            }
        };

        Some(track_products(&self.dispatcher, &file.products, &self.settings).await)
    }
}

/// Builds and starts the background job scheduler.
///
/// The returned [`JobScheduler`] must be kept alive for the lifetime of the
/// process; dropping it stops the jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the cron expression is invalid or the
/// scheduler cannot be started.
pub async fn build_scheduler(
    runner: BatchRunner,
    schedule: &str,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_tracking_job(&scheduler, runner, schedule).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

async fn register_tracking_job(
    scheduler: &JobScheduler,
    runner: BatchRunner,
    schedule: &str,
) -> Result<(), JobSchedulerError> {
    let runner = Arc::new(runner);

    let job = Job::new_async(schedule, move |_uuid, _lock| {
        let runner = Arc::clone(&runner);

        Box::pin(async move {
            tracing::info!("scheduler: starting tracking run");
            if let Some(summary) = runner.run_once().await {
                tracing::info!(
                    attempted = summary.attempted(),
                    succeeded = summary.succeeded(),
                    failed = summary.failed(),
                    "scheduler: tracking run complete"
                );
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(schedule, "scheduler: tracking job registered");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pricewatch_core::MemoryProductStore;
    use pricewatch_scraper::ScraperRegistry;

    use super::*;

    fn shipped_config() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../config/tracked_products.yaml")
    }

    fn runner(path: PathBuf) -> BatchRunner {
        let dispatcher = Dispatcher::new(
            ScraperRegistry::new(),
            Arc::new(MemoryProductStore::new()),
        );
        BatchRunner::new(
            Arc::new(dispatcher),
            path,
            TrackerSettings {
                batch_delay: Duration::ZERO,
                ..TrackerSettings::default()
            },
        )
    }

    #[tokio::test]
    async fn run_once_visits_every_configured_url() {
        let summary = runner(shipped_config()).run_once().await.expect("ran");
        // iPhone: amazon + walmart (ebay is null); Galaxy: amazon + ebay.
        assert_eq!(summary.attempted(), 4);
        assert_eq!(summary.failed(), 4, "no scrapers registered");
    }

    #[tokio::test]
    async fn mismatched_url_does_not_skip_the_run() {
        let path = std::env::temp_dir().join(format!(
            "pricewatch-scheduler-{}.yaml",
            uuid::Uuid::new_v4()
        ));
        std::fs::write(
            &path,
            "products:\n  - name: Good\n    urls:\n      amazon: https://www.amazon.com/dp/1\n  \
             - name: Bad\n    urls:\n      walmart: https://www.target.com/p/2\n",
        )
        .expect("write");

        let summary = runner(path.clone()).run_once().await;
        std::fs::remove_file(&path).ok();

        let summary = summary.expect("run proceeds");
        assert_eq!(summary.attempted(), 2);
        assert_eq!(summary.reports[0].product_name, "Good");
    }

    #[tokio::test]
    async fn overlapping_run_is_skipped() {
        let runner = runner(shipped_config());
        let _held = runner.running.lock().await;
        assert!(runner.run_once().await.is_none());
    }

    #[tokio::test]
    async fn missing_product_file_skips_the_run() {
        let runner = runner(PathBuf::from("/nonexistent/tracked_products.yaml"));
        assert!(runner.run_once().await.is_none());
    }

    #[tokio::test]
    async fn rejects_invalid_cron_expression() {
        let result = build_scheduler(runner(shipped_config()), "every six hours").await;
        assert!(result.is_err());
    }
}
