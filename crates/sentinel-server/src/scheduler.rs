//! Background job scheduler.
//!
//! Registers the daily housekeeping job that drops expired cache snapshots
//! and guest counters from previous days.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use sentinel_analysis::StoreMaintenance;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Every day at 03:00 UTC.
const HOUSEKEEPING_SCHEDULE: &str = "0 0 3 * * *";

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process. Dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// the job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    store: Arc<dyn StoreMaintenance>,
    cache_ttl: TimeDelta,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    register_housekeeping_job(&scheduler, store, cache_ttl).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

async fn register_housekeeping_job(
    scheduler: &JobScheduler,
    store: Arc<dyn StoreMaintenance>,
    cache_ttl: TimeDelta,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(HOUSEKEEPING_SCHEDULE, move |_uuid, _lock| {
        let store = Arc::clone(&store);

        Box::pin(async move {
            tracing::info!("scheduler: starting daily housekeeping");
            run_housekeeping(store.as_ref(), Utc::now(), cache_ttl).await;
            tracing::info!("scheduler: daily housekeeping complete");
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

/// Purges cache rows older than `cache_ttl` and guest counters dated before
/// today. Failures are logged; each purge runs regardless of the other.
pub(crate) async fn run_housekeeping(
    store: &dyn StoreMaintenance,
    now: DateTime<Utc>,
    cache_ttl: TimeDelta,
) {
    match store.purge_stale_cache(now - cache_ttl).await {
        Ok(removed) => tracing::info!(removed, "scheduler: purged stale cache entries"),
        Err(e) => tracing::error!(error = %e, "scheduler: cache purge failed"),
    }

    match store.purge_guest_usage(now.date_naive()).await {
        Ok(removed) => tracing::info!(removed, "scheduler: purged old guest counters"),
        Err(e) => tracing::error!(error = %e, "scheduler: guest counter purge failed"),
    }
}
