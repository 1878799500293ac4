//! Background job scheduler.
//!
//! Keeps the exchange-rate table warm so searches rarely pay for a refresh
//! on the request path.

use std::sync::Arc;

use storescout_scraper::SearchService;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Top of every hour.
const RATE_REFRESH_SCHEDULE: &str = "0 0 * * * *";

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process. Dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    service: Arc<SearchService>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    register_rate_refresh_job(&scheduler, service).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

/// Register an hourly exchange-rate refresh.
///
/// A failed refresh leaves the cached table in place; request-path lookups
/// keep serving it (or the defaults) until a refresh succeeds.
async fn register_rate_refresh_job(
    scheduler: &JobScheduler,
    service: Arc<SearchService>,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(RATE_REFRESH_SCHEDULE, move |_uuid, _lock| {
        let service = Arc::clone(&service);

        Box::pin(async move {
            match service.rates().refresh().await {
                Ok(snapshot) => tracing::info!(
                    currencies = snapshot.rates.len(),
                    "scheduler: exchange rates refreshed"
                ),
                Err(e) => tracing::warn!(error = %e, "scheduler: exchange-rate refresh failed"),
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}
