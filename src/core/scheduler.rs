use crate::config::AppConfig;
use crate::core::orchestrator::{self, PipelineOutcome};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio_cron_scheduler::{Job, JobScheduler};

/// Delay before the first run after boot, so migrations and logging are settled.
pub const STARTUP_DELAY: Duration = Duration::from_secs(5);

pub async fn init(pool: SqlitePool, config: AppConfig) -> Result<JobScheduler, anyhow::Error> {
    let sched = JobScheduler::new().await?;
    let config = Arc::new(config);

    let pool_clone = pool.clone();
    let config_clone = Arc::clone(&config);

    sched
        .add(Job::new_async(config.update_cron.as_str(), move |_uuid, _l| {
            let pool = pool_clone.clone();
            let config = Arc::clone(&config_clone);
            Box::pin(async move {
                log::info!("Running scheduled update job...");
                run_logged(&pool, &config).await;
            })
        })?)
        .await?;
    log::info!("Update job scheduled ({})", config.update_cron);

    // Startup run, spawned so the caller can keep going
    let pool_startup = pool.clone();
    let config_startup = Arc::clone(&config);
    tokio::spawn(async move {
        tokio::time::sleep(STARTUP_DELAY).await;
        log::info!("Running startup update...");
        run_logged(&pool_startup, &config_startup).await;
    });

    sched.start().await?;
    Ok(sched)
}

async fn run_logged(pool: &SqlitePool, config: &AppConfig) {
    match orchestrator::update(pool, config).await {
        Ok(PipelineOutcome::Report(report)) => {
            log::info!("Update finished: {} detections published", report.detections.len())
        }
        Ok(_) => log::info!("Update finished without new data"),
        Err(e) => log::error!("Update failed: {:#}", e),
    }
}
