use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::runner::Runner;
use crate::store::Workbook;

/// Periodic batch loop for the `watch` command: one batch per cron firing
/// until ctrl-c. The workbook is reopened per firing so sheet edits between
/// runs are picked up.
pub async fn run_watch(config: AppConfig) -> Result<()> {
    let workbook_dir = config.require_workbook()?.to_string();
    let cron = config.scheduler.cron.clone();
    let config = Arc::new(config);
    let busy = Arc::new(AtomicBool::new(false));

    let mut scheduler = JobScheduler::new().await?;

    let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
        let config = Arc::clone(&config);
        let busy = Arc::clone(&busy);
        let workbook_dir = workbook_dir.clone();

        Box::pin(async move {
            if busy.swap(true, Ordering::SeqCst) {
                warn!("previous batch still running; skipping this firing");
                return;
            }

            match run_batch(&config, &workbook_dir).await {
                Ok(()) => {}
                Err(err) => error!(error = %err, "scheduled batch failed"),
            }

            busy.store(false, Ordering::SeqCst);
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;
    info!(cron = %cron, "watch scheduler started");

    tokio::signal::ctrl_c().await?;
    info!("shutting down watch scheduler");
    scheduler.shutdown().await?;
    Ok(())
}

async fn run_batch(config: &AppConfig, workbook_dir: &str) -> Result<()> {
    let workbook = Workbook::open(workbook_dir)?;
    let runner = Runner::new(config.clone())?;
    let summary = runner
        .run_once(&workbook, &workbook, &workbook, &workbook)
        .await?;
    info!(
        batch_id = %summary.batch_id,
        total = summary.total,
        succeeded = summary.succeeded,
        failed = summary.failed,
        "scheduled batch finished"
    );
    Ok(())
}
