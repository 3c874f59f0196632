//! Cron trigger for the DAG. Missed intervals are never caught up, and a tick that lands while
//! the previous run is still going is skipped.

use super::{Dag, PipelineRun};
use anyhow::Result;
use chrono::{Local, NaiveDate};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Start the scheduler with one job firing `dag` on its configured cron.
pub async fn start_scheduler(dag: Arc<Dag>, cancel: CancellationToken) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;
    let cron = dag.config().schedule.clone();
    let dag_id = dag.config().dag_id.clone();
    let in_flight = Arc::new(Mutex::new(()));

    let job = Job::new_async_tz(cron.as_str(), Local, move |_uuid, _lock| {
        let dag = dag.clone();
        let cancel = cancel.clone();
        let in_flight = in_flight.clone();
        Box::pin(async move {
            let Ok(_guard) = in_flight.try_lock() else {
                warn!("Previous run still in flight, skipping this tick");
                return;
            };
            trigger(&dag, Local::now().date_naive(), &cancel).await;
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;

    info!("Scheduled {} on '{}'", dag_id, cron);
    Ok(scheduler)
}

/// Run the DAG for `today` unless it predates the configured start date.
pub async fn trigger(dag: &Dag, today: NaiveDate, cancel: &CancellationToken) {
    let config = dag.config();
    if today < config.start_date {
        info!(%today, start_date = %config.start_date, "Before start date, not running");
        return;
    }
    let run = PipelineRun::new(today, config.source_name.clone());
    match dag.run(&run, cancel).await {
        Ok(receipt) => info!(key = %receipt.key, rows = receipt.rows, "Scheduled run finished"),
        Err(e) => error!(run_id = %run.run_id, error = %e, "Scheduled run failed"),
    }
}
