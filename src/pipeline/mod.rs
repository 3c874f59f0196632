//! The daily ETL graph: scrape_data → fetch_csv → convert_csv_to_df → upload_to_s3.
//!
//! Tasks run strictly in order. Each one gets `retries` extra attempts; a task that still
//! fails notifies once and ends the run. Intermediates are plain values handed from one
//! task to the next.

pub mod parquet_out;
pub mod schedule;
pub mod tasks;

use crate::app::ports::{BlobStore, Notifier, ScrapeExecutor, TaskFailure, VolumeReader};
use crate::config::PipelineConfig;
use crate::constants::BLOB_EXTENSION;
use crate::error::{Result, ScraperError};
use crate::metrics::PipelineMetrics;
use arrow_array::RecordBatch;
use chrono::NaiveDate;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

pub const SCRAPE_DATA: &str = "scrape_data";
pub const FETCH_CSV: &str = "fetch_csv";
pub const CONVERT_CSV_TO_DF: &str = "convert_csv_to_df";
pub const UPLOAD_TO_S3: &str = "upload_to_s3";

/// One execution of the graph for a given date
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub run_date: NaiveDate,
    pub source: String,
    /// Log correlation only
    pub run_id: Uuid,
}

impl PipelineRun {
    pub fn new(run_date: NaiveDate, source: impl Into<String>) -> Self {
        Self {
            run_date,
            source: source.into(),
            run_id: Uuid::new_v4(),
        }
    }
}

/// Object key for a run: `<prefix>/<source>/<YYYY-MM-DD>.parquet.gzip`
pub fn blob_key(prefix: &str, source: &str, run_date: NaiveDate) -> String {
    format!(
        "{}/{}/{}.{}",
        prefix.trim_end_matches('/'),
        source,
        run_date.format("%Y-%m-%d"),
        BLOB_EXTENSION
    )
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadReceipt {
    pub bucket: String,
    pub key: String,
    pub rows: usize,
    pub columns: usize,
    pub bytes: usize,
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Task {task} failed after {attempts} attempt(s): {source}")]
    TaskFailed {
        task: &'static str,
        attempts: u32,
        source: ScraperError,
    },

    #[error("Run cancelled before task {before}")]
    Cancelled { before: &'static str },
}

pub struct Dag {
    config: PipelineConfig,
    scrape: Arc<dyn ScrapeExecutor>,
    reader: Arc<dyn VolumeReader>,
    store: Arc<dyn BlobStore>,
    notifier: Arc<dyn Notifier>,
}

impl Dag {
    pub fn new(
        config: PipelineConfig,
        scrape: Arc<dyn ScrapeExecutor>,
        reader: Arc<dyn VolumeReader>,
        store: Arc<dyn BlobStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            scrape,
            reader,
            store,
            notifier,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[instrument(
        skip(self, cancel),
        fields(dag_id = %self.config.dag_id, run_id = %run.run_id, run_date = %run.run_date)
    )]
    pub async fn run(
        &self,
        run: &PipelineRun,
        cancel: &CancellationToken,
    ) -> std::result::Result<UploadReceipt, PipelineError> {
        info!("🚀 Starting {} for {}", self.config.dag_id, run.source);
        let started = std::time::Instant::now();

        checkpoint(cancel, SCRAPE_DATA)?;
        self.run_task(run, SCRAPE_DATA, || self.scrape.scrape(run.run_date))
            .await?;

        checkpoint(cancel, FETCH_CSV)?;
        let csv = self
            .run_task(run, FETCH_CSV, || self.reader.read_output(run.run_date))
            .await?;
        info!("📥 Fetched {} bytes of scraper output", csv.len());

        checkpoint(cancel, CONVERT_CSV_TO_DF)?;
        let batch = self
            .run_task(run, CONVERT_CSV_TO_DF, || async {
                tasks::convert_csv_to_df(&csv)
            })
            .await?;
        info!(
            "🔧 Converted output to {} rows x {} columns",
            batch.num_rows(),
            batch.num_columns()
        );

        checkpoint(cancel, UPLOAD_TO_S3)?;
        let receipt = self
            .run_task(run, UPLOAD_TO_S3, || self.upload(run, &batch))
            .await?;

        PipelineMetrics::run_finished(started.elapsed().as_secs_f64());
        info!("💾 Uploaded s3://{}/{}", receipt.bucket, receipt.key);
        Ok(receipt)
    }

    /// Run `op` with the configured retries; notify once if the final attempt fails.
    async fn run_task<F, Fut, T>(
        &self,
        run: &PipelineRun,
        task: &'static str,
        mut op: F,
    ) -> std::result::Result<T, PipelineError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.config.retries + 1;
        let mut attempt = 1;
        loop {
            PipelineMetrics::task_attempt(task);
            match op().await {
                Ok(value) => {
                    info!(task, attempt, "Task succeeded");
                    return Ok(value);
                }
                Err(e) if attempt < max_attempts => {
                    warn!(task, attempt, error = %e, "Task failed, retrying");
                    attempt += 1;
                }
                Err(e) => {
                    PipelineMetrics::task_failed(task);
                    error!(task, attempts = attempt, error = %e, "Task failed");
                    let failure = TaskFailure {
                        dag_id: self.config.dag_id.clone(),
                        owner: self.config.owner.clone(),
                        task_id: task.to_string(),
                        run_date: run.run_date,
                        attempts: attempt,
                        error: e.to_string(),
                    };
                    if let Err(notify_err) = self.notifier.task_failed(&failure).await {
                        warn!(task, error = %notify_err, "Failed to send failure notification");
                    }
                    return Err(PipelineError::TaskFailed {
                        task,
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }
    }

    async fn upload(&self, run: &PipelineRun, batch: &RecordBatch) -> Result<UploadReceipt> {
        let bytes = parquet_out::encode_parquet(batch)?;
        let key = blob_key(&self.config.key_prefix, &run.source, run.run_date);
        let size = bytes.len();
        self.store.put(&self.config.bucket, &key, bytes).await?;
        PipelineMetrics::uploaded(size);
        Ok(UploadReceipt {
            bucket: self.config.bucket.clone(),
            key,
            rows: batch.num_rows(),
            columns: batch.num_columns(),
            bytes: size,
        })
    }
}

fn checkpoint(
    cancel: &CancellationToken,
    before: &'static str,
) -> std::result::Result<(), PipelineError> {
    if cancel.is_cancelled() {
        warn!(before, "Run cancelled");
        return Err(PipelineError::Cancelled { before });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_key() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            blob_key("airflow", "ninety_nine", date),
            "airflow/ninety_nine/2024-03-09.parquet.gzip"
        );
        assert_eq!(
            blob_key("airflow/", "ninety_nine", date),
            "airflow/ninety_nine/2024-03-09.parquet.gzip"
        );
    }

    #[test]
    fn test_run_ids_are_unique() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let a = PipelineRun::new(date, "ninety_nine");
        let b = PipelineRun::new(date, "ninety_nine");
        assert_ne!(a.run_id, b.run_id);
    }
}
