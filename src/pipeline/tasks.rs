use crate::app::ports::{
    ContainerRuntime, ContainerSpec, DocumentFetcher, ScrapeExecutor, VolumeMount, VolumeReader,
};
use crate::config::{PipelineConfig, ScraperConfig};
use crate::crawl::{output_path, run_supervised};
use crate::dataset::{check_core_columns, RentalDataset};
use crate::error::{Result, ScraperError};
use arrow_array::RecordBatch;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

fn date_arg(run_date: NaiveDate) -> String {
    run_date.format("%Y-%m-%d").to_string()
}

/// scrape_data in a disposable scraper container writing onto the shared volume
pub struct ContainerScrape {
    runtime: Arc<dyn ContainerRuntime>,
    image: String,
    volume_name: String,
    volume_dir: PathBuf,
    force_pull: bool,
    debug: bool,
    log_output: bool,
}

impl ContainerScrape {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, config: &PipelineConfig) -> Self {
        Self {
            runtime,
            image: config.image.clone(),
            volume_name: config.volume_name.clone(),
            volume_dir: config.volume_dir.clone(),
            force_pull: config.force_pull,
            debug: config.scraper_debug,
            log_output: config.log_scraper_output,
        }
    }

    pub fn spec(&self, run_date: NaiveDate) -> ContainerSpec {
        ContainerSpec {
            image: self.image.clone(),
            command: vec!["scrape".to_string()],
            mounts: vec![VolumeMount {
                volume: self.volume_name.clone(),
                target: self.volume_dir.clone(),
                read_only: false,
            }],
            env: vec![
                ("DEBUG_MODE".to_string(), self.debug.to_string()),
                ("LOG_OUTPUT".to_string(), self.log_output.to_string()),
                ("RUN_DATE".to_string(), date_arg(run_date)),
                (
                    "OUTPUT_DIR".to_string(),
                    self.volume_dir.display().to_string(),
                ),
            ],
            auto_remove: true,
            force_pull: self.force_pull,
        }
    }
}

#[async_trait]
impl ScrapeExecutor for ContainerScrape {
    async fn scrape(&self, run_date: NaiveDate) -> Result<()> {
        info!(image = %self.image, %run_date, "Launching scraper container");
        let stdout = self.runtime.run(&self.spec(run_date)).await?;
        debug!(output = %String::from_utf8_lossy(&stdout), "Scraper container output");
        Ok(())
    }
}

/// scrape_data in the current process
pub struct InProcessScrape {
    config: ScraperConfig,
    source_name: String,
    fetcher: Arc<dyn DocumentFetcher>,
}

impl InProcessScrape {
    pub fn new(
        config: ScraperConfig,
        source_name: impl Into<String>,
        fetcher: Arc<dyn DocumentFetcher>,
    ) -> Self {
        Self {
            config,
            source_name: source_name.into(),
            fetcher,
        }
    }
}

#[async_trait]
impl ScrapeExecutor for InProcessScrape {
    async fn scrape(&self, run_date: NaiveDate) -> Result<()> {
        let mut config = self.config.clone();
        config.run_date = Some(run_date);
        let summary = run_supervised(&config, &self.source_name, self.fetcher.clone()).await?;
        info!(
            listings = summary.listings(),
            file = %summary.output_file.display(),
            "In-process scrape finished"
        );
        Ok(())
    }
}

/// fetch_csv through a throwaway reader container with the volume mounted read-only
pub struct ContainerVolumeReader {
    runtime: Arc<dyn ContainerRuntime>,
    image: String,
    volume_name: String,
    volume_dir: PathBuf,
}

impl ContainerVolumeReader {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, config: &PipelineConfig) -> Self {
        Self {
            runtime,
            image: config.reader_image.clone(),
            volume_name: config.volume_name.clone(),
            volume_dir: config.volume_dir.clone(),
        }
    }

    pub fn spec(&self, run_date: NaiveDate) -> ContainerSpec {
        let file = output_path(&self.volume_dir, run_date);
        ContainerSpec {
            image: self.image.clone(),
            command: vec!["cat".to_string(), file.display().to_string()],
            mounts: vec![VolumeMount {
                volume: self.volume_name.clone(),
                target: self.volume_dir.clone(),
                read_only: true,
            }],
            env: Vec::new(),
            auto_remove: true,
            force_pull: false,
        }
    }
}

#[async_trait]
impl VolumeReader for ContainerVolumeReader {
    async fn read_output(&self, run_date: NaiveDate) -> Result<Vec<u8>> {
        self.runtime.run(&self.spec(run_date)).await
    }
}

/// fetch_csv straight from a local directory
pub struct LocalVolumeReader {
    dir: PathBuf,
}

impl LocalVolumeReader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl VolumeReader for LocalVolumeReader {
    async fn read_output(&self, run_date: NaiveDate) -> Result<Vec<u8>> {
        let path = output_path(&self.dir, run_date);
        let bytes = tokio::fs::read(&path).await.map_err(|e| ScraperError::Storage {
            message: format!("failed to read {}: {}", path.display(), e),
        })?;
        Ok(bytes)
    }
}

/// convert_csv_to_df: CSV bytes with a header into an all-Utf8 batch carrying every core column
pub fn convert_csv_to_df(bytes: &[u8]) -> Result<RecordBatch> {
    std::str::from_utf8(bytes)
        .map_err(|e| ScraperError::Markup(format!("scraper output is not UTF-8: {}", e)))?;
    let dataset = RentalDataset::from_csv(bytes)?;
    let schema = dataset.schema();
    check_core_columns(&schema)?;
    dataset.to_record_batch()
}
