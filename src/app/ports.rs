use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::PathBuf;

// Crawl-side ports
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Fetch `url` and return the response body as markup.
    async fn fetch(&self, url: &str) -> Result<String>;
}

// Pipeline-side ports
#[derive(Clone, Debug, PartialEq)]
pub struct VolumeMount {
    pub volume: String,
    pub target: PathBuf,
    pub read_only: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ContainerSpec {
    pub image: String,
    pub command: Vec<String>,
    pub mounts: Vec<VolumeMount>,
    pub env: Vec<(String, String)>,
    pub auto_remove: bool,
    pub force_pull: bool,
}

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Run a container to completion and return its stdout.
    async fn run(&self, spec: &ContainerSpec) -> Result<Vec<u8>>;
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `bucket/key`, replacing any existing object.
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<()>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct TaskFailure {
    pub dag_id: String,
    pub owner: String,
    pub task_id: String,
    pub run_date: NaiveDate,
    pub attempts: u32,
    pub error: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn task_failed(&self, failure: &TaskFailure) -> Result<()>;
}

/// Produces the day's scraper output on the shared volume.
#[async_trait]
pub trait ScrapeExecutor: Send + Sync {
    async fn scrape(&self, run_date: NaiveDate) -> Result<()>;
}

/// Reads the day's scraper output off the shared volume.
#[async_trait]
pub trait VolumeReader: Send + Sync {
    async fn read_output(&self, run_date: NaiveDate) -> Result<Vec<u8>>;
}
