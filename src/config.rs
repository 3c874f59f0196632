use crate::apis::ninety_nine::SiteSelectors;
use crate::constants;
use crate::error::{Result, ScraperError};
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scraper: ScraperConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub base_url: String,
    pub search_path: String,
    pub query_template: String,
    pub listings_per_partition: usize,
    pub debug_listing_limit: usize,
    pub debug: bool,
    pub output_dir: PathBuf,
    pub request_timeout_secs: u64,
    /// `None` restarts a failed run forever.
    pub max_restarts: Option<u32>,
    /// District codes to crawl; empty means every district.
    pub districts: Vec<String>,
    #[serde(skip)]
    pub run_date: Option<NaiveDate>,
    pub selectors: SiteSelectors,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: constants::NINETY_NINE_BASE_URL.to_string(),
            search_path: constants::NINETY_NINE_SEARCH_PATH.to_string(),
            query_template: constants::NINETY_NINE_QUERY_TEMPLATE.to_string(),
            listings_per_partition: constants::DEFAULT_LISTINGS_PER_PARTITION,
            debug_listing_limit: constants::DEBUG_LISTING_LIMIT,
            debug: false,
            output_dir: PathBuf::from("rental_prices/ninety_nine"),
            request_timeout_secs: 30,
            max_restarts: None,
            districts: Vec::new(),
            run_date: None,
            selectors: SiteSelectors::default(),
        }
    }
}

impl ScraperConfig {
    /// Date stamped on the output file; defaults to today.
    pub fn run_date(&self) -> NaiveDate {
        self.run_date
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    /// Listing budget per partition, honoring debug mode
    pub fn listing_limit(&self) -> usize {
        if self.debug {
            self.debug_listing_limit
        } else {
            self.listings_per_partition
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub dag_id: String,
    pub owner: String,
    pub start_date: NaiveDate,
    /// Six-field cron expression (seconds first).
    pub schedule: String,
    pub retries: u32,
    pub notify_emails: Vec<String>,
    pub notify_webhook: Option<String>,
    pub bucket: String,
    pub key_prefix: String,
    pub source_name: String,
    pub image: String,
    pub volume_name: String,
    pub volume_dir: PathBuf,
    pub reader_image: String,
    pub force_pull: bool,
    /// Debug mode passed to the scraper container.
    pub scraper_debug: bool,
    /// Forward the scraper container's stdout to our logs.
    pub log_scraper_output: bool,
    /// Run the scraper in-process and read its output from `[scraper].output_dir`.
    pub local: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dag_id: constants::DEFAULT_DAG_ID.to_string(),
            owner: "rent_scraper".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 7, 14).unwrap_or_default(),
            schedule: constants::DEFAULT_SCHEDULE.to_string(),
            retries: constants::DEFAULT_TASK_RETRIES,
            notify_emails: Vec::new(),
            notify_webhook: None,
            bucket: String::new(),
            key_prefix: constants::DEFAULT_KEY_PREFIX.to_string(),
            source_name: constants::NINETY_NINE_SOURCE.to_string(),
            image: constants::DEFAULT_SCRAPER_IMAGE.to_string(),
            volume_name: constants::DEFAULT_VOLUME_NAME.to_string(),
            volume_dir: PathBuf::from(constants::DEFAULT_VOLUME_DIR),
            reader_image: constants::DEFAULT_READER_IMAGE.to_string(),
            force_pull: true,
            scraper_debug: true,
            log_scraper_output: false,
            local: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: PathBuf,
    pub file_name: String,
    pub console: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            file_name: "scraper.log".to_string(),
            console: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Address of the Prometheus `/metrics` listener; empty disables the exporter.
    pub listen_addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            listen_addr: constants::DEFAULT_METRICS_ADDR.to_string(),
        }
    }
}

impl AppConfig {
    /// Load `config.toml` (or the given path), then `.env`, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ScraperError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Apply environment-style overrides from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("DEBUG_MODE") {
            self.scraper.debug = parse_flag(&v);
        }
        if let Some(v) = lookup("LOG_OUTPUT") {
            self.logging.console = parse_flag(&v);
        }
        if let Some(v) = lookup("RUN_DATE") {
            let date = NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d")
                .map_err(|e| ScraperError::Config(format!("Invalid RUN_DATE '{}': {}", v, e)))?;
            self.scraper.run_date = Some(date);
        }
        if let Some(v) = lookup("OUTPUT_DIR") {
            self.scraper.output_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("S3_BUCKET") {
            self.pipeline.bucket = v;
        }
        if let Some(v) = lookup("SCRAPER_IMAGE") {
            self.pipeline.image = v;
        }
        if let Some(v) = lookup("METRICS_ADDR") {
            self.metrics.listen_addr = v;
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
