//! Metric names and recording helpers, grouped by phase.
//!
//! Recording goes through the `metrics` facade. [`init_metrics`] installs the Prometheus
//! recorder; without it every call is a no-op.

use crate::config::MetricsConfig;
use ::metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Once;
use tracing::{info, warn};

pub const PAGES_SKIPPED: &str = "rent_pages_skipped_total";
pub const LISTINGS_DROPPED: &str = "rent_listings_dropped_total";
pub const LISTINGS_SCRAPED: &str = "rent_listings_scraped_total";
pub const FIELD_GROUP_FAILURES: &str = "rent_field_group_failures_total";
pub const RUN_RESTARTS: &str = "rent_run_restarts_total";
pub const TASK_ATTEMPTS: &str = "rent_task_attempts_total";
pub const TASK_FAILURES: &str = "rent_task_failures_total";
pub const UPLOAD_BYTES: &str = "rent_upload_bytes";
pub const PIPELINE_DURATION: &str = "rent_pipeline_duration_seconds";

static DESCRIBE: Once = Once::new();
static INIT: Once = Once::new();

/// Install the Prometheus recorder with an HTTP listener on `config.listen_addr`, then
/// register descriptions. Idempotent; must run inside a tokio runtime.
pub fn init_metrics(config: &MetricsConfig) {
    INIT.call_once(|| {
        let addr = config.listen_addr.trim();
        if addr.is_empty() {
            info!("Metrics exporter disabled");
            return;
        }
        let addr: SocketAddr = match addr.parse() {
            Ok(addr) => addr,
            Err(e) => {
                warn!("Invalid metrics address '{}': {}", addr, e);
                return;
            }
        };
        match PrometheusBuilder::new().with_http_listener(addr).install() {
            Ok(()) => info!("Prometheus exporter listening on http://{}/metrics", addr),
            Err(e) => warn!("Failed to install Prometheus exporter: {}", e),
        }
    });
    describe_metrics();
}

/// Register descriptions for every metric; safe to call more than once.
pub fn describe_metrics() {
    DESCRIBE.call_once(|| {
        describe_counter!(PAGES_SKIPPED, "Search pages skipped after a failed fetch");
        describe_counter!(LISTINGS_DROPPED, "Listings dropped, labelled by reason");
        describe_counter!(LISTINGS_SCRAPED, "Listings extracted into the output");
        describe_counter!(FIELD_GROUP_FAILURES, "Optional field groups left empty");
        describe_counter!(RUN_RESTARTS, "Scrape runs restarted from scratch");
        describe_counter!(TASK_ATTEMPTS, "DAG task attempts, labelled by task");
        describe_counter!(TASK_FAILURES, "DAG tasks that exhausted their retries");
        describe_histogram!(UPLOAD_BYTES, Unit::Bytes, "Size of uploaded Parquet blobs");
        describe_histogram!(
            PIPELINE_DURATION,
            Unit::Seconds,
            "Wall time of a successful DAG run"
        );
    });
}

/// Crawl-phase metrics
pub struct CrawlMetrics;

impl CrawlMetrics {
    pub fn page_skipped() {
        counter!(PAGES_SKIPPED).increment(1);
    }

    pub fn listing_dropped(reason: &'static str) {
        counter!(LISTINGS_DROPPED, "reason" => reason).increment(1);
    }

    pub fn listings_scraped(count: usize) {
        counter!(LISTINGS_SCRAPED).increment(count as u64);
    }

    pub fn field_group_failed(group: &'static str) {
        counter!(FIELD_GROUP_FAILURES, "group" => group).increment(1);
    }

    pub fn run_restarted() {
        counter!(RUN_RESTARTS).increment(1);
    }
}

/// Orchestration-phase metrics
pub struct PipelineMetrics;

impl PipelineMetrics {
    pub fn task_attempt(task: &'static str) {
        counter!(TASK_ATTEMPTS, "task" => task).increment(1);
    }

    pub fn task_failed(task: &'static str) {
        counter!(TASK_FAILURES, "task" => task).increment(1);
    }

    pub fn uploaded(bytes: usize) {
        histogram!(UPLOAD_BYTES).record(bytes as f64);
    }

    pub fn run_finished(duration_secs: f64) {
        histogram!(PIPELINE_DURATION).record(duration_secs);
    }
}
