use crate::config::LoggingConfig;
use crate::error::{Result, ScraperError};
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "rent_scraper=info,info";

/// Install the global subscriber: JSON lines into a daily-rotated file under `config.dir`,
/// plus plain console output unless `config.console` is off (`LOG_OUTPUT=false`).
///
/// `RUST_LOG` overrides the default filter. Hold the returned guard until exit; dropping it
/// flushes the file writer.
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard> {
    fs::create_dir_all(&config.dir)?;

    let appender = tracing_appender::rolling::daily(&config.dir, &config.file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let file_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_writer(file_writer);
    let console_layer = config
        .console
        .then(|| fmt::layer().with_target(false).with_writer(std::io::stdout));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| ScraperError::Config(format!("Logging already initialized: {}", e)))?;

    Ok(guard)
}
