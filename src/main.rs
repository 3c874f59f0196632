use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rent_scraper::app::ports::{
    BlobStore, ContainerRuntime, DocumentFetcher, Notifier, ScrapeExecutor, VolumeReader,
};
use rent_scraper::config::AppConfig;
use rent_scraper::crawl::run_supervised;
use rent_scraper::error::ScraperError;
use rent_scraper::infra::docker::DockerCli;
use rent_scraper::infra::http_client::ReqwestFetcher;
use rent_scraper::infra::notifier::EmailNotifier;
use rent_scraper::infra::s3::S3BlobStore;
use rent_scraper::pipeline::tasks::{
    ContainerScrape, ContainerVolumeReader, InProcessScrape, LocalVolumeReader,
};
use rent_scraper::pipeline::{schedule, Dag, PipelineRun};
use rent_scraper::{constants, logging, metrics};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "rent_scraper")]
#[command(about = "Rental listing scraper and daily S3 export pipeline")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape listings into <output_dir>/<date>.csv
    Scrape {
        /// Page 1 only and a handful of listings per district
        #[arg(long)]
        debug: bool,
        /// District codes to scrape (comma-separated). Default: all
        #[arg(long)]
        districts: Option<String>,
        /// Run date (YYYY-MM-DD). Default: today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Run or schedule the export pipeline
    Pipeline {
        #[command(subcommand)]
        action: PipelineCommand,
    },
}

#[derive(Subcommand)]
enum PipelineCommand {
    /// Run the pipeline once
    Run {
        /// Run date (YYYY-MM-DD). Default: today
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Scrape in-process and read output from the local output dir instead of docker
        #[arg(long)]
        local: bool,
    },
    /// Run the pipeline on its cron schedule until interrupted
    Schedule {
        #[arg(long)]
        local: bool,
    },
}

async fn build_dag(config: &AppConfig, local: bool) -> Result<Dag> {
    let pipeline = config.pipeline.clone();
    let store: Arc<dyn BlobStore> = Arc::new(S3BlobStore::from_env().await);
    let notifier: Arc<dyn Notifier> = Arc::new(EmailNotifier::new(
        pipeline.notify_emails.clone(),
        pipeline.notify_webhook.clone(),
    ));

    let (scrape, reader): (Arc<dyn ScrapeExecutor>, Arc<dyn VolumeReader>) =
        if local || pipeline.local {
            let fetcher: Arc<dyn DocumentFetcher> =
                Arc::new(ReqwestFetcher::new(config.scraper.request_timeout_secs)?);
            (
                Arc::new(InProcessScrape::new(
                    config.scraper.clone(),
                    pipeline.source_name.clone(),
                    fetcher,
                )),
                Arc::new(LocalVolumeReader::new(config.scraper.output_dir.clone())),
            )
        } else {
            let runtime: Arc<dyn ContainerRuntime> = Arc::new(DockerCli::new());
            (
                Arc::new(ContainerScrape::new(runtime.clone(), &pipeline)),
                Arc::new(ContainerVolumeReader::new(runtime, &pipeline)),
            )
        };

    if pipeline.bucket.is_empty() {
        anyhow::bail!("No bucket configured; set [pipeline].bucket or S3_BUCKET");
    }
    Ok(Dag::new(pipeline, scrape, reader, store, notifier))
}

async fn scrape(
    mut config: AppConfig,
    debug: bool,
    districts: Option<String>,
    date: Option<NaiveDate>,
) -> Result<ExitCode> {
    if debug {
        config.scraper.debug = true;
    }
    if let Some(list) = districts {
        config.scraper.districts = list.split(',').map(|s| s.trim().to_string()).collect();
    }
    if date.is_some() {
        config.scraper.run_date = date;
    }

    println!("🔄 Scraping {}...", constants::NINETY_NINE_PLATFORM);
    let fetcher: Arc<dyn DocumentFetcher> =
        Arc::new(ReqwestFetcher::new(config.scraper.request_timeout_secs)?);

    match run_supervised(&config.scraper, constants::NINETY_NINE_SOURCE, fetcher).await {
        Ok(summary) => {
            println!(
                "✅ Scraped {} listings into {}",
                summary.listings(),
                summary.output_file.display()
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(ScraperError::NoResults { partition }) => {
            error!(partition = %partition, "No property found. Scraping stopped.");
            println!("❌ No property found for district {}", partition);
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e).context("Scrape failed"),
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    let _log_guard = logging::init_logging(&config.logging)?;
    metrics::init_metrics(&config.metrics);

    match cli.command {
        Commands::Scrape {
            debug,
            districts,
            date,
        } => return scrape(config, debug, districts, date).await,
        Commands::Pipeline { action } => match action {
            PipelineCommand::Run { date, local } => {
                let dag = build_dag(&config, local).await?;
                let run_date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
                let run = PipelineRun::new(run_date, config.pipeline.source_name.clone());
                println!("🚀 Running {} for {}...", dag.config().dag_id, run_date);

                let receipt = dag
                    .run(&run, &CancellationToken::new())
                    .await
                    .context("Pipeline run failed")?;
                println!(
                    "✅ Uploaded {} rows to s3://{}/{}",
                    receipt.rows, receipt.bucket, receipt.key
                );
            }
            PipelineCommand::Schedule { local } => {
                let dag = Arc::new(build_dag(&config, local).await?);
                let cancel = CancellationToken::new();
                let mut scheduler = schedule::start_scheduler(dag, cancel.clone()).await?;
                println!("⏰ Scheduler running, press Ctrl-C to stop");

                tokio::signal::ctrl_c().await?;
                info!("Shutting down scheduler");
                cancel.cancel();
                scheduler.shutdown().await?;
            }
        },
    }
    Ok(ExitCode::SUCCESS)
}
