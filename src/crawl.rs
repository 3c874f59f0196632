//! Crawl orchestration: page-by-page link discovery, listing extraction within a budget,
//! and persistence of one CSV per run.

use crate::apis;
use crate::app::ports::DocumentFetcher;
use crate::config::ScraperConfig;
use crate::dataset::RentalDataset;
use crate::error::{Result, ScraperError};
use crate::metrics::CrawlMetrics;
use crate::parser::listing_id_from_url;
use crate::supervisor::{supervise, RestartPolicy};
use crate::types::{
    CrawlPartition, District, ExtractError, ListingFields, ListingLink, ListingRecord,
    Pagination, PropertySource,
};
use chrono::NaiveDate;
use scraper::Html;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CrawlState {
    Init,
    PaginatingFirstPage,
    CrawlingPages,
    FetchingListings,
    Assembling,
    Persisted,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PartitionSummary {
    pub district: String,
    pub pages: u32,
    pub pages_skipped: usize,
    pub links: usize,
    pub listings: usize,
    pub listings_dropped: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScrapeSummary {
    pub run_date: NaiveDate,
    pub output_file: PathBuf,
    pub partitions: Vec<PartitionSummary>,
}

impl ScrapeSummary {
    pub fn listings(&self) -> usize {
        self.partitions.iter().map(|p| p.listings).sum()
    }
}

/// Path of the run's output file: `<output_dir>/<run-date>.csv`
pub fn output_path(output_dir: &Path, run_date: NaiveDate) -> PathBuf {
    output_dir.join(format!("{}.csv", run_date.format("%Y-%m-%d")))
}

/// Drives one property source through its partitions.
pub struct Scraper {
    source: Box<dyn PropertySource>,
    fetcher: Arc<dyn DocumentFetcher>,
    debug: bool,
    listing_limit: usize,
    output_file: PathBuf,
    run_date: NaiveDate,
    partition: CrawlPartition,
    state: CrawlState,
}

impl Scraper {
    pub fn new(
        source: Box<dyn PropertySource>,
        fetcher: Arc<dyn DocumentFetcher>,
        config: &ScraperConfig,
    ) -> Self {
        let run_date = config.run_date();
        Self {
            source,
            fetcher,
            debug: config.debug,
            listing_limit: config.listing_limit(),
            output_file: output_path(&config.output_dir, run_date),
            run_date,
            partition: CrawlPartition::new(config.query_template.clone()),
            state: CrawlState::Init,
        }
    }

    pub fn state(&self) -> CrawlState {
        self.state
    }

    pub fn partition(&self) -> &CrawlPartition {
        &self.partition
    }

    pub fn output_file(&self) -> &Path {
        &self.output_file
    }

    fn transition(&mut self, next: CrawlState) {
        debug!(from = ?self.state, to = ?next, "Crawl state transition");
        self.state = next;
    }

    /// Scrape every district in order into a fresh output file.
    #[instrument(skip_all, fields(source = self.source.source_name(), run_date = %self.run_date))]
    pub async fn run(&mut self, districts: &[District]) -> Result<ScrapeSummary> {
        // A restarted run starts over; never append to a previous attempt's rows.
        if self.output_file.exists() {
            fs::remove_file(&self.output_file)?;
        }

        let mut partitions = Vec::with_capacity(districts.len());
        for district in districts {
            partitions.push(self.scrape_partition(district).await?);
        }

        if !self.output_file.exists() {
            RentalDataset::empty().write_csv(&self.output_file)?;
        }

        Ok(ScrapeSummary {
            run_date: self.run_date,
            output_file: self.output_file.clone(),
            partitions,
        })
    }

    /// Crawl one district, extract its listings and merge them into the run's output file.
    #[instrument(skip(self), fields(district = %district.code))]
    pub async fn scrape_partition(&mut self, district: &District) -> Result<PartitionSummary> {
        self.transition(CrawlState::Init);
        self.partition.begin(district);
        info!("Scraping {}...", district.label);

        let mut summary = PartitionSummary {
            district: district.label.clone(),
            ..Default::default()
        };

        // Page 1 decides the page count; failing here fails the run.
        self.transition(CrawlState::PaginatingFirstPage);
        let first_url = self.source.page_url(&self.partition.query, 1);
        let body = self.fetcher.fetch(&first_url).await?;
        let (pagination, links) = self.read_search_page(&body);
        let pages = match pagination? {
            Pagination::Pages(n) => n,
            Pagination::NoResults => {
                error!("No property found. Scraping stopped.");
                return Err(ScraperError::NoResults {
                    partition: district.code.clone(),
                });
            }
        };
        self.partition.pages = pages;
        self.partition.links.extend(links);
        summary.pages = pages;
        info!("Page 1/{} done.", pages);

        self.transition(CrawlState::CrawlingPages);
        let last_page = if self.debug { 1 } else { pages };
        for page in 2..=last_page {
            let url = self.source.page_url(&self.partition.query, page);
            let body = match self.fetcher.fetch(&url).await {
                Ok(body) => body,
                Err(e) => {
                    warn!(page, error = %e, "Error fetching page {}, skipping...", page);
                    CrawlMetrics::page_skipped();
                    summary.pages_skipped += 1;
                    continue;
                }
            };
            let links = self.read_links(&body);
            self.partition.links.extend(links);
            info!("Page {}/{} done.", page, pages);
        }
        summary.links = self.partition.links.len();

        self.transition(CrawlState::FetchingListings);
        let budget: Vec<ListingLink> = self
            .partition
            .links
            .iter()
            .take(self.listing_limit)
            .cloned()
            .collect();
        info!("A total of {} properties will be scraped.", budget.len());

        let mut records = Vec::with_capacity(budget.len());
        for (i, link) in budget.iter().enumerate() {
            let url = self.source.listing_url(&link.href);
            info!("Fetching {}...", link.name);

            let body = match self.fetcher.fetch(&url).await {
                Ok(body) => body,
                Err(e) => {
                    warn!(url = %url, error = %e, "Error fetching listing, dropping");
                    CrawlMetrics::listing_dropped("fetch");
                    summary.listings_dropped += 1;
                    continue;
                }
            };
            let fields = match self.read_listing(&body) {
                Ok(fields) => fields,
                Err(e) => {
                    warn!(url = %url, error = %e, "Error scraping listing, dropping");
                    CrawlMetrics::listing_dropped("extract");
                    summary.listings_dropped += 1;
                    continue;
                }
            };

            records.push(ListingRecord {
                fields,
                property_name: link.name.clone(),
                district: district.label.clone(),
                listing_id: listing_id_from_url(&url),
                url,
            });
            info!("{}/{} done!", i + 1, budget.len());
        }
        summary.listings = records.len();
        CrawlMetrics::listings_scraped(records.len());

        self.transition(CrawlState::Assembling);
        let dataset = RentalDataset::from_records(&records);
        self.persist(dataset)?;

        self.transition(CrawlState::Persisted);
        self.partition.reset();
        Ok(summary)
    }

    // Documents are parsed and dropped inside these helpers; `Html` must not live across an await.
    fn read_search_page(&self, body: &str) -> (Result<Pagination>, Vec<ListingLink>) {
        let doc = Html::parse_document(body);
        (self.source.paginate(&doc), self.source.scrape_links(&doc))
    }

    fn read_links(&self, body: &str) -> Vec<ListingLink> {
        let doc = Html::parse_document(body);
        self.source.scrape_links(&doc)
    }

    fn read_listing(&self, body: &str) -> std::result::Result<ListingFields, ExtractError> {
        let doc = Html::parse_document(body);
        self.source.extract_listing(&doc)
    }

    /// Merge `dataset` into the run's output file.
    fn persist(&self, dataset: RentalDataset) -> Result<()> {
        let rows = dataset.len();
        let merged = if self.output_file.exists() {
            let mut existing = RentalDataset::read_csv(&self.output_file)?;
            existing.merge(dataset);
            existing
        } else {
            dataset
        };
        merged.write_csv(&self.output_file)?;
        info!(
            rows,
            total_rows = merged.len(),
            file = %self.output_file.display(),
            "Persisted partition output"
        );
        Ok(())
    }
}

/// Districts selected by the config; every district when none are listed.
pub fn selected_districts(config: &ScraperConfig) -> Result<Vec<District>> {
    if config.districts.is_empty() {
        return Ok(District::all());
    }
    config
        .districts
        .iter()
        .map(|code| District::from_code(code))
        .collect()
}

/// Scrape `source_name` under the supervised restart loop; each attempt starts from scratch.
pub async fn run_supervised(
    config: &ScraperConfig,
    source_name: &str,
    fetcher: Arc<dyn DocumentFetcher>,
) -> Result<ScrapeSummary> {
    let districts = selected_districts(config)?;
    let policy = RestartPolicy {
        max_restarts: config.max_restarts,
    };

    supervise(policy, |attempt| {
        let fetcher = fetcher.clone();
        let districts = districts.clone();
        async move {
            let started = std::time::Instant::now();
            let source = apis::create_source(source_name, config)?;
            let mut scraper = Scraper::new(source, fetcher, config);
            info!(attempt, partitions = districts.len(), "Starting scrape run");
            let summary = scraper.run(&districts).await?;
            info!(
                listings = summary.listings(),
                file = %summary.output_file.display(),
                "Time taken: {:.1} seconds",
                started.elapsed().as_secs_f64()
            );
            Ok(summary)
        }
    })
    .await
}
