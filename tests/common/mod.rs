#![allow(dead_code)]

use async_trait::async_trait;
use rent_scraper::app::ports::{DocumentFetcher, Notifier, TaskFailure};
use rent_scraper::config::ScraperConfig;
use rent_scraper::error::{Result, ScraperError};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

pub const BASE: &str = "https://www.99.co";

pub fn fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("missing fixture {}: {}", path.display(), e))
}

/// Search URL for `district` page `page`, as built by the 99.co source
pub fn search_url(district: &str, page: u32) -> String {
    let query = format!(
        "query_ids=dtdistrict{}&query_type=district&rental_type=all",
        district
    );
    if page == 1 {
        format!("{}/singapore/rent?{}", BASE, query)
    } else {
        format!("{}/singapore/rent/?page_num={}&{}", BASE, page, query)
    }
}

pub fn listing_url(slug: &str) -> String {
    format!("{}/singapore/rent/property/{}", BASE, slug)
}

/// Serves canned bodies by URL and records every request. Unknown URLs fail.
#[derive(Clone, Default)]
pub struct FixtureFetcher {
    pages: Arc<Mutex<HashMap<String, String>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, url: impl Into<String>, fixture_name: &str) -> &Self {
        self.pages
            .lock()
            .unwrap()
            .insert(url.into(), fixture(fixture_name));
        self
    }

    pub fn forget(&self, url: &str) {
        self.pages.lock().unwrap().remove(url);
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn listing_requests(&self) -> usize {
        self.requests()
            .iter()
            .filter(|u| u.contains("/property/"))
            .count()
    }
}

#[async_trait]
impl DocumentFetcher for FixtureFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.requests.lock().unwrap().push(url.to_string());
        self.pages.lock().unwrap().get(url).cloned().ok_or_else(|| {
            ScraperError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("404 for {}", url),
            ))
        })
    }
}

#[derive(Clone, Default)]
pub struct RecordingNotifier {
    failures: Arc<Mutex<Vec<TaskFailure>>>,
}

impl RecordingNotifier {
    pub fn failures(&self) -> Vec<TaskFailure> {
        self.failures.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn task_failed(&self, failure: &TaskFailure) -> Result<()> {
        self.failures.lock().unwrap().push(failure.clone());
        Ok(())
    }
}

pub fn scraper_config(output_dir: &Path, districts: &[&str]) -> ScraperConfig {
    ScraperConfig {
        output_dir: output_dir.to_path_buf(),
        districts: districts.iter().map(|d| d.to_string()).collect(),
        run_date: chrono::NaiveDate::from_ymd_opt(2024, 7, 14),
        max_restarts: Some(0),
        ..Default::default()
    }
}

/// Serve district `code` as a single page with the full and the broken listing.
pub fn serve_single_page_district(fetcher: &FixtureFetcher, code: &str) {
    fetcher
        .serve(search_url(code, 1), "search_single_page.html")
        .serve(
            listing_url("marina-one-residences-condo-abc123"),
            "listing_full.html",
        )
        .serve(
            listing_url("the-sail-marina-bay-condo-def456"),
            "listing_broken_groups.html",
        );
}
