use crate::constants::{self, DISTRICT_PLACEHOLDER};
use crate::error::{Result, ScraperError};
use scraper::Html;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core output columns, in order. Property-detail columns follow these.
pub const CORE_COLUMNS: [&str; 14] = [
    "price",
    "bedroom",
    "bathroom",
    "dimensions",
    "address",
    "latitude",
    "longitude",
    "nearest_mrt",
    "distance_to_nearest_mrt",
    "facilities",
    "property_name",
    "district",
    "listing_id",
    "url",
];

/// One geographic partition of the crawl space
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct District {
    pub code: String,
    pub label: String,
}

impl District {
    pub fn from_code(code: &str) -> Result<Self> {
        let label = constants::district_label(code)
            .ok_or_else(|| ScraperError::Config(format!("Unknown district code '{}'", code)))?;
        Ok(Self {
            code: code.to_string(),
            label: label.to_string(),
        })
    }

    pub fn all() -> Vec<Self> {
        constants::DISTRICTS
            .iter()
            .map(|(code, label)| Self {
                code: code.to_string(),
                label: label.to_string(),
            })
            .collect()
    }
}

/// A listing discovered on a search-results page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingLink {
    pub name: String,
    /// As found in the page, usually relative to the site root
    pub href: String,
}

/// Fields extracted from one listing page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingFields {
    pub price: String,
    pub bedroom: Option<String>,
    pub bathroom: Option<String>,
    pub dimensions: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub nearest_mrt: Option<String>,
    pub distance_to_nearest_mrt: Option<String>,
    pub facilities: Option<Vec<String>>,
    /// Snake-cased detail label -> value, in page order
    pub details: Vec<(String, String)>,
}

impl ListingFields {
    /// Insert or overwrite a detail column, keeping first-seen order.
    pub fn set_detail(&mut self, key: String, value: String) {
        match self.details.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.details.push((key, value)),
        }
    }
}

/// A fully enriched output row
#[derive(Debug, Clone, PartialEq)]
pub struct ListingRecord {
    pub fields: ListingFields,
    pub property_name: String,
    pub district: String,
    pub listing_id: String,
    pub url: String,
}

impl ListingRecord {
    /// Cell value for `column`; `None` renders as an empty cell.
    pub fn value(&self, column: &str) -> Option<String> {
        let f = &self.fields;
        match column {
            "price" => Some(f.price.clone()),
            "bedroom" => f.bedroom.clone(),
            "bathroom" => f.bathroom.clone(),
            "dimensions" => f.dimensions.clone(),
            "address" => f.address.clone(),
            "latitude" => f.latitude.map(|v| v.to_string()),
            "longitude" => f.longitude.map(|v| v.to_string()),
            "nearest_mrt" => f.nearest_mrt.clone(),
            "distance_to_nearest_mrt" => f.distance_to_nearest_mrt.clone(),
            "facilities" => f
                .facilities
                .as_ref()
                .and_then(|list| serde_json::to_string(list).ok()),
            "property_name" => Some(self.property_name.clone()),
            "district" => Some(self.district.clone()),
            "listing_id" => Some(self.listing_id.clone()),
            "url" => Some(self.url.clone()),
            other => f
                .details
                .iter()
                .find(|(k, _)| k == other)
                .map(|(_, v)| v.clone()),
        }
    }
}

/// Why a listing produced no record
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    #[error("price not found")]
    MissingPrice,
}

/// Outcome of reading a search-results page's pagination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    Pages(u32),
    NoResults,
}

/// Crawl state for one partition, reused across partitions by the same scraper
#[derive(Debug, Clone)]
pub struct CrawlPartition {
    template: String,
    pub district: Option<District>,
    pub query: String,
    pub links: Vec<ListingLink>,
    pub pages: u32,
}

impl CrawlPartition {
    pub fn new(template: impl Into<String>) -> Self {
        let template = template.into();
        Self {
            query: template.clone(),
            template,
            district: None,
            links: Vec::new(),
            pages: 0,
        }
    }

    /// Parameterize the query template with the district code.
    pub fn begin(&mut self, district: &District) {
        self.query = self.template.replace(DISTRICT_PLACEHOLDER, &district.code);
        self.district = Some(district.clone());
        self.links.clear();
        self.pages = 0;
    }

    /// Drop accumulated links and restore the unparameterized template.
    pub fn reset(&mut self) {
        self.query = self.template.clone();
        self.district = None;
        self.links.clear();
        self.pages = 0;
    }

    pub fn is_reset(&self) -> bool {
        self.query == self.template && self.links.is_empty() && self.district.is_none()
    }
}

/// A property website the scraper knows how to crawl.
///
/// Implementations are pure functions of parsed documents; fetching, budgets and
/// persistence live in [`crate::crawl::Scraper`].
pub trait PropertySource: Send + Sync {
    /// Short name used in blob keys and logs
    fn source_name(&self) -> &'static str;

    /// Human-readable site name
    fn platform_name(&self) -> &'static str;

    /// Absolute URL of search page `page` for an already-parameterized query
    fn page_url(&self, query: &str, page: u32) -> String;

    /// Absolute URL for a listing href scraped from a search page
    fn listing_url(&self, href: &str) -> String;

    fn paginate(&self, doc: &Html) -> Result<Pagination>;

    fn scrape_links(&self, doc: &Html) -> Vec<ListingLink>;

    fn extract_listing(&self, doc: &Html) -> std::result::Result<ListingFields, ExtractError>;
}
