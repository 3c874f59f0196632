//! Text-level helpers shared by listing extractors.
//!
//! Each field group of a listing is extracted into a [`FieldResult`]: `Ok(Some(v))` when the
//! value was found, `Ok(None)` when the page legitimately has no value, and `Err` when the
//! group could not be read. [`settle`] folds a result into the record and logs failures, so a
//! broken group never aborts the rest of the listing.

use crate::metrics::CrawlMetrics;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("malformed {field}: {message}")]
    Malformed {
        field: &'static str,
        message: String,
    },
}

pub type FieldResult<T> = std::result::Result<Option<T>, FieldError>;

/// Collapse one field group's outcome into an optional value, logging failures.
pub fn settle<T>(group: &'static str, result: FieldResult<T>) -> Option<T> {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!(group, error = %e, "Error scraping field group");
            CrawlMetrics::field_group_failed(group);
            None
        }
    }
}

static NON_ALNUM_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());
static ADDRESS_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\s·.*?Rent").unwrap());
static MRT_DISTANCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\((\d+)\s*m\)").unwrap());
static COORDINATES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""coordinates":\{"lng":([0-9.-]+),"lat":([0-9.-]+)\}"#).unwrap()
});

/// Normalize a detail-table label into a column key: `"Price/sqft"` -> `"price_sqft"`.
pub fn to_snake_case(label: &str) -> String {
    let lowered = label.trim().to_lowercase();
    NON_ALNUM_RUN
        .replace_all(&lowered, "_")
        .trim_matches('_')
        .to_string()
}

/// Pull the street address out of the listing's type/address blob.
///
/// The first line looks like `"Blk 123 Main St · Executive Condo for Rent"`; the
/// `· <type> for Rent` tag is stripped. A line starting with `·` carries no address.
pub fn parse_address(blob: &str) -> Option<String> {
    let first_line = blob.trim().split('\n').next()?.trim();
    if first_line.is_empty() || first_line.starts_with('·') {
        return None;
    }
    let address = ADDRESS_TAG.replace_all(first_line, "");
    let address = address.trim();
    (!address.is_empty()).then(|| address.to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub struct NearestMrt {
    pub station: String,
    /// Walking distance in meters, as printed on the page
    pub distance_m: Option<String>,
}

/// Parse `"3 mins (175 m) from Shenton Way MRT"`.
pub fn parse_nearest_mrt(text: &str) -> std::result::Result<NearestMrt, FieldError> {
    let (distance, station) =
        text.trim()
            .split_once(" from ")
            .ok_or_else(|| FieldError::Malformed {
                field: "nearest_mrt",
                message: format!("no ' from ' in {:?}", text),
            })?;

    let distance_m = MRT_DISTANCE
        .captures(distance)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());

    Ok(NearestMrt {
        station: station.trim().to_string(),
        distance_m,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Coordinates {
    pub lng: f64,
    pub lat: f64,
}

#[derive(Deserialize)]
struct CoordinatesEnvelope {
    coordinates: Coordinates,
}

/// Find the listing's coordinates inside the serialized application state.
pub fn parse_coordinates(state: &str) -> FieldResult<Coordinates> {
    let Some(found) = COORDINATES.find(state) else {
        return Ok(None);
    };
    let json = format!("{{{}}}", found.as_str());
    let envelope: CoordinatesEnvelope =
        serde_json::from_str(&json).map_err(|e| FieldError::Malformed {
            field: "coordinates",
            message: e.to_string(),
        })?;
    Ok(Some(envelope.coordinates))
}

/// Listing ids are the last `-`-separated segment of the listing URL.
pub fn listing_id_from_url(url: &str) -> String {
    url.rsplit('-').next().unwrap_or(url).to_string()
}
