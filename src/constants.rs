/// Source names, used in CLI arguments, blob keys and log fields
pub const NINETY_NINE_SOURCE: &str = "ninety_nine";
pub const NINETY_NINE_PLATFORM: &str = "99.co";

pub const NINETY_NINE_BASE_URL: &str = "https://www.99.co";
pub const NINETY_NINE_SEARCH_PATH: &str = "/singapore/rent";
pub const NINETY_NINE_QUERY_TEMPLATE: &str =
    "?query_ids=dtdistrict{district}&query_type=district&rental_type=all";

/// Placeholder replaced by the partition key in a query template
pub const DISTRICT_PLACEHOLDER: &str = "{district}";

pub const DEFAULT_LISTINGS_PER_PARTITION: usize = 200;
pub const DEBUG_LISTING_LIMIT: usize = 6;

// Pipeline defaults
pub const DEFAULT_DAG_ID: &str = "ninety_nine_etl";
pub const DEFAULT_SCHEDULE: &str = "0 0 12 * * *";
pub const DEFAULT_TASK_RETRIES: u32 = 1;
pub const DEFAULT_KEY_PREFIX: &str = "airflow";
pub const DEFAULT_SCRAPER_IMAGE: &str = "rent-scraper:ninety-nine-latest";
pub const DEFAULT_VOLUME_NAME: &str = "scraper_data";
pub const DEFAULT_VOLUME_DIR: &str = "/app/pkg/rental_prices/ninety_nine";
pub const DEFAULT_READER_IMAGE: &str = "alpine";
pub const DEFAULT_METRICS_ADDR: &str = "127.0.0.1:9898";
pub const BLOB_EXTENSION: &str = "parquet.gzip";

/// Detail-table labels never turned into columns
pub const EXCLUDED_DETAIL_LABELS: &[&str] = &["Last updated"];

/// District code -> district label for the Singapore rental search
pub const DISTRICTS: &[(&str, &str)] = &[
    ("01", "Boat Quay / Raffles Place / Marina"),
    ("02", "Chinatown / Tanjong Pagar"),
    ("03", "Alexandra / Commonwealth"),
    ("04", "Harbourfront / Telok Blangah"),
    ("05", "Buona Vista / West Coast / Clementi"),
    ("06", "City Hall / Clarke Quay"),
    ("07", "Beach Road / Bugis / Rochor"),
    ("08", "Farrer Park / Serangoon Rd"),
    ("09", "Orchard / River Valley"),
    ("10", "Tanglin / Holland"),
    ("11", "Newton / Novena"),
    ("12", "Balestier / Toa Payoh"),
    ("13", "Macpherson / Potong Pasir"),
    ("14", "Eunos / Geylang / Paya Lebar"),
    ("15", "East Coast / Marine Parade"),
    ("16", "Bedok / Upper East Coast"),
    ("17", "Changi Airport / Changi Village"),
    ("18", "Pasir Ris / Tampines"),
    ("19", "Hougang / Punggol / Sengkang"),
    ("20", "Ang Mo Kio / Bishan / Thomson"),
    ("21", "Clementi Park / Upper Bukit Timah"),
    ("22", "Boon Lay / Jurong / Tuas"),
    ("23", "Bukit Batok / Bukit Panjang / Choa Chu Kang"),
    ("24", "Lim Chu Kang / Tengah"),
    ("25", "Admiralty / Woodlands"),
    ("26", "Mandai / Upper Thomson"),
    ("27", "Sembawang / Yishun"),
    ("28", "Seletar / Yio Chu Kang"),
];

/// Look up the label of a district code
pub fn district_label(code: &str) -> Option<&'static str> {
    DISTRICTS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, label)| *label)
}

/// Get all supported source names
pub fn get_supported_sources() -> Vec<&'static str> {
    vec![NINETY_NINE_SOURCE]
}
