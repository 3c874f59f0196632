use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unexpected page markup: {0}")]
    Markup(String),

    /// The search returned zero listings for a partition. Never retried.
    #[error("No property found for partition {partition}")]
    NoResults { partition: String },

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Container error: {message}")]
    Container { message: String },
}

impl ScraperError {
    /// Fatal errors stop the process instead of restarting the run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScraperError::NoResults { .. } | ScraperError::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, ScraperError>;
