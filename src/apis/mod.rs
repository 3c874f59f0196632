pub mod ninety_nine;

use crate::config::ScraperConfig;
use crate::constants;
use crate::error::{Result, ScraperError};
use crate::types::PropertySource;

/// Build the property source registered under `name`.
pub fn create_source(name: &str, config: &ScraperConfig) -> Result<Box<dyn PropertySource>> {
    match name {
        constants::NINETY_NINE_SOURCE => Ok(Box::new(ninety_nine::NinetyNineCo::new(config)?)),
        other => Err(ScraperError::Config(format!(
            "Unknown source '{}'. Available: {}",
            other,
            constants::get_supported_sources().join(", ")
        ))),
    }
}
