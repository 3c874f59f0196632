pub mod apis;
pub mod config;
pub mod constants;
pub mod crawl;
pub mod dataset;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod parser;
pub mod pipeline;
pub mod storage;
pub mod supervisor;
pub mod types;

// Layered boundaries: ports in `app`, adapters in `infra`
pub mod app;
pub mod infra;
