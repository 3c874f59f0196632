mod common;

use common::*;
use metrics_exporter_prometheus::PrometheusBuilder;
use rent_scraper::crawl::run_supervised;
use std::sync::Arc;
use tempfile::tempdir;

/// Drive `fut` on a current-thread runtime so the thread-local recorder sees every record.
fn block_on<F: std::future::Future>(fut: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(fut)
}

#[test]
fn test_restart_is_counted() {
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    let dir = tempdir().unwrap();
    let mut config = scraper_config(dir.path(), &["01"]);
    config.max_restarts = Some(1);
    let fetcher = FixtureFetcher::new();

    let result = metrics::with_local_recorder(&recorder, || {
        block_on(run_supervised(&config, "ninety_nine", Arc::new(fetcher.clone())))
    });

    assert!(result.is_err());
    assert_eq!(fetcher.requests().len(), 2);
    assert!(handle.render().contains("rent_run_restarts_total 1"));
}

#[test]
fn test_dropped_listing_is_counted() {
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    let dir = tempdir().unwrap();
    let config = scraper_config(dir.path(), &["01"]);
    let fetcher = FixtureFetcher::new();
    serve_single_page_district(&fetcher, "01");
    fetcher.forget(&listing_url("the-sail-marina-bay-condo-def456"));

    let summary = metrics::with_local_recorder(&recorder, || {
        block_on(run_supervised(&config, "ninety_nine", Arc::new(fetcher.clone())))
    })
    .unwrap();

    assert_eq!(summary.listings(), 1);
    let rendered = handle.render();
    assert!(rendered.contains(r#"rent_listings_dropped_total{reason="fetch"} 1"#));
    assert!(rendered.contains("rent_listings_scraped_total 1"));
    assert!(!rendered.contains("rent_run_restarts_total"));
}
