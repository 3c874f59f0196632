mod common;

use common::*;
use rent_scraper::apis;
use rent_scraper::crawl::{run_supervised, CrawlState, Scraper};
use rent_scraper::dataset::RentalDataset;
use rent_scraper::error::ScraperError;
use rent_scraper::types::District;
use std::sync::Arc;
use tempfile::tempdir;

fn scraper_for(config: &rent_scraper::config::ScraperConfig, fetcher: &FixtureFetcher) -> Scraper {
    let source = apis::create_source("ninety_nine", config).unwrap();
    Scraper::new(source, Arc::new(fetcher.clone()), config)
}

#[tokio::test]
async fn test_partition_is_persisted_and_reset() {
    let dir = tempdir().unwrap();
    let config = scraper_config(dir.path(), &["01"]);
    let fetcher = FixtureFetcher::new();
    serve_single_page_district(&fetcher, "01");

    let mut scraper = scraper_for(&config, &fetcher);
    let district = District::from_code("01").unwrap();
    let summary = scraper.scrape_partition(&district).await.unwrap();

    assert_eq!(summary.pages, 1);
    assert_eq!(summary.listings, 2);
    assert_eq!(scraper.state(), CrawlState::Persisted);
    assert!(scraper.partition().is_reset());
    assert!(scraper.partition().links.is_empty());
    assert_eq!(scraper.partition().pages, 0);

    let dataset = RentalDataset::read_csv(scraper.output_file()).unwrap();
    assert_eq!(dataset.len(), 2);
    assert_eq!(dataset.get(0, "listing_id"), Some("abc123"));
    assert_eq!(
        dataset.get(0, "url"),
        Some("https://www.99.co/singapore/rent/property/marina-one-residences-condo-abc123")
    );
    assert_eq!(dataset.get(0, "property_name"), Some("Marina One Residences"));
    assert_eq!(
        dataset.get(0, "district"),
        Some("Boat Quay / Raffles Place / Marina")
    );
    assert_eq!(
        dataset.get(0, "facilities"),
        Some(r#"["Swimming pool","Gym","Gym"]"#)
    );
    assert_eq!(dataset.get(1, "address"), None);
    assert_eq!(dataset.get(1, "tenure"), Some("99-year leasehold"));
    assert_eq!(dataset.get(0, "tenure"), None);
}

#[tokio::test]
async fn test_zero_results_fetches_no_listing() {
    let dir = tempdir().unwrap();
    let config = scraper_config(dir.path(), &["25"]);
    let fetcher = FixtureFetcher::new();
    fetcher.serve(search_url("25", 1), "search_no_results.html");

    let result = run_supervised(&config, "ninety_nine", Arc::new(fetcher.clone())).await;

    assert!(matches!(result, Err(ScraperError::NoResults { ref partition }) if partition == "25"));
    assert_eq!(fetcher.requests().len(), 1);
    assert_eq!(fetcher.listing_requests(), 0);
}

#[tokio::test]
async fn test_failed_page_is_skipped() {
    let dir = tempdir().unwrap();
    let config = scraper_config(dir.path(), &["09"]);
    let fetcher = FixtureFetcher::new();
    fetcher
        .serve(search_url("09", 1), "search_page1_of3.html")
        .serve(search_url("09", 3), "search_page3_of3.html");
    for slug in [
        "orchard-residences-condo-p1a",
        "scotts-square-condo-p1b",
        "leedon-green-condo-p3a",
    ] {
        fetcher.serve(listing_url(slug), "listing_full.html");
    }

    let summary = run_supervised(&config, "ninety_nine", Arc::new(fetcher.clone()))
        .await
        .unwrap();

    let partition = &summary.partitions[0];
    assert_eq!(partition.pages, 3);
    assert_eq!(partition.pages_skipped, 1);
    assert_eq!(partition.links, 3);
    assert_eq!(partition.listings, 3);
    assert!(fetcher.requests().contains(&search_url("09", 2)));
}

#[tokio::test]
async fn test_all_pages_are_crawled_in_order() {
    let dir = tempdir().unwrap();
    let config = scraper_config(dir.path(), &["09"]);
    let fetcher = FixtureFetcher::new();
    fetcher
        .serve(search_url("09", 1), "search_page1_of3.html")
        .serve(search_url("09", 2), "search_page2_of3.html")
        .serve(search_url("09", 3), "search_page3_of3.html");

    // No listing pages are served: every listing is dropped, the run still persists.
    let summary = run_supervised(&config, "ninety_nine", Arc::new(fetcher.clone()))
        .await
        .unwrap();

    let listing_order: Vec<String> = fetcher
        .requests()
        .into_iter()
        .filter(|u| u.contains("/property/"))
        .collect();
    assert_eq!(
        listing_order,
        vec![
            listing_url("orchard-residences-condo-p1a"),
            listing_url("scotts-square-condo-p1b"),
            listing_url("the-orchard-residences-condo-p2a"),
            listing_url("martin-modern-condo-p2b"),
            listing_url("leedon-green-condo-p3a"),
        ]
    );
    assert_eq!(summary.partitions[0].listings, 0);
    assert_eq!(summary.partitions[0].listings_dropped, 5);

    let dataset = RentalDataset::read_csv(&summary.output_file).unwrap();
    assert!(dataset.is_empty());
}

#[tokio::test]
async fn test_debug_mode_crawls_first_page_and_caps_listings() {
    let dir = tempdir().unwrap();
    let mut config = scraper_config(dir.path(), &["09"]);
    config.debug = true;
    config.debug_listing_limit = 1;
    let fetcher = FixtureFetcher::new();
    fetcher
        .serve(search_url("09", 1), "search_page1_of3.html")
        .serve(listing_url("orchard-residences-condo-p1a"), "listing_full.html");

    let summary = run_supervised(&config, "ninety_nine", Arc::new(fetcher.clone()))
        .await
        .unwrap();

    assert_eq!(fetcher.requests().len(), 2);
    assert_eq!(fetcher.listing_requests(), 1);
    assert_eq!(summary.listings(), 1);
}

#[tokio::test]
async fn test_listing_budget_is_exact() {
    let dir = tempdir().unwrap();
    let mut config = scraper_config(dir.path(), &["01"]);
    config.listings_per_partition = 1;
    let fetcher = FixtureFetcher::new();
    serve_single_page_district(&fetcher, "01");

    let summary = run_supervised(&config, "ninety_nine", Arc::new(fetcher.clone()))
        .await
        .unwrap();

    assert_eq!(fetcher.listing_requests(), 1);
    assert_eq!(summary.listings(), 1);
}

#[tokio::test]
async fn test_partitions_merge_into_one_file() {
    let dir = tempdir().unwrap();
    let config = scraper_config(dir.path(), &["01", "02"]);
    let fetcher = FixtureFetcher::new();
    serve_single_page_district(&fetcher, "01");
    fetcher.serve(search_url("02", 1), "search_single_page.html");

    let summary = run_supervised(&config, "ninety_nine", Arc::new(fetcher.clone()))
        .await
        .unwrap();

    assert_eq!(summary.partitions.len(), 2);
    assert_eq!(summary.listings(), 4);
    let dataset = RentalDataset::read_csv(&summary.output_file).unwrap();
    assert_eq!(dataset.len(), 4);
    assert_eq!(dataset.get(2, "district"), Some("Chinatown / Tanjong Pagar"));
    assert!(summary.output_file.ends_with("2024-07-14.csv"));
}

#[tokio::test]
async fn test_rerun_replaces_previous_output() {
    let dir = tempdir().unwrap();
    let config = scraper_config(dir.path(), &["01"]);
    let fetcher = FixtureFetcher::new();
    serve_single_page_district(&fetcher, "01");

    for _ in 0..2 {
        run_supervised(&config, "ninety_nine", Arc::new(fetcher.clone()))
            .await
            .unwrap();
    }

    let dataset = RentalDataset::read_csv(&dir.path().join("2024-07-14.csv")).unwrap();
    assert_eq!(dataset.len(), 2);
}

#[tokio::test]
async fn test_failed_first_page_is_restarted() {
    let dir = tempdir().unwrap();
    let mut config = scraper_config(dir.path(), &["01"]);
    config.max_restarts = Some(2);
    let fetcher = FixtureFetcher::new();

    let result = run_supervised(&config, "ninety_nine", Arc::new(fetcher.clone())).await;

    assert!(matches!(result, Err(ScraperError::Io(_))));
    assert_eq!(fetcher.requests(), vec![search_url("01", 1); 3]);
}
