// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::helpers::{product_page, TestContext};
use dealrs::domain::models::listing::ListingFilter;
use dealrs::domain::repositories::config_repository::ConfigRepository;
use dealrs::domain::repositories::listing_repository::ListingRepository;
use dealrs::domain::repositories::run_repository::RunRepository;
use dealrs::workers::cycle::{CycleError, CycleOptions};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PRODUCT_PATH: &str = "/products/sv06";

async fn mount_product(server: &MockServer, title: &str, price_cents: u64) {
    Mock::given(method("GET"))
        .and(path(PRODUCT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(product_page(title, price_cents, None)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn full_cycle_persists_and_counts() {
    let ctx = TestContext::new().await;
    ctx.fast_settings().await;
    let server = MockServer::start().await;
    mount_product(&server, "Sovol SV06", 29999).await;
    ctx.single_query(&format!("{}{}", server.uri(), PRODUCT_PATH), "sovol sv06")
        .await;

    let summary = ctx.coordinator.run_cycle(CycleOptions::default()).await.unwrap();
    assert_eq!(summary.found, 1);
    assert_eq!(summary.new, 1);
    assert_eq!(summary.price_changes, 0);
    assert_eq!(summary.errors, 0);

    let listings = ctx.listings.get_listings(&ListingFilter::default()).await.unwrap();
    assert_eq!(listings.len(), 1);
    let listing = &listings[0];
    assert_eq!(listing.title, "Sovol SV06");
    assert_eq!(listing.current_price, Some(299.99));
    assert_eq!(listing.original_price, Some(299.99));
    assert_eq!(listing.currency, "USD");
    assert!(listing.is_active);

    // The run record is terminal with matching counts
    let run = ctx.runs.latest_run().await.unwrap().unwrap();
    assert!(run.finished_at.is_some());
    assert_eq!(run.listings_found, 1);
    assert_eq!(run.new_listings, 1);
    assert_eq!(run.search_query, Some("sovol sv06".to_string()));

    let history = ctx.listings.price_history(&listing.listing_id).await.unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn price_change_is_counted_and_baseline_kept() {
    let ctx = TestContext::new().await;
    ctx.fast_settings().await;
    let server = MockServer::start().await;
    mount_product(&server, "Sovol SV06", 29999).await;
    ctx.single_query(&format!("{}{}", server.uri(), PRODUCT_PATH), "sovol sv06")
        .await;

    ctx.coordinator.run_cycle(CycleOptions::default()).await.unwrap();

    // Same product, new price on the next cycle
    server.reset().await;
    mount_product(&server, "Sovol SV06", 14999).await;

    let summary = ctx.coordinator.run_cycle(CycleOptions::default()).await.unwrap();
    assert_eq!(summary.found, 1);
    assert_eq!(summary.new, 0);
    assert_eq!(summary.price_changes, 1);

    let listings = ctx.listings.get_listings(&ListingFilter::default()).await.unwrap();
    let listing = &listings[0];
    assert_eq!(listing.current_price, Some(149.99));
    // The drop baseline never moves
    assert_eq!(listing.original_price, Some(299.99));

    let history = ctx.listings.price_history(&listing.listing_id).await.unwrap();
    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn same_product_maps_to_same_listing_key() {
    let ctx = TestContext::new().await;
    ctx.fast_settings().await;
    let server = MockServer::start().await;
    mount_product(&server, "Sovol SV06", 29999).await;
    ctx.single_query(&format!("{}{}", server.uri(), PRODUCT_PATH), "sovol sv06")
        .await;

    ctx.coordinator.run_cycle(CycleOptions::default()).await.unwrap();
    ctx.coordinator.run_cycle(CycleOptions::default()).await.unwrap();

    // Two cycles over the same URL never fork a second listing
    let listings = ctx
        .listings
        .get_listings(&ListingFilter {
            active_only: false,
            show_hidden: true,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(listings.len(), 1);
}

#[tokio::test]
async fn unseen_listings_age_out_and_reappearance_revives() {
    let ctx = TestContext::new().await;
    ctx.fast_settings().await;
    ctx.config.set_setting("inactive_threshold", json!(2)).await.unwrap();

    let server = MockServer::start().await;
    mount_product(&server, "Sovol SV06", 29999).await;
    ctx.single_query(&format!("{}{}", server.uri(), PRODUCT_PATH), "sovol sv06")
        .await;

    ctx.coordinator.run_cycle(CycleOptions::default()).await.unwrap();

    // Cycles that match no queries still run the staleness pass
    let ghost = CycleOptions {
        query_filter: Some("no-such-label".to_string()),
        ..Default::default()
    };
    ctx.coordinator.run_cycle(ghost.clone()).await.unwrap();

    let active = ctx.listings.get_listings(&ListingFilter::default()).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].missed_runs, 1);

    ctx.coordinator.run_cycle(ghost).await.unwrap();
    let active = ctx.listings.get_listings(&ListingFilter::default()).await.unwrap();
    assert!(active.is_empty());

    // The listing is back in the results: counter resets, active again
    ctx.coordinator.run_cycle(CycleOptions::default()).await.unwrap();
    let active = ctx.listings.get_listings(&ListingFilter::default()).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].missed_runs, 0);
}

#[tokio::test]
async fn failing_source_counts_error_and_cycle_continues() {
    let ctx = TestContext::new().await;
    ctx.fast_settings().await;
    let server = MockServer::start().await;
    mount_product(&server, "Sovol SV06", 29999).await;

    ctx.single_query(&format!("{}/products/missing", server.uri()), "broken")
        .await;
    ctx.config
        .add_search_query(&format!("{}{}", server.uri(), PRODUCT_PATH), "sovol sv06")
        .await
        .unwrap();

    let summary = ctx.coordinator.run_cycle(CycleOptions::default()).await.unwrap();
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.found, 1);
    assert_eq!(summary.new, 1);
}

#[tokio::test]
async fn concurrent_trigger_is_rejected_as_busy() {
    let ctx = TestContext::new().await;
    ctx.fast_settings().await;
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PRODUCT_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(product_page("Sovol SV06", 29999, None))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;
    ctx.single_query(&format!("{}{}", server.uri(), PRODUCT_PATH), "sovol sv06")
        .await;

    let coordinator = ctx.coordinator.clone();
    let running = tokio::spawn({
        let coordinator = coordinator.clone();
        async move { coordinator.run_cycle(CycleOptions::default()).await }
    });

    // Wait until the background cycle actually holds the flight lock
    while !coordinator.status().scraping {
        if running.is_finished() {
            panic!("cycle finished before the busy check");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // A second trigger is rejected immediately, not queued
    assert!(matches!(
        coordinator.trigger_now(CycleOptions::default()),
        Err(CycleError::AlreadyRunning)
    ));

    let summary = running.await.unwrap().unwrap();
    assert_eq!(summary.found, 1);

    let status = coordinator.status();
    assert!(!status.scraping);
    assert_eq!(status.last_result.unwrap().found, 1);
}

#[tokio::test]
async fn stats_reflect_cycles() {
    let ctx = TestContext::new().await;
    ctx.fast_settings().await;
    let server = MockServer::start().await;
    mount_product(&server, "Sovol SV06", 29999).await;
    ctx.single_query(&format!("{}{}", server.uri(), PRODUCT_PATH), "sovol sv06")
        .await;

    assert_eq!(ctx.runs.run_count().await.unwrap(), 0);
    ctx.coordinator.run_cycle(CycleOptions::default()).await.unwrap();

    let stats = ctx.runs.stats().await.unwrap();
    assert_eq!(stats.total_listings, 1);
    assert_eq!(stats.active_listings, 1);
    assert_eq!(stats.total_snapshots, 1);
    assert_eq!(stats.total_scrape_runs, 1);
    assert_eq!(stats.listings_with_drops, 0);
    assert!(stats.last_run.unwrap().finished_at.is_some());
}
