// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::helpers::{scraped, TestContext};
use chrono::{Duration, Utc};
use dealrs::domain::models::listing::ListingFilter;
use dealrs::domain::repositories::listing_repository::{ListingEnrichment, ListingRepository};
use std::collections::HashSet;

#[tokio::test]
async fn first_seen_and_original_price_survive_reupserts() {
    let ctx = TestContext::new().await;
    let enrichment = ListingEnrichment::default();

    let first_at = Utc::now() - Duration::hours(6);
    let is_new = ctx
        .listings
        .upsert(&scraped("1000000001", "Ender 3", Some(200.0)), &enrichment, first_at)
        .await
        .unwrap();
    assert!(is_new);

    // Upsert twice more with different prices
    for price in [180.0, 150.0] {
        let is_new = ctx
            .listings
            .upsert(
                &scraped("1000000001", "Ender 3", Some(price)),
                &enrichment,
                Utc::now(),
            )
            .await
            .unwrap();
        assert!(!is_new);
    }

    let listing = ctx.listings.find_by_id("1000000001").await.unwrap().unwrap();
    assert_eq!(listing.original_price, Some(200.0));
    assert_eq!(listing.current_price, Some(150.0));
    assert_eq!(listing.first_seen.timestamp(), first_at.timestamp());
    assert!(listing.last_seen > listing.first_seen);
}

#[tokio::test]
async fn missing_price_never_nulls_current_price() {
    let ctx = TestContext::new().await;
    let enrichment = ListingEnrichment::default();

    ctx.listings
        .upsert(&scraped("1000000002", "Prusa MK4", Some(900.0)), &enrichment, Utc::now())
        .await
        .unwrap();

    // Scrape failed to extract a price this time
    ctx.listings
        .upsert(&scraped("1000000002", "Prusa MK4", None), &enrichment, Utc::now())
        .await
        .unwrap();

    let listing = ctx.listings.find_by_id("1000000002").await.unwrap().unwrap();
    assert_eq!(listing.current_price, Some(900.0));
}

#[tokio::test]
async fn coalesce_keeps_detail_fields() {
    let ctx = TestContext::new().await;
    let enrichment = ListingEnrichment {
        brand: Some("prusa".to_string()),
        model: None,
        msrp: None,
    };

    let mut full = scraped("1000000003", "Prusa Mini+", Some(450.0));
    full.description = Some("with enclosure".to_string());
    full.seller_name = Some("alex".to_string());
    full.image_urls = vec!["https://img.example/1.jpg".to_string()];
    ctx.listings.upsert(&full, &enrichment, Utc::now()).await.unwrap();

    // A later sparse scrape (search page only) keeps everything
    let sparse = scraped("1000000003", "Prusa Mini+", Some(440.0));
    ctx.listings
        .upsert(&sparse, &ListingEnrichment::default(), Utc::now())
        .await
        .unwrap();

    let listing = ctx.listings.find_by_id("1000000003").await.unwrap().unwrap();
    assert_eq!(listing.description, Some("with enclosure".to_string()));
    assert_eq!(listing.seller_name, Some("alex".to_string()));
    assert_eq!(listing.image_urls, vec!["https://img.example/1.jpg"]);
    assert_eq!(listing.brand, Some("prusa".to_string()));
    assert_eq!(listing.current_price, Some(440.0));
}

#[tokio::test]
async fn missed_runs_increment_reset_and_threshold() {
    let ctx = TestContext::new().await;
    let enrichment = ListingEnrichment::default();

    ctx.listings
        .upsert(&scraped("1000000004", "Voron 2.4", Some(1200.0)), &enrichment, Utc::now())
        .await
        .unwrap();

    let empty: HashSet<String> = HashSet::new();
    let threshold = 3;

    // Two missed cycles: counter climbs, still active
    for expected in 1..=2 {
        ctx.listings.increment_missed_runs(&empty, threshold).await.unwrap();
        let listing = ctx.listings.find_by_id("1000000004").await.unwrap().unwrap();
        assert_eq!(listing.missed_runs, expected);
        assert!(listing.is_active);
    }

    // Reappearance resets the counter and keeps it active
    ctx.listings
        .upsert(&scraped("1000000004", "Voron 2.4", Some(1100.0)), &enrichment, Utc::now())
        .await
        .unwrap();
    let listing = ctx.listings.find_by_id("1000000004").await.unwrap().unwrap();
    assert_eq!(listing.missed_runs, 0);
    assert!(listing.is_active);

    // Three consecutive misses cross the threshold exactly once
    for _ in 0..3 {
        ctx.listings.increment_missed_runs(&empty, threshold).await.unwrap();
    }
    let listing = ctx.listings.find_by_id("1000000004").await.unwrap().unwrap();
    assert_eq!(listing.missed_runs, 3);
    assert!(!listing.is_active);

    // Inactive listings stop accumulating: the sweep is idempotent
    ctx.listings.increment_missed_runs(&empty, threshold).await.unwrap();
    let listing = ctx.listings.find_by_id("1000000004").await.unwrap().unwrap();
    assert_eq!(listing.missed_runs, 3);
    assert!(!listing.is_active);
}

#[tokio::test]
async fn seen_ids_are_not_incremented() {
    let ctx = TestContext::new().await;
    let enrichment = ListingEnrichment::default();

    ctx.listings
        .upsert(&scraped("1000000005", "Kobra 2", Some(300.0)), &enrichment, Utc::now())
        .await
        .unwrap();
    ctx.listings
        .upsert(&scraped("1000000006", "Kobra 2 Max", Some(500.0)), &enrichment, Utc::now())
        .await
        .unwrap();

    let seen: HashSet<String> = HashSet::from(["1000000005".to_string()]);
    ctx.listings.increment_missed_runs(&seen, 3).await.unwrap();

    let kept = ctx.listings.find_by_id("1000000005").await.unwrap().unwrap();
    let missed = ctx.listings.find_by_id("1000000006").await.unwrap().unwrap();
    assert_eq!(kept.missed_runs, 0);
    assert_eq!(missed.missed_runs, 1);
}

#[tokio::test]
async fn snapshots_dedupe_on_same_instant() {
    let ctx = TestContext::new().await;
    let enrichment = ListingEnrichment::default();
    ctx.listings
        .upsert(&scraped("1000000007", "SV06", Some(250.0)), &enrichment, Utc::now())
        .await
        .unwrap();

    let at = Utc::now();
    ctx.listings.add_price_snapshot("1000000007", Some(250.0), at).await.unwrap();
    ctx.listings.add_price_snapshot("1000000007", Some(250.0), at).await.unwrap();
    // Null-price snapshot still tracks presence
    ctx.listings
        .add_price_snapshot("1000000007", None, at + Duration::seconds(1))
        .await
        .unwrap();

    let history = ctx.listings.price_history("1000000007").await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].price, Some(250.0));
    assert_eq!(history[1].price, None);
}

#[tokio::test]
async fn sort_orders_are_applied() {
    let ctx = TestContext::new().await;
    let enrichment = ListingEnrichment::default();

    let mut cheap = scraped("1000000010", "cheap", Some(100.0));
    cheap.price = Some(100.0);
    ctx.listings.upsert(&cheap, &enrichment, Utc::now()).await.unwrap();
    ctx.listings
        .upsert(&scraped("1000000011", "pricey", Some(900.0)), &enrichment, Utc::now())
        .await
        .unwrap();
    // Give the pricey one a visible drop
    ctx.listings
        .upsert(&scraped("1000000011", "pricey", Some(500.0)), &enrichment, Utc::now())
        .await
        .unwrap();

    let by_price = ctx
        .listings
        .get_listings(&ListingFilter {
            sort_by: dealrs::domain::models::listing::ListingSort::PriceAsc,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_price[0].listing_id, "1000000010");

    let by_drop = ctx
        .listings
        .get_listings(&ListingFilter {
            sort_by: dealrs::domain::models::listing::ListingSort::PriceDrop,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_drop[0].listing_id, "1000000011");
}

#[tokio::test]
async fn hidden_listings_are_filtered_by_default() {
    let ctx = TestContext::new().await;
    let enrichment = ListingEnrichment::default();
    ctx.listings
        .upsert(&scraped("1000000008", "A1 Mini", Some(350.0)), &enrichment, Utc::now())
        .await
        .unwrap();
    ctx.listings.set_hidden("1000000008", true).await.unwrap();

    let visible = ctx.listings.get_listings(&ListingFilter::default()).await.unwrap();
    assert!(visible.is_empty());

    let all = ctx
        .listings
        .get_listings(&ListingFilter {
            show_hidden: true,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
}
