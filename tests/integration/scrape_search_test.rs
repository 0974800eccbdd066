// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::helpers::{json_listing, next_data_page};
use dealrs::engines::fetch::PageFetcher;
use dealrs::extractors::kijiji::KijijiScraper;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SEARCH_PATH: &str = "/b-canada/3d-printer/k0l0";
const PAGE2_PATH: &str = "/b-canada/3d-printer/page-2/k0l0";

fn fetcher() -> PageFetcher {
    PageFetcher::new(0.0, 0.0)
}

#[tokio::test]
async fn overlapping_pages_dedupe_in_first_seen_order() {
    let server = MockServer::start().await;

    let page1 = next_data_page(
        &[
            json_listing(1000000001, "one", 100.0),
            json_listing(1000000002, "two", 200.0),
            json_listing(1000000003, "three", 300.0),
            json_listing(1000000004, "four", 400.0),
        ],
        1,
        2,
    );
    // Page 2 repeats three ids from page 1 and adds one fresh listing
    let page2 = next_data_page(
        &[
            json_listing(1000000002, "two", 200.0),
            json_listing(1000000003, "three", 300.0),
            json_listing(1000000004, "four", 400.0),
            json_listing(1000000005, "five", 500.0),
        ],
        2,
        2,
    );

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(page1))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(PAGE2_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(page2))
        .mount(&server)
        .await;

    let fetcher = fetcher();
    let scraper = KijijiScraper::new(&fetcher, 5);
    let listings = scraper
        .scrape_search(&format!("{}{}", server.uri(), SEARCH_PATH), None)
        .await;

    let ids: Vec<&str> = listings.iter().map(|l| l.listing_id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "1000000001",
            "1000000002",
            "1000000003",
            "1000000004",
            "1000000005"
        ]
    );
}

#[tokio::test]
async fn pagination_stops_at_page_budget() {
    let server = MockServer::start().await;

    // Every page claims more pages exist
    let page1 = next_data_page(&[json_listing(1000000001, "one", 100.0)], 1, 99);
    let page2 = next_data_page(&[json_listing(1000000002, "two", 200.0)], 2, 99);

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(page1))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(PAGE2_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(page2))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fetcher();
    let scraper = KijijiScraper::new(&fetcher, 2);
    let listings = scraper
        .scrape_search(&format!("{}{}", server.uri(), SEARCH_PATH), None)
        .await;

    // Budget of 2 pages: page 3 is never requested
    assert_eq!(listings.len(), 2);
}

#[tokio::test]
async fn blocked_response_aborts_but_keeps_gathered() {
    let server = MockServer::start().await;

    let page1 = next_data_page(&[json_listing(1000000001, "one", 100.0)], 1, 3);
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(page1))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(PAGE2_PATH))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let fetcher = fetcher();
    let scraper = KijijiScraper::new(&fetcher, 5);
    let listings = scraper
        .scrape_search(&format!("{}{}", server.uri(), SEARCH_PATH), None)
        .await;

    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].listing_id, "1000000001");
}

#[tokio::test]
async fn rate_limit_cools_down_then_aborts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fetcher();
    let scraper =
        KijijiScraper::new(&fetcher, 5).with_cooldown(Duration::from_millis(50));

    let start = std::time::Instant::now();
    let listings = scraper
        .scrape_search(&format!("{}{}", server.uri(), SEARCH_PATH), None)
        .await;

    assert!(listings.is_empty());
    // The cooldown ran before giving up
    assert!(start.elapsed() >= Duration::from_millis(50));
}

#[tokio::test]
async fn server_error_aborts_pagination() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fetcher();
    let scraper = KijijiScraper::new(&fetcher, 5);
    let listings = scraper
        .scrape_search(&format!("{}{}", server.uri(), SEARCH_PATH), None)
        .await;

    assert!(listings.is_empty());
}

#[tokio::test]
async fn empty_page_stops_pagination() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><p>No results</p></body></html>"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fetcher();
    let scraper = KijijiScraper::new(&fetcher, 5);
    let listings = scraper
        .scrape_search(&format!("{}{}", server.uri(), SEARCH_PATH), None)
        .await;

    assert!(listings.is_empty());
}
