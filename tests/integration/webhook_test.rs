// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::helpers::{product_page, TestContext};
use dealrs::domain::models::settings::RuntimeSettings;
use dealrs::domain::models::webhook::{WebhookEvent, WebhookEventType};
use dealrs::domain::services::notifier::WebhookNotifier;
use dealrs::utils::retry::RetryPolicy;
use dealrs::workers::cycle::CycleOptions;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Millisecond-scale retry sequence so tests stay fast.
fn fast_policy() -> RetryPolicy {
    RetryPolicy::new(vec![
        Duration::from_millis(10),
        Duration::from_millis(20),
        Duration::from_millis(30),
    ])
}

fn webhook_settings(url: &str) -> RuntimeSettings {
    let map = std::collections::HashMap::from([
        ("webhook_enabled".to_string(), json!(true)),
        ("webhook_url".to_string(), json!(url)),
    ]);
    RuntimeSettings::from_map(&map)
}

#[tokio::test]
async fn delivers_signed_canonical_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(header_exists("X-Dealrs-Signature"))
        .and(header_exists("X-Dealrs-Event"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = WebhookNotifier::new("test-secret".to_string());
    let settings = webhook_settings(&format!("{}/hook", server.uri()));
    let delivered = notifier
        .emit(
            &settings,
            WebhookEvent::new(WebhookEventType::ScrapeCompleted, json!({"found": 4})),
        )
        .await;
    assert!(delivered);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["event"], "scrape_completed");
    assert_eq!(body["schema_version"], 1);
    assert_eq!(body["data"]["found"], 4);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn retries_after_server_error_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = WebhookNotifier::new("test-secret".to_string()).with_policy(fast_policy());
    let settings = webhook_settings(&format!("{}/hook", server.uri()));
    let delivered = notifier
        .emit(
            &settings,
            WebhookEvent::new(WebhookEventType::ScrapeFailed, json!({"error": "boom"})),
        )
        .await;

    assert!(delivered);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn gives_up_silently_after_retry_sequence() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let notifier = WebhookNotifier::new("test-secret".to_string()).with_policy(fast_policy());
    let settings = webhook_settings(&server.uri());
    let delivered = notifier
        .emit(
            &settings,
            WebhookEvent::new(WebhookEventType::ScrapeCompleted, json!({})),
        )
        .await;

    // Initial attempt plus one retry per policy slot, then silence
    assert!(!delivered);
    assert_eq!(server.received_requests().await.unwrap().len(), 4);
}

#[tokio::test]
async fn filtered_and_disabled_events_are_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let notifier = WebhookNotifier::new("test-secret".to_string());

    // Event type not in the configured list
    let map = std::collections::HashMap::from([
        ("webhook_enabled".to_string(), json!(true)),
        ("webhook_url".to_string(), json!(server.uri())),
        ("webhook_events".to_string(), json!(["scrape_failed"])),
    ]);
    let filtered = RuntimeSettings::from_map(&map);
    assert!(
        !notifier
            .emit(
                &filtered,
                WebhookEvent::new(WebhookEventType::ScrapeCompleted, json!({}))
            )
            .await
    );

    // Disabled sink ignores everything
    let disabled = RuntimeSettings::default();
    assert!(
        !notifier
            .emit(
                &disabled,
                WebhookEvent::new(WebhookEventType::ScrapeCompleted, json!({}))
            )
            .await
    );

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn cycle_emits_completed_and_deal_events() {
    let ctx = TestContext::new().await;
    ctx.fast_settings().await;

    let sink = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&sink)
        .await;
    ctx.enable_webhook(&format!("{}/hook", sink.uri())).await;

    let store = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products/sv06"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(product_page("Sovol SV06", 29999, None)),
        )
        .mount(&store)
        .await;
    ctx.single_query(&format!("{}/products/sv06", store.uri()), "sovol sv06")
        .await;

    // First cycle: baseline, no deal yet
    ctx.coordinator.run_cycle(CycleOptions::default()).await.unwrap();

    // Second cycle: 50% drop clears the 15% notification threshold
    store.reset().await;
    Mock::given(method("GET"))
        .and(path("/products/sv06"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(product_page("Sovol SV06", 14999, None)),
        )
        .mount(&store)
        .await;
    ctx.coordinator.run_cycle(CycleOptions::default()).await.unwrap();

    let requests = sink.received_requests().await.unwrap();
    let events: Vec<String> = requests
        .iter()
        .map(|r| {
            let body: Value = serde_json::from_slice(&r.body).unwrap();
            body["event"].as_str().unwrap().to_string()
        })
        .collect();

    assert_eq!(
        events,
        vec!["scrape_completed", "scrape_completed", "new_deal_detected"]
    );

    // The deal payload carries thresholds and the capped batch
    let deal_body: Value = serde_json::from_slice(&requests[2].body).unwrap();
    assert_eq!(deal_body["data"]["count"], 1);
    assert_eq!(deal_body["data"]["thresholds"]["min_drop_pct"], 15.0);
    let deal = &deal_body["data"]["deals"][0];
    assert_eq!(deal["current_price"], 149.99);
    assert_eq!(deal["title"], "Sovol SV06");
}
