// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use dealrs::domain::models::listing::ScrapedListing;
use dealrs::domain::repositories::config_repository::ConfigRepository;
use dealrs::domain::services::notifier::WebhookNotifier;
use dealrs::infrastructure::repositories::config_repo_impl::ConfigRepositoryImpl;
use dealrs::infrastructure::repositories::listing_repo_impl::ListingRepositoryImpl;
use dealrs::infrastructure::repositories::run_repo_impl::RunRepositoryImpl;
use dealrs::workers::coordinator::ScrapeCoordinator;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde_json::{json, Value};
use std::sync::Arc;

/// In-memory SQLite with the full migration set applied. A single
/// connection keeps every handle on the same memory database.
pub async fn test_db() -> Arc<DatabaseConnection> {
    let mut opt = ConnectOptions::new("sqlite::memory:".to_string());
    opt.max_connections(1).min_connections(1);
    let db = Database::connect(opt).await.expect("connect in-memory sqlite");
    Migrator::up(&db, None).await.expect("apply migrations");
    Arc::new(db)
}

/// Repositories plus a coordinator wired against one test database.
pub struct TestContext {
    pub db: Arc<DatabaseConnection>,
    pub listings: Arc<ListingRepositoryImpl>,
    pub runs: Arc<RunRepositoryImpl>,
    pub config: Arc<ConfigRepositoryImpl>,
    pub coordinator: Arc<ScrapeCoordinator>,
}

impl TestContext {
    pub async fn new() -> Self {
        let db = test_db().await;
        let listings = Arc::new(ListingRepositoryImpl::new(db.clone()));
        let runs = Arc::new(RunRepositoryImpl::new(db.clone()));
        let config = Arc::new(ConfigRepositoryImpl::new(db.clone()));
        let notifier = Arc::new(WebhookNotifier::new("test-secret".to_string()));
        let coordinator = Arc::new(ScrapeCoordinator::new(
            listings.clone(),
            runs.clone(),
            config.clone(),
            notifier,
        ));
        Self {
            db,
            listings,
            runs,
            config,
            coordinator,
        }
    }

    /// Zero scrape delays so cycles run instantly under test.
    pub async fn fast_settings(&self) {
        self.config
            .set_setting("request_delay_min", json!(0.0))
            .await
            .unwrap();
        self.config
            .set_setting("request_delay_max", json!(0.0))
            .await
            .unwrap();
    }

    /// Point the cycle at a single query and nothing else.
    pub async fn single_query(&self, url: &str, label: &str) -> i32 {
        for query in self.config.search_queries(false).await.unwrap() {
            self.config.delete_search_query(query.id).await.unwrap();
        }
        self.config.add_search_query(url, label).await.unwrap()
    }

    pub async fn enable_webhook(&self, url: &str) {
        self.config
            .set_setting("webhook_enabled", json!(true))
            .await
            .unwrap();
        self.config
            .set_setting("webhook_url", json!(url))
            .await
            .unwrap();
    }
}

/// Minimal scraped listing for repository-level tests.
pub fn scraped(id: &str, title: &str, price: Option<f64>) -> ScrapedListing {
    let mut listing = ScrapedListing::new(
        id.to_string(),
        format!("https://www.kijiji.ca/v-vip/{}", id),
        title.to_string(),
    );
    listing.price = price;
    listing
}

/// A search page carrying listings in the embedded page-state JSON.
pub fn next_data_page(listings: &[Value], current_page: i64, total_pages: i64) -> String {
    let payload = json!({
        "props": {
            "pageProps": {
                "listings": listings,
                "pagination": {"currentPage": current_page, "totalPages": total_pages}
            }
        }
    });
    format!(
        r#"<html><body><script id="__NEXT_DATA__" type="application/json">{payload}</script></body></html>"#
    )
}

pub fn json_listing(id: u64, title: &str, price: f64) -> Value {
    json!({
        "id": id,
        "title": title,
        "seoUrl": format!("/v-vip/{}", id),
        "price": {"amount": price},
        "location": {"city": "Toronto", "province": "ON"}
    })
}

/// A storefront product page with a variant price in minor units.
pub fn product_page(title: &str, price_cents: u64, compare_cents: Option<u64>) -> String {
    let compare = compare_cents
        .map(|c| format!(r#", "compare_at_price": "{}""#, c))
        .unwrap_or_default();
    format!(
        r#"<html><body>
        <script type="application/ld+json">{{"@type": "Product", "name": "{title}"}}</script>
        <script type="application/json">
        {{"product": {{"variants": [{{"price": "{price_cents}"{compare}, "currency": "USD"}}]}}}}
        </script>
        </body></html>"#
    )
}
