// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::helpers::TestContext;
use dealrs::domain::models::settings::RuntimeSettings;
use dealrs::domain::repositories::config_repository::ConfigRepository;
use serde_json::json;

#[tokio::test]
async fn seed_defaults_is_idempotent() {
    let ctx = TestContext::new().await;
    ctx.config.seed_defaults().await.unwrap();
    ctx.config.seed_defaults().await.unwrap();

    let settings = ctx.config.get_all_settings().await.unwrap();
    assert!(settings.contains_key("max_pages_per_query"));
    assert!(settings.contains_key("fx_rates_to_usd"));

    let queries = ctx.config.search_queries(true).await.unwrap();
    assert!(!queries.is_empty());

    let keywords = ctx.config.brand_keyword_table().await.unwrap();
    assert!(keywords.iter().any(|(brand, _)| brand == "bambu"));
}

#[tokio::test]
async fn seeding_respects_existing_rows() {
    let ctx = TestContext::new().await;
    ctx.config.set_setting("max_pages_per_query", json!(2)).await.unwrap();
    ctx.config.seed_defaults().await.unwrap();

    // The settings table was non-empty, so defaults stay out
    let map = ctx.config.get_all_settings().await.unwrap();
    assert_eq!(map.len(), 1);
    assert!(!map.contains_key("request_delay_min"));

    // Missing keys fall back to their in-code defaults
    let settings = RuntimeSettings::from_map(&map);
    assert_eq!(settings.max_pages_per_query, 2);
    assert_eq!(settings.inactive_threshold, 3);
}

#[tokio::test]
async fn settings_roundtrip_overwrites() {
    let ctx = TestContext::new().await;
    ctx.config.set_setting("inactive_threshold", json!(3)).await.unwrap();
    ctx.config.set_setting("inactive_threshold", json!(5)).await.unwrap();

    let value = ctx.config.get_setting("inactive_threshold").await.unwrap();
    assert_eq!(value, Some(json!(5)));
    assert_eq!(ctx.config.get_setting("missing_key").await.unwrap(), None);
}

#[tokio::test]
async fn brand_keyword_table_is_ordered_and_grouped() {
    let ctx = TestContext::new().await;
    ctx.config.add_brand_keyword("prusa", "mk4").await.unwrap();
    ctx.config.add_brand_keyword("bambu", "x1c").await.unwrap();
    ctx.config.add_brand_keyword("bambu", "p1s").await.unwrap();
    // Duplicate pair is silently ignored
    ctx.config.add_brand_keyword("bambu", "p1s").await.unwrap();

    let table = ctx.config.brand_keyword_table().await.unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table[0].0, "bambu");
    assert_eq!(table[0].1, vec!["p1s", "x1c"]);
    assert_eq!(table[1].0, "prusa");
}

#[tokio::test]
async fn msrp_upsert_overwrites_price_group() {
    let ctx = TestContext::new().await;
    ctx.config
        .upsert_msrp_entry("bambu", "P1S", 949.0, Some(699.0), None)
        .await
        .unwrap();
    ctx.config
        .upsert_msrp_entry("bambu", "P1S", 899.0, Some(649.0), Some(799.0))
        .await
        .unwrap();

    let entries = ctx.config.msrp_entries().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].msrp_cad, 899.0);
    assert_eq!(entries[0].retail_price, Some(799.0));
    assert!(entries[0].last_updated.is_some());

    let table = ctx.config.msrp_table().await.unwrap();
    assert_eq!(table[0].1[0].0, "P1S");
    assert_eq!(table[0].1[0].1.retail_price, Some(799.0));
}

#[tokio::test]
async fn file_backed_database_persists_across_connections() {
    use dealrs::config::settings::DatabaseSettings;
    use dealrs::infrastructure::database::connection;
    use dealrs::infrastructure::repositories::config_repo_impl::ConfigRepositoryImpl;
    use migration::{Migrator, MigratorTrait};
    use std::sync::Arc;

    let dir = tempfile::tempdir().unwrap();
    let db_settings = DatabaseSettings {
        url: format!("sqlite://{}/dealrs.db?mode=rwc", dir.path().display()),
        max_connections: Some(1),
        min_connections: Some(1),
        connect_timeout: Some(5),
        idle_timeout: Some(60),
    };

    {
        let db = connection::create_pool(&db_settings).await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        let config = ConfigRepositoryImpl::new(Arc::new(db));
        config.seed_defaults().await.unwrap();
    }

    // A fresh connection sees the seeded state on disk
    let db = connection::create_pool(&db_settings).await.unwrap();
    let config = ConfigRepositoryImpl::new(Arc::new(db));
    assert!(!config.search_queries(true).await.unwrap().is_empty());
    let settings = config.get_all_settings().await.unwrap();
    assert!(settings.contains_key("inactive_threshold"));
}

#[tokio::test]
async fn search_query_crud() {
    let ctx = TestContext::new().await;
    let id = ctx
        .config
        .add_search_query("https://www.kijiji.ca/b-canada/voron/k0l0", "voron")
        .await
        .unwrap();

    ctx.config
        .update_search_query(id, None, None, Some(false))
        .await
        .unwrap();
    assert!(ctx.config.search_queries(true).await.unwrap().is_empty());
    assert_eq!(ctx.config.search_queries(false).await.unwrap().len(), 1);

    ctx.config.delete_search_query(id).await.unwrap();
    assert!(ctx.config.search_queries(false).await.unwrap().is_empty());
}
