// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::domain::models::listing::ListingFilter;
use crate::domain::models::run::RunSummary;
use crate::domain::models::settings::RuntimeSettings;
use crate::domain::models::webhook::{WebhookEvent, WebhookEventType};
use crate::domain::repositories::config_repository::ConfigRepository;
use crate::domain::repositories::listing_repository::{ListingRepository, RepositoryError};
use crate::domain::repositories::run_repository::RunRepository;
use crate::domain::services::deals::{qualifying_deals, rank_deals};
use crate::domain::services::detection::BrandDetector;
use crate::domain::services::fx::{to_usd, usd_price_changed};
use crate::domain::services::notifier::WebhookNotifier;
use crate::engines::fetch::{FetchError, PageFetcher};
use crate::extractors::kijiji::KijijiScraper;
use crate::extractors::priceindex::{PriceIndexScraper, DEFAULT_INDEX_URL};
use crate::extractors::shopify::ShopifyScraper;
use crate::utils::urls::is_classifieds_url;
use chrono::Utc;
use serde_json::json;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{error, info, warn};

/// 周期错误类型
#[derive(Error, Debug)]
pub enum CycleError {
    /// 已有周期在运行：忙信号而非失败，触发方立即被拒绝
    #[error("Scrape already in progress")]
    AlreadyRunning,
    /// 持久化失败：周期中止，运行记录保持未完成
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
    /// 抓取失败（仅零售价格指数更新这类单来源操作会上抛）
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),
}

/// 单次周期的调用选项
#[derive(Debug, Clone, Default)]
pub struct CycleOptions {
    /// 覆盖每查询页数预算
    pub max_pages: Option<u32>,
    /// 只运行指定标签的查询
    pub query_filter: Option<String>,
    /// 只运行指定ID的查询
    pub query_id: Option<i32>,
}

/// 执行一个完整的抓取周期
///
/// 每来源的错误计数后继续；仓库错误中止周期（此时运行记录
/// 留在未完成状态，由运行日志可见）。生命周期事件在周期末尾
/// 发出，投递失败只记日志
pub(crate) async fn run_cycle(
    listings_repo: &dyn ListingRepository,
    runs_repo: &dyn RunRepository,
    config_repo: &dyn ConfigRepository,
    notifier: &WebhookNotifier,
    options: &CycleOptions,
) -> Result<RunSummary, CycleError> {
    // Settings and detection tables load once per cycle so the cycle's
    // decisions stay consistent even if config changes mid-flight
    let settings = RuntimeSettings::from_map(&config_repo.get_all_settings().await?);

    match run_cycle_inner(listings_repo, runs_repo, config_repo, notifier, options, &settings).await
    {
        Ok(summary) => Ok(summary),
        Err(e) => {
            error!("Scrape failed: {}", e);
            notifier
                .emit(
                    &settings,
                    WebhookEvent::new(
                        WebhookEventType::ScrapeFailed,
                        json!({
                            "error": e.to_string(),
                            "finished_at": Utc::now().to_rfc3339(),
                        }),
                    ),
                )
                .await;
            Err(e)
        }
    }
}

async fn run_cycle_inner(
    listings_repo: &dyn ListingRepository,
    runs_repo: &dyn RunRepository,
    config_repo: &dyn ConfigRepository,
    notifier: &WebhookNotifier,
    options: &CycleOptions,
    settings: &RuntimeSettings,
) -> Result<RunSummary, CycleError> {
    let max_pages = options.max_pages.unwrap_or(settings.max_pages_per_query);
    let detector = BrandDetector::load(config_repo).await?;
    let fetcher = PageFetcher::new(settings.request_delay_min, settings.request_delay_max);

    let mut queries = config_repo.search_queries(true).await?;
    if let Some(filter) = &options.query_filter {
        queries.retain(|q| &q.label == filter);
    }
    if let Some(query_id) = options.query_id {
        queries.retain(|q| q.id == query_id);
    }

    let labels: Vec<&str> = queries.iter().map(|q| q.label.as_str()).collect();
    let cycle_started = Utc::now();
    let run_id = runs_repo.start_run(&labels.join(", "), cycle_started).await?;

    let mut total_found: i32 = 0;
    let mut total_new: i32 = 0;
    let mut total_price_changes: i32 = 0;
    let mut total_errors: i32 = 0;
    let mut all_seen_ids: HashSet<String> = HashSet::new();

    for query in &queries {
        info!("Searching: {} ...", query.label);

        let listings = if is_classifieds_url(&query.url) {
            // The classifieds scraper absorbs page-level failures itself
            // and returns whatever it gathered
            Ok(KijijiScraper::new(&fetcher, max_pages)
                .scrape_search(&query.url, Some(max_pages))
                .await)
        } else {
            ShopifyScraper::new(&fetcher).scrape_url(&query.url).await
        };

        let listings = match listings {
            Ok(listings) => listings,
            Err(e) => {
                error!("Error scraping {} ({}): {}", query.label, query.url, e);
                total_errors += 1;
                continue;
            }
        };

        info!("  Found {} listings", listings.len());
        total_found += listings.len() as i32;

        for listing in listings {
            all_seen_ids.insert(listing.listing_id.clone());

            let description = listing.description.clone().unwrap_or_default();
            let enrichment = detector.enrich(&listing.title, &description);

            let existing = listings_repo.find_by_id(&listing.listing_id).await?;
            if let Some(existing) = existing {
                if usd_price_changed(
                    existing.current_price,
                    &existing.currency,
                    listing.price,
                    &listing.currency,
                    &settings.fx_rates_to_usd,
                ) {
                    total_price_changes += 1;
                    let old_usd =
                        to_usd(existing.current_price, &existing.currency, &settings.fx_rates_to_usd);
                    let new_usd = to_usd(listing.price, &listing.currency, &settings.fx_rates_to_usd);
                    if let (Some(old_usd), Some(new_usd)) = (old_usd, new_usd) {
                        let direction = if new_usd < old_usd { "down" } else { "up" };
                        let short_title: String = listing.title.chars().take(50).collect();
                        info!(
                            "  USD price {}: {} ${:.2} -> ${:.2}",
                            direction, short_title, old_usd, new_usd
                        );
                    }
                }
            }

            if listings_repo.upsert(&listing, &enrichment, cycle_started).await? {
                total_new += 1;
            }

            // Snapshot goes in even with a null price, for presence tracking;
            // the cycle timestamp keeps one row per listing per cycle
            listings_repo
                .add_price_snapshot(&listing.listing_id, listing.price, cycle_started)
                .await?;
        }
    }

    listings_repo
        .increment_missed_runs(&all_seen_ids, settings.inactive_threshold)
        .await?;
    runs_repo
        .finish_run(run_id, total_found, total_new, total_price_changes, total_errors)
        .await?;

    let active = listings_repo.get_listings(&ListingFilter::default()).await?;
    let ranked = rank_deals(&active, &detector);
    let qualifying = qualifying_deals(
        &ranked,
        settings.deal_max_retail_ratio,
        settings.deal_min_drop_pct,
        settings.deal_batch_size,
    );

    let summary = RunSummary {
        found: total_found,
        new: total_new,
        price_changes: total_price_changes,
        errors: total_errors,
        finished_at: Utc::now(),
    };

    notifier
        .emit(
            settings,
            WebhookEvent::new(
                WebhookEventType::ScrapeCompleted,
                serde_json::to_value(&summary).unwrap_or_default(),
            ),
        )
        .await;

    if total_errors > 0 {
        notifier
            .emit(
                settings,
                WebhookEvent::new(
                    WebhookEventType::ScrapeFailed,
                    json!({
                        "error": format!("{} query errors during scrape run", total_errors),
                        "found": summary.found,
                        "new": summary.new,
                        "price_changes": summary.price_changes,
                        "errors": summary.errors,
                        "finished_at": summary.finished_at.to_rfc3339(),
                    }),
                ),
            )
            .await;
    }

    if !qualifying.is_empty() {
        let deals: Vec<serde_json::Value> = qualifying
            .iter()
            .map(|deal| {
                json!({
                    "listing_id": deal.listing_id,
                    "title": deal.title,
                    "url": deal.url,
                    "source": deal.source,
                    "currency": deal.currency,
                    "current_price": round2(deal.current_price),
                    "price_drop_pct": round2(deal.price_drop_pct),
                    "price_to_retail_ratio": deal.price_to_retail_ratio.map(round4),
                })
            })
            .collect();

        notifier
            .emit(
                settings,
                WebhookEvent::new(
                    WebhookEventType::NewDealDetected,
                    json!({
                        "count": qualifying.len(),
                        "deals": deals,
                        "thresholds": {
                            "max_price_to_retail_ratio": settings.deal_max_retail_ratio,
                            "min_drop_pct": settings.deal_min_drop_pct,
                        },
                        "finished_at": summary.finished_at.to_rfc3339(),
                    }),
                ),
            )
            .await;
    }

    info!(
        "Scrape done: found={} new={} price_changes={} errors={}",
        summary.found, summary.new, summary.price_changes, summary.errors
    );
    Ok(summary)
}

/// 从零售价格指数页更新MSRP表
///
/// 指数页以美元报价；msrp_cad沿用指数值，当前促销价写入
/// retail_price作为第二交易基线
pub async fn update_retail_prices(
    config_repo: &dyn ConfigRepository,
    index_url: Option<&str>,
) -> Result<usize, CycleError> {
    let fetcher = PageFetcher::new(1.0, 2.0);
    let scraper = PriceIndexScraper::new(&fetcher);
    let entries = scraper
        .scrape_index(index_url.unwrap_or(DEFAULT_INDEX_URL))
        .await?;

    if entries.is_empty() {
        warn!("No prices retrieved from the retail price index");
        return Ok(0);
    }

    let mut updated = 0;
    for entry in &entries {
        config_repo
            .upsert_msrp_entry(
                &entry.brand,
                &entry.model,
                entry.msrp,
                None,
                Some(entry.retail_price),
            )
            .await?;
        updated += 1;
    }

    info!("Updated {} retail prices from the price index", updated);
    Ok(updated)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
