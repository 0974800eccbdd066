// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 一次抓取周期的审计记录
///
/// finished_at写入后即为终态
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeRun {
    pub id: i32,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub listings_found: i32,
    pub new_listings: i32,
    pub price_changes: i32,
    pub errors: i32,
    pub search_query: Option<String>,
}

/// 抓取周期的汇总结果，返回给调用方并作为webhook负载
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub found: i32,
    pub new: i32,
    pub price_changes: i32,
    pub errors: i32,
    pub finished_at: DateTime<Utc>,
}

/// 数据库聚合统计
#[derive(Debug, Clone, Serialize)]
pub struct TrackerStats {
    pub total_listings: u64,
    pub active_listings: u64,
    pub total_snapshots: u64,
    pub total_scrape_runs: u64,
    pub listings_with_drops: u64,
    pub last_run: Option<ScrapeRun>,
}
