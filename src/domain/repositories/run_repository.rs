// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::run::{ScrapeRun, TrackerStats};
use crate::domain::repositories::listing_repository::RepositoryError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// 抓取运行仓库特质
#[async_trait]
pub trait RunRepository: Send + Sync {
    /// 打开一条运行记录，返回运行ID
    async fn start_run(&self, search_query: &str, started_at: DateTime<Utc>)
        -> Result<i32, RepositoryError>;

    /// 以聚合计数关闭运行记录
    async fn finish_run(
        &self,
        run_id: i32,
        listings_found: i32,
        new_listings: i32,
        price_changes: i32,
        errors: i32,
    ) -> Result<(), RepositoryError>;

    /// 最近一次运行
    async fn latest_run(&self) -> Result<Option<ScrapeRun>, RepositoryError>;

    /// 运行总数（用于首启时判断是否触发一次初始抓取）
    async fn run_count(&self) -> Result<u64, RepositoryError>;

    /// 数据库聚合统计
    async fn stats(&self) -> Result<TrackerStats, RepositoryError>;
}
