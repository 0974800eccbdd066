// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::listing::{Listing, ListingFilter, PriceSnapshot, ScrapedListing};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::DbErr;
use std::collections::HashSet;
use thiserror::Error;

/// 仓库错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    /// 记录未找到
    #[error("Record not found")]
    NotFound,
}

/// 归一化阶段附加到抓取记录上的检测结果
#[derive(Debug, Clone, Default)]
pub struct ListingEnrichment {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub msrp: Option<f64>,
}

/// 列表仓库特质
///
/// 定义列表与价格快照的数据访问接口
#[async_trait]
pub trait ListingRepository: Send + Sync {
    /// 插入或更新列表，返回是否为新记录
    ///
    /// 新记录以当前价格作为original_price种子；已有记录仅更新
    /// 非空字段（COALESCE语义），抓取缺失的字段保留库中旧值
    async fn upsert(
        &self,
        scraped: &ScrapedListing,
        enrichment: &ListingEnrichment,
        seen_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;

    /// 根据稳定ID查找列表
    async fn find_by_id(&self, listing_id: &str) -> Result<Option<Listing>, RepositoryError>;

    /// 按过滤和排序条件查询列表
    async fn get_listings(&self, filter: &ListingFilter) -> Result<Vec<Listing>, RepositoryError>;

    /// 追加价格快照；(listing_id, scraped_at)冲突时静默忽略
    async fn add_price_snapshot(
        &self,
        listing_id: &str,
        price: Option<f64>,
        scraped_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// 按时间顺序返回价格历史
    async fn price_history(&self, listing_id: &str) -> Result<Vec<PriceSnapshot>, RepositoryError>;

    /// 失踪计数：本周期未出现的活跃列表missed_runs加1，
    /// 达到阈值的翻转为不活跃
    async fn increment_missed_runs(
        &self,
        seen_ids: &HashSet<String>,
        inactive_threshold: i32,
    ) -> Result<(), RepositoryError>;

    /// 设置隐藏标记
    async fn set_hidden(&self, listing_id: &str, hidden: bool) -> Result<(), RepositoryError>;
}
