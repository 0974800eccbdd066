// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 单次抓取产生的原始列表记录
///
/// 生命周期仅限一次提取调用，随即被归一化与持久化消费
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapedListing {
    /// 稳定的来源ID（原生数字ID或URL哈希派生）
    pub listing_id: String,
    /// 规范URL
    pub url: String,
    /// 标题
    pub title: String,
    /// 当前价格，提取失败时为None
    pub price: Option<f64>,
    /// 货币代码
    pub currency: String,
    /// 折扣前名义价格
    pub nominal_price: Option<f64>,
    /// 是否在促销
    pub on_sale: bool,
    /// 描述
    pub description: Option<String>,
    /// 卖家名称
    pub seller_name: Option<String>,
    /// 地点
    pub location: Option<String>,
    /// 发布日期（来源原始字符串）
    pub listing_date: Option<String>,
    /// 图片URL，保持来源顺序
    pub image_urls: Vec<String>,
    /// 来源标签（kijiji、sovol、formbot...）
    pub source: String,
}

impl ScrapedListing {
    /// 创建只含必备字段的记录，其余字段由提取器按需补充
    pub fn new(listing_id: impl Into<String>, url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            listing_id: listing_id.into(),
            url: url.into(),
            title: title.into(),
            price: None,
            currency: "CAD".to_string(),
            nominal_price: None,
            on_sale: false,
            description: None,
            seller_name: None,
            location: None,
            listing_date: None,
            image_urls: Vec::new(),
            source: "kijiji".to_string(),
        }
    }
}

/// 详情页提取的补充字段
#[derive(Debug, Clone, Default)]
pub struct ListingDetail {
    pub description: Option<String>,
    pub seller_name: Option<String>,
    pub listing_date: Option<String>,
    pub image_urls: Vec<String>,
}

impl ListingDetail {
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.seller_name.is_none()
            && self.listing_date.is_none()
            && self.image_urls.is_empty()
    }
}

/// 持久化的列表实体，以listing_id为键
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub listing_id: String,
    pub source: String,
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub seller_name: Option<String>,
    pub location: Option<String>,
    pub image_urls: Vec<String>,
    pub listing_date: Option<String>,
    pub currency: String,
    /// 最近一次成功提取的价格；抓取失败不会清空
    pub current_price: Option<f64>,
    /// 首次发现时的价格，之后永不改写，作为降价基线
    pub original_price: Option<f64>,
    pub nominal_price: Option<f64>,
    pub on_sale: bool,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub msrp: Option<f64>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub is_active: bool,
    pub is_hidden: bool,
    /// 连续未出现在抓取结果中的周期数
    pub missed_runs: i32,
}

/// 列表查询过滤条件
#[derive(Debug, Clone)]
pub struct ListingFilter {
    pub active_only: bool,
    pub show_hidden: bool,
    pub brand: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub location: Option<String>,
    pub search: Option<String>,
    pub sort_by: ListingSort,
}

impl Default for ListingFilter {
    fn default() -> Self {
        Self {
            active_only: true,
            show_hidden: false,
            brand: None,
            min_price: None,
            max_price: None,
            location: None,
            search: None,
            sort_by: ListingSort::LastSeen,
        }
    }
}

/// 列表排序方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingSort {
    PriceAsc,
    PriceDesc,
    Newest,
    Oldest,
    LastSeen,
    PriceDrop,
}

/// 价格快照（只追加的时间序列）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub listing_id: String,
    pub price: Option<f64>,
    pub scraped_at: DateTime<Utc>,
}
