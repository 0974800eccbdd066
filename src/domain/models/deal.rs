// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::Serialize;

/// 基于活跃列表计算出的交易视图
///
/// 从不持久化，每次请求重新计算
#[derive(Debug, Clone, Serialize)]
pub struct Deal {
    pub listing_id: String,
    pub title: String,
    pub url: String,
    pub source: String,
    pub currency: String,
    pub current_price: f64,
    pub original_price: f64,
    /// 相对首见价格的绝对降幅，不为负
    pub price_drop_abs: f64,
    pub price_drop_pct: f64,
    /// 上架天数，解析失败时为0
    pub days_on_market: i64,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub msrp: Option<f64>,
    pub retail_price: Option<f64>,
    pub price_to_msrp_ratio: Option<f64>,
    pub price_to_retail_ratio: Option<f64>,
    /// 相对零售价的节省额，仅在为正时出现
    pub vs_retail_savings: Option<f64>,
    pub location: Option<String>,
    pub image_url: Option<String>,
    /// 综合排名得分，越高越好
    pub score: f64,
}
