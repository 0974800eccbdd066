// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 品牌关键词行（brand, keyword组合唯一）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandKeyword {
    pub id: i32,
    pub brand: String,
    pub keyword: String,
}

/// MSRP行：品牌+型号到指导价/零售价的映射
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MsrpEntry {
    pub id: i32,
    pub brand: String,
    pub model: String,
    pub msrp_cad: f64,
    pub msrp_usd: Option<f64>,
    pub retail_price: Option<f64>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// MSRP价格组，用于查找表
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MsrpPrices {
    pub msrp_cad: f64,
    pub msrp_usd: Option<f64>,
    pub retail_price: Option<f64>,
}

/// 启用的搜索目标
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub id: i32,
    pub url: String,
    pub label: String,
    pub enabled: bool,
}
