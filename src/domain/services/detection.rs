// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::repositories::config_repository::{
    BrandKeywordTable, ConfigRepository, MsrpTable,
};
use crate::domain::repositories::listing_repository::{ListingEnrichment, RepositoryError};

/// 品牌/型号检测器
///
/// 持有一个抓取周期内的关键词表和MSRP表快照（周期开始时加载一次，
/// 而非每条记录查询），保证周期内检测结果一致。
///
/// 检测策略为表序首个子串命中：当多个品牌共享子串时
/// （如"ender 5"同时包含"ender"关键词和其他品牌的关键词），
/// 由表的排序决定胜者，不做最长匹配
pub struct BrandDetector {
    brand_keywords: BrandKeywordTable,
    msrp_table: MsrpTable,
}

impl BrandDetector {
    pub fn new(brand_keywords: BrandKeywordTable, msrp_table: MsrpTable) -> Self {
        Self {
            brand_keywords,
            msrp_table,
        }
    }

    /// 从配置仓库加载一次周期快照
    pub async fn load(config: &dyn ConfigRepository) -> Result<Self, RepositoryError> {
        Ok(Self::new(
            config.brand_keyword_table().await?,
            config.msrp_table().await?,
        ))
    }

    /// 从标题与描述检测品牌
    pub fn detect_brand(&self, title: &str, description: &str) -> Option<String> {
        let combined = format!("{} {}", title, description).to_lowercase();
        for (brand, keywords) in &self.brand_keywords {
            if keywords.iter().any(|kw| combined.contains(kw.as_str())) {
                return Some(brand.clone());
            }
        }
        None
    }

    /// 从标题与描述检测具体型号
    ///
    /// 品牌已知时只在该品牌的型号表内搜索，否则扫描全部品牌
    pub fn detect_model(&self, title: &str, description: &str, brand: Option<&str>) -> Option<String> {
        let combined = format!("{} {}", title, description).to_lowercase();

        let brand_entry =
            brand.and_then(|b| self.msrp_table.iter().find(|(name, _)| name.as_str() == b));
        match brand_entry {
            Some((_, models)) => models
                .iter()
                .find(|(model, _)| combined.contains(&model.to_lowercase()))
                .map(|(model, _)| model.clone()),
            None => self
                .msrp_table
                .iter()
                .flat_map(|(_, models)| models.iter())
                .find(|(model, _)| combined.contains(&model.to_lowercase()))
                .map(|(model, _)| model.clone()),
        }
    }

    /// 查找品牌/型号组合的MSRP（加元）
    pub fn lookup_msrp(&self, brand: Option<&str>, model: Option<&str>) -> Option<f64> {
        let (brand, model) = (brand?, model?);
        self.msrp_table
            .iter()
            .find(|(name, _)| name.as_str() == brand)?
            .1
            .iter()
            .find(|(name, _)| name.as_str() == model)
            .map(|(_, prices)| prices.msrp_cad)
    }

    /// 查找品牌/型号组合的当前零售价
    pub fn lookup_retail_price(&self, brand: Option<&str>, model: Option<&str>) -> Option<f64> {
        let (brand, model) = (brand?, model?);
        self.msrp_table
            .iter()
            .find(|(name, _)| name.as_str() == brand)?
            .1
            .iter()
            .find(|(name, _)| name.as_str() == model)
            .and_then(|(_, prices)| prices.retail_price)
    }

    /// 一次完成品牌、型号与MSRP的归一化检测
    pub fn enrich(&self, title: &str, description: &str) -> ListingEnrichment {
        let brand = self.detect_brand(title, description);
        let model = self.detect_model(title, description, brand.as_deref());
        let msrp = self.lookup_msrp(brand.as_deref(), model.as_deref());
        ListingEnrichment { brand, model, msrp }
    }
}
