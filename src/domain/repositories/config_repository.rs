// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::tables::{BrandKeyword, MsrpEntry, MsrpPrices, SearchQuery};
use crate::domain::repositories::listing_repository::RepositoryError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// 有序品牌关键词表：(品牌, 关键词列表)，顺序即检测优先级
pub type BrandKeywordTable = Vec<(String, Vec<String>)>;

/// 有序MSRP表：(品牌, (型号, 价格组)列表)
pub type MsrpTable = Vec<(String, Vec<(String, MsrpPrices)>)>;

/// 配置仓库特质
///
/// 覆盖settings键值表与三张查找表（搜索查询、品牌关键词、MSRP）。
/// 所有内容运行期可变，抓取周期每次重新读取而非长期缓存
#[async_trait]
pub trait ConfigRepository: Send + Sync {
    /// 读取全部settings键值（值为JSON）
    async fn get_all_settings(&self) -> Result<HashMap<String, Value>, RepositoryError>;

    /// 读取单个setting
    async fn get_setting(&self, key: &str) -> Result<Option<Value>, RepositoryError>;

    /// 写入单个setting
    async fn set_setting(&self, key: &str, value: Value) -> Result<(), RepositoryError>;

    /// 首次启动时种入默认settings、搜索查询和品牌关键词
    ///
    /// 仅当对应表为空时写入，重复调用无副作用
    async fn seed_defaults(&self) -> Result<(), RepositoryError>;

    /// 搜索查询列表，按ID排序
    async fn search_queries(&self, enabled_only: bool) -> Result<Vec<SearchQuery>, RepositoryError>;

    /// 新增搜索查询，返回ID
    async fn add_search_query(&self, url: &str, label: &str) -> Result<i32, RepositoryError>;

    /// 更新搜索查询，None字段保持不变
    async fn update_search_query(
        &self,
        query_id: i32,
        url: Option<&str>,
        label: Option<&str>,
        enabled: Option<bool>,
    ) -> Result<(), RepositoryError>;

    /// 删除搜索查询
    async fn delete_search_query(&self, query_id: i32) -> Result<(), RepositoryError>;

    /// 品牌关键词行，按(brand, keyword)排序
    async fn brand_keywords(&self) -> Result<Vec<BrandKeyword>, RepositoryError>;

    /// 以检测顺序组织的品牌关键词表
    async fn brand_keyword_table(&self) -> Result<BrandKeywordTable, RepositoryError>;

    /// 新增品牌关键词（已存在时忽略）
    async fn add_brand_keyword(&self, brand: &str, keyword: &str) -> Result<(), RepositoryError>;

    /// 删除品牌关键词
    async fn delete_brand_keyword(&self, keyword_id: i32) -> Result<(), RepositoryError>;

    /// MSRP行，按(brand, model)排序
    async fn msrp_entries(&self) -> Result<Vec<MsrpEntry>, RepositoryError>;

    /// 以检测顺序组织的MSRP查找表
    async fn msrp_table(&self) -> Result<MsrpTable, RepositoryError>;

    /// 插入或更新MSRP行（brand+model冲突时整组价格覆盖）
    async fn upsert_msrp_entry(
        &self,
        brand: &str,
        model: &str,
        msrp_cad: f64,
        msrp_usd: Option<f64>,
        retail_price: Option<f64>,
    ) -> Result<(), RepositoryError>;

    /// 删除MSRP行
    async fn delete_msrp_entry(&self, entry_id: i32) -> Result<(), RepositoryError>;
}
