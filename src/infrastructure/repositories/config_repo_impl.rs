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

use crate::config::defaults;
use crate::domain::models::tables::{BrandKeyword, MsrpEntry, MsrpPrices, SearchQuery};
use crate::domain::repositories::config_repository::{
    BrandKeywordTable, ConfigRepository, MsrpTable,
};
use crate::domain::repositories::listing_repository::RepositoryError;
use crate::infrastructure::database::entities::{brand_keyword, msrp_entry, search_query, setting};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// 配置仓库实现
#[derive(Clone)]
pub struct ConfigRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl ConfigRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<search_query::Model> for SearchQuery {
    fn from(model: search_query::Model) -> Self {
        Self {
            id: model.id,
            url: model.url,
            label: model.label,
            enabled: model.enabled,
        }
    }
}

impl From<brand_keyword::Model> for BrandKeyword {
    fn from(model: brand_keyword::Model) -> Self {
        Self {
            id: model.id,
            brand: model.brand,
            keyword: model.keyword,
        }
    }
}

impl From<msrp_entry::Model> for MsrpEntry {
    fn from(model: msrp_entry::Model) -> Self {
        Self {
            id: model.id,
            brand: model.brand,
            model: model.model,
            msrp_cad: model.msrp_cad,
            msrp_usd: model.msrp_usd,
            retail_price: model.retail_price,
            last_updated: model.last_updated,
        }
    }
}

#[async_trait]
impl ConfigRepository for ConfigRepositoryImpl {
    async fn get_all_settings(&self) -> Result<HashMap<String, Value>, RepositoryError> {
        let rows = setting::Entity::find().all(self.db.as_ref()).await?;
        Ok(rows.into_iter().map(|r| (r.key, r.value)).collect())
    }

    async fn get_setting(&self, key: &str) -> Result<Option<Value>, RepositoryError> {
        let row = setting::Entity::find_by_id(key).one(self.db.as_ref()).await?;
        Ok(row.map(|r| r.value))
    }

    async fn set_setting(&self, key: &str, value: Value) -> Result<(), RepositoryError> {
        let model = setting::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value),
        };
        setting::Entity::insert(model)
            .on_conflict(
                OnConflict::column(setting::Column::Key)
                    .update_column(setting::Column::Value)
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await?;
        Ok(())
    }

    async fn seed_defaults(&self) -> Result<(), RepositoryError> {
        if setting::Entity::find().count(self.db.as_ref()).await? == 0 {
            let models: Vec<setting::ActiveModel> = defaults::default_settings()
                .into_iter()
                .map(|(key, value)| setting::ActiveModel {
                    key: Set(key.to_string()),
                    value: Set(value),
                })
                .collect();
            setting::Entity::insert_many(models)
                .exec_without_returning(self.db.as_ref())
                .await?;
        }

        if search_query::Entity::find().count(self.db.as_ref()).await? == 0 {
            let models: Vec<search_query::ActiveModel> = defaults::default_search_queries()
                .into_iter()
                .map(|(url, label)| search_query::ActiveModel {
                    url: Set(url.to_string()),
                    label: Set(label.to_string()),
                    enabled: Set(true),
                    ..Default::default()
                })
                .collect();
            search_query::Entity::insert_many(models)
                .exec_without_returning(self.db.as_ref())
                .await?;
        }

        if brand_keyword::Entity::find().count(self.db.as_ref()).await? == 0 {
            let mut models = Vec::new();
            for (brand, keywords) in defaults::default_brand_keywords() {
                for keyword in keywords {
                    models.push(brand_keyword::ActiveModel {
                        brand: Set(brand.to_string()),
                        keyword: Set(keyword.to_string()),
                        ..Default::default()
                    });
                }
            }
            brand_keyword::Entity::insert_many(models)
                .exec_without_returning(self.db.as_ref())
                .await?;
        }

        Ok(())
    }

    async fn search_queries(&self, enabled_only: bool) -> Result<Vec<SearchQuery>, RepositoryError> {
        let mut query = search_query::Entity::find().order_by_asc(search_query::Column::Id);
        if enabled_only {
            query = query.filter(search_query::Column::Enabled.eq(true));
        }
        let rows = query.all(self.db.as_ref()).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn add_search_query(&self, url: &str, label: &str) -> Result<i32, RepositoryError> {
        let model = search_query::ActiveModel {
            url: Set(url.to_string()),
            label: Set(label.to_string()),
            enabled: Set(true),
            ..Default::default()
        };
        let inserted = model.insert(self.db.as_ref()).await?;
        Ok(inserted.id)
    }

    async fn update_search_query(
        &self,
        query_id: i32,
        url: Option<&str>,
        label: Option<&str>,
        enabled: Option<bool>,
    ) -> Result<(), RepositoryError> {
        let existing = search_query::Entity::find_by_id(query_id)
            .one(self.db.as_ref())
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let mut model: search_query::ActiveModel = existing.into();
        if let Some(url) = url {
            model.url = Set(url.to_string());
        }
        if let Some(label) = label {
            model.label = Set(label.to_string());
        }
        if let Some(enabled) = enabled {
            model.enabled = Set(enabled);
        }
        model.update(self.db.as_ref()).await?;
        Ok(())
    }

    async fn delete_search_query(&self, query_id: i32) -> Result<(), RepositoryError> {
        search_query::Entity::delete_by_id(query_id)
            .exec(self.db.as_ref())
            .await?;
        Ok(())
    }

    async fn brand_keywords(&self) -> Result<Vec<BrandKeyword>, RepositoryError> {
        let rows = brand_keyword::Entity::find()
            .order_by_asc(brand_keyword::Column::Brand)
            .order_by_asc(brand_keyword::Column::Keyword)
            .all(self.db.as_ref())
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn brand_keyword_table(&self) -> Result<BrandKeywordTable, RepositoryError> {
        let rows = self.brand_keywords().await?;
        let mut table: BrandKeywordTable = Vec::new();
        for row in rows {
            match table.last_mut() {
                Some((brand, keywords)) if *brand == row.brand => keywords.push(row.keyword),
                _ => table.push((row.brand, vec![row.keyword])),
            }
        }
        Ok(table)
    }

    async fn add_brand_keyword(&self, brand: &str, keyword: &str) -> Result<(), RepositoryError> {
        let model = brand_keyword::ActiveModel {
            brand: Set(brand.to_lowercase()),
            keyword: Set(keyword.to_lowercase()),
            ..Default::default()
        };
        brand_keyword::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([brand_keyword::Column::Brand, brand_keyword::Column::Keyword])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await?;
        Ok(())
    }

    async fn delete_brand_keyword(&self, keyword_id: i32) -> Result<(), RepositoryError> {
        brand_keyword::Entity::delete_by_id(keyword_id)
            .exec(self.db.as_ref())
            .await?;
        Ok(())
    }

    async fn msrp_entries(&self) -> Result<Vec<MsrpEntry>, RepositoryError> {
        let rows = msrp_entry::Entity::find()
            .order_by_asc(msrp_entry::Column::Brand)
            .order_by_asc(msrp_entry::Column::Model)
            .all(self.db.as_ref())
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn msrp_table(&self) -> Result<MsrpTable, RepositoryError> {
        let rows = self.msrp_entries().await?;
        let mut table: MsrpTable = Vec::new();
        for row in rows {
            let prices = MsrpPrices {
                msrp_cad: row.msrp_cad,
                msrp_usd: row.msrp_usd,
                retail_price: row.retail_price,
            };
            match table.last_mut() {
                Some((brand, models)) if *brand == row.brand => models.push((row.model, prices)),
                _ => table.push((row.brand, vec![(row.model, prices)])),
            }
        }
        Ok(table)
    }

    async fn upsert_msrp_entry(
        &self,
        brand: &str,
        model: &str,
        msrp_cad: f64,
        msrp_usd: Option<f64>,
        retail_price: Option<f64>,
    ) -> Result<(), RepositoryError> {
        let active = msrp_entry::ActiveModel {
            brand: Set(brand.to_lowercase()),
            model: Set(model.to_string()),
            msrp_cad: Set(msrp_cad),
            msrp_usd: Set(msrp_usd),
            retail_price: Set(retail_price),
            last_updated: Set(Some(Utc::now())),
            ..Default::default()
        };
        msrp_entry::Entity::insert(active)
            .on_conflict(
                OnConflict::columns([msrp_entry::Column::Brand, msrp_entry::Column::Model])
                    .update_columns([
                        msrp_entry::Column::MsrpCad,
                        msrp_entry::Column::MsrpUsd,
                        msrp_entry::Column::RetailPrice,
                        msrp_entry::Column::LastUpdated,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await?;
        Ok(())
    }

    async fn delete_msrp_entry(&self, entry_id: i32) -> Result<(), RepositoryError> {
        msrp_entry::Entity::delete_by_id(entry_id)
            .exec(self.db.as_ref())
            .await?;
        Ok(())
    }
}
