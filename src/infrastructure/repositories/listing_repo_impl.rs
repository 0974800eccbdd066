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

use crate::domain::models::listing::{
    Listing, ListingFilter, ListingSort, PriceSnapshot, ScrapedListing,
};
use crate::domain::repositories::listing_repository::{
    ListingEnrichment, ListingRepository, RepositoryError,
};
use crate::infrastructure::database::entities::{listing, price_snapshot};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use std::collections::HashSet;
use std::sync::Arc;

/// 列表仓库实现
///
/// 基于SeaORM实现的列表数据访问层
#[derive(Clone)]
pub struct ListingRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl ListingRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<listing::Model> for Listing {
    fn from(model: listing::Model) -> Self {
        let image_urls = serde_json::from_value(model.image_urls).unwrap_or_default();
        Self {
            listing_id: model.listing_id,
            source: model.source,
            url: model.url,
            title: model.title,
            description: model.description,
            seller_name: model.seller_name,
            location: model.location,
            image_urls,
            listing_date: model.listing_date,
            currency: model.currency,
            current_price: model.current_price,
            original_price: model.original_price,
            nominal_price: model.nominal_price,
            on_sale: model.on_sale,
            brand: model.brand,
            model: model.model,
            msrp: model.msrp,
            first_seen: model.first_seen,
            last_seen: model.last_seen,
            is_active: model.is_active,
            is_hidden: model.is_hidden,
            missed_runs: model.missed_runs,
        }
    }
}

#[async_trait]
impl ListingRepository for ListingRepositoryImpl {
    async fn upsert(
        &self,
        scraped: &ScrapedListing,
        enrichment: &ListingEnrichment,
        seen_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let existing = listing::Entity::find_by_id(scraped.listing_id.as_str())
            .one(self.db.as_ref())
            .await?;

        let image_urls_json = serde_json::json!(scraped.image_urls);

        match existing {
            None => {
                let model = listing::ActiveModel {
                    listing_id: Set(scraped.listing_id.clone()),
                    source: Set(scraped.source.clone()),
                    url: Set(scraped.url.clone()),
                    title: Set(scraped.title.clone()),
                    description: Set(scraped.description.clone()),
                    seller_name: Set(scraped.seller_name.clone()),
                    location: Set(scraped.location.clone()),
                    image_urls: Set(image_urls_json),
                    listing_date: Set(scraped.listing_date.clone()),
                    currency: Set(scraped.currency.clone()),
                    current_price: Set(scraped.price),
                    // First sighting seeds the drop baseline, never rewritten
                    original_price: Set(scraped.price),
                    nominal_price: Set(scraped.nominal_price),
                    on_sale: Set(scraped.on_sale),
                    brand: Set(enrichment.brand.clone()),
                    model: Set(enrichment.model.clone()),
                    msrp: Set(enrichment.msrp),
                    first_seen: Set(seen_at),
                    last_seen: Set(seen_at),
                    is_active: Set(true),
                    is_hidden: Set(false),
                    missed_runs: Set(0),
                };
                model.insert(self.db.as_ref()).await?;
                Ok(true)
            }
            Some(current) => {
                let mut model = listing::ActiveModel {
                    listing_id: Set(current.listing_id.clone()),
                    url: Set(scraped.url.clone()),
                    title: Set(scraped.title.clone()),
                    currency: Set(scraped.currency.clone()),
                    on_sale: Set(scraped.on_sale),
                    last_seen: Set(seen_at),
                    is_active: Set(true),
                    missed_runs: Set(0),
                    ..Default::default()
                };

                // COALESCE semantics: a scrape that failed to capture a
                // field must not erase a previously stored value
                if scraped.description.is_some() {
                    model.description = Set(scraped.description.clone());
                }
                if scraped.seller_name.is_some() {
                    model.seller_name = Set(scraped.seller_name.clone());
                }
                if scraped.location.is_some() {
                    model.location = Set(scraped.location.clone());
                }
                if !scraped.image_urls.is_empty() {
                    model.image_urls = Set(image_urls_json);
                }
                if scraped.listing_date.is_some() {
                    model.listing_date = Set(scraped.listing_date.clone());
                }
                if scraped.price.is_some() {
                    model.current_price = Set(scraped.price);
                }
                if scraped.nominal_price.is_some() {
                    model.nominal_price = Set(scraped.nominal_price);
                }
                if enrichment.brand.is_some() {
                    model.brand = Set(enrichment.brand.clone());
                }
                if enrichment.model.is_some() {
                    model.model = Set(enrichment.model.clone());
                }
                if enrichment.msrp.is_some() {
                    model.msrp = Set(enrichment.msrp);
                }

                model.update(self.db.as_ref()).await?;
                Ok(false)
            }
        }
    }

    async fn find_by_id(&self, listing_id: &str) -> Result<Option<Listing>, RepositoryError> {
        let model = listing::Entity::find_by_id(listing_id)
            .one(self.db.as_ref())
            .await?;
        Ok(model.map(Into::into))
    }

    async fn get_listings(&self, filter: &ListingFilter) -> Result<Vec<Listing>, RepositoryError> {
        let mut condition = Condition::all();

        if !filter.show_hidden {
            condition = condition.add(listing::Column::IsHidden.eq(false));
        }
        if filter.active_only {
            condition = condition.add(listing::Column::IsActive.eq(true));
        }
        if let Some(brand) = &filter.brand {
            condition = condition.add(listing::Column::Brand.eq(brand.clone()));
        }
        if let Some(min) = filter.min_price {
            condition = condition.add(listing::Column::CurrentPrice.gte(min));
        }
        if let Some(max) = filter.max_price {
            condition = condition.add(listing::Column::CurrentPrice.lte(max));
        }
        if let Some(location) = &filter.location {
            condition = condition.add(listing::Column::Location.contains(location.clone()));
        }
        if let Some(search) = &filter.search {
            condition = condition.add(
                Condition::any()
                    .add(listing::Column::Title.contains(search.clone()))
                    .add(listing::Column::Description.contains(search.clone())),
            );
        }

        let query = listing::Entity::find().filter(condition);
        let query = match filter.sort_by {
            ListingSort::PriceAsc => query.order_by_asc(listing::Column::CurrentPrice),
            ListingSort::PriceDesc => query.order_by_desc(listing::Column::CurrentPrice),
            ListingSort::Newest => query.order_by_desc(listing::Column::FirstSeen),
            ListingSort::Oldest => query.order_by_asc(listing::Column::FirstSeen),
            ListingSort::LastSeen => query.order_by_desc(listing::Column::LastSeen),
            ListingSort::PriceDrop => query.order_by_desc(
                Expr::col(listing::Column::OriginalPrice)
                    .sub(Expr::col(listing::Column::CurrentPrice)),
            ),
        };

        let models = query.all(self.db.as_ref()).await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn add_price_snapshot(
        &self,
        listing_id: &str,
        price: Option<f64>,
        scraped_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let model = price_snapshot::ActiveModel {
            listing_id: Set(listing_id.to_string()),
            price: Set(price),
            scraped_at: Set(scraped_at),
            ..Default::default()
        };

        // Same listing at the same instant dedupes silently
        price_snapshot::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    price_snapshot::Column::ListingId,
                    price_snapshot::Column::ScrapedAt,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await?;
        Ok(())
    }

    async fn price_history(&self, listing_id: &str) -> Result<Vec<PriceSnapshot>, RepositoryError> {
        let models = price_snapshot::Entity::find()
            .filter(price_snapshot::Column::ListingId.eq(listing_id))
            .order_by_asc(price_snapshot::Column::ScrapedAt)
            .all(self.db.as_ref())
            .await?;

        Ok(models
            .into_iter()
            .map(|m| PriceSnapshot {
                listing_id: m.listing_id,
                price: m.price,
                scraped_at: m.scraped_at,
            })
            .collect())
    }

    async fn increment_missed_runs(
        &self,
        seen_ids: &HashSet<String>,
        inactive_threshold: i32,
    ) -> Result<(), RepositoryError> {
        let active_ids: Vec<String> = listing::Entity::find()
            .filter(listing::Column::IsActive.eq(true))
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(|m| m.listing_id)
            .collect();

        let missed: Vec<String> = active_ids
            .into_iter()
            .filter(|id| !seen_ids.contains(id))
            .collect();

        if !missed.is_empty() {
            listing::Entity::update_many()
                .col_expr(
                    listing::Column::MissedRuns,
                    Expr::col(listing::Column::MissedRuns).add(1),
                )
                .filter(listing::Column::ListingId.is_in(missed))
                .exec(self.db.as_ref())
                .await?;
        }

        // Listings seen this cycle were reset to 0 during the merge, so a
        // global threshold sweep only ever touches the missed ones
        listing::Entity::update_many()
            .col_expr(listing::Column::IsActive, Expr::value(false))
            .filter(listing::Column::IsActive.eq(true))
            .filter(listing::Column::MissedRuns.gte(inactive_threshold))
            .exec(self.db.as_ref())
            .await?;

        Ok(())
    }

    async fn set_hidden(&self, listing_id: &str, hidden: bool) -> Result<(), RepositoryError> {
        let result = listing::Entity::update_many()
            .col_expr(listing::Column::IsHidden, Expr::value(hidden))
            .filter(listing::Column::ListingId.eq(listing_id))
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
