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

use crate::domain::models::run::{ScrapeRun, TrackerStats};
use crate::domain::repositories::listing_repository::RepositoryError;
use crate::domain::repositories::run_repository::RunRepository;
use crate::infrastructure::database::entities::{listing, price_snapshot, scrape_run};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;

/// 抓取运行仓库实现
#[derive(Clone)]
pub struct RunRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl RunRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<scrape_run::Model> for ScrapeRun {
    fn from(model: scrape_run::Model) -> Self {
        Self {
            id: model.id,
            started_at: model.started_at,
            finished_at: model.finished_at,
            listings_found: model.listings_found,
            new_listings: model.new_listings,
            price_changes: model.price_changes,
            errors: model.errors,
            search_query: model.search_query,
        }
    }
}

#[async_trait]
impl RunRepository for RunRepositoryImpl {
    async fn start_run(
        &self,
        search_query: &str,
        started_at: DateTime<Utc>,
    ) -> Result<i32, RepositoryError> {
        let model = scrape_run::ActiveModel {
            started_at: Set(started_at),
            search_query: Set(Some(search_query.to_string())),
            ..Default::default()
        };
        let inserted = model.insert(self.db.as_ref()).await?;
        Ok(inserted.id)
    }

    async fn finish_run(
        &self,
        run_id: i32,
        listings_found: i32,
        new_listings: i32,
        price_changes: i32,
        errors: i32,
    ) -> Result<(), RepositoryError> {
        let result = scrape_run::Entity::update_many()
            .col_expr(scrape_run::Column::FinishedAt, Expr::value(Utc::now()))
            .col_expr(scrape_run::Column::ListingsFound, Expr::value(listings_found))
            .col_expr(scrape_run::Column::NewListings, Expr::value(new_listings))
            .col_expr(scrape_run::Column::PriceChanges, Expr::value(price_changes))
            .col_expr(scrape_run::Column::Errors, Expr::value(errors))
            .filter(scrape_run::Column::Id.eq(run_id))
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn latest_run(&self) -> Result<Option<ScrapeRun>, RepositoryError> {
        let model = scrape_run::Entity::find()
            .order_by_desc(scrape_run::Column::StartedAt)
            .one(self.db.as_ref())
            .await?;
        Ok(model.map(Into::into))
    }

    async fn run_count(&self) -> Result<u64, RepositoryError> {
        Ok(scrape_run::Entity::find().count(self.db.as_ref()).await?)
    }

    async fn stats(&self) -> Result<TrackerStats, RepositoryError> {
        let total_listings = listing::Entity::find().count(self.db.as_ref()).await?;
        let active_listings = listing::Entity::find()
            .filter(listing::Column::IsActive.eq(true))
            .count(self.db.as_ref())
            .await?;
        let total_snapshots = price_snapshot::Entity::find().count(self.db.as_ref()).await?;
        let total_scrape_runs = scrape_run::Entity::find().count(self.db.as_ref()).await?;

        let listings_with_drops = listing::Entity::find()
            .filter(listing::Column::IsActive.eq(true))
            .filter(
                Expr::col(listing::Column::CurrentPrice)
                    .lt(Expr::col(listing::Column::OriginalPrice)),
            )
            .count(self.db.as_ref())
            .await?;

        let last_run = self.latest_run().await?;

        Ok(TrackerStats {
            total_listings,
            active_listings,
            total_snapshots,
            total_scrape_runs,
            listings_with_drops,
            last_run,
        })
    }
}
