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

use sea_orm_migration::prelude::*;

/// 初始数据库模式迁移
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    /// 应用数据库迁移
    ///
    /// # 参数
    ///
    /// * `manager` - 数据库模式管理器
    ///
    /// # 返回值
    ///
    /// * `Ok(())` - 迁移成功
    /// * `Err(DbErr)` - 迁移失败
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 1. Create listings table (No dependencies)
        manager
            .create_table(
                Table::create()
                    .table(Listings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Listings::ListingId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Listings::Source).string().not_null())
                    .col(ColumnDef::new(Listings::Url).string().not_null())
                    .col(ColumnDef::new(Listings::Title).string().not_null())
                    .col(ColumnDef::new(Listings::Description).text().null())
                    .col(ColumnDef::new(Listings::SellerName).string().null())
                    .col(ColumnDef::new(Listings::Location).string().null())
                    .col(
                        ColumnDef::new(Listings::ImageUrls)
                            .json()
                            .not_null()
                            .default("[]"),
                    )
                    .col(ColumnDef::new(Listings::ListingDate).string().null())
                    .col(
                        ColumnDef::new(Listings::Currency)
                            .string()
                            .not_null()
                            .default("CAD"),
                    )
                    .col(ColumnDef::new(Listings::CurrentPrice).double().null())
                    .col(ColumnDef::new(Listings::OriginalPrice).double().null())
                    .col(ColumnDef::new(Listings::NominalPrice).double().null())
                    .col(
                        ColumnDef::new(Listings::OnSale)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Listings::Brand).string().null())
                    .col(ColumnDef::new(Listings::Model).string().null())
                    .col(ColumnDef::new(Listings::Msrp).double().null())
                    .col(
                        ColumnDef::new(Listings::FirstSeen)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Listings::LastSeen)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Listings::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Listings::MissedRuns)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        // 2. Create price_snapshots table (Depends on Listings)
        manager
            .create_table(
                Table::create()
                    .table(PriceSnapshots::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PriceSnapshots::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PriceSnapshots::ListingId).string().not_null())
                    .col(ColumnDef::new(PriceSnapshots::Price).double().null())
                    .col(
                        ColumnDef::new(PriceSnapshots::ScrapedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_snapshot_listing")
                            .from(PriceSnapshots::Table, PriceSnapshots::ListingId)
                            .to(Listings::Table, Listings::ListingId),
                    )
                    .to_owned(),
            )
            .await?;

        // Snapshot dedup: one row per listing per instant
        manager
            .create_index(
                Index::create()
                    .name("idx_snapshot_listing_at")
                    .table(PriceSnapshots::Table)
                    .col(PriceSnapshots::ListingId)
                    .col(PriceSnapshots::ScrapedAt)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 3. Create scrape_runs table
        manager
            .create_table(
                Table::create()
                    .table(ScrapeRuns::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ScrapeRuns::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ScrapeRuns::StartedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ScrapeRuns::FinishedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ScrapeRuns::ListingsFound)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ScrapeRuns::NewListings)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ScrapeRuns::PriceChanges)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ScrapeRuns::Errors)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(ScrapeRuns::SearchQuery).string().null())
                    .to_owned(),
            )
            .await?;

        // 4. Create settings table (JSON-encoded values)
        manager
            .create_table(
                Table::create()
                    .table(Settings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Settings::Key)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Settings::Value).json().not_null())
                    .to_owned(),
            )
            .await?;

        // 5. Create search_queries table
        manager
            .create_table(
                Table::create()
                    .table(SearchQueries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SearchQueries::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SearchQueries::Url).string().not_null())
                    .col(ColumnDef::new(SearchQueries::Label).string().not_null())
                    .col(
                        ColumnDef::new(SearchQueries::Enabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .to_owned(),
            )
            .await?;

        // 6. Create brand_keywords table
        manager
            .create_table(
                Table::create()
                    .table(BrandKeywords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BrandKeywords::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BrandKeywords::Brand).string().not_null())
                    .col(ColumnDef::new(BrandKeywords::Keyword).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_brand_keyword_unique")
                    .table(BrandKeywords::Table)
                    .col(BrandKeywords::Brand)
                    .col(BrandKeywords::Keyword)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 7. Create msrp_entries table
        manager
            .create_table(
                Table::create()
                    .table(MsrpEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MsrpEntries::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MsrpEntries::Brand).string().not_null())
                    .col(ColumnDef::new(MsrpEntries::Model).string().not_null())
                    .col(ColumnDef::new(MsrpEntries::MsrpCad).double().not_null())
                    .col(ColumnDef::new(MsrpEntries::MsrpUsd).double().null())
                    .col(ColumnDef::new(MsrpEntries::RetailPrice).double().null())
                    .col(
                        ColumnDef::new(MsrpEntries::LastUpdated)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_msrp_brand_model_unique")
                    .table(MsrpEntries::Table)
                    .col(MsrpEntries::Brand)
                    .col(MsrpEntries::Model)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Query-path indexes
        manager
            .create_index(
                Index::create()
                    .name("idx_listings_active")
                    .table(Listings::Table)
                    .col(Listings::IsActive)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_listings_brand")
                    .table(Listings::Table)
                    .col(Listings::Brand)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_listings_current_price")
                    .table(Listings::Table)
                    .col(Listings::CurrentPrice)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_snapshots_scraped_at")
                    .table(PriceSnapshots::Table)
                    .col(PriceSnapshots::ScrapedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PriceSnapshots::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ScrapeRuns::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Settings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SearchQueries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BrandKeywords::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(MsrpEntries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Listings::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Listings {
    Table,
    ListingId,
    Source,
    Url,
    Title,
    Description,
    SellerName,
    Location,
    ImageUrls,
    ListingDate,
    Currency,
    CurrentPrice,
    OriginalPrice,
    NominalPrice,
    OnSale,
    Brand,
    Model,
    Msrp,
    FirstSeen,
    LastSeen,
    IsActive,
    MissedRuns,
}

#[derive(DeriveIden)]
enum PriceSnapshots {
    Table,
    Id,
    ListingId,
    Price,
    ScrapedAt,
}

#[derive(DeriveIden)]
enum ScrapeRuns {
    Table,
    Id,
    StartedAt,
    FinishedAt,
    ListingsFound,
    NewListings,
    PriceChanges,
    Errors,
    SearchQuery,
}

#[derive(DeriveIden)]
enum Settings {
    Table,
    Key,
    Value,
}

#[derive(DeriveIden)]
enum SearchQueries {
    Table,
    Id,
    Url,
    Label,
    Enabled,
}

#[derive(DeriveIden)]
enum BrandKeywords {
    Table,
    Id,
    Brand,
    Keyword,
}

#[derive(DeriveIden)]
enum MsrpEntries {
    Table,
    Id,
    Brand,
    Model,
    MsrpCad,
    MsrpUsd,
    RetailPrice,
    LastUpdated,
}
