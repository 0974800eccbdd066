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

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "listings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub listing_id: String,
    pub source: String,
    pub url: String,
    pub title: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub seller_name: Option<String>,
    pub location: Option<String>,
    pub image_urls: Json,
    pub listing_date: Option<String>,
    pub currency: String,
    pub current_price: Option<f64>,
    pub original_price: Option<f64>,
    pub nominal_price: Option<f64>,
    pub on_sale: bool,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub msrp: Option<f64>,
    pub first_seen: DateTimeUtc,
    pub last_seen: DateTimeUtc,
    pub is_active: bool,
    pub missed_runs: i32,
    pub is_hidden: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::price_snapshot::Entity")]
    PriceSnapshot,
}

impl Related<super::price_snapshot::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PriceSnapshot.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
