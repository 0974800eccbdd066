// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::deal::Deal;
use crate::domain::models::listing::Listing;
use crate::domain::services::detection::BrandDetector;
use chrono::Utc;

/// MSRP比率低于此值即视为交易，无需降价
const MSRP_RATIO_CUTOFF: f64 = 0.7;
/// 零售价比率低于此值即视为交易
const RETAIL_RATIO_CUTOFF: f64 = 0.9;

/// 对活跃列表计算交易指标并按综合得分降序排列
///
/// 输入应为活跃且未隐藏的列表；价格缺失或非正的记录被跳过。
/// 排序稳定，同分保持传入顺序
pub fn rank_deals(listings: &[Listing], detector: &BrandDetector) -> Vec<Deal> {
    let mut deals: Vec<Deal> = listings
        .iter()
        .filter_map(|listing| build_deal(listing, detector))
        .collect();

    deals.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    deals
}

/// 通知子选择：独立于排名得分的阈值对 + 批量上限
pub fn qualifying_deals(
    deals: &[Deal],
    max_retail_ratio: f64,
    min_drop_pct: f64,
    batch_size: usize,
) -> Vec<Deal> {
    let mut qualifying = Vec::new();
    for deal in deals {
        let ratio_match = deal
            .price_to_retail_ratio
            .map(|r| r <= max_retail_ratio)
            .unwrap_or(false);
        let drop_match = deal.price_drop_pct >= min_drop_pct;
        if ratio_match || drop_match {
            qualifying.push(deal.clone());
        }
        if qualifying.len() >= batch_size {
            break;
        }
    }
    qualifying
}

fn build_deal(listing: &Listing, detector: &BrandDetector) -> Option<Deal> {
    let current = listing.current_price?;
    let original = listing.original_price?;
    if current <= 0.0 || original <= 0.0 {
        return None;
    }

    let price_drop_abs = (original - current).max(0.0);
    let price_drop_pct = if original > 0.0 && price_drop_abs > 0.0 {
        price_drop_abs / original * 100.0
    } else {
        0.0
    };

    let msrp = listing.msrp.or_else(|| {
        detector.lookup_msrp(listing.brand.as_deref(), listing.model.as_deref())
    });
    let retail_price =
        detector.lookup_retail_price(listing.brand.as_deref(), listing.model.as_deref());

    let msrp_ratio = msrp.filter(|m| *m > 0.0).map(|m| current / m);
    let retail_ratio = retail_price.filter(|r| *r > 0.0).map(|r| current / r);
    let vs_retail_savings = retail_price.map(|r| r - current).filter(|s| *s > 0.0);

    let included = price_drop_abs > 0.0
        || msrp_ratio.map(|r| r < MSRP_RATIO_CUTOFF).unwrap_or(false)
        || retail_ratio.map(|r| r < RETAIL_RATIO_CUTOFF).unwrap_or(false);
    if !included {
        return None;
    }

    let days_on_market = (Utc::now() - listing.first_seen).num_days().max(0);

    Some(Deal {
        listing_id: listing.listing_id.clone(),
        title: listing.title.clone(),
        url: listing.url.clone(),
        source: listing.source.clone(),
        currency: listing.currency.clone(),
        current_price: current,
        original_price: original,
        price_drop_abs,
        price_drop_pct,
        days_on_market,
        brand: listing.brand.clone(),
        model: listing.model.clone(),
        msrp,
        retail_price,
        price_to_msrp_ratio: msrp_ratio,
        price_to_retail_ratio: retail_ratio,
        vs_retail_savings,
        location: listing.location.clone(),
        image_url: listing.image_urls.first().cloned(),
        score: score_deal(vs_retail_savings, price_drop_pct, days_on_market, retail_ratio),
    })
}

/// 综合排名得分，越高越好
///
/// 零售节省额封顶100分；近一周内的新上架有时效加成；
/// 零售比率低于0.8时有陡峭的额外奖励
fn score_deal(
    vs_retail_savings: Option<f64>,
    price_drop_pct: f64,
    days_on_market: i64,
    retail_ratio: Option<f64>,
) -> f64 {
    let mut score = 0.0;

    if let Some(savings) = vs_retail_savings {
        score += (savings / 10.0).min(100.0);
    }

    score += price_drop_pct * 0.5;

    if days_on_market <= 7 {
        score += 20.0 - 2.0 * days_on_market as f64;
    }

    if let Some(ratio) = retail_ratio {
        if ratio < 0.8 {
            score += (0.8 - ratio) * 150.0;
        }
    }

    score
}
