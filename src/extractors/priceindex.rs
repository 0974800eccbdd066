// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::fetch::{FetchError, PageFetcher};
use crate::utils::money::extract_all_prices;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::{debug, info};
use url::Url;

/// 默认的零售价格指数页
pub const DEFAULT_INDEX_URL: &str = "https://auroratechchannel.com/3d-printer-price.php";

static PRICE_DETAIL_ANCHOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href*='price-details.php']").expect("detail anchor selector"));

/// 指数页上的一行：品牌/型号及其MSRP与当前零售价
#[derive(Debug, Clone, PartialEq)]
pub struct RetailPriceEntry {
    pub brand: String,
    pub model: String,
    pub msrp: f64,
    pub retail_price: f64,
}

impl RetailPriceEntry {
    pub fn price_drop(&self) -> f64 {
        self.msrp - self.retail_price
    }

    pub fn drop_percentage(&self) -> f64 {
        if self.msrp > 0.0 {
            self.price_drop() / self.msrp * 100.0
        } else {
            0.0
        }
    }
}

/// 零售价格指数提取器
///
/// 跟踪站按品牌/型号列出MSRP与当前促销价，作为交易评分的
/// 第二基线喂给MSRP表
pub struct PriceIndexScraper<'a> {
    fetcher: &'a PageFetcher,
}

impl<'a> PriceIndexScraper<'a> {
    pub fn new(fetcher: &'a PageFetcher) -> Self {
        Self { fetcher }
    }

    pub async fn scrape_index(&self, url: &str) -> Result<Vec<RetailPriceEntry>, FetchError> {
        info!("Fetching retail price index from {}", url);
        let html = self.fetcher.fetch_page(url).await?;
        let entries = parse_price_index(&html);
        info!("Scraped {} printer prices from the index", entries.len());
        Ok(entries)
    }
}

/// 解析指数页
///
/// price-details.php链接的查询参数携带brand/model；所在容器的
/// 文本以"$MSRP$当前价"连写两个价格，第一个是MSRP
pub fn parse_price_index(html: &str) -> Vec<RetailPriceEntry> {
    let document = Html::parse_document(html);
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut entries = Vec::new();

    for link in document.select(&PRICE_DETAIL_ANCHOR) {
        let href = link.value().attr("href").unwrap_or_default();
        let Some((brand, model)) = brand_model_from_href(href) else {
            continue;
        };
        if !seen.insert((brand.to_lowercase(), model.to_lowercase())) {
            continue;
        }

        let Some(container) = enclosing_container(link) else {
            continue;
        };
        let text: String = container.text().collect::<Vec<_>>().join(" ");
        let prices = extract_all_prices(&text);
        if prices.len() < 2 {
            debug!("No price pair for {} {}", brand, model);
            continue;
        }
        let (msrp, retail) = (prices[0], prices[1]);
        if msrp <= 0.0 || retail <= 0.0 {
            continue;
        }

        entries.push(RetailPriceEntry {
            brand,
            model,
            msrp,
            retail_price: retail,
        });
    }

    entries
}

fn brand_model_from_href(href: &str) -> Option<(String, String)> {
    let parsed = Url::parse(href)
        .or_else(|_| Url::parse("https://auroratechchannel.com").and_then(|b| b.join(href)))
        .ok()?;
    let mut brand = None;
    let mut model = None;
    for (key, value) in parsed.query_pairs() {
        match key.as_ref() {
            "brand" => brand = Some(value.into_owned()),
            "model" => model = Some(value.into_owned()),
            _ => {}
        }
    }
    match (brand, model) {
        (Some(brand), Some(model)) if !brand.is_empty() && !model.is_empty() => {
            Some((brand, model))
        }
        _ => None,
    }
}

fn enclosing_container(link: ElementRef) -> Option<ElementRef> {
    let mut node = link.parent();
    while let Some(current) = node {
        if let Some(element) = ElementRef::wrap(current) {
            let name = element.value().name();
            if name == "div" || name == "section" {
                return Some(element);
            }
        }
        node = current.parent();
    }
    None
}
