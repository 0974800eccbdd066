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

use crate::domain::models::listing::ScrapedListing;
use crate::engines::fetch::{FetchError, PageFetcher};
use crate::extractors::payload::find_arrays_under_key;
use crate::utils::money::{detect_currency, extract_all_prices, parse_amount, parse_shopify_money};
use crate::utils::urls::{absolutize, source_from_url, stable_listing_id};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, warn};

/// 变体金额中低于此值的一律按噪声丢弃（"8% OFF"之类的残片）
const PRICE_NOISE_FLOOR: f64 = 20.0;
/// 图片数量上限
const IMAGE_CAP: usize = 10;

/// 当前价的渲染DOM选择器，反映用户实际选中的变体，信号最强
static CURRENT_PRICE_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["#cur_price", ".themes_products_price", "[itemprop='price']", ".product-price", ".price"]
        .iter()
        .map(|s| Selector::parse(s).expect("price selector"))
        .collect()
});

/// 划线价/比较价的DOM选择器
static NOMINAL_PRICE_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["del", ".themes_products_origin_price", ".compare-at-price", ".old-price", ".origin-price"]
        .iter()
        .map(|s| Selector::parse(s).expect("nominal selector"))
        .collect()
});

static JSON_SCRIPT_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("script[type='application/json']").expect("json script selector"));
static LD_JSON_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("script[type='application/ld+json']").expect("ld json selector")
});
static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h1, title").expect("title selector"));
static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("anchor selector"));

static COMPARE_AT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""compare_at_price(?:_min|_max)?"\s*:\s*"?(\d+(?:\.\d+)?)"?"#)
        .expect("compare_at regex")
});
static CURRENCY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""currency"\s*:\s*"([A-Za-z]{3})""#).expect("currency regex"));
static FEATURED_IMAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""featured_image"\s*:\s*"([^"]+)""#).expect("featured image regex"));
static CDN_IMAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(https?:)?//cdn\.shopify\.com/[^"'\s>]+\.(?:jpg|jpeg|png|webp)"#)
        .expect("cdn image regex")
});

/// 店面提取器
///
/// 按URL形态分派：/products/路径走单品解析，formbot需要先爬
/// 目录页发现商品链接再逐个进入单品解析
pub struct ShopifyScraper<'a> {
    fetcher: &'a PageFetcher,
}

impl<'a> ShopifyScraper<'a> {
    pub fn new(fetcher: &'a PageFetcher) -> Self {
        Self { fetcher }
    }

    pub async fn scrape_url(&self, url: &str) -> Result<Vec<ScrapedListing>, FetchError> {
        let path = url::Url::parse(url)
            .map(|u| u.path().to_lowercase())
            .unwrap_or_default();
        if path.contains("/products/") {
            let listing = self.scrape_product(url).await?;
            return Ok(vec![listing]);
        }
        if url.contains("formbot3d.com") {
            return self.scrape_formbot_vorons(url).await;
        }
        warn!("No retail scraper registered for url={}", url);
        Ok(Vec::new())
    }

    async fn scrape_product(&self, url: &str) -> Result<ScrapedListing, FetchError> {
        let html = self.fetcher.fetch_page(url).await?;
        Ok(parse_product_page(url, &html))
    }

    /// 目录页爬取：发现/products/链接，按域关键词过滤后逐个解析
    async fn scrape_formbot_vorons(&self, url: &str) -> Result<Vec<ScrapedListing>, FetchError> {
        let html = self.fetcher.fetch_page(url).await?;
        let product_urls = collect_product_links(url, &html, "voron");

        let mut listings = Vec::new();
        for product_url in product_urls {
            match self.scrape_product(&product_url).await {
                Ok(listing) => listings.push(listing),
                Err(e) => {
                    debug!("Failed to parse formbot product {}: {}", product_url, e);
                    continue;
                }
            }
        }
        Ok(listings)
    }
}

/// 从目录页收集商品链接，卡片文本须包含关键词
pub(crate) fn collect_product_links(base_url: &str, html: &str, keyword: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut seen: HashSet<String> = HashSet::new();
    let mut urls = Vec::new();

    for link in document.select(&ANCHOR_SELECTOR) {
        let href = link.value().attr("href").unwrap_or_default();
        if !href.contains("/products/") {
            continue;
        }
        let absolute = absolutize(base_url, href.split('?').next().unwrap_or(href));
        if !seen.insert(absolute.clone()) {
            continue;
        }
        let card_text = element_text(link);
        if card_text.is_empty() || !card_text.to_lowercase().contains(keyword) {
            continue;
        }
        urls.push(absolute);
    }

    urls
}

/// 解析单个商品页
///
/// 价格信号按严格优先级调和：渲染DOM > 变体JSON > JSON-LD > meta标签；
/// 货币优先级与之对应，最后兜底USD
pub fn parse_product_page(url: &str, html: &str) -> ScrapedListing {
    let document = Html::parse_document(html);
    let source = source_from_url(url);

    let (variant_current, variant_nominal, variant_currency) =
        extract_variant_prices(html, &document);
    let (dom_current, dom_nominal, dom_currency) = extract_dom_prices(&document);
    let (ld_title, ld_current, ld_currency) = extract_linked_data(&document);

    let mut current_price = ld_current;
    let mut nominal_price: Option<f64> = None;

    // Rendered DOM reflects the actually selected variant
    if dom_current.is_some() {
        current_price = dom_current;
    } else if variant_current.is_some() {
        current_price = variant_current;
    }

    let mut title = ld_title;
    if title.is_none() {
        title = document
            .select(&TITLE_SELECTOR)
            .next()
            .map(element_text)
            .filter(|t| !t.is_empty());
    }
    let title = title.unwrap_or_else(|| format!("{} Product", capitalize(&source)));

    if current_price.is_none() {
        let page_text: String = document.root_element().text().collect::<Vec<_>>().join(" ");
        let candidates = extract_all_prices(&page_text);
        if let Some(min) = candidates.iter().copied().reduce(f64::min) {
            current_price = Some(min);
            let max = candidates.iter().copied().fold(min, f64::max);
            if max > min {
                nominal_price = Some(max);
            }
        }
    }

    if dom_nominal.is_some() {
        nominal_price = dom_nominal;
    } else if nominal_price.is_none() && variant_nominal.is_some() {
        nominal_price = variant_nominal;
    }

    // Last resort for compare-at in the raw source
    if nominal_price.is_none() {
        if let (Some(caps), Some(current)) = (COMPARE_AT_RE.captures(html), current_price) {
            let candidate =
                parse_shopify_money(&Value::String(caps[1].to_string())).unwrap_or(0.0);
            if candidate > current {
                nominal_price = Some(candidate);
            }
        }
    }

    // Pages that only expose product price metas
    let meta_price = meta_content(&document, "meta[property='product:price:amount']");
    if current_price.is_none() {
        current_price = meta_price.as_deref().and_then(|v| parse_amount(&Value::String(v.to_string())));
    }
    let meta_currency = meta_content(&document, "meta[property='product:price:currency']")
        .map(|c| c.trim().to_uppercase())
        .filter(|c| !c.is_empty());

    let currency = dom_currency
        .or(variant_currency)
        .or(ld_currency)
        .or(meta_currency)
        .unwrap_or_else(|| "USD".to_string());

    let on_sale = matches!(
        (nominal_price, current_price),
        (Some(nominal), Some(current)) if nominal > current
    );

    let mut listing = ScrapedListing::new(stable_listing_id(&source, url), url, title);
    listing.price = current_price;
    listing.currency = currency;
    listing.nominal_price = nominal_price;
    listing.on_sale = on_sale;
    listing.source = source;
    listing.location = Some("Online".to_string());
    listing.image_urls = extract_images(url, html, &document);
    listing
}

/// 从内嵌JSON脚本块提取变体价格：当前价取最小，比较价取最大
fn extract_variant_prices(
    html: &str,
    document: &Html,
) -> (Option<f64>, Option<f64>, Option<String>) {
    let mut current_candidates: Vec<f64> = Vec::new();
    let mut compare_candidates: Vec<f64> = Vec::new();
    let mut currency: Option<String> = None;

    for script in document.select(&JSON_SCRIPT_SELECTOR) {
        let raw: String = script.text().collect();
        let Ok(parsed) = serde_json::from_str::<Value>(&raw) else {
            continue;
        };
        for variants in find_arrays_under_key(&parsed, "variants") {
            for variant in variants {
                let Some(obj) = variant.as_object() else { continue };
                if let Some(price) = obj.get("price").and_then(|v| parse_shopify_money(v)) {
                    current_candidates.push(price);
                }
                if let Some(compare) =
                    obj.get("compare_at_price").and_then(|v| parse_shopify_money(v))
                {
                    compare_candidates.push(compare);
                }
                if currency.is_none() {
                    currency = obj
                        .get("currency")
                        .or_else(|| obj.get("price_currency"))
                        .and_then(Value::as_str)
                        .map(|c| c.trim().to_uppercase())
                        .filter(|c| !c.is_empty());
                }
            }
        }
    }

    // Regex fallback when the script JSON is not directly parseable
    for caps in COMPARE_AT_RE.captures_iter(html) {
        if let Some(parsed) = parse_shopify_money(&Value::String(caps[1].to_string())) {
            compare_candidates.push(parsed);
        }
    }
    if currency.is_none() {
        currency = CURRENCY_RE.captures(html).map(|c| c[1].to_uppercase());
    }

    // Guard against junk values ("8" from an "8% OFF" style payload)
    current_candidates.retain(|p| *p >= PRICE_NOISE_FLOOR);
    compare_candidates.retain(|p| *p >= PRICE_NOISE_FLOOR);

    let current = current_candidates.into_iter().reduce(f64::min);
    let nominal = compare_candidates.into_iter().reduce(f64::max);
    (current, nominal, currency)
}

/// 从渲染DOM提取当前价与划线价
fn extract_dom_prices(document: &Html) -> (Option<f64>, Option<f64>, Option<String>) {
    let mut current_candidates: Vec<f64> = Vec::new();
    let mut nominal_candidates: Vec<f64> = Vec::new();
    let mut currency: Option<String> = None;

    for selector in CURRENT_PRICE_SELECTORS.iter() {
        for el in document.select(selector) {
            let text = element_text(el);
            if text.is_empty() {
                continue;
            }
            current_candidates.extend(extract_all_prices(&text));
            if currency.is_none() {
                let detected = detect_currency(&text, "");
                if !detected.is_empty() {
                    currency = Some(detected);
                }
            }
        }
    }

    for selector in NOMINAL_PRICE_SELECTORS.iter() {
        for el in document.select(selector) {
            let text = element_text(el);
            if text.is_empty() {
                continue;
            }
            nominal_candidates.extend(extract_all_prices(&text));
            if currency.is_none() {
                let detected = detect_currency(&text, "");
                if !detected.is_empty() {
                    currency = Some(detected);
                }
            }
        }
    }

    let current = current_candidates.into_iter().reduce(f64::min);
    let nominal = nominal_candidates.into_iter().reduce(f64::max);
    (current, nominal, currency)
}

/// 从JSON-LD的Product块提取标题、最低报价和货币
fn extract_linked_data(document: &Html) -> (Option<String>, Option<f64>, Option<String>) {
    let mut title: Option<String> = None;
    let mut current: Option<f64> = None;
    let mut currency: Option<String> = None;

    for block in ld_json_blocks(document) {
        if block.get("@type").and_then(Value::as_str) != Some("Product") {
            continue;
        }
        if title.is_none() {
            title = block.get("name").and_then(Value::as_str).map(str::to_string);
        }
        let offers = match block.get("offers") {
            Some(Value::Array(items)) => items.clone(),
            Some(Value::Object(_)) => vec![block["offers"].clone()],
            _ => Vec::new(),
        };
        for offer in offers {
            if let Some(price) = offer.get("price").and_then(|v| parse_amount(v)) {
                current = Some(current.map_or(price, |c: f64| c.min(price)));
            }
            if currency.is_none() {
                currency = offer
                    .get("priceCurrency")
                    .and_then(Value::as_str)
                    .map(|c| c.trim().to_uppercase())
                    .filter(|c| !c.is_empty());
            }
        }
    }

    (title, current, currency)
}

fn ld_json_blocks(document: &Html) -> Vec<Value> {
    let mut blocks = Vec::new();
    for script in document.select(&LD_JSON_SELECTOR) {
        let raw: String = script.text().collect();
        let Ok(parsed) = serde_json::from_str::<Value>(&raw) else {
            continue;
        };
        match parsed {
            Value::Array(items) => blocks.extend(items.into_iter().filter(|i| i.is_object())),
            Value::Object(_) => blocks.push(parsed),
            _ => {}
        }
    }
    blocks
}

/// 依次尝试各图片来源，第一个非空的来源胜出
fn extract_images(url: &str, html: &str, document: &Html) -> Vec<String> {
    let mut image_urls: Vec<String> = Vec::new();

    for block in ld_json_blocks(document) {
        if block.get("@type").and_then(Value::as_str) != Some("Product") {
            continue;
        }
        match block.get("image") {
            Some(Value::String(s)) if !s.is_empty() => image_urls.push(absolutize(url, s)),
            Some(Value::Array(items)) => {
                for img in items {
                    match img {
                        Value::String(s) if !s.is_empty() => image_urls.push(absolutize(url, s)),
                        Value::Object(obj) => {
                            if let Some(img_url) = obj
                                .get("url")
                                .or_else(|| obj.get("contentUrl"))
                                .or_else(|| obj.get("src"))
                                .and_then(Value::as_str)
                            {
                                image_urls.push(absolutize(url, img_url));
                            }
                        }
                        _ => {}
                    }
                }
            }
            Some(Value::Object(obj)) => {
                if let Some(img_url) = obj
                    .get("url")
                    .or_else(|| obj.get("contentUrl"))
                    .or_else(|| obj.get("src"))
                    .and_then(Value::as_str)
                {
                    image_urls.push(absolutize(url, img_url));
                }
            }
            _ => {}
        }
    }

    if image_urls.is_empty() {
        if let Some(content) = meta_content(document, "meta[property='og:image']") {
            image_urls.push(absolutize(url, &content));
        }
    }
    if image_urls.is_empty() {
        if let Some(content) = meta_content(document, "meta[property='og:image:secure_url']") {
            image_urls.push(absolutize(url, &content));
        }
    }
    if image_urls.is_empty() {
        if let Some(content) = meta_content(document, "meta[name='twitter:image']") {
            image_urls.push(absolutize(url, &content));
        }
    }
    if image_urls.is_empty() {
        if let Some(caps) = FEATURED_IMAGE_RE.captures(html) {
            image_urls.push(absolutize(url, &caps[1]));
        }
    }
    if image_urls.is_empty() {
        if let Some(m) = CDN_IMAGE_RE.find(html) {
            image_urls.push(absolutize(url, m.as_str()));
        }
    }

    let mut seen: HashSet<String> = HashSet::new();
    image_urls.retain(|img| seen.insert(img.clone()));
    image_urls.truncate(IMAGE_CAP);
    image_urls
}

fn meta_content(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(str::to_string)
        .filter(|c| !c.is_empty())
}

fn element_text(element: ElementRef) -> String {
    element.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
