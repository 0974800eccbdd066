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

use crate::domain::models::listing::{ListingDetail, ScrapedListing};
use crate::engines::fetch::{FetchError, PageFetcher, RATE_LIMIT_COOLDOWN};
use crate::extractors::payload::{
    self, probe, probe_string, DESCRIPTION_KEYS, ID_KEYS, IMAGE_KEYS, IMAGE_URL_KEYS,
    LOCATION_KEYS, PRICE_KEYS, PRICE_VALUE_KEYS, SELLER_KEYS, SELLER_NAME_KEYS, TITLE_KEYS,
    URL_KEYS,
};
use crate::utils::money::{parse_amount, parse_price_text};
use crate::utils::urls::extract_listing_id;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::{debug, info, warn};

const SITE_ORIGIN: &str = "https://www.kijiji.ca";

/// 详情页ad对象的别名
const AD_KEYS: &[&str] = &["ad", "listing", "adInfo"];
/// 详情页发布日期的别名
const DATE_KEYS: &[&str] = &["activationDate", "postedDate", "sortingDate"];

/// 卡片内定位用的"城市, 省码"模式
static LOCATION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Z][a-z]+,\s*[A-Z]{2}").expect("location regex"));

static NEXT_DATA_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("script#__NEXT_DATA__").expect("next data selector"));
static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("anchor selector"));
static HEADING_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h2, h3").expect("heading selector"));
static IMG_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("img").expect("img selector"));
static TEXT_BLOCK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span, div, p").expect("text block selector"));
static DESCRIPTION_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("[itemprop='description']").expect("description selector"));
static DETAIL_BLOCK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div, section").expect("detail block selector"));
static TIME_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("time, [itemprop='datePosted']").expect("time selector"));
static PAGINATION_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("nav, div").expect("pagination selector"));

/// 分类广告站搜索提取器
///
/// 逐页抓取搜索结果，优先走页面内嵌的状态JSON，
/// 退化时解析HTML卡片
pub struct KijijiScraper<'a> {
    fetcher: &'a PageFetcher,
    max_pages: u32,
    cooldown: std::time::Duration,
}

impl<'a> KijijiScraper<'a> {
    pub fn new(fetcher: &'a PageFetcher, max_pages: u32) -> Self {
        Self {
            fetcher,
            max_pages,
            cooldown: RATE_LIMIT_COOLDOWN,
        }
    }

    /// 覆盖429冷却时长
    pub fn with_cooldown(mut self, cooldown: std::time::Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// 抓取一个搜索查询的所有页面，返回按首见顺序去重的列表
    ///
    /// 403/429/非200/网络错误都会中止翻页但保留已收集的结果；
    /// 429先冷却再中止
    pub async fn scrape_search(&self, base_url: &str, max_pages: Option<u32>) -> Vec<ScrapedListing> {
        let max_pages = max_pages.unwrap_or(self.max_pages).max(1);
        let mut all_listings: Vec<ScrapedListing> = Vec::new();
        let mut seen_ids: HashSet<String> = HashSet::new();

        for page in 1..=max_pages {
            let url = build_page_url(base_url, page);

            let html = match self.fetcher.fetch_page(&url).await {
                Ok(html) => html,
                Err(FetchError::Blocked(url)) => {
                    warn!("Got 403 (blocked) for {}, stopping pagination", url);
                    break;
                }
                Err(FetchError::RateLimited(url)) => {
                    warn!("Got 429 (rate limited) for {}, backing off", url);
                    tokio::time::sleep(self.cooldown).await;
                    break;
                }
                Err(FetchError::Status { status, url }) => {
                    warn!("Got {} for {}", status, url);
                    break;
                }
                Err(FetchError::Network(e)) => {
                    warn!("Request failed for {}: {}", url, e);
                    break;
                }
            };

            let (listings, has_next) = parse_search_page(&html);
            let page_count = listings.len();

            for listing in listings {
                if seen_ids.insert(listing.listing_id.clone()) {
                    all_listings.push(listing);
                }
            }

            info!(
                "Page {}: found {} listings (total: {})",
                page,
                page_count,
                all_listings.len()
            );

            if !has_next || page_count == 0 {
                break;
            }
        }

        all_listings
    }

    /// 抓取单个列表详情页
    ///
    /// 任何失败都返回空detail，不中断周期
    pub async fn scrape_listing_detail(&self, url: &str) -> ListingDetail {
        let html = match self.fetcher.fetch_page(url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Failed to fetch listing detail {}: {}", url, e);
                return ListingDetail::default();
            }
        };
        parse_detail_page(&html)
    }
}

/// 按来源的翻页方案构造第N页URL
///
/// /b-canada/3d-printer/k0l0 -> /b-canada/3d-printer/page-2/k0l0
pub fn build_page_url(base_url: &str, page: u32) -> String {
    if page <= 1 {
        return base_url.to_string();
    }
    match base_url.rsplit_once('/') {
        Some((head, tail)) => format!("{}/page-{}/{}", head, page, tail),
        None => base_url.to_string(),
    }
}

/// 解析一个搜索结果页，返回(列表, 是否有下一页)
pub fn parse_search_page(html: &str) -> (Vec<ScrapedListing>, bool) {
    let document = Html::parse_document(html);

    // Strategy 1: embedded page-state JSON
    if let Some(data) = next_data_payload(&document) {
        let listings = parse_next_data(&data);
        if !listings.is_empty() {
            let has_next = has_next_page_from_data(&data);
            return (listings, has_next);
        }
    }

    // Strategy 2: raw HTML cards
    let listings = parse_html_listings(&document);
    let has_next = has_next_page_html(&document);
    (listings, has_next)
}

fn next_data_payload(document: &Html) -> Option<Value> {
    let script = document.select(&NEXT_DATA_SELECTOR).next()?;
    let raw: String = script.text().collect();
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Failed to parse __NEXT_DATA__: {}", e);
            None
        }
    }
}

/// 从页面状态JSON提取列表
fn parse_next_data(data: &Value) -> Vec<ScrapedListing> {
    let props = &data["props"]["pageProps"];
    if props.is_null() {
        return Vec::new();
    }

    let mut listings = Vec::new();
    for collection in payload::find_listing_collections(props) {
        for item in collection {
            let Some(obj) = item.as_object() else { continue };
            if let Some(listing) = extract_from_json_item(obj) {
                listings.push(listing);
            }
        }
    }

    // Multiple collections may repeat the same listing
    let mut seen: HashSet<String> = HashSet::new();
    listings.retain(|l| seen.insert(l.listing_id.clone()));
    listings
}

/// 从单个JSON列表对象提取记录，字段名按别名表探测
fn extract_from_json_item(item: &Map<String, Value>) -> Option<ScrapedListing> {
    let raw_url = probe_string(item, URL_KEYS).unwrap_or_default();

    let listing_id = match probe(item, ID_KEYS) {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => extract_listing_id(&raw_url)?,
    };

    let title = probe_string(item, TITLE_KEYS)?;

    let url = if raw_url.starts_with("http") {
        raw_url
    } else {
        format!("{}{}", SITE_ORIGIN, raw_url)
    };

    let price = probe(item, PRICE_KEYS).and_then(|price_data| match price_data {
        Value::Object(obj) => probe(obj, PRICE_VALUE_KEYS).and_then(parse_amount),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_price_text(s),
        _ => None,
    });

    let location = probe(item, LOCATION_KEYS).and_then(|loc| match loc {
        Value::Object(obj) => {
            let city = probe_string(obj, &["city"]);
            let province = probe_string(obj, &["province", "region"]);
            let parts: Vec<String> = [city, province].into_iter().flatten().collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
        Value::String(s) => Some(s.clone()),
        _ => None,
    });

    let image_urls = probe(item, IMAGE_KEYS)
        .and_then(Value::as_array)
        .map(|images| collect_image_urls(images, 5))
        .unwrap_or_default();

    let description = probe_string(item, DESCRIPTION_KEYS);

    let seller_name = probe(item, SELLER_KEYS)
        .and_then(Value::as_object)
        .and_then(|seller| probe_string(seller, SELLER_NAME_KEYS));

    let mut listing = ScrapedListing::new(listing_id, url, title);
    listing.price = price;
    listing.location = location;
    listing.image_urls = image_urls;
    listing.description = description;
    listing.seller_name = seller_name;
    Some(listing)
}

fn collect_image_urls(images: &[Value], cap: usize) -> Vec<String> {
    images
        .iter()
        .take(cap)
        .filter_map(|img| match img {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Object(obj) => probe_string(obj, IMAGE_URL_KEYS),
            _ => None,
        })
        .collect()
}

/// 从页面状态JSON判断是否还有下一页，信息缺失时假定有
fn has_next_page_from_data(data: &Value) -> bool {
    let pagination = &data["props"]["pageProps"]["pagination"];
    let Some(obj) = pagination.as_object() else {
        return true;
    };
    let current = probe(obj, &["currentPage", "page"]).and_then(Value::as_i64);
    let total = probe(obj, &["totalPages", "numPages"]).and_then(Value::as_i64);
    match (current, total) {
        (Some(current), Some(total)) => current < total,
        _ => true,
    }
}

/// HTML退化路径：从锚点卡片提取列表
fn parse_html_listings(document: &Html) -> Vec<ScrapedListing> {
    let mut links: Vec<ElementRef> = Vec::new();
    for link in document.select(&ANCHOR_SELECTOR) {
        let href = link.value().attr("href").unwrap_or_default();
        if href.is_empty() {
            continue;
        }
        if extract_listing_id(href).is_some() {
            links.push(link);
            continue;
        }
        let data_testid = link.value().attr("data-testid").unwrap_or_default().to_lowercase();
        if data_testid.contains("listing") && data_testid.contains("title") {
            links.push(link);
        }
    }

    // Same listing appears in several anchors (image + title links)
    let mut seen_hrefs: HashSet<&str> = HashSet::new();
    let mut listings = Vec::new();
    for link in links {
        let href = link.value().attr("href").unwrap_or_default();
        if !seen_hrefs.insert(href) {
            continue;
        }
        match parse_listing_card(link) {
            Some(listing) => listings.push(listing),
            None => debug!("Failed to parse listing card for {}", href),
        }
    }

    listings
}

/// 从一个锚点元素解析列表卡片
fn parse_listing_card(link: ElementRef) -> Option<ScrapedListing> {
    let href = link.value().attr("href")?;
    let listing_id = extract_listing_id(href)?;
    let url = crate::utils::urls::absolutize(SITE_ORIGIN, href);

    // Walk up to the enclosing card container
    let mut card = link;
    for _ in 0..5 {
        let Some(parent) = card.parent().and_then(ElementRef::wrap) else {
            break;
        };
        let name = parent.value().name();
        if name == "html" || name == "body" {
            break;
        }
        card = parent;
    }

    let title = link
        .select(&HEADING_SELECTOR)
        .next()
        .or_else(|| card.select(&HEADING_SELECTOR).next())
        .map(element_text)
        .unwrap_or_else(|| element_text(link));
    if title.len() < 3 {
        return None;
    }

    let price = parse_price_text(&element_text(card));
    let location = extract_location(card);

    let mut image_urls = Vec::new();
    if let Some(img) = link
        .select(&IMG_SELECTOR)
        .next()
        .or_else(|| card.select(&IMG_SELECTOR).next())
    {
        let src = img
            .value()
            .attr("src")
            .or_else(|| img.value().attr("data-src"))
            .unwrap_or_default();
        if !src.is_empty() && !src.starts_with("data:") {
            image_urls.push(src.to_string());
        }
    }

    let mut listing = ScrapedListing::new(listing_id, url, title);
    listing.price = price;
    listing.location = location;
    listing.image_urls = image_urls;
    Some(listing)
}

fn element_text(element: ElementRef) -> String {
    element.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 在卡片内寻找"城市, 省码"形式的地点文本
fn extract_location(card: ElementRef) -> Option<String> {
    for tag in card.select(&TEXT_BLOCK_SELECTOR) {
        let text = element_text(tag);
        if text.len() < 100 && LOCATION_PATTERN.is_match(&text) {
            return Some(text);
        }
    }
    None
}

/// HTML退化路径的下一页判断
fn has_next_page_html(document: &Html) -> bool {
    for link in document.select(&ANCHOR_SELECTOR) {
        if let Some(label) = link.value().attr("aria-label") {
            if label.to_lowercase().contains("next") {
                return true;
            }
        }
    }
    for container in document.select(&PAGINATION_SELECTOR) {
        let Some(label) = container.value().attr("aria-label") else {
            continue;
        };
        if label.to_lowercase().contains("paginat") {
            let text = element_text(container);
            if text.contains("Next") || text.contains('»') || text.contains('›') {
                return true;
            }
        }
    }
    false
}

/// 解析详情页，优先走页面状态JSON
pub fn parse_detail_page(html: &str) -> ListingDetail {
    let document = Html::parse_document(html);

    if let Some(data) = next_data_payload(&document) {
        if let Some(props) = data["props"]["pageProps"].as_object() {
            if let Some(ad) = probe(props, AD_KEYS).and_then(Value::as_object) {
                let mut detail = ListingDetail {
                    description: probe_string(ad, DESCRIPTION_KEYS),
                    seller_name: probe(ad, SELLER_KEYS)
                        .and_then(Value::as_object)
                        .and_then(|seller| probe_string(seller, SELLER_NAME_KEYS)),
                    listing_date: probe_string(ad, DATE_KEYS),
                    image_urls: Vec::new(),
                };
                if let Some(images) = probe(ad, IMAGE_KEYS).and_then(Value::as_array) {
                    detail.image_urls = collect_image_urls(images, 10);
                }
                if !detail.is_empty() {
                    return detail;
                }
            }
        }
    }

    // HTML fallback
    let mut detail = ListingDetail::default();

    if let Some(desc) = document.select(&DESCRIPTION_SELECTOR).next() {
        detail.description = Some(element_text(desc));
    } else {
        for block in document.select(&DETAIL_BLOCK_SELECTOR) {
            let text = element_text(block);
            // Long text block that does not open with a price token
            let head: String = text.chars().take(10).collect();
            if text.len() > 100 && !head.contains('$') {
                detail.description = Some(text.chars().take(2000).collect());
                break;
            }
        }
    }

    if let Some(date_el) = document.select(&TIME_SELECTOR).next() {
        let date = date_el
            .value()
            .attr("datetime")
            .map(str::to_string)
            .unwrap_or_else(|| element_text(date_el));
        if !date.is_empty() {
            detail.listing_date = Some(date);
        }
    }

    detail
}
