// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use url::Url;

/// URL路径末段的数字型列表ID（至少6位）
static PATH_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/(\d{6,})(?:$|[/?#])").expect("path id regex"));

/// 纯数字ID校验（至少6位）
static NUMERIC_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{6,}$").expect("numeric id regex"));

/// 识别ID的查询参数名，按优先级排列
const ID_QUERY_KEYS: &[&str] = &["adId", "adid", "listingId", "id"];

/// 本地化子域前缀（ca.qidi3d.com -> qidi3d.com）
const LOCALE_PREFIXES: &[&str] = &["ca", "us", "eu", "uk", "au", "de", "fr", "es", "it", "jp"];

/// 从分类站href中提取数字型列表ID
///
/// 支持 /v-.../1234567890 形式的路径末段，以及
/// /v-view-details.html?adId=1234567890 形式的查询参数
pub fn extract_listing_id(href: &str) -> Option<String> {
    let candidate = href.trim();
    if candidate.is_empty() {
        return None;
    }

    if let Some(caps) = PATH_ID.captures(candidate) {
        return Some(caps[1].to_string());
    }

    // Relative hrefs need a base before Url will parse them
    let parsed = Url::parse(candidate)
        .or_else(|_| Url::parse("https://www.kijiji.ca").and_then(|b| b.join(candidate)))
        .ok()?;
    for key in ID_QUERY_KEYS {
        if let Some((_, value)) = parsed.query_pairs().find(|(k, _)| k == key) {
            if NUMERIC_ID.is_match(&value) {
                return Some(value.into_owned());
            }
        }
    }
    None
}

/// 推断店面来源标签
///
/// 去掉www和本地化前缀后按主机名匹配已知厂商，
/// 未知的Shopify店面退化为子域/顶级标签
pub fn source_from_url(url: &str) -> String {
    let host = match Url::parse(url) {
        Ok(u) => u.host_str().unwrap_or_default().to_lowercase(),
        Err(_) => return "shopify".to_string(),
    };
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();

    let parts: Vec<&str> = host.split('.').collect();
    let host = if parts.len() >= 3 && LOCALE_PREFIXES.contains(&parts[0]) {
        parts[1..].join(".")
    } else {
        host.clone()
    };

    if host.contains("sovol3d.com") {
        return "sovol".to_string();
    }
    if host.contains("formbot3d.com") {
        return "formbot".to_string();
    }
    if host.contains("qidi3d.com") {
        return "qidi3d".to_string();
    }

    let parts: Vec<&str> = host.split('.').collect();
    let base = if parts.len() >= 3 && (parts[0] == "shop" || parts[0] == "store") {
        parts[1].trim()
    } else {
        parts.first().map(|p| p.trim()).unwrap_or("")
    };
    if base.is_empty() {
        "shopify".to_string()
    } else {
        base.to_string()
    }
}

/// 判断查询URL是否指向分类广告站
pub fn is_classifieds_url(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase().contains("kijiji.ca")))
        .unwrap_or(false)
}

/// 为缺少原生ID的店面商品派生稳定ID
///
/// 同一规范化URL在任意次抓取中都映射到同一个键
pub fn stable_listing_id(source: &str, url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    format!("{}:{}", source, &hex::encode(digest)[..16])
}

/// 相对链接转绝对链接，解析失败时原样返回
pub fn absolutize(base: &str, href: &str) -> String {
    match Url::parse(base).and_then(|b| b.join(href)) {
        Ok(u) => u.to_string(),
        Err(_) => href.to_string(),
    }
}
