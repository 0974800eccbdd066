// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// 美元价格标记正则，匹配 $1,234.56 / $1234 等形式
static PRICE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\s*([\d,]+(?:\.\d{1,2})?)").expect("price token regex"));

/// Shopify等平台以最小货币单位（分）存储金额的阈值
const MINOR_UNIT_THRESHOLD: f64 = 10_000.0;

/// 从自由文本中解析单个价格
///
/// "free"映射为0；无法解析返回None（"Please Contact"等）
pub fn parse_price_text(text: &str) -> Option<f64> {
    if text.is_empty() {
        return None;
    }
    if text.to_lowercase().contains("free") {
        return Some(0.0);
    }
    let caps = PRICE_TOKEN.captures(text)?;
    caps[1].replace(',', "").parse().ok()
}

/// 从文本中提取所有带$前缀的价格
pub fn extract_all_prices(text: &str) -> Vec<f64> {
    PRICE_TOKEN
        .captures_iter(text)
        .filter_map(|c| c[1].replace(',', "").parse().ok())
        .collect()
}

/// 解析JSON金额值（数字、字符串或null）
pub fn parse_amount(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s
                .trim()
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            if cleaned.is_empty() {
                return None;
            }
            cleaned.parse().ok()
        }
        _ => None,
    }
}

/// 解析可能以分为单位存储的Shopify金额
///
/// 整数形式 >= 10000 视为最小货币单位，除以100
pub fn parse_shopify_money(value: &Value) -> Option<f64> {
    let amount = parse_amount(value)?;
    if amount >= MINOR_UNIT_THRESHOLD {
        Some(amount / 100.0)
    } else {
        Some(amount)
    }
}

/// 从文本推断货币代码
///
/// CAD标记优先于通用的$符号（$在北美站点上两种货币都用）
pub fn detect_currency(text: &str, default: &str) -> String {
    let lowered = text.to_lowercase();
    if lowered.contains("cad") || lowered.contains("ca$") || lowered.contains("c$") {
        return "CAD".to_string();
    }
    if lowered.contains("usd") || lowered.contains("us$") || lowered.contains('$') {
        return "USD".to_string();
    }
    default.to_string()
}
