// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde_json::{Map, Value};
use std::collections::VecDeque;

/// 列表对象的字段别名表，按探测优先级排列
///
/// 站点改版时字段名经常在这些别名间漂移，提取时按固定顺序
/// 取第一个存在且非空的值
pub const ID_KEYS: &[&str] = &["id", "adId", "listingId"];
pub const TITLE_KEYS: &[&str] = &["title", "name"];
pub const URL_KEYS: &[&str] = &["url", "seoUrl", "href"];
pub const PRICE_KEYS: &[&str] = &["price", "amount", "priceInfo"];
pub const PRICE_VALUE_KEYS: &[&str] = &["amount", "value"];
pub const LOCATION_KEYS: &[&str] = &["location", "address"];
pub const IMAGE_KEYS: &[&str] = &["images", "imageUrls", "photos"];
pub const IMAGE_URL_KEYS: &[&str] = &["href", "url", "src"];
pub const DESCRIPTION_KEYS: &[&str] = &["description", "body"];
pub const SELLER_KEYS: &[&str] = &["seller", "poster", "user"];
pub const SELLER_NAME_KEYS: &[&str] = &["name", "displayName"];

/// 页面状态JSON中常见的列表集合包装键
const COLLECTION_KEYS: &[&str] = &["listings", "ads", "results", "searchResults", "items", "data"];

/// 判定集合时抽样的最大元素数
const SAMPLE_SIZE: usize = 8;

/// 按别名顺序探测第一个存在且非空的值
pub fn probe<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    for key in keys {
        if let Some(value) = obj.get(*key) {
            let empty = match value {
                Value::Null => true,
                Value::String(s) => s.is_empty(),
                Value::Array(a) => a.is_empty(),
                Value::Object(o) => o.is_empty(),
                _ => false,
            };
            if !empty {
                return Some(value);
            }
        }
    }
    None
}

/// probe的字符串便捷形式
pub fn probe_string(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    probe(obj, keys).and_then(|v| v.as_str()).map(str::to_string)
}

/// 在负载树中查找所有疑似列表结果集的数组
///
/// 显式工作队列遍历（深层嵌套的JSON上不冒递归深度风险）。
/// 对象节点先按已知包装键命中，再入队所有子值；数组节点
/// 自身先判定，再入队元素
pub fn find_listing_collections(root: &Value) -> Vec<&Vec<Value>> {
    let mut found: Vec<&Vec<Value>> = Vec::new();
    let mut queue: VecDeque<&Value> = VecDeque::new();
    queue.push_back(root);

    while let Some(node) = queue.pop_front() {
        match node {
            Value::Object(map) => {
                for key in COLLECTION_KEYS {
                    if let Some(Value::Array(items)) = map.get(*key) {
                        if looks_like_listing_collection(items) {
                            found.push(items);
                        }
                    }
                }
                for value in map.values() {
                    queue.push_back(value);
                }
            }
            Value::Array(items) => {
                if looks_like_listing_collection(items) {
                    found.push(items);
                }
                for value in items {
                    queue.push_back(value);
                }
            }
            _ => {}
        }
    }

    found
}

/// 集合判定启发式：抽样对象中至少一半暴露
/// (ID类字段且标题类字段) 或 (URL类字段且标题类字段)
fn looks_like_listing_collection(items: &[Value]) -> bool {
    if items.is_empty() {
        return false;
    }
    let sample: Vec<&Map<String, Value>> = items
        .iter()
        .take(SAMPLE_SIZE)
        .filter_map(Value::as_object)
        .collect();
    if sample.is_empty() {
        return false;
    }

    let hits = sample
        .iter()
        .filter(|item| {
            let has_title = probe(item, TITLE_KEYS).is_some();
            has_title && (probe(item, ID_KEYS).is_some() || probe(item, URL_KEYS).is_some())
        })
        .count();

    hits >= std::cmp::max(1, sample.len() / 2)
}

/// 在负载树中查找给定键下的所有数组（如Shopify的variants）
pub fn find_arrays_under_key<'a>(root: &'a Value, key: &str) -> Vec<&'a Vec<Value>> {
    let mut found: Vec<&Vec<Value>> = Vec::new();
    let mut queue: VecDeque<&Value> = VecDeque::new();
    queue.push_back(root);

    while let Some(node) = queue.pop_front() {
        match node {
            Value::Object(map) => {
                if let Some(Value::Array(items)) = map.get(key) {
                    found.push(items);
                }
                for value in map.values() {
                    queue.push_back(value);
                }
            }
            Value::Array(items) => {
                for value in items {
                    queue.push_back(value);
                }
            }
            _ => {}
        }
    }

    found
}
