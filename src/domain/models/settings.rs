// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde_json::Value;
use std::collections::HashMap;

/// 一个抓取周期内生效的运行期设置快照
///
/// 周期开始时从settings表读取一次并向下传递，周期内保持一致，
/// 即使配置在周期中途被修改
#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub max_pages_per_query: u32,
    pub request_delay_min: f64,
    pub request_delay_max: f64,
    pub inactive_threshold: i32,
    pub scrape_interval_hours: f64,
    pub scheduler_enabled: bool,
    /// 货币代码 -> 对美元汇率
    pub fx_rates_to_usd: HashMap<String, f64>,
    pub webhook_enabled: bool,
    pub webhook_url: String,
    /// 允许投递的事件类型名
    pub webhook_events: Vec<String>,
    pub deal_max_retail_ratio: f64,
    pub deal_min_drop_pct: f64,
    pub deal_batch_size: usize,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            max_pages_per_query: 5,
            request_delay_min: 2.0,
            request_delay_max: 5.0,
            inactive_threshold: 3,
            scrape_interval_hours: 6.0,
            scheduler_enabled: false,
            fx_rates_to_usd: HashMap::from([("USD".to_string(), 1.0)]),
            webhook_enabled: false,
            webhook_url: String::new(),
            webhook_events: vec![
                "scrape_completed".to_string(),
                "scrape_failed".to_string(),
                "new_deal_detected".to_string(),
            ],
            deal_max_retail_ratio: 0.9,
            deal_min_drop_pct: 15.0,
            deal_batch_size: 5,
        }
    }
}

impl RuntimeSettings {
    /// 从settings表的键值映射构建，缺失或类型不符的键保持默认值
    pub fn from_map(map: &HashMap<String, Value>) -> Self {
        let mut settings = Self::default();

        if let Some(v) = map.get("max_pages_per_query").and_then(Value::as_u64) {
            settings.max_pages_per_query = v as u32;
        }
        if let Some(v) = map.get("request_delay_min").and_then(Value::as_f64) {
            settings.request_delay_min = v;
        }
        if let Some(v) = map.get("request_delay_max").and_then(Value::as_f64) {
            settings.request_delay_max = v;
        }
        if let Some(v) = map.get("inactive_threshold").and_then(Value::as_i64) {
            settings.inactive_threshold = v as i32;
        }
        if let Some(v) = map.get("scrape_interval_hours").and_then(Value::as_f64) {
            settings.scrape_interval_hours = v;
        }
        if let Some(v) = map.get("scheduler_enabled").and_then(Value::as_bool) {
            settings.scheduler_enabled = v;
        }
        if let Some(rates) = map.get("fx_rates_to_usd").and_then(Value::as_object) {
            settings.fx_rates_to_usd = rates
                .iter()
                .filter_map(|(k, v)| v.as_f64().map(|r| (k.to_uppercase(), r)))
                .collect();
        }
        if let Some(v) = map.get("webhook_enabled").and_then(Value::as_bool) {
            settings.webhook_enabled = v;
        }
        if let Some(v) = map.get("webhook_url").and_then(Value::as_str) {
            settings.webhook_url = v.trim().to_string();
        }
        if let Some(events) = map.get("webhook_events").and_then(Value::as_array) {
            settings.webhook_events = events
                .iter()
                .filter_map(|e| e.as_str().map(str::to_string))
                .collect();
        }
        if let Some(v) = map
            .get("webhook_deal_max_price_to_retail_ratio")
            .and_then(Value::as_f64)
        {
            settings.deal_max_retail_ratio = v;
        }
        if let Some(v) = map.get("webhook_deal_min_drop_pct").and_then(Value::as_f64) {
            settings.deal_min_drop_pct = v;
        }
        if let Some(v) = map.get("webhook_deal_batch_size").and_then(Value::as_u64) {
            settings.deal_batch_size = v as usize;
        }

        settings
    }
}
