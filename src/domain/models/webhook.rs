// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Webhook事件负载的模式版本
const SCHEMA_VERSION: u32 = 1;

/// Webhook事件类型枚举
///
/// 抓取生命周期事件，投递给外部通知端点
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventType {
    /// 抓取周期完成（无论是否有错误都会发出）
    ScrapeCompleted,
    /// 抓取周期失败或周期内出现查询错误
    ScrapeFailed,
    /// 检测到符合通知阈值的新交易
    NewDealDetected,
}

impl fmt::Display for WebhookEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebhookEventType::ScrapeCompleted => write!(f, "scrape_completed"),
            WebhookEventType::ScrapeFailed => write!(f, "scrape_failed"),
            WebhookEventType::NewDealDetected => write!(f, "new_deal_detected"),
        }
    }
}

/// 待投递的Webhook事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// 事件类型
    pub event_type: WebhookEventType,
    /// 事件负载数据
    pub data: Value,
}

impl WebhookEvent {
    pub fn new(event_type: WebhookEventType, data: Value) -> Self {
        Self { event_type, data }
    }

    /// 构造规范化信封，发送时间戳在此刻生成
    pub fn envelope(&self) -> Value {
        json!({
            "event": self.event_type.to_string(),
            "timestamp": Utc::now().to_rfc3339(),
            "schema_version": SCHEMA_VERSION,
            "data": self.data,
        })
    }
}
