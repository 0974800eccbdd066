// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::settings::RuntimeSettings;
use crate::domain::models::webhook::WebhookEvent;
use crate::utils::retry::RetryPolicy;
use hmac::{Hmac, Mac};
use reqwest::{header, Client};
use sha2::Sha256;
use std::time::Duration;
use tracing::{debug, warn};

type HmacSha256 = Hmac<Sha256>;

/// 单次投递的HTTP超时
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Webhook通知器
///
/// 面向核心是发后不理的：投递失败记录日志后吞掉，从不上抛。
/// 负载带HMAC-SHA256签名头，接收方可验证来源
pub struct WebhookNotifier {
    /// HTTP客户端
    client: Client,
    /// 签名密钥
    secret: String,
    /// 固定序列重试策略
    policy: RetryPolicy,
}

impl WebhookNotifier {
    pub fn new(secret: String) -> Self {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static("Dealrs-Webhook/0.1.0"),
        );
        Self {
            client: Client::builder()
                .default_headers(headers)
                .build()
                .expect("reqwest client"),
            secret,
            policy: RetryPolicy::webhook(),
        }
    }

    /// 覆盖重试策略
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// 发出一个生命周期事件
    ///
    /// 未启用、未配置URL或事件类型被过滤时静默跳过。
    /// 返回是否成功投递，调用方通常忽略返回值
    pub async fn emit(&self, settings: &RuntimeSettings, event: WebhookEvent) -> bool {
        if !settings.webhook_enabled || settings.webhook_url.is_empty() {
            return false;
        }
        if !settings
            .webhook_events
            .iter()
            .any(|e| e == &event.event_type.to_string())
        {
            debug!("Webhook event {} filtered by settings", event.event_type);
            return false;
        }

        let envelope = event.envelope();
        let body = envelope.to_string();

        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(body.as_bytes());
        let signature_hex = hex::encode(mac.finalize().into_bytes());

        for attempt in 0..self.policy.max_attempts() {
            let response = self
                .client
                .post(&settings.webhook_url)
                .header("X-Dealrs-Signature", &signature_hex)
                .header("X-Dealrs-Event", event.event_type.to_string())
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.clone())
                .timeout(DELIVERY_TIMEOUT)
                .send()
                .await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    debug!("Webhook event {} delivered", event.event_type);
                    return true;
                }
                Ok(resp) => {
                    warn!(
                        "Webhook event {} got status {} (attempt {})",
                        event.event_type,
                        resp.status(),
                        attempt + 1
                    );
                }
                Err(e) => {
                    warn!(
                        "Webhook event {} delivery error (attempt {}): {}",
                        event.event_type,
                        attempt + 1,
                        e
                    );
                }
            }

            match self.policy.backoff_for(attempt) {
                Some(delay) => tokio::time::sleep(delay).await,
                // Sequence exhausted: give up silently
                None => break,
            }
        }

        false
    }
}
