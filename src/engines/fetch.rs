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

use crate::config::defaults::USER_AGENTS;
use rand::prelude::IndexedRandom;
use rand::Rng;
use reqwest::header;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// 单个请求的超时
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// 收到429后，放弃该来源前的固定冷却时间
pub const RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(30);

/// 抓取错误类型
#[derive(Error, Debug)]
pub enum FetchError {
    /// 反爬拦截（403）：中止该来源的翻页，对周期非致命
    #[error("Blocked (403) at {0}")]
    Blocked(String),
    /// 限流（429）：冷却后中止该来源
    #[error("Rate limited (429) at {0}")]
    RateLimited(String),
    /// 其他非200状态
    #[error("Got status {status} for {url}")]
    Status { status: u16, url: String },
    /// 网络错误
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
}

/// 页面抓取器
///
/// 每个请求之前在[delay_min, delay_max]秒内随机暂停并轮换
/// User-Agent。同一周期内的请求共享cookie存储
pub struct PageFetcher {
    /// HTTP客户端
    client: reqwest::Client,
    delay_min: f64,
    delay_max: f64,
}

impl PageFetcher {
    pub fn new(delay_min: f64, delay_max: f64) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .cookie_store(true)
                .build()
                .expect("reqwest client"),
            delay_min: delay_min.max(0.0),
            delay_max: delay_max.max(delay_min.max(0.0)),
        }
    }

    /// 抓取一个页面并返回响应体
    ///
    /// 403/429/非200状态映射到对应的错误变体，由调用方决定
    /// 翻页是否继续
    pub async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        self.pause().await;

        let user_agent = Self::random_user_agent();
        debug!("GET {} ({})", url, &user_agent[..40.min(user_agent.len())]);

        let response = self
            .client
            .get(url)
            .header(header::USER_AGENT, user_agent)
            .send()
            .await?;

        let status = response.status().as_u16();
        match status {
            200 => Ok(response.text().await?),
            403 => Err(FetchError::Blocked(url.to_string())),
            429 => Err(FetchError::RateLimited(url.to_string())),
            _ => Err(FetchError::Status {
                status,
                url: url.to_string(),
            }),
        }
    }

    /// 请求节奏：在配置区间内随机暂停
    async fn pause(&self) {
        if self.delay_max <= 0.0 {
            return;
        }
        let secs = if self.delay_max > self.delay_min {
            rand::rng().random_range(self.delay_min..self.delay_max)
        } else {
            self.delay_min
        };
        if secs > 0.0 {
            tokio::time::sleep(Duration::from_secs_f64(secs)).await;
        }
    }

    fn random_user_agent() -> &'static str {
        USER_AGENTS
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or(USER_AGENTS[0])
    }
}
