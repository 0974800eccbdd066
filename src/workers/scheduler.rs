// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::repositories::config_repository::ConfigRepository;
use crate::workers::coordinator::ScrapeCoordinator;
use crate::workers::cycle::CycleOptions;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// 后台定时调度器
///
/// 按固定间隔在独立任务上触发抓取周期。间隔在启动时确定，
/// 修改间隔需要重启调度器
pub struct Scheduler {
    coordinator: Arc<ScrapeCoordinator>,
    config_repo: Arc<dyn ConfigRepository>,
    handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new(coordinator: Arc<ScrapeCoordinator>, config_repo: Arc<dyn ConfigRepository>) -> Self {
        Self {
            coordinator,
            config_repo,
            handle: None,
        }
    }

    /// 启动调度循环并持久化启用标记
    pub async fn start(&mut self, interval_hours: f64) {
        self.stop_task();

        let interval = Duration::from_secs_f64(interval_hours.max(0.01) * 3600.0);
        let coordinator = self.coordinator.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                info!("Scheduled scrape starting...");
                if let Err(e) = coordinator.run_cycle(CycleOptions::default()).await {
                    warn!("Scheduled scrape failed: {}", e);
                }
            }
        });
        self.handle = Some(handle);

        if let Err(e) = self.config_repo.set_setting("scheduler_enabled", json!(true)).await {
            error!("Failed to persist scheduler setting: {}", e);
        }
        info!("Scheduler started: scraping every {}h", interval_hours);
    }

    /// 停止调度循环
    ///
    /// disable=false时仅停掉内存中的调度，不改持久化设置
    pub async fn stop(&mut self, disable: bool) {
        self.stop_task();
        if disable {
            if let Err(e) = self.config_repo.set_setting("scheduler_enabled", json!(false)).await {
                error!("Failed to persist scheduler setting: {}", e);
            }
        }
        info!("Scheduler stopped");
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }

    fn stop_task(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// 等待关闭信号
///
/// 监听ctrl-c并优雅退出
pub async fn wait_for_shutdown() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
}
