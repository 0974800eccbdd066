// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::run::RunSummary;
use crate::domain::repositories::config_repository::ConfigRepository;
use crate::domain::repositories::listing_repository::ListingRepository;
use crate::domain::repositories::run_repository::RunRepository;
use crate::domain::services::notifier::WebhookNotifier;
use crate::workers::cycle::{self, CycleError, CycleOptions};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// 协调器可观测状态
#[derive(Debug, Clone, Serialize)]
pub struct CycleStatus {
    /// 是否有周期正在执行
    pub scraping: bool,
    /// 最近一次完成周期的汇总
    pub last_result: Option<RunSummary>,
}

#[derive(Default)]
struct CoordinatorState {
    is_running: bool,
    last_result: Option<RunSummary>,
}

/// 抓取协调器
///
/// 显式的单飞状态对象：同一时刻最多一个周期在运行，并发触发
/// 立即返回忙信号而非排队。后台触发把周期挂到独立任务上，
/// 调用方通过轮询status观察完成
pub struct ScrapeCoordinator {
    listings_repo: Arc<dyn ListingRepository>,
    runs_repo: Arc<dyn RunRepository>,
    config_repo: Arc<dyn ConfigRepository>,
    notifier: Arc<WebhookNotifier>,
    state: Arc<Mutex<CoordinatorState>>,
}

impl ScrapeCoordinator {
    pub fn new(
        listings_repo: Arc<dyn ListingRepository>,
        runs_repo: Arc<dyn RunRepository>,
        config_repo: Arc<dyn ConfigRepository>,
        notifier: Arc<WebhookNotifier>,
    ) -> Self {
        Self {
            listings_repo,
            runs_repo,
            config_repo,
            notifier,
            state: Arc::new(Mutex::new(CoordinatorState::default())),
        }
    }

    /// 在当前任务上执行一个完整周期
    ///
    /// 已有周期运行时立即返回AlreadyRunning
    pub async fn run_cycle(&self, options: CycleOptions) -> Result<RunSummary, CycleError> {
        let _guard = begin(&self.state)?;

        let result = cycle::run_cycle(
            self.listings_repo.as_ref(),
            self.runs_repo.as_ref(),
            self.config_repo.as_ref(),
            self.notifier.as_ref(),
            &options,
        )
        .await;

        if let Ok(summary) = &result {
            self.state.lock().last_result = Some(summary.clone());
        }
        result
    }

    /// 立即触发一个周期，在后台任务上运行
    ///
    /// 调用路径从不阻塞在抓取时长上；完成通过status轮询观察
    pub fn trigger_now(&self, options: CycleOptions) -> Result<(), CycleError> {
        if self.state.lock().is_running {
            return Err(CycleError::AlreadyRunning);
        }

        let listings_repo = self.listings_repo.clone();
        let runs_repo = self.runs_repo.clone();
        let config_repo = self.config_repo.clone();
        let notifier = self.notifier.clone();
        let state = self.state.clone();

        tokio::spawn(async move {
            let _guard = match begin(&state) {
                Ok(guard) => guard,
                Err(e) => {
                    warn!("Triggered scrape rejected: {}", e);
                    return;
                }
            };

            let result = cycle::run_cycle(
                listings_repo.as_ref(),
                runs_repo.as_ref(),
                config_repo.as_ref(),
                notifier.as_ref(),
                &options,
            )
            .await;

            match result {
                Ok(summary) => state.lock().last_result = Some(summary),
                Err(e) => warn!("Triggered scrape failed: {}", e),
            }
        });

        info!("Scrape triggered");
        Ok(())
    }

    /// 立即触发单个查询的周期
    pub fn trigger_query(&self, query_id: i32) -> Result<(), CycleError> {
        self.trigger_now(CycleOptions {
            query_id: Some(query_id),
            ..Default::default()
        })
    }

    /// 当前状态快照
    pub fn status(&self) -> CycleStatus {
        let state = self.state.lock();
        CycleStatus {
            scraping: state.is_running,
            last_result: state.last_result.clone(),
        }
    }
}

fn begin(state: &Arc<Mutex<CoordinatorState>>) -> Result<CycleGuard, CycleError> {
    let mut locked = state.lock();
    if locked.is_running {
        return Err(CycleError::AlreadyRunning);
    }
    locked.is_running = true;
    Ok(CycleGuard {
        state: state.clone(),
    })
}

/// RAII守卫：无论周期正常结束还是出错，都把运行标记放回
struct CycleGuard {
    state: Arc<Mutex<CoordinatorState>>,
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        self.state.lock().is_running = false;
    }
}
