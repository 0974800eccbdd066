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

use dealrs::config::settings::Settings;
use dealrs::domain::models::settings::RuntimeSettings;
use dealrs::domain::repositories::config_repository::ConfigRepository;
use dealrs::domain::repositories::run_repository::RunRepository;
use dealrs::domain::services::notifier::WebhookNotifier;
use dealrs::infrastructure::database::connection;
use dealrs::infrastructure::repositories::config_repo_impl::ConfigRepositoryImpl;
use dealrs::infrastructure::repositories::listing_repo_impl::ListingRepositoryImpl;
use dealrs::infrastructure::repositories::run_repo_impl::RunRepositoryImpl;
use dealrs::utils::telemetry;
use dealrs::workers::coordinator::ScrapeCoordinator;
use dealrs::workers::cycle::CycleOptions;
use dealrs::workers::scheduler::{wait_for_shutdown, Scheduler};
use migration::{Migrator, MigratorTrait};
use std::sync::Arc;
use tracing::info;

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动调度
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting dealrs...");

    // 2. Load configuration
    let settings = Arc::new(Settings::new()?);
    info!("Configuration loaded");

    // 3. Connect to database
    let db = connection::create_pool(&settings.database).await?;
    let db = Arc::new(db);
    info!("Database connection established");

    // Run database migrations
    info!("Running database migrations...");
    Migrator::up(db.as_ref(), None).await?;
    info!("Database migrations applied");

    // 4. Initialize components
    let listings_repo = Arc::new(ListingRepositoryImpl::new(db.clone()));
    let runs_repo = Arc::new(RunRepositoryImpl::new(db.clone()));
    let config_repo = Arc::new(ConfigRepositoryImpl::new(db.clone()));
    let notifier = Arc::new(WebhookNotifier::new(settings.webhook.secret.clone()));

    // Seed settings, search queries and brand keywords on first run
    config_repo.seed_defaults().await?;

    let coordinator = Arc::new(ScrapeCoordinator::new(
        listings_repo,
        runs_repo.clone(),
        config_repo.clone(),
        notifier,
    ));

    // 5. Start the interval scheduler when enabled
    let runtime = RuntimeSettings::from_map(&config_repo.get_all_settings().await?);
    let mut scheduler = Scheduler::new(coordinator.clone(), config_repo.clone());
    if runtime.scheduler_enabled {
        scheduler.start(runtime.scrape_interval_hours).await;

        // An empty run log means a fresh install: kick one cycle off now
        if runs_repo.run_count().await? == 0 {
            let _ = coordinator.trigger_now(CycleOptions::default());
        }
    }

    info!("dealrs is running; press ctrl-c to stop");
    wait_for_shutdown().await;

    // Stop in-memory scheduling only, keep the persisted setting
    scheduler.stop(false).await;
    Ok(())
}
