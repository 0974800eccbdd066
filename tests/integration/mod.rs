// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 集成测试套件
//!
//! 在内存SQLite和wiremock HTTP夹具上端到端地驱动抓取周期、
//! 仓库语义与Webhook投递

mod helpers;

mod config_repo_test;
mod cycle_test;
mod listing_repo_test;
mod retail_prices_test;
mod run_log_test;
mod scrape_search_test;
mod webhook_test;
