// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::helpers::TestContext;
use chrono::Utc;
use dealrs::domain::repositories::run_repository::RunRepository;

#[tokio::test]
async fn run_record_stays_open_until_finished() {
    let ctx = TestContext::new().await;

    let run_id = ctx.runs.start_run("3d printer, prusa", Utc::now()).await.unwrap();

    // An aborted cycle leaves exactly this state behind: the record
    // exists but has no finished_at and zeroed counts
    let open = ctx.runs.latest_run().await.unwrap().unwrap();
    assert_eq!(open.id, run_id);
    assert!(open.finished_at.is_none());
    assert_eq!(open.listings_found, 0);

    ctx.runs.finish_run(run_id, 12, 3, 2, 1).await.unwrap();

    let closed = ctx.runs.latest_run().await.unwrap().unwrap();
    assert!(closed.finished_at.is_some());
    assert_eq!(closed.listings_found, 12);
    assert_eq!(closed.new_listings, 3);
    assert_eq!(closed.price_changes, 2);
    assert_eq!(closed.errors, 1);
}

#[tokio::test]
async fn finishing_unknown_run_is_not_found() {
    let ctx = TestContext::new().await;
    assert!(ctx.runs.finish_run(999, 0, 0, 0, 0).await.is_err());
}
