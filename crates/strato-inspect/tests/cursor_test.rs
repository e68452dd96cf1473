// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Event cursor behavior against a scripted gateway.

mod common;

use common::{FakeGateway, Tick, DEPLOYMENT_ID};
use strato_inspect::EventCursor;

#[tokio::test(start_paused = true)]
async fn test_cursor_returns_each_event_exactly_once_in_order() {
    let gateway = FakeGateway::new(
        &[],
        vec![
            Tick::new().with_events(&["planning deployment", "allocating machine"]),
            Tick::new().with_events(&["starting instance 1"]),
            Tick::new(),
        ],
    );
    let mut cursor = EventCursor::new();

    let first = cursor.fetch_new(&gateway, DEPLOYMENT_ID).await.unwrap();
    assert_eq!(first, vec!["planning deployment", "allocating machine"]);
    assert_eq!(cursor.last_consumed_index(), 2);

    // Nothing new within the same tick.
    let steady = cursor.fetch_new(&gateway, DEPLOYMENT_ID).await.unwrap();
    assert!(steady.is_empty());
    assert_eq!(cursor.last_consumed_index(), 2);

    gateway.advance_tick();
    let second = cursor.fetch_new(&gateway, DEPLOYMENT_ID).await.unwrap();
    assert_eq!(second, vec!["starting instance 1"]);
    assert_eq!(cursor.last_consumed_index(), 3);

    gateway.advance_tick();
    let quiet = cursor.fetch_new(&gateway, DEPLOYMENT_ID).await.unwrap();
    assert!(quiet.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_repeated_empty_fetches_are_normal() {
    let gateway = FakeGateway::new(&[], vec![Tick::new()]);
    let mut cursor = EventCursor::new();

    for _ in 0..5 {
        let batch = cursor.fetch_new(&gateway, DEPLOYMENT_ID).await.unwrap();
        assert!(batch.is_empty());
        assert_eq!(cursor.last_consumed_index(), 0);
    }
}

#[tokio::test(start_paused = true)]
async fn test_cursor_resumes_after_preexisting_history() {
    let gateway = FakeGateway::new(
        &[],
        vec![Tick::new().with_events(&["stopping tomcat"])],
    )
    .with_seed_events(&["installing tomcat", "instance 1 started", "service started"]);

    // Resuming after index 3 skips the install history entirely.
    let mut cursor = EventCursor::resume_after(3);
    let batch = cursor.fetch_new(&gateway, DEPLOYMENT_ID).await.unwrap();
    assert_eq!(batch, vec!["stopping tomcat"]);
    assert_eq!(cursor.last_consumed_index(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_capped_batch_still_advances_to_the_newest_event() {
    let seed: Vec<String> = (1..=150).map(|i| format!("event {}", i)).collect();
    let seed_refs: Vec<&str> = seed.iter().map(String::as_str).collect();
    let gateway = FakeGateway::new(&[], vec![Tick::new()]).with_seed_events(&seed_refs);

    let mut cursor = EventCursor::new();
    let batch = cursor.fetch_new(&gateway, DEPLOYMENT_ID).await.unwrap();

    // The gateway window keeps the newest 100 events; the cursor lands on
    // the newest index either way.
    assert_eq!(batch.len(), 100);
    assert_eq!(batch.first().map(String::as_str), Some("event 51"));
    assert_eq!(batch.last().map(String::as_str), Some("event 150"));
    assert_eq!(cursor.last_consumed_index(), 150);
}
