// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Uninstallation inspector behavior against a scripted gateway.

mod common;

use std::collections::BTreeMap;
use std::sync::Arc;

use common::{FakeGateway, Tick, APPLICATION, DEPLOYMENT_ID};
use strato_inspect::{
    ApplicationUninstallProbe, LifecycleInspector, ServiceUninstallProbe,
    UninstallationInspector, WaitError,
};
use strato_rest_client::UNDEPLOYED_SUCCESSFULLY_EVENT;

fn running(pairs: &[(&str, u32)]) -> BTreeMap<String, u32> {
    pairs
        .iter()
        .map(|(name, count)| (name.to_string(), *count))
        .collect()
}

fn service_inspector(
    gateway: &Arc<FakeGateway>,
    initial_running: BTreeMap<String, u32>,
    last_event_index: u64,
) -> UninstallationInspector {
    let probe = ServiceUninstallProbe::new(gateway.clone(), APPLICATION);
    UninstallationInspector::new(
        gateway.clone(),
        DEPLOYMENT_ID,
        APPLICATION,
        false,
        initial_running,
        last_event_index,
        Box::new(probe),
    )
}

#[tokio::test(start_paused = true)]
async fn test_uninstall_completes_on_the_sentinel_event() {
    let gateway = Arc::new(FakeGateway::new(
        &[("tomcat", 2)],
        vec![
            Tick::new()
                .with_events(&["stopping tomcat"])
                .with_instances(&[("tomcat", 2)]),
            Tick::new()
                .with_events(&[UNDEPLOYED_SUCCESSFULLY_EVENT])
                .with_gone(&["tomcat"]),
        ],
    ));

    let mut inspector = service_inspector(&gateway, running(&[("tomcat", 2)]), 0);
    inspector.wait_for_lifecycle_to_end(1).await.unwrap();

    // Done on the second tick: sentinel plus the 404 release signal.
    assert_eq!(gateway.events_calls(), 2);
    assert!(inspector.releases().is_done());
    // Per tick one count query and, while tracked, one release query.
    assert_eq!(gateway.description_queries("tomcat"), 4);
}

#[tokio::test(start_paused = true)]
async fn test_unrelated_events_do_not_complete_the_uninstall() {
    let gateway = Arc::new(FakeGateway::new(
        &[("tomcat", 1)],
        vec![
            Tick::new()
                .with_events(&[
                    "stopping tomcat",
                    "instance 1 stopped",
                    "releasing ports",
                    "detaching volume",
                    "undeploy in progress",
                ])
                .with_instances(&[("tomcat", 1)]),
            Tick::new()
                .with_events(&[UNDEPLOYED_SUCCESSFULLY_EVENT])
                .with_gone(&["tomcat"]),
        ],
    ));

    let mut inspector = service_inspector(&gateway, running(&[("tomcat", 1)]), 0);
    inspector.wait_for_lifecycle_to_end(1).await.unwrap();

    // A busy but sentinel-free batch keeps the wait going.
    assert_eq!(gateway.events_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_release_checks_stop_after_the_404() {
    let gateway = Arc::new(FakeGateway::new(
        &[("tomcat", 2)],
        vec![
            Tick::new().with_instances(&[("tomcat", 2)]),
            Tick::new().with_gone(&["tomcat"]),
            Tick::new().with_gone(&["tomcat"]),
            Tick::new()
                .with_gone(&["tomcat"])
                .with_events(&[UNDEPLOYED_SUCCESSFULLY_EVENT]),
        ],
    ));

    let mut inspector = service_inspector(&gateway, running(&[("tomcat", 2)]), 0);
    inspector.wait_for_lifecycle_to_end(1).await.unwrap();

    assert!(inspector.releases().is_done());
    // Four count queries (one per tick), but only two release queries: the
    // one that saw the service and the one that saw the 404. After that the
    // tracker is empty and the check is skipped.
    assert_eq!(gateway.description_queries("tomcat"), 6);
}

#[tokio::test(start_paused = true)]
async fn test_uninstall_skips_preexisting_install_history() {
    let gateway = Arc::new(
        FakeGateway::new(
            &[("tomcat", 1)],
            vec![
                Tick::new()
                    .with_events(&["stopping tomcat"])
                    .with_instances(&[("tomcat", 1)]),
                Tick::new()
                    .with_events(&[UNDEPLOYED_SUCCESSFULLY_EVENT])
                    .with_gone(&["tomcat"]),
            ],
        )
        .with_seed_events(&["installing tomcat", "tomcat started"]),
    );

    // The install produced events 1 and 2; polling starts after them.
    let mut inspector = service_inspector(&gateway, running(&[("tomcat", 1)]), 2);
    inspector.wait_for_lifecycle_to_end(1).await.unwrap();

    assert_eq!(inspector.last_consumed_event_index(), 4);
    assert_eq!(gateway.events_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_uninstall_carries_the_uninstall_message() {
    let gateway = Arc::new(FakeGateway::new(
        &[("tomcat", 1)],
        vec![Tick::new().with_instances(&[("tomcat", 1)])],
    ));

    let mut inspector = service_inspector(&gateway, running(&[("tomcat", 1)]), 0);
    let err = inspector.wait_for_lifecycle_to_end(0).await.unwrap_err();

    match err {
        WaitError::Timeout(message) => {
            assert!(message.contains("Service uninstallation timed out"));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_application_uninstall_tracks_each_service_release() {
    let gateway = Arc::new(FakeGateway::new(
        &[("tomcat", 2), ("mysql", 1)],
        vec![
            Tick::new().with_instances(&[("tomcat", 2), ("mysql", 1)]),
            Tick::new()
                .with_instances(&[("tomcat", 0), ("mysql", 1)])
                .with_gone(&["tomcat"]),
            Tick::new()
                .with_gone(&["tomcat", "mysql"])
                .with_events(&[UNDEPLOYED_SUCCESSFULLY_EVENT]),
        ],
    ));

    let probe = ApplicationUninstallProbe::new(gateway.clone(), APPLICATION);
    let mut inspector = UninstallationInspector::new(
        gateway.clone(),
        DEPLOYMENT_ID,
        APPLICATION,
        false,
        running(&[("tomcat", 2), ("mysql", 1)]),
        0,
        Box::new(probe),
    );

    inspector.wait_for_lifecycle_to_end(1).await.unwrap();

    assert!(inspector.releases().is_done());
    // tomcat: 3 count queries + 2 release queries (present, then 404).
    assert_eq!(gateway.description_queries("tomcat"), 5);
    // mysql: 3 count queries + 3 release queries (released only at the
    // final tick).
    assert_eq!(gateway.description_queries("mysql"), 6);
}
