// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Incremental access to a deployment's event log.

use strato_rest_client::{Result, UNDEPLOYED_SUCCESSFULLY_EVENT};

use crate::gateway::AdminGateway;

/// Cursor over a deployment's lifecycle events.
///
/// Lifecycle operations can run for minutes; re-reading the full event
/// history on every poll would duplicate output and work. The cursor turns
/// the unbounded log into a diff feed: each fetch asks the gateway for
/// events after the last index already consumed and advances past whatever
/// comes back. The consumed index never moves backwards.
#[derive(Debug, Clone, Default)]
pub struct EventCursor {
    last_consumed_index: u64,
}

impl EventCursor {
    /// Cursor that has consumed nothing yet (starts at the log's beginning).
    pub fn new() -> Self {
        Self::default()
    }

    /// Cursor resuming after `index`.
    ///
    /// Used when a deployment already has history; an uninstall starts
    /// polling after the last event the install produced.
    pub fn resume_after(index: u64) -> Self {
        Self {
            last_consumed_index: index,
        }
    }

    /// Index of the last event this cursor has consumed (0 = none).
    pub fn last_consumed_index(&self) -> u64 {
        self.last_consumed_index
    }

    /// Fetch descriptions of events not yet seen, in index order.
    ///
    /// An empty result is the normal steady state between lifecycle steps,
    /// not a fault; calling this repeatedly with no new data is fine.
    pub async fn fetch_new(
        &mut self,
        gateway: &dyn AdminGateway,
        deployment_id: &str,
    ) -> Result<Vec<String>> {
        let events = gateway
            .deployment_events(deployment_id, self.last_consumed_index + 1)
            .await?;

        if events.is_empty() {
            return Ok(Vec::new());
        }

        if let Some(last_index) = events.last_index() {
            self.last_consumed_index = last_index;
        }
        Ok(events.descriptions())
    }

    /// Whether a freshly fetched batch contains the uninstall sentinel.
    pub fn batch_marks_undeployed(descriptions: &[String]) -> bool {
        descriptions
            .iter()
            .any(|description| description == UNDEPLOYED_SUCCESSFULLY_EVENT)
    }
}
