// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Wire types for the admin gateway's deployment API.

use serde::{Deserialize, Serialize};

/// Maximum number of events the gateway returns in one batch.
///
/// The event log behaves as a sliding window: when a batch would exceed this
/// capacity, the oldest events are evicted first. Callers page through larger
/// histories by advancing their cursor and fetching again.
pub const MAX_EVENTS_PER_BATCH: usize = 100;

/// Event description the gateway publishes when an uninstall has fully
/// completed. The uninstallation inspector matches it verbatim.
pub const UNDEPLOYED_SUCCESSFULLY_EVENT: &str = "Successfully undeployed";

/// One lifecycle log line of a deployment.
///
/// `index` is assigned by the gateway and increases monotonically within a
/// deployment; it is the ordering and cursor key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentEvent {
    pub description: String,
    pub index: u64,
}

impl DeploymentEvent {
    pub fn new(description: impl Into<String>, index: u64) -> Self {
        Self {
            description: description.into(),
            index,
        }
    }
}

/// An ordered batch of deployment events, as returned per poll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentEvents {
    pub events: Vec<DeploymentEvent>,
}

impl DeploymentEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event, evicting the oldest one once the batch capacity is
    /// reached.
    pub fn push(&mut self, event: DeploymentEvent) {
        if self.events.len() == MAX_EVENTS_PER_BATCH {
            self.events.remove(0);
        }
        self.events.push(event);
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Index of the last event in the batch, if any.
    pub fn last_index(&self) -> Option<u64> {
        self.events.last().map(|event| event.index)
    }

    /// The event descriptions, in batch order.
    pub fn descriptions(&self) -> Vec<String> {
        self.events
            .iter()
            .map(|event| event.description.clone())
            .collect()
    }
}

/// Deployment progress as reported by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentState {
    /// Lifecycle still in progress.
    InProgress,
    /// All processing units reached their running state.
    Started,
    /// The deployment failed.
    Failed,
}

impl DeploymentState {
    pub fn is_failed(&self) -> bool {
        matches!(self, DeploymentState::Failed)
    }
}

/// Gateway-side view of one deployed service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDescription {
    pub service_name: String,
    pub application_name: String,
    /// Deployment the service currently belongs to.
    pub deployment_id: String,
    /// Instances currently running.
    pub instance_count: u32,
    /// Instances the deployment plan calls for.
    pub planned_instances: u32,
    pub service_state: DeploymentState,
}

/// Gateway-side view of a deployed application and its services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationDescription {
    pub application_name: String,
    pub application_state: DeploymentState,
    pub services: Vec<ServiceDescription>,
}

/// Body of an install-service request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallServiceRequest {
    pub planned_instances: u32,
    pub timeout_minutes: u32,
}

/// Body of an install-application request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallApplicationRequest {
    pub timeout_minutes: u32,
}

/// Response to an accepted install-service request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallServiceResponse {
    /// Identifier of the freshly allocated deployment.
    pub deployment_id: String,
}

/// Response to an accepted install-application request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallApplicationResponse {
    pub deployment_id: String,
}

/// Response to an accepted uninstall-service request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UninstallServiceResponse {
    pub deployment_id: String,
}

/// Response to an accepted uninstall-application request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UninstallApplicationResponse {
    pub deployment_id: String,
}
