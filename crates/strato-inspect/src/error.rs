// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for lifecycle inspection.

use strato_rest_client::RestClientError;
use thiserror::Error;

/// Errors raised while inspecting a deployment lifecycle.
#[derive(Debug, Error)]
pub enum InspectError {
    /// A gateway call failed during polling.
    ///
    /// Carries the most detailed diagnostic text the gateway provided, not
    /// the raw transport error.
    #[error("{message}")]
    Remote { message: String },

    /// The gateway reported the deployment as failed.
    #[error("failed to deploy {kind} {name}")]
    DeploymentFailed { kind: &'static str, name: String },

    /// More instances observed than the deployment plan allows.
    #[error(
        "service {service_name} reports {running} running instances, but only {planned} were planned"
    )]
    MoreInstancesThanPlanned {
        service_name: String,
        running: u32,
        planned: u32,
    },
}

impl From<RestClientError> for InspectError {
    fn from(err: RestClientError) -> Self {
        InspectError::Remote {
            message: err.verbose_message(),
        }
    }
}
