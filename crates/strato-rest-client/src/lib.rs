// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Strato REST client
//!
//! Typed wrappers over the strato admin gateway's deployment API.
//!
//! The gateway exposes install/uninstall triggers and read-only inspection
//! endpoints (deployment events, service and application descriptions). This
//! crate owns the wire concerns only: URL construction, JSON mapping and the
//! error taxonomy. Lifecycle polling on top of these calls lives in
//! `strato-inspect`.
//!
//! # Example
//!
//! ```no_run
//! use strato_rest_client::{RestClient, RestClientConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = RestClient::new(RestClientConfig::from_env()?)?;
//!
//! let description = client.service_description("petclinic", "tomcat").await?;
//! println!(
//!     "{} instances of {} running",
//!     description.instance_count, description.service_name
//! );
//!
//! let events = client.deployment_events(&description.deployment_id, 1).await?;
//! for event in &events.events {
//!     println!("[{}] {}", event.index, event.description);
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;
mod types;

pub use client::RestClient;
pub use config::RestClientConfig;
pub use error::{RestClientError, Result};
pub use types::{
    ApplicationDescription, DeploymentEvent, DeploymentEvents, DeploymentState,
    InstallApplicationRequest, InstallApplicationResponse, InstallServiceRequest,
    InstallServiceResponse, ServiceDescription, UninstallApplicationResponse,
    UninstallServiceResponse, MAX_EVENTS_PER_BATCH, UNDEPLOYED_SUCCESSFULLY_EVENT,
};
