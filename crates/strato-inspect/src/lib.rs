// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Strato lifecycle inspection
//!
//! The polling engine that turns the admin gateway's eventually-consistent
//! view of an install or uninstall into a deterministic outcome: done,
//! timed out, cancelled or failed.
//!
//! Building blocks, smallest first:
//!
//! - [`latch`]: a generic poll-until-done primitive with a hard timeout, a
//!   fixed polling cadence and cooperative cancellation. Domain-free and
//!   reused wherever something remote needs to be waited on.
//! - [`EventCursor`]: incremental access to a deployment's event log:
//!   every poll only returns events the caller has not seen yet.
//! - [`InstallationInspector`] / [`UninstallationInspector`]: drive the
//!   latch with a predicate that reports instance-count progress, prints
//!   fresh lifecycle events and decides whether the lifecycle has ended.
//!   The per-domain queries (what counts as "running", when a lifecycle is
//!   over) are injected as [`InstallProbe`] / [`UninstallProbe`] strategies.
//!
//! # Example
//!
//! ```no_run
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//!
//! use strato_inspect::{
//!     InstallationInspector, InstanceCounts, LifecycleInspector, ServiceInstallProbe,
//! };
//! use strato_rest_client::{RestClient, RestClientConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let gateway = Arc::new(RestClient::new(RestClientConfig::from_env()?)?);
//!
//! let planned = BTreeMap::from([("tomcat".to_string(), 2)]);
//! let probe = ServiceInstallProbe::new(gateway.clone(), "petclinic", "tomcat");
//! let mut inspector = InstallationInspector::new(
//!     gateway,
//!     "dep-42",
//!     false,
//!     InstanceCounts::starting_from_zero(planned),
//!     Box::new(probe),
//! );
//!
//! inspector.wait_for_lifecycle_to_end(5).await?;
//! # Ok(())
//! # }
//! ```

mod cursor;
mod display;
mod error;
mod gateway;
mod install;
pub mod latch;
mod uninstall;

pub use cursor::EventCursor;
pub use display::EventsDisplayer;
pub use error::InspectError;
pub use gateway::AdminGateway;
pub use install::{
    ApplicationInstallProbe, InstallProbe, InstallationInspector, InstanceCounts,
    LifecycleInspector, ServiceInstallProbe,
};
pub use latch::{LatchConfig, Predicate, WaitError};
pub use uninstall::{
    ApplicationUninstallProbe, ReleaseTracker, ServiceUninstallProbe, UninstallProbe,
    UninstallationInspector,
};
