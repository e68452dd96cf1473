// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Uninstallation lifecycle inspection.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cursor::EventCursor;
use crate::display::EventsDisplayer;
use crate::error::InspectError;
use crate::gateway::AdminGateway;
use crate::install::{InstanceCounts, LifecycleInspector};
use crate::latch::{wait_for, Predicate, WaitError};

const SERVICE_UNINSTALL_TIMEOUT_MESSAGE: &str =
    "Service uninstallation timed out. Configure the timeout using the --timeout flag.";
const APPLICATION_UNINSTALL_TIMEOUT_MESSAGE: &str =
    "Application uninstallation timed out. Configure the timeout using the --timeout flag.";

/// Services whose underlying cluster resources have not been confirmed
/// released yet.
///
/// A service leaves the set the first time its description query answers
/// 404, meaning the cluster resource is gone. It never re-enters, and once
/// the set is empty no further release checks are issued.
#[derive(Debug)]
pub struct ReleaseTracker {
    pending: BTreeSet<String>,
}

impl ReleaseTracker {
    pub fn new(service_names: impl IntoIterator<Item = String>) -> Self {
        Self {
            pending: service_names.into_iter().collect(),
        }
    }

    /// True once every service's resources are confirmed released.
    pub fn is_done(&self) -> bool {
        self.pending.is_empty()
    }

    /// Services still awaiting confirmation, in stable order.
    pub fn pending(&self) -> Vec<String> {
        self.pending.iter().cloned().collect()
    }

    /// Record a confirmed release. Returns true when this was news.
    pub fn mark_released(&mut self, service_name: &str) -> bool {
        self.pending.remove(service_name)
    }
}

/// Domain-specific count query injected into the uninstallation inspector.
///
/// Uninstalls terminate processing units almost instantly, so there is no
/// "ended" decision to delegate; completion is signalled by a dedicated
/// lifecycle event. Only the instance counting differs per variant.
#[async_trait]
pub trait UninstallProbe: Send + Sync {
    /// Number of instances still up for the given service.
    async fn running_instances(&self, service_name: &str) -> Result<u32, InspectError>;

    /// Message attached to a timed-out wait.
    fn timeout_error_message(&self) -> String;
}

/// Uninstall probe for a single service.
pub struct ServiceUninstallProbe {
    gateway: Arc<dyn AdminGateway>,
    application_name: String,
}

impl ServiceUninstallProbe {
    pub fn new(gateway: Arc<dyn AdminGateway>, application_name: impl Into<String>) -> Self {
        Self {
            gateway,
            application_name: application_name.into(),
        }
    }
}

#[async_trait]
impl UninstallProbe for ServiceUninstallProbe {
    async fn running_instances(&self, service_name: &str) -> Result<u32, InspectError> {
        match self
            .gateway
            .service_description(&self.application_name, service_name)
            .await
        {
            Ok(description) => Ok(description.instance_count),
            // Already undeployed.
            Err(err) if err.is_not_found() => Ok(0),
            Err(err) => Err(err.into()),
        }
    }

    fn timeout_error_message(&self) -> String {
        SERVICE_UNINSTALL_TIMEOUT_MESSAGE.to_string()
    }
}

/// Uninstall probe for an application (all of its services).
pub struct ApplicationUninstallProbe {
    gateway: Arc<dyn AdminGateway>,
    application_name: String,
}

impl ApplicationUninstallProbe {
    pub fn new(gateway: Arc<dyn AdminGateway>, application_name: impl Into<String>) -> Self {
        Self {
            gateway,
            application_name: application_name.into(),
        }
    }
}

#[async_trait]
impl UninstallProbe for ApplicationUninstallProbe {
    async fn running_instances(&self, service_name: &str) -> Result<u32, InspectError> {
        match self
            .gateway
            .service_description(&self.application_name, service_name)
            .await
        {
            Ok(description) => Ok(description.instance_count),
            Err(err) if err.is_not_found() => Ok(0),
            Err(err) => Err(err.into()),
        }
    }

    fn timeout_error_message(&self) -> String {
        APPLICATION_UNINSTALL_TIMEOUT_MESSAGE.to_string()
    }
}

/// Watches an uninstallation until the gateway publishes the
/// "undeployed successfully" lifecycle event.
///
/// Completion is the sentinel event alone: a quiet event stream does not
/// mean the uninstall is over, and instance counts reaching zero can be
/// transient. The uninstall appends to the event stream of the deployment
/// being removed, and event queries are scoped by that deployment id, so
/// the sentinel cannot originate from another operation; starting the
/// cursor after the deployment's pre-existing history keeps install events
/// from being replayed.
///
/// Independently of completion, the inspector watches each service's
/// description disappear (404) and reports the underlying cluster resources
/// as released, a slower signal worth surfacing but never a gate on
/// "done".
pub struct UninstallationInspector {
    gateway: Arc<dyn AdminGateway>,
    deployment_id: String,
    application_name: String,
    verbose: bool,
    counts: InstanceCounts,
    cursor: EventCursor,
    displayer: EventsDisplayer,
    probe: Box<dyn UninstallProbe>,
    releases: ReleaseTracker,
    cancel: CancellationToken,
    preamble_printed: bool,
}

impl UninstallationInspector {
    /// Create an inspector for a deployment that is being uninstalled.
    ///
    /// `initial_running` is the per-service instance snapshot taken before
    /// the uninstall request; it doubles as the "planned" baseline progress
    /// is reported against. `last_event_index` is the index of the last
    /// event the deployment produced before the uninstall, so polling only
    /// surfaces uninstall events.
    pub fn new(
        gateway: Arc<dyn AdminGateway>,
        deployment_id: impl Into<String>,
        application_name: impl Into<String>,
        verbose: bool,
        initial_running: BTreeMap<String, u32>,
        last_event_index: u64,
        probe: Box<dyn UninstallProbe>,
    ) -> Self {
        let releases = ReleaseTracker::new(initial_running.keys().cloned());
        let counts = InstanceCounts::new(initial_running.clone(), initial_running);

        Self {
            gateway,
            deployment_id: deployment_id.into(),
            application_name: application_name.into(),
            verbose,
            counts,
            cursor: EventCursor::resume_after(last_event_index),
            displayer: EventsDisplayer::new(),
            probe,
            releases,
            cancel: CancellationToken::new(),
            preamble_printed: false,
        }
    }

    /// Attach an external cancellation signal (e.g. Ctrl-C).
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The release tracker's current state.
    pub fn releases(&self) -> &ReleaseTracker {
        &self.releases
    }

    /// Index of the last event already printed.
    pub fn last_consumed_event_index(&self) -> u64 {
        self.cursor.last_consumed_index()
    }

    /// One-time baseline printed before polling begins.
    fn print_initial_running_instances(&mut self) {
        if self.preamble_printed {
            return;
        }
        for service_name in self.counts.service_names() {
            self.displayer.print_event(&format!(
                "{}: Installed {} Planned {}",
                service_name,
                self.counts.running_for(&service_name),
                self.counts.planned_for(&service_name)
            ));
        }
        self.preamble_printed = true;
    }
}

#[async_trait]
impl LifecycleInspector for UninstallationInspector {
    async fn wait_for_lifecycle_to_end(
        &mut self,
        timeout_minutes: u64,
    ) -> Result<(), WaitError<InspectError>> {
        debug!(
            deployment_id = %self.deployment_id,
            timeout_minutes,
            "waiting for uninstallation lifecycle to end"
        );

        self.print_initial_running_instances();

        let config = crate::install::latch_config_for(
            timeout_minutes,
            self.probe.timeout_error_message(),
            self.verbose,
        );
        let cancel = self.cancel.clone();

        let mut poll = UninstallPoll {
            gateway: &*self.gateway,
            deployment_id: &self.deployment_id,
            application_name: &self.application_name,
            counts: &mut self.counts,
            cursor: &mut self.cursor,
            displayer: &mut self.displayer,
            probe: &*self.probe,
            releases: &mut self.releases,
        };

        wait_for(&config, &cancel, &mut poll).await
    }
}

/// One poll tick of an uninstallation.
struct UninstallPoll<'a> {
    gateway: &'a dyn AdminGateway,
    deployment_id: &'a str,
    application_name: &'a str,
    counts: &'a mut InstanceCounts,
    cursor: &'a mut EventCursor,
    displayer: &'a mut EventsDisplayer,
    probe: &'a dyn UninstallProbe,
    releases: &'a mut ReleaseTracker,
}

impl UninstallPoll<'_> {
    /// Report services whose instance count dropped since the last tick.
    async fn report_terminated_instances(&mut self) -> Result<(), InspectError> {
        for service_name in self.counts.service_names() {
            let running = self.probe.running_instances(&service_name).await?;
            if running < self.counts.running_for(&service_name) {
                self.displayer.print_event(&format!(
                    "{}: Installed {} Planned {}",
                    service_name,
                    running,
                    self.counts.planned_for(&service_name)
                ));
                self.counts.record_running(&service_name, running);
            }
        }
        Ok(())
    }

    /// Check which services' cluster resources have been released.
    ///
    /// A 404 for a tracked service is the release signal; anything else
    /// that fails is a genuine problem and propagates.
    async fn check_released_resources(&mut self) -> Result<(), InspectError> {
        if self.releases.is_done() {
            return Ok(());
        }

        for service_name in self.releases.pending() {
            match self
                .gateway
                .service_description(self.application_name, &service_name)
                .await
            {
                Ok(_) => {}
                Err(err) if err.is_not_found() => {
                    self.releases.mark_released(&service_name);
                    self.displayer.print_event(&format!(
                        "Cloud resources released for service {}",
                        service_name
                    ));
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Predicate for UninstallPoll<'_> {
    type Error = InspectError;

    async fn is_done(&mut self) -> Result<bool, InspectError> {
        let new_events = self
            .cursor
            .fetch_new(self.gateway, self.deployment_id)
            .await
            .map_err(InspectError::from)?;

        let ended = EventCursor::batch_marks_undeployed(&new_events);

        if !new_events.is_empty() {
            self.displayer.print_events(&new_events);
        } else if !ended {
            self.displayer.print_no_change();
        }

        self.report_terminated_instances().await?;
        self.check_released_resources().await?;

        Ok(ended)
    }
}
