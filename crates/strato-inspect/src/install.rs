// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Installation lifecycle inspection.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cursor::EventCursor;
use crate::display::EventsDisplayer;
use crate::error::InspectError;
use crate::gateway::AdminGateway;
use crate::latch::{wait_for, LatchConfig, Predicate, WaitError};

/// Cadence at which the inspectors sample the gateway.
pub(crate) const POLLING_INTERVAL: Duration = Duration::from_millis(500);

const SERVICE_INSTALL_TIMEOUT_MESSAGE: &str =
    "Service installation timed out. Configure the timeout using the --timeout flag.";
const APPLICATION_INSTALL_TIMEOUT_MESSAGE: &str =
    "Application installation timed out. Configure the timeout using the --timeout flag.";

/// Per-service planned and currently observed instance counts.
///
/// The planned side is fixed for the inspector's lifetime; the running side
/// is refreshed every poll and only used to detect change (and the plan
/// being exceeded); reaching the plan is evaluated by the install probes.
#[derive(Debug, Clone)]
pub struct InstanceCounts {
    planned: BTreeMap<String, u32>,
    running: BTreeMap<String, u32>,
}

impl InstanceCounts {
    /// Counts with an explicit starting snapshot of running instances.
    pub fn new(planned: BTreeMap<String, u32>, running: BTreeMap<String, u32>) -> Self {
        let mut counts = Self { planned, running };
        for service_name in counts.planned.keys() {
            counts
                .running
                .entry(service_name.clone())
                .or_insert(0);
        }
        counts
    }

    /// Counts for a fresh installation: nothing runs yet.
    pub fn starting_from_zero(planned: BTreeMap<String, u32>) -> Self {
        Self::new(planned, BTreeMap::new())
    }

    /// The planned service names, in stable order.
    pub fn service_names(&self) -> Vec<String> {
        self.planned.keys().cloned().collect()
    }

    pub fn planned_for(&self, service_name: &str) -> u32 {
        self.planned.get(service_name).copied().unwrap_or(0)
    }

    pub fn running_for(&self, service_name: &str) -> u32 {
        self.running.get(service_name).copied().unwrap_or(0)
    }

    pub fn record_running(&mut self, service_name: &str, count: u32) {
        self.running.insert(service_name.to_string(), count);
    }

    /// Number of planned services.
    pub fn service_count(&self) -> usize {
        self.planned.len()
    }

    /// True when every planned service runs exactly its planned count.
    pub fn all_planned_reached(&self) -> bool {
        self.planned
            .iter()
            .all(|(service_name, planned)| self.running_for(service_name) == *planned)
    }
}

/// Domain-specific queries injected into the installation inspector.
///
/// The polling skeleton is identical for services and applications; what
/// differs is how instances are counted and when the lifecycle counts as
/// ended. Those two decisions live here.
#[async_trait]
pub trait InstallProbe: Send + Sync {
    /// Number of instances currently running for the given service.
    async fn running_instances(&self, service_name: &str) -> Result<u32, InspectError>;

    /// Whether the installation lifecycle has ended.
    async fn lifecycle_ended(&self, counts: &InstanceCounts) -> Result<bool, InspectError>;

    /// Message attached to a timed-out wait.
    fn timeout_error_message(&self) -> String;
}

/// Install probe for a single service deployment.
pub struct ServiceInstallProbe {
    gateway: Arc<dyn AdminGateway>,
    application_name: String,
    service_name: String,
}

impl ServiceInstallProbe {
    pub fn new(
        gateway: Arc<dyn AdminGateway>,
        application_name: impl Into<String>,
        service_name: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            application_name: application_name.into(),
            service_name: service_name.into(),
        }
    }
}

#[async_trait]
impl InstallProbe for ServiceInstallProbe {
    async fn running_instances(&self, service_name: &str) -> Result<u32, InspectError> {
        match self
            .gateway
            .service_description(&self.application_name, service_name)
            .await
        {
            Ok(description) => Ok(description.instance_count),
            // Not deployed yet, so nothing runs yet.
            Err(err) if err.is_not_found() => Ok(0),
            Err(err) => Err(err.into()),
        }
    }

    async fn lifecycle_ended(&self, counts: &InstanceCounts) -> Result<bool, InspectError> {
        match self
            .gateway
            .service_description(&self.application_name, &self.service_name)
            .await
        {
            Ok(description) if description.service_state.is_failed() => {
                Err(InspectError::DeploymentFailed {
                    kind: "service",
                    name: self.service_name.clone(),
                })
            }
            Ok(_) => Ok(counts.all_planned_reached()),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn timeout_error_message(&self) -> String {
        SERVICE_INSTALL_TIMEOUT_MESSAGE.to_string()
    }
}

/// Install probe for an application deployment (a set of services).
pub struct ApplicationInstallProbe {
    gateway: Arc<dyn AdminGateway>,
    application_name: String,
}

impl ApplicationInstallProbe {
    pub fn new(gateway: Arc<dyn AdminGateway>, application_name: impl Into<String>) -> Self {
        Self {
            gateway,
            application_name: application_name.into(),
        }
    }
}

#[async_trait]
impl InstallProbe for ApplicationInstallProbe {
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

    async fn lifecycle_ended(&self, counts: &InstanceCounts) -> Result<bool, InspectError> {
        match self
            .gateway
            .application_description(&self.application_name)
            .await
        {
            Ok(description) if description.application_state.is_failed() => {
                Err(InspectError::DeploymentFailed {
                    kind: "application",
                    name: self.application_name.clone(),
                })
            }
            Ok(description) => {
                // All planned services must already be visible; partial
                // deployments report fewer services than the plan.
                let all_services_deployed = description.services.len() == counts.service_count();
                Ok(all_services_deployed && counts.all_planned_reached())
            }
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn timeout_error_message(&self) -> String {
        APPLICATION_INSTALL_TIMEOUT_MESSAGE.to_string()
    }
}

/// Anything that can be waited on until its lifecycle ends.
///
/// Lets the shell run the same timeout/continue loop over installation and
/// uninstallation inspectors.
#[async_trait]
pub trait LifecycleInspector: Send {
    /// Poll until the lifecycle ends or the budget (in minutes) elapses.
    async fn wait_for_lifecycle_to_end(
        &mut self,
        timeout_minutes: u64,
    ) -> Result<(), WaitError<InspectError>>;
}

/// Watches an installation until every planned instance runs.
///
/// One logical thread of control: `wait_for_lifecycle_to_end` blocks its
/// caller, sampling the gateway twice a second. Each tick reports fresh
/// instance counts, prints lifecycle events not seen before and asks the
/// probe whether the lifecycle is over. The inspector survives a timed-out
/// wait: calling it again resumes from the same cursor and counts, which
/// is how the shell extends the budget after asking the user.
pub struct InstallationInspector {
    gateway: Arc<dyn AdminGateway>,
    deployment_id: String,
    verbose: bool,
    counts: InstanceCounts,
    cursor: EventCursor,
    displayer: EventsDisplayer,
    probe: Box<dyn InstallProbe>,
    cancel: CancellationToken,
}

impl InstallationInspector {
    pub fn new(
        gateway: Arc<dyn AdminGateway>,
        deployment_id: impl Into<String>,
        verbose: bool,
        counts: InstanceCounts,
        probe: Box<dyn InstallProbe>,
    ) -> Self {
        Self {
            gateway,
            deployment_id: deployment_id.into(),
            verbose,
            counts,
            cursor: EventCursor::new(),
            displayer: EventsDisplayer::new(),
            probe,
            cancel: CancellationToken::new(),
        }
    }

    /// Start the event cursor after `index` instead of at the log's start.
    pub fn resume_after_event(mut self, index: u64) -> Self {
        self.cursor = EventCursor::resume_after(index);
        self
    }

    /// Attach an external cancellation signal (e.g. Ctrl-C).
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The current instance counts.
    pub fn counts(&self) -> &InstanceCounts {
        &self.counts
    }

    /// Index of the last event already printed.
    pub fn last_consumed_event_index(&self) -> u64 {
        self.cursor.last_consumed_index()
    }
}

/// Latch configuration shared by both inspectors: minute-granular budget,
/// 500 ms cadence.
pub(crate) fn latch_config_for(
    timeout_minutes: u64,
    timeout_error_message: String,
    verbose: bool,
) -> LatchConfig {
    LatchConfig::new(Duration::from_secs(timeout_minutes * 60), POLLING_INTERVAL)
        .expect("polling interval is non-zero")
        .with_timeout_error_message(timeout_error_message)
        .with_verbose(verbose)
}

#[async_trait]
impl LifecycleInspector for InstallationInspector {
    async fn wait_for_lifecycle_to_end(
        &mut self,
        timeout_minutes: u64,
    ) -> Result<(), WaitError<InspectError>> {
        debug!(
            deployment_id = %self.deployment_id,
            timeout_minutes,
            "waiting for installation lifecycle to end"
        );

        let config = latch_config_for(
            timeout_minutes,
            self.probe.timeout_error_message(),
            self.verbose,
        );
        let cancel = self.cancel.clone();

        let mut poll = InstallPoll {
            gateway: &*self.gateway,
            deployment_id: &self.deployment_id,
            counts: &mut self.counts,
            cursor: &mut self.cursor,
            displayer: &mut self.displayer,
            probe: &*self.probe,
        };

        wait_for(&config, &cancel, &mut poll).await
    }
}

/// One poll tick of an installation.
struct InstallPoll<'a> {
    gateway: &'a dyn AdminGateway,
    deployment_id: &'a str,
    counts: &'a mut InstanceCounts,
    cursor: &'a mut EventCursor,
    displayer: &'a mut EventsDisplayer,
    probe: &'a dyn InstallProbe,
}

impl InstallPoll<'_> {
    /// Report services whose running count grew since the last tick.
    async fn report_new_instances(&mut self) -> Result<(), InspectError> {
        for service_name in self.counts.service_names() {
            let running = self.probe.running_instances(&service_name).await?;
            let planned = self.counts.planned_for(&service_name);

            if running > planned {
                return Err(InspectError::MoreInstancesThanPlanned {
                    service_name,
                    running,
                    planned,
                });
            }

            if running > self.counts.running_for(&service_name) {
                self.displayer.print_event(&format!(
                    "Successfully installed {} of {} instances for service {}",
                    running, planned, service_name
                ));
                self.counts.record_running(&service_name, running);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Predicate for InstallPoll<'_> {
    type Error = InspectError;

    async fn is_done(&mut self) -> Result<bool, InspectError> {
        self.report_new_instances().await?;

        let new_events = self
            .cursor
            .fetch_new(self.gateway, self.deployment_id)
            .await
            .map_err(InspectError::from)?;

        let ended = self.probe.lifecycle_ended(self.counts).await?;

        if !new_events.is_empty() {
            self.displayer.print_events(&new_events);
        } else if !ended {
            self.displayer.print_no_change();
        }

        if ended {
            // Flush count notifications the final tick may still owe.
            self.report_new_instances().await?;
        }

        Ok(ended)
    }
}
