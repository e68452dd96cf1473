// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Service and application installation drivers.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use strato_inspect::latch::{self, LatchConfig};
use strato_inspect::{
    AdminGateway, ApplicationInstallProbe, EventsDisplayer, InspectError, InstallationInspector,
    InstanceCounts, LifecycleInspector, Predicate, ServiceInstallProbe, WaitError,
};
use strato_rest_client::{InstallApplicationRequest, InstallServiceRequest};

use crate::error::ShellError;
use crate::prompt;

/// Budget granted per continuation when a service wait times out and the
/// user chooses to keep waiting.
pub const DEFAULT_SERVICE_TIMEOUT_MINUTES: u64 = 5;
/// Budget granted per continuation for application waits.
pub const DEFAULT_APPLICATION_TIMEOUT_MINUTES: u64 = 15;

/// Cadence of the visibility pre-lookup after a deployment request.
const VISIBILITY_POLLING_INTERVAL: Duration = Duration::from_secs(1);

/// Re-arm `inspector` with fresh budgets until it completes, the user gives
/// up, or the wait fails.
///
/// The engine itself never prompts; the interactive "keep waiting?"
/// decision on timeout lives here. The inspector keeps its cursor and
/// counts across rounds, so extending the budget continues the same watch.
pub(crate) async fn wait_until_done(
    inspector: &mut dyn LifecycleInspector,
    initial_timeout_minutes: u64,
    continue_timeout_minutes: u64,
    interactive: bool,
    question: &str,
) -> Result<(), ShellError> {
    let mut budget = initial_timeout_minutes;
    loop {
        match inspector.wait_for_lifecycle_to_end(budget).await {
            Ok(()) => return Ok(()),
            Err(WaitError::Timeout(message)) => {
                if !interactive {
                    return Err(ShellError::Timeout(message));
                }
                println!();
                if prompt::confirm(question)? {
                    budget = continue_timeout_minutes;
                } else {
                    return Err(ShellError::Timeout(message));
                }
            }
            Err(other) => return Err(other.into()),
        }
    }
}

/// Latch configuration for the visibility pre-lookup.
///
/// Right after a deployment request the gateway may transiently answer
/// errors while the deployment is still being registered; this wait alone
/// retries through failures instead of aborting.
fn visibility_latch(timeout_minutes: u64, message: String, verbose: bool) -> LatchConfig {
    LatchConfig::new(
        Duration::from_secs(timeout_minutes * 60),
        VISIBILITY_POLLING_INTERVAL,
    )
    .expect("polling interval is non-zero")
    .with_timeout_error_message(message)
    .with_verbose(verbose)
    .with_retry_on_error(true)
}

struct ServiceVisible<'a> {
    gateway: &'a dyn AdminGateway,
    application_name: &'a str,
    service_name: &'a str,
}

#[async_trait]
impl Predicate for ServiceVisible<'_> {
    type Error = InspectError;

    async fn is_done(&mut self) -> Result<bool, InspectError> {
        match self
            .gateway
            .service_description(self.application_name, self.service_name)
            .await
        {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}

struct ApplicationVisible<'a> {
    gateway: &'a dyn AdminGateway,
    application_name: &'a str,
}

#[async_trait]
impl Predicate for ApplicationVisible<'_> {
    type Error = InspectError;

    async fn is_done(&mut self) -> Result<bool, InspectError> {
        match self
            .gateway
            .application_description(self.application_name)
            .await
        {
            // The application only counts as visible once its services are
            // registered; an empty description would produce an empty plan.
            Ok(description) => Ok(!description.services.is_empty()),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}

/// Installs one service and watches its lifecycle until every planned
/// instance runs.
pub struct ServiceInstaller {
    gateway: Arc<dyn AdminGateway>,
    application_name: String,
    service_name: String,
    planned_instances: u32,
    initial_timeout_minutes: u64,
    verbose: bool,
    interactive: bool,
    cancel: CancellationToken,
}

impl ServiceInstaller {
    pub fn new(
        gateway: Arc<dyn AdminGateway>,
        application_name: impl Into<String>,
        service_name: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            application_name: application_name.into(),
            service_name: service_name.into(),
            planned_instances: 1,
            initial_timeout_minutes: DEFAULT_SERVICE_TIMEOUT_MINUTES,
            verbose: false,
            interactive: true,
            cancel: CancellationToken::new(),
        }
    }

    /// Set the number of instances the deployment plan calls for.
    pub fn with_planned_instances(mut self, planned_instances: u32) -> Self {
        self.planned_instances = planned_instances;
        self
    }

    /// Set the first wait budget, in minutes.
    pub fn with_initial_timeout(mut self, minutes: u64) -> Self {
        self.initial_timeout_minutes = minutes;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Allow or suppress the "keep waiting?" prompt on timeout.
    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Attach an external cancellation signal (e.g. Ctrl-C).
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Request the installation and watch it to completion.
    pub async fn install(&self) -> Result<(), ShellError> {
        let request = InstallServiceRequest {
            planned_instances: self.planned_instances,
            timeout_minutes: self.initial_timeout_minutes as u32,
        };
        let response = self
            .gateway
            .install_service(&self.application_name, &self.service_name, &request)
            .await?;
        debug!(
            service_name = %self.service_name,
            deployment_id = %response.deployment_id,
            "service installation accepted"
        );

        let mut displayer = EventsDisplayer::new();
        displayer.print_event(&format!(
            "Installing service {} with {} planned instances",
            self.service_name, self.planned_instances
        ));

        self.wait_for_service_to_appear().await?;

        displayer.print_event(&format!(
            "Waiting for life cycle events of service {}",
            self.service_name
        ));

        let planned = BTreeMap::from([(self.service_name.clone(), self.planned_instances)]);
        let probe = ServiceInstallProbe::new(
            self.gateway.clone(),
            &self.application_name,
            &self.service_name,
        );
        let mut inspector = InstallationInspector::new(
            self.gateway.clone(),
            response.deployment_id,
            self.verbose,
            InstanceCounts::starting_from_zero(planned),
            Box::new(probe),
        )
        .with_cancellation(self.cancel.clone());

        wait_until_done(
            &mut inspector,
            self.initial_timeout_minutes,
            DEFAULT_SERVICE_TIMEOUT_MINUTES,
            self.interactive,
            &format!(
                "Would you like to continue waiting for the installation of service {}?",
                self.service_name
            ),
        )
        .await?;

        displayer.print_event("");
        Ok(())
    }

    async fn wait_for_service_to_appear(&self) -> Result<(), ShellError> {
        let config = visibility_latch(
            self.initial_timeout_minutes,
            format!(
                "Timed out waiting for service {} to become visible",
                self.service_name
            ),
            self.verbose,
        );
        let mut predicate = ServiceVisible {
            gateway: &*self.gateway,
            application_name: &self.application_name,
            service_name: &self.service_name,
        };
        latch::wait_for(&config, &self.cancel, &mut predicate)
            .await
            .map_err(ShellError::from)
    }
}

/// Installs an application and watches its lifecycle until every planned
/// instance of every service runs.
pub struct ApplicationInstaller {
    gateway: Arc<dyn AdminGateway>,
    application_name: String,
    initial_timeout_minutes: u64,
    verbose: bool,
    interactive: bool,
    cancel: CancellationToken,
}

impl ApplicationInstaller {
    pub fn new(gateway: Arc<dyn AdminGateway>, application_name: impl Into<String>) -> Self {
        Self {
            gateway,
            application_name: application_name.into(),
            initial_timeout_minutes: DEFAULT_APPLICATION_TIMEOUT_MINUTES,
            verbose: false,
            interactive: true,
            cancel: CancellationToken::new(),
        }
    }

    /// Set the first wait budget, in minutes.
    pub fn with_initial_timeout(mut self, minutes: u64) -> Self {
        self.initial_timeout_minutes = minutes;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Allow or suppress the "keep waiting?" prompt on timeout.
    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Attach an external cancellation signal (e.g. Ctrl-C).
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Request the installation and watch it to completion.
    pub async fn install(&self) -> Result<(), ShellError> {
        let request = InstallApplicationRequest {
            timeout_minutes: self.initial_timeout_minutes as u32,
        };
        let response = self
            .gateway
            .install_application(&self.application_name, &request)
            .await?;
        debug!(
            application_name = %self.application_name,
            deployment_id = %response.deployment_id,
            "application installation accepted"
        );

        let mut displayer = EventsDisplayer::new();
        displayer.print_event(&format!(
            "Installing application {}",
            self.application_name
        ));

        self.wait_for_application_to_appear().await?;

        // The plan comes from the gateway's own view of the application.
        let description = self
            .gateway
            .application_description(&self.application_name)
            .await?;
        let planned: BTreeMap<String, u32> = description
            .services
            .iter()
            .map(|service| (service.service_name.clone(), service.planned_instances))
            .collect();

        displayer.print_event(&format!(
            "Waiting for life cycle events of application {}",
            self.application_name
        ));

        let probe = ApplicationInstallProbe::new(self.gateway.clone(), &self.application_name);
        let mut inspector = InstallationInspector::new(
            self.gateway.clone(),
            response.deployment_id,
            self.verbose,
            InstanceCounts::starting_from_zero(planned),
            Box::new(probe),
        )
        .with_cancellation(self.cancel.clone());

        wait_until_done(
            &mut inspector,
            self.initial_timeout_minutes,
            DEFAULT_APPLICATION_TIMEOUT_MINUTES,
            self.interactive,
            &format!(
                "Would you like to continue waiting for the installation of application {}?",
                self.application_name
            ),
        )
        .await?;

        displayer.print_event("");
        Ok(())
    }

    async fn wait_for_application_to_appear(&self) -> Result<(), ShellError> {
        let config = visibility_latch(
            self.initial_timeout_minutes,
            format!(
                "Timed out waiting for application {} to become visible",
                self.application_name
            ),
            self.verbose,
        );
        let mut predicate = ApplicationVisible {
            gateway: &*self.gateway,
            application_name: &self.application_name,
        };
        latch::wait_for(&config, &self.cancel, &mut predicate)
            .await
            .map_err(ShellError::from)
    }
}
