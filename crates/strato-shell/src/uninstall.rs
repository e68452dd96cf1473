// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Service and application uninstallation drivers.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use strato_inspect::{
    AdminGateway, ApplicationUninstallProbe, EventsDisplayer, ServiceUninstallProbe,
    UninstallationInspector,
};

use crate::error::ShellError;
use crate::install::{
    wait_until_done, DEFAULT_APPLICATION_TIMEOUT_MINUTES, DEFAULT_SERVICE_TIMEOUT_MINUTES,
};

/// Index of the last event a deployment produced so far (0 when the stream
/// is still empty). Uninstall polling starts after it.
async fn last_event_index(
    gateway: &dyn AdminGateway,
    deployment_id: &str,
) -> Result<u64, ShellError> {
    let events = gateway.last_deployment_event(deployment_id).await?;
    Ok(events.last_index().unwrap_or(0))
}

/// Uninstalls one service and watches the lifecycle until the gateway
/// reports it undeployed.
pub struct ServiceUninstaller {
    gateway: Arc<dyn AdminGateway>,
    application_name: String,
    service_name: String,
    initial_timeout_minutes: u64,
    verbose: bool,
    interactive: bool,
    cancel: CancellationToken,
}

impl ServiceUninstaller {
    pub fn new(
        gateway: Arc<dyn AdminGateway>,
        application_name: impl Into<String>,
        service_name: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            application_name: application_name.into(),
            service_name: service_name.into(),
            initial_timeout_minutes: DEFAULT_SERVICE_TIMEOUT_MINUTES,
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

    /// Request the uninstallation and watch it to completion.
    pub async fn uninstall(&self) -> Result<(), ShellError> {
        let description = match self
            .gateway
            .service_description(&self.application_name, &self.service_name)
            .await
        {
            Ok(description) => description,
            Err(err) if err.is_not_found() => {
                return Err(ShellError::ServiceNotFound {
                    application_name: self.application_name.clone(),
                    service_name: self.service_name.clone(),
                });
            }
            Err(err) => return Err(err.into()),
        };

        // The uninstall appends to this deployment's event stream; skip the
        // history the install already produced.
        let deployment_id = description.deployment_id.clone();
        let last_index = last_event_index(&*self.gateway, &deployment_id).await?;

        self.gateway
            .uninstall_service(
                &self.application_name,
                &self.service_name,
                self.initial_timeout_minutes as u32,
            )
            .await?;
        debug!(
            service_name = %self.service_name,
            deployment_id = %deployment_id,
            last_event_index = last_index,
            "service uninstallation accepted"
        );

        let mut displayer = EventsDisplayer::new();
        displayer.print_event(&format!("Uninstalling service {}", self.service_name));
        displayer.print_event(&format!(
            "Waiting for life cycle events of service {}",
            self.service_name
        ));

        let initial_running =
            BTreeMap::from([(self.service_name.clone(), description.instance_count)]);
        let probe = ServiceUninstallProbe::new(self.gateway.clone(), &self.application_name);
        let mut inspector = UninstallationInspector::new(
            self.gateway.clone(),
            deployment_id,
            &self.application_name,
            self.verbose,
            initial_running,
            last_index,
            Box::new(probe),
        )
        .with_cancellation(self.cancel.clone());

        wait_until_done(
            &mut inspector,
            self.initial_timeout_minutes,
            DEFAULT_SERVICE_TIMEOUT_MINUTES,
            self.interactive,
            &format!(
                "Would you like to continue waiting for the uninstallation of service {}?",
                self.service_name
            ),
        )
        .await?;

        displayer.print_event("");
        Ok(())
    }
}

/// Uninstalls an application and watches the lifecycle until the gateway
/// reports it undeployed.
pub struct ApplicationUninstaller {
    gateway: Arc<dyn AdminGateway>,
    application_name: String,
    initial_timeout_minutes: u64,
    verbose: bool,
    interactive: bool,
    cancel: CancellationToken,
}

impl ApplicationUninstaller {
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

    /// Request the uninstallation and watch it to completion.
    pub async fn uninstall(&self) -> Result<(), ShellError> {
        let description = match self
            .gateway
            .application_description(&self.application_name)
            .await
        {
            Ok(description) => description,
            Err(err) if err.is_not_found() => {
                return Err(ShellError::ApplicationNotFound(self.application_name.clone()));
            }
            Err(err) => return Err(err.into()),
        };

        // An application exists through its deployed services; without any
        // there is nothing to uninstall or watch.
        let Some(first_service) = description.services.first() else {
            return Err(ShellError::ApplicationNotFound(self.application_name.clone()));
        };
        let deployment_id = first_service.deployment_id.clone();

        let initial_running: BTreeMap<String, u32> = description
            .services
            .iter()
            .map(|service| (service.service_name.clone(), service.instance_count))
            .collect();

        let last_index = last_event_index(&*self.gateway, &deployment_id).await?;

        self.gateway
            .uninstall_application(&self.application_name, self.initial_timeout_minutes as u32)
            .await?;
        debug!(
            application_name = %self.application_name,
            deployment_id = %deployment_id,
            last_event_index = last_index,
            "application uninstallation accepted"
        );

        let mut displayer = EventsDisplayer::new();
        displayer.print_event(&format!(
            "Uninstalling application {}",
            self.application_name
        ));
        displayer.print_event(&format!(
            "Waiting for life cycle events of application {}",
            self.application_name
        ));

        let probe = ApplicationUninstallProbe::new(self.gateway.clone(), &self.application_name);
        let mut inspector = UninstallationInspector::new(
            self.gateway.clone(),
            deployment_id,
            &self.application_name,
            self.verbose,
            initial_running,
            last_index,
            Box::new(probe),
        )
        .with_cancellation(self.cancel.clone());

        wait_until_done(
            &mut inspector,
            self.initial_timeout_minutes,
            DEFAULT_APPLICATION_TIMEOUT_MINUTES,
            self.interactive,
            &format!(
                "Would you like to continue waiting for the uninstallation of application {}?",
                self.application_name
            ),
        )
        .await?;

        displayer.print_event("");
        Ok(())
    }
}
