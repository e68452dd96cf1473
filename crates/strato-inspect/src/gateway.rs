// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Trait seam over the admin gateway.

use async_trait::async_trait;

use strato_rest_client::{
    ApplicationDescription, DeploymentEvents, InstallApplicationRequest,
    InstallApplicationResponse, InstallServiceRequest, InstallServiceResponse, RestClient, Result,
    ServiceDescription, UninstallApplicationResponse, UninstallServiceResponse,
};

/// The admin gateway operations the lifecycle engine consumes.
///
/// This abstracts the communication layer so inspectors and shell drivers
/// work against either the real [`RestClient`] or an in-memory fake in
/// tests. The gateway is treated as a shared, thread-safe collaborator;
/// every call is an independent request/response exchange.
#[async_trait]
pub trait AdminGateway: Send + Sync {
    /// Lifecycle events of a deployment, starting at `from_index`.
    /// An empty batch means "no new events", not an error.
    async fn deployment_events(
        &self,
        deployment_id: &str,
        from_index: u64,
    ) -> Result<DeploymentEvents>;

    /// The most recent lifecycle event of a deployment, if any.
    async fn last_deployment_event(&self, deployment_id: &str) -> Result<DeploymentEvents>;

    /// Current description of a deployed service. 404 is meaningful to
    /// callers and must surface as such.
    async fn service_description(
        &self,
        application_name: &str,
        service_name: &str,
    ) -> Result<ServiceDescription>;

    /// Current description of a deployed application.
    async fn application_description(
        &self,
        application_name: &str,
    ) -> Result<ApplicationDescription>;

    /// Trigger a service installation.
    async fn install_service(
        &self,
        application_name: &str,
        service_name: &str,
        request: &InstallServiceRequest,
    ) -> Result<InstallServiceResponse>;

    /// Trigger an application installation.
    async fn install_application(
        &self,
        application_name: &str,
        request: &InstallApplicationRequest,
    ) -> Result<InstallApplicationResponse>;

    /// Trigger a service uninstallation.
    async fn uninstall_service(
        &self,
        application_name: &str,
        service_name: &str,
        timeout_minutes: u32,
    ) -> Result<UninstallServiceResponse>;

    /// Trigger an application uninstallation.
    async fn uninstall_application(
        &self,
        application_name: &str,
        timeout_minutes: u32,
    ) -> Result<UninstallApplicationResponse>;
}

#[async_trait]
impl AdminGateway for RestClient {
    async fn deployment_events(
        &self,
        deployment_id: &str,
        from_index: u64,
    ) -> Result<DeploymentEvents> {
        RestClient::deployment_events(self, deployment_id, from_index).await
    }

    async fn last_deployment_event(&self, deployment_id: &str) -> Result<DeploymentEvents> {
        RestClient::last_deployment_event(self, deployment_id).await
    }

    async fn service_description(
        &self,
        application_name: &str,
        service_name: &str,
    ) -> Result<ServiceDescription> {
        RestClient::service_description(self, application_name, service_name).await
    }

    async fn application_description(
        &self,
        application_name: &str,
    ) -> Result<ApplicationDescription> {
        RestClient::application_description(self, application_name).await
    }

    async fn install_service(
        &self,
        application_name: &str,
        service_name: &str,
        request: &InstallServiceRequest,
    ) -> Result<InstallServiceResponse> {
        RestClient::install_service(self, application_name, service_name, request).await
    }

    async fn install_application(
        &self,
        application_name: &str,
        request: &InstallApplicationRequest,
    ) -> Result<InstallApplicationResponse> {
        RestClient::install_application(self, application_name, request).await
    }

    async fn uninstall_service(
        &self,
        application_name: &str,
        service_name: &str,
        timeout_minutes: u32,
    ) -> Result<UninstallServiceResponse> {
        RestClient::uninstall_service(self, application_name, service_name, timeout_minutes).await
    }

    async fn uninstall_application(
        &self,
        application_name: &str,
        timeout_minutes: u32,
    ) -> Result<UninstallApplicationResponse> {
        RestClient::uninstall_application(self, application_name, timeout_minutes).await
    }
}
