// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! RestClient for interacting with the strato admin gateway.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::RestClientConfig;
use crate::error::{RestClientError, Result};
use crate::types::{
    ApplicationDescription, DeploymentEvents, InstallApplicationRequest,
    InstallApplicationResponse, InstallServiceRequest, InstallServiceResponse,
    ServiceDescription, UninstallApplicationResponse, UninstallServiceResponse,
};

/// Characters escaped when an application or service name is embedded in a
/// URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'?');

/// Extended error body the gateway attaches to non-success responses.
#[derive(Debug, Deserialize)]
struct GatewayErrorBody {
    message: String,
    #[serde(default)]
    verbose: String,
}

/// Typed client for the admin gateway's deployment API.
///
/// All calls are independent request/response exchanges; the client holds no
/// session state and can be shared freely across tasks.
pub struct RestClient {
    http: reqwest::Client,
    config: RestClientConfig,
}

impl RestClient {
    /// Create a new client with the given configuration.
    pub fn new(config: RestClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| RestClientError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Create a client from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(RestClientConfig::from_env()?)
    }

    /// Get the client configuration.
    pub fn config(&self) -> &RestClientConfig {
        &self.config
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.gateway_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn segment(name: &str) -> String {
        utf8_percent_encode(name, PATH_SEGMENT).to_string()
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T> {
        let response = self.http.get(&url).send().await?;
        Self::decode(response).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(&self, url: String, body: &B) -> Result<T> {
        let response = self.http.post(&url).json(body).send().await?;
        Self::decode(response).await
    }

    async fn delete_json<T: DeserializeOwned>(
        &self,
        url: String,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self.http.delete(&url).query(query).send().await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Self::response_error(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            RestClientError::UnexpectedResponse(format!("failed to decode gateway response: {}", e))
        })
    }

    fn response_error(status: u16, body: &str) -> RestClientError {
        match serde_json::from_str::<GatewayErrorBody>(body) {
            Ok(parsed) => RestClientError::Response {
                status,
                message: parsed.message,
                verbose: parsed.verbose,
            },
            Err(_) => {
                let message = body.trim();
                RestClientError::Response {
                    status,
                    message: if message.is_empty() {
                        format!("gateway returned status {}", status)
                    } else {
                        message.to_string()
                    },
                    verbose: String::new(),
                }
            }
        }
    }

    // =========================================================================
    // Deployment events
    // =========================================================================

    /// Get lifecycle events of a deployment, starting at `from_index`.
    ///
    /// Sends `to=-1`, meaning "everything available"; the gateway caps a
    /// single batch at 100 events. An empty batch is a normal answer, not an
    /// error.
    #[instrument(skip(self), fields(deployment_id = %deployment_id, from_index))]
    pub async fn deployment_events(
        &self,
        deployment_id: &str,
        from_index: u64,
    ) -> Result<DeploymentEvents> {
        debug!("Fetching deployment events");

        let url = self.url(&format!(
            "v1/deployments/{}/events?from={}&to=-1",
            Self::segment(deployment_id),
            from_index
        ));
        self.get_json(url).await
    }

    /// Get the most recent lifecycle event of a deployment (zero or one
    /// events).
    #[instrument(skip(self), fields(deployment_id = %deployment_id))]
    pub async fn last_deployment_event(&self, deployment_id: &str) -> Result<DeploymentEvents> {
        debug!("Fetching last deployment event");

        let url = self.url(&format!(
            "v1/deployments/{}/events/last",
            Self::segment(deployment_id)
        ));
        self.get_json(url).await
    }

    // =========================================================================
    // Descriptions
    // =========================================================================

    /// Get the current description of a deployed service.
    ///
    /// A 404 answer means the service is not deployed (anymore); callers
    /// decide whether that is a fault or an expected signal.
    #[instrument(skip(self), fields(application_name = %application_name, service_name = %service_name))]
    pub async fn service_description(
        &self,
        application_name: &str,
        service_name: &str,
    ) -> Result<ServiceDescription> {
        debug!("Fetching service description");

        let url = self.url(&format!(
            "v1/deployments/{}/service/{}/description",
            Self::segment(application_name),
            Self::segment(service_name)
        ));
        self.get_json(url).await
    }

    /// Get the current description of a deployed application.
    #[instrument(skip(self), fields(application_name = %application_name))]
    pub async fn application_description(
        &self,
        application_name: &str,
    ) -> Result<ApplicationDescription> {
        debug!("Fetching application description");

        let url = self.url(&format!(
            "v1/deployments/applications/{}/description",
            Self::segment(application_name)
        ));
        self.get_json(url).await
    }

    // =========================================================================
    // Install / uninstall triggers
    // =========================================================================

    /// Request installation of a service. Fire-and-forget: the returned
    /// deployment id is the handle for polling the lifecycle afterwards.
    #[instrument(skip(self, request), fields(application_name = %application_name, service_name = %service_name))]
    pub async fn install_service(
        &self,
        application_name: &str,
        service_name: &str,
        request: &InstallServiceRequest,
    ) -> Result<InstallServiceResponse> {
        debug!(
            planned_instances = request.planned_instances,
            "Requesting service installation"
        );

        let url = self.url(&format!(
            "v1/deployments/{}/services/{}",
            Self::segment(application_name),
            Self::segment(service_name)
        ));
        self.post_json(url, request).await
    }

    /// Request installation of an application.
    #[instrument(skip(self, request), fields(application_name = %application_name))]
    pub async fn install_application(
        &self,
        application_name: &str,
        request: &InstallApplicationRequest,
    ) -> Result<InstallApplicationResponse> {
        debug!("Requesting application installation");

        let url = self.url(&format!(
            "v1/deployments/{}",
            Self::segment(application_name)
        ));
        self.post_json(url, request).await
    }

    /// Request uninstallation of a service.
    #[instrument(skip(self), fields(application_name = %application_name, service_name = %service_name))]
    pub async fn uninstall_service(
        &self,
        application_name: &str,
        service_name: &str,
        timeout_minutes: u32,
    ) -> Result<UninstallServiceResponse> {
        debug!("Requesting service uninstallation");

        let url = self.url(&format!(
            "v1/deployments/{}/services/{}",
            Self::segment(application_name),
            Self::segment(service_name)
        ));
        self.delete_json(url, &[("timeout", timeout_minutes.to_string())])
            .await
    }

    /// Request uninstallation of an application.
    #[instrument(skip(self), fields(application_name = %application_name))]
    pub async fn uninstall_application(
        &self,
        application_name: &str,
        timeout_minutes: u32,
    ) -> Result<UninstallApplicationResponse> {
        debug!("Requesting application uninstallation");

        let url = self.url(&format!(
            "v1/deployments/applications/{}",
            Self::segment(application_name)
        ));
        self.delete_json(url, &[("timeout", timeout_minutes.to_string())])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_with_url(url: &str) -> RestClient {
        RestClient::new(RestClientConfig::new().with_gateway_url(url)).unwrap()
    }

    #[test]
    fn test_url_joining_is_slash_insensitive() {
        let plain = client_with_url("http://gateway:8100");
        let trailing = client_with_url("http://gateway:8100/");

        assert_eq!(
            plain.url("v1/deployments/dep-1/events?from=1&to=-1"),
            "http://gateway:8100/v1/deployments/dep-1/events?from=1&to=-1"
        );
        assert_eq!(plain.url("/v1/x"), trailing.url("v1/x"));
    }

    #[test]
    fn test_path_segments_are_escaped() {
        assert_eq!(RestClient::segment("pet clinic"), "pet%20clinic");
        assert_eq!(RestClient::segment("a/b"), "a%2Fb");
        assert_eq!(RestClient::segment("tomcat"), "tomcat");
    }

    #[test]
    fn test_response_error_parses_gateway_body() {
        let err = RestClient::response_error(
            500,
            r#"{"message": "deployment failed", "verbose": "stack trace here"}"#,
        );
        match err {
            RestClientError::Response {
                status,
                message,
                verbose,
            } => {
                assert_eq!(status, 500);
                assert_eq!(message, "deployment failed");
                assert_eq!(verbose, "stack trace here");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_response_error_falls_back_to_raw_body() {
        let err = RestClient::response_error(404, "no such service");
        assert!(err.is_not_found());
        match err {
            RestClientError::Response {
                message, verbose, ..
            } => {
                assert_eq!(message, "no such service");
                assert!(verbose.is_empty());
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_response_error_with_empty_body() {
        let err = RestClient::response_error(503, "  ");
        match err {
            RestClientError::Response { message, .. } => {
                assert_eq!(message, "gateway returned status 503");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
