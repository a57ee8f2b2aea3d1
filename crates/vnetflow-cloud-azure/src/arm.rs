//! Azure Resource Manager REST client
//!
//! Bearer-token client for the ARM API. Create-or-update calls follow the
//! long-running-operation protocol and only return once the resource has
//! reached a terminal provisioning state.

use crate::error::{AzureError, Result};
use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use vnetflow_cloud::resource_id::types;
use vnetflow_cloud::{ControlPlane, Resource, ResourceId, ResourceScope};

pub const DEFAULT_MANAGEMENT_ENDPOINT: &str = "https://management.azure.com";

const RESOURCE_GROUP_API_VERSION: &str = "2021-04-01";
const NETWORK_API_VERSION: &str = "2023-09-01";
const PRIVATE_DNS_API_VERSION: &str = "2020-06-01";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Connection settings for [`ArmClient`]
#[derive(Debug, Clone)]
pub struct ArmConfig {
    pub access_token: String,
    pub endpoint: String,
    /// Wait between polls when the service sends no `Retry-After`
    pub poll_interval: Duration,
}

impl ArmConfig {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            endpoint: DEFAULT_MANAGEMENT_ENDPOINT.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Create ArmConfig from environment variables
    pub fn from_env() -> Result<Self> {
        let access_token = std::env::var("AZURE_ACCESS_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AzureError::MissingEnvVar("AZURE_ACCESS_TOKEN".to_string()))?;

        let mut config = Self::new(access_token);
        if let Ok(endpoint) = std::env::var("AZURE_MANAGEMENT_ENDPOINT") {
            config = config.with_endpoint(endpoint);
        }
        Ok(config)
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// API version for a resource or collection type
pub fn api_version(resource_type: &str) -> &'static str {
    let top = resource_type.split('/').next().unwrap_or_default();
    if top.eq_ignore_ascii_case(types::PRIVATE_DNS_ZONES) {
        PRIVATE_DNS_API_VERSION
    } else {
        NETWORK_API_VERSION
    }
}

fn api_version_for(id: &ResourceId) -> &'static str {
    if id.is_resource_group() {
        RESOURCE_GROUP_API_VERSION
    } else {
        api_version(&id.type_path())
    }
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct OperationStatus {
    status: String,
    #[serde(default)]
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Page {
    #[serde(default)]
    value: Vec<Resource>,
    next_link: Option<String>,
}

/// Provisioning state carried by most ARM resources
enum ProvisioningState {
    Succeeded,
    Failed(String),
    InProgress,
}

fn provisioning_state(resource: &Resource) -> ProvisioningState {
    match resource.property::<String>("provisioningState") {
        None => ProvisioningState::Succeeded,
        Some(state) if state.eq_ignore_ascii_case("succeeded") => ProvisioningState::Succeeded,
        Some(state)
            if state.eq_ignore_ascii_case("failed") || state.eq_ignore_ascii_case("canceled") =>
        {
            ProvisioningState::Failed(state)
        }
        Some(_) => ProvisioningState::InProgress,
    }
}

fn header(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// ARM control plane
pub struct ArmClient {
    client: reqwest::Client,
    config: ArmConfig,
}

impl ArmClient {
    pub fn new(config: ArmConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn url(&self, path: &str, api_version: &str) -> String {
        format!(
            "{}{}?api-version={}",
            self.config.endpoint, path, api_version
        )
    }

    fn resource_url(&self, id: &ResourceId) -> String {
        self.url(&id.to_string(), api_version_for(id))
    }

    /// Delay requested by the service, or the configured default
    fn retry_after(&self, response: &Response) -> Duration {
        header(response, "Retry-After")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(self.config.poll_interval)
    }

    /// Send a request and turn non-success responses into errors
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response> {
        let response = request
            .bearer_auth(&self.config.access_token)
            .send()
            .await?;
        let status = response.status();
        tracing::debug!(url = %response.url(), status = status.as_u16(), "ARM response");

        if status.is_success() {
            return Ok(response);
        }
        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();
        Err(error_from_body(status, &url, &body))
    }

    async fn get_resource(&self, id: &ResourceId) -> Result<Resource> {
        let response = self
            .send(self.client.get(self.resource_url(id)))
            .await
            .map_err(|e| match e {
                AzureError::NotFound(_) => AzureError::NotFound(id.to_string()),
                other => other,
            })?;
        Ok(response.json::<Resource>().await?)
    }

    async fn put_resource(&self, id: &ResourceId, body: serde_json::Value) -> Result<Resource> {
        tracing::debug!(id = %id, "PUT");
        let response = self
            .send(self.client.put(self.resource_url(id)).json(&body))
            .await?;

        let status = response.status();
        let delay = self.retry_after(&response);
        let operation = header(&response, "Azure-AsyncOperation");
        let location = header(&response, "Location");
        let text = response.text().await?;

        if let Some(url) = operation {
            self.poll_operation(&url, delay).await?;
            return self.wait_for_resource(id).await;
        }
        if status == StatusCode::ACCEPTED {
            if let Some(url) = location {
                self.poll_location(&url, delay).await?;
            }
            return self.wait_for_resource(id).await;
        }

        if text.trim().is_empty() {
            return self.wait_for_resource(id).await;
        }
        let resource: Resource = serde_json::from_str(&text)?;
        match provisioning_state(&resource) {
            ProvisioningState::Succeeded => Ok(resource),
            ProvisioningState::Failed(state) => Err(AzureError::OperationFailed {
                status: state,
                message: format!("provisioning of {} did not succeed", id),
            }),
            ProvisioningState::InProgress => self.wait_for_resource(id).await,
        }
    }

    /// Poll an `Azure-AsyncOperation` URL until it reports a terminal status
    async fn poll_operation(&self, url: &str, mut delay: Duration) -> Result<()> {
        loop {
            tokio::time::sleep(delay).await;
            let response = self.send(self.client.get(url)).await?;
            delay = self.retry_after(&response);

            let operation: OperationStatus = response.json().await?;
            match operation.status.to_ascii_lowercase().as_str() {
                "succeeded" => return Ok(()),
                "failed" | "canceled" => {
                    let message = operation
                        .error
                        .map(|e| format!("({}) {}", e.code, e.message))
                        .unwrap_or_else(|| "no error details".to_string());
                    return Err(AzureError::OperationFailed {
                        status: operation.status,
                        message,
                    });
                }
                other => tracing::debug!(status = other, "Operation in progress"),
            }
        }
    }

    /// Poll a `Location` URL until it stops answering 202
    async fn poll_location(&self, url: &str, mut delay: Duration) -> Result<()> {
        loop {
            tokio::time::sleep(delay).await;
            let response = self.send(self.client.get(url)).await?;
            if response.status() != StatusCode::ACCEPTED {
                return Ok(());
            }
            delay = self.retry_after(&response);
        }
    }

    /// Re-read a resource until its provisioning state is terminal
    async fn wait_for_resource(&self, id: &ResourceId) -> Result<Resource> {
        loop {
            let resource = self.get_resource(id).await?;
            match provisioning_state(&resource) {
                ProvisioningState::Succeeded => return Ok(resource),
                ProvisioningState::Failed(state) => {
                    return Err(AzureError::OperationFailed {
                        status: state,
                        message: format!("provisioning of {} did not succeed", id),
                    });
                }
                ProvisioningState::InProgress => {
                    tokio::time::sleep(self.config.poll_interval).await;
                }
            }
        }
    }

    async fn group_exists(&self, subscription_id: &str, resource_group: &str) -> Result<bool> {
        let id = ResourceId::resource_group(subscription_id, resource_group);
        let response = self
            .client
            .head(self.resource_url(&id))
            .bearer_auth(&self.config.access_token)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(error_from_body(status, &id.to_string(), "")),
        }
    }

    async fn list_collection(&self, scope: &ResourceScope) -> Result<Vec<Resource>> {
        let mut resources = Vec::new();
        let mut next = Some(self.url(&scope.to_string(), api_version(&scope.resource_type)));

        while let Some(url) = next {
            let page: Page = self.send(self.client.get(&url)).await?.json().await?;
            resources.extend(page.value);
            next = page.next_link;
        }

        tracing::debug!(scope = %scope, count = resources.len(), "Listed resources");
        Ok(resources)
    }
}

fn error_from_body(status: StatusCode, url: &str, body: &str) -> AzureError {
    let detail = serde_json::from_str::<ErrorResponse>(body).ok().map(|r| r.error);
    match (status, detail) {
        (StatusCode::NOT_FOUND, _) => AzureError::NotFound(url.to_string()),
        (StatusCode::UNAUTHORIZED, detail) => AzureError::Unauthorized(
            detail
                .map(|d| d.message)
                .unwrap_or_else(|| status.to_string()),
        ),
        (_, Some(detail)) => AzureError::Api {
            status: status.as_u16(),
            code: detail.code,
            message: detail.message,
        },
        (_, None) => AzureError::Api {
            status: status.as_u16(),
            code: status.as_u16().to_string(),
            message: status
                .canonical_reason()
                .unwrap_or("unexpected response")
                .to_string(),
        },
    }
}

#[async_trait]
impl ControlPlane for ArmClient {
    async fn resource_group_exists(
        &self,
        subscription_id: &str,
        resource_group: &str,
    ) -> vnetflow_cloud::Result<bool> {
        Ok(self.group_exists(subscription_id, resource_group).await?)
    }

    async fn create_or_update(
        &self,
        id: &ResourceId,
        body: serde_json::Value,
    ) -> vnetflow_cloud::Result<Resource> {
        Ok(self.put_resource(id, body).await?)
    }

    async fn get(&self, id: &ResourceId) -> vnetflow_cloud::Result<Resource> {
        Ok(self.get_resource(id).await?)
    }

    async fn list(&self, scope: &ResourceScope) -> vnetflow_cloud::Result<Vec<Resource>> {
        Ok(self.list_collection(scope).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_versions() {
        let group = ResourceId::resource_group("s", "rg");
        assert_eq!(api_version_for(&group), RESOURCE_GROUP_API_VERSION);

        let zone = ResourceId::network("s", "rg", types::PRIVATE_DNS_ZONES, "corp.internal")
            .child(types::VIRTUAL_NETWORK_LINKS, "hub");
        assert_eq!(api_version_for(&zone), PRIVATE_DNS_API_VERSION);

        let nic = ResourceId::network("s", "rg", types::NETWORK_INTERFACES, "nic");
        assert_eq!(api_version_for(&nic), NETWORK_API_VERSION);
    }

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        let config = ArmConfig::new("token").with_endpoint("http://localhost:8080/");
        assert_eq!(config.endpoint, "http://localhost:8080");
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn test_error_body_parsing() {
        let err = error_from_body(
            StatusCode::BAD_REQUEST,
            "/x",
            r#"{"error":{"code":"InvalidAddressPrefix","message":"bad prefix"}}"#,
        );
        assert_eq!(err.to_string(), "(InvalidAddressPrefix) bad prefix");

        let err = error_from_body(StatusCode::BAD_GATEWAY, "/x", "<html>");
        assert!(matches!(err, AzureError::Api { status: 502, .. }));
    }
}
