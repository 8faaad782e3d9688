/// GKE API client
use anyhow::{Context, Result};
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::models::*;
use crate::config::ProviderSettings;
use crate::utils::polling::PollingConfig;

pub const GKE_API_BASE: &str = "https://container.googleapis.com/v1";

const OPERATION_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Client scoped to one project and location
#[derive(Clone)]
pub struct GkeClient {
    client: Client,
    base: Url,
    operation_timeout: Duration,
}

impl GkeClient {
    /// Create a new GKE API client
    pub fn new(access_token: &str, settings: &ProviderSettings) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", access_token))
                .context("Invalid access token format")?,
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base: with_segments(
                &settings.api_endpoint,
                &[
                    "projects",
                    settings.project.as_str(),
                    "locations",
                    settings.location.as_str(),
                ],
            )?,
            operation_timeout: settings.operation_timeout,
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        with_segments(&self.base, segments)
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let url = self.url(segments)?;
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send GET request")?;

        handle_response(response).await
    }

    async fn post<T: Serialize, R: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &T,
    ) -> Result<R> {
        let url = self.url(segments)?;
        debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send POST request")?;

        handle_response(response).await
    }

    async fn delete<R: DeserializeOwned>(&self, segments: &[&str]) -> Result<R> {
        let url = self.url(segments)?;
        debug!("DELETE {}", url);

        let response = self
            .client
            .delete(url)
            .send()
            .await
            .context("Failed to send DELETE request")?;

        handle_response(response).await
    }

    /// Get the server configuration (available versions) for the location
    pub async fn get_server_config(&self) -> Result<ServerConfig> {
        self.get(&["serverConfig"]).await
    }

    /// Get cluster by name
    pub async fn get_cluster(&self, name: &str) -> Result<Cluster> {
        self.get(&["clusters", name]).await
    }

    /// Start cluster creation
    pub async fn create_cluster(&self, request: &CreateClusterRequest) -> Result<Operation> {
        self.post(&["clusters"], request).await
    }

    /// Start cluster deletion
    pub async fn delete_cluster(&self, name: &str) -> Result<Operation> {
        self.delete(&["clusters", name]).await
    }

    /// Get operation status
    pub async fn get_operation(&self, name: &str) -> Result<Operation> {
        self.get(&["operations", name]).await
    }

    /// Wait for an operation to finish, failing if it finished with an error
    pub async fn wait_for_operation(&self, operation: Operation) -> Result<Operation> {
        let description = format!(
            "Waiting for {} operation {}",
            operation.operation_type, operation.name
        );
        let polling = PollingConfig::new(self.operation_timeout, OPERATION_POLL_INTERVAL, description);

        let name = operation.name.clone();
        let mut first = Some(operation);
        let done = polling
            .poll(|| {
                let known = first.take();
                let name = name.clone();
                async move {
                    let op = match known {
                        Some(op) => op,
                        None => self.get_operation(&name).await?,
                    };
                    debug!("Operation {} status: {:?}", op.name, op.status);
                    Ok((op.status == OperationStatus::Done).then_some(op))
                }
            })
            .await?;

        if let Some(message) = done.status_message.as_deref().filter(|m| !m.is_empty()) {
            debug!("Operation {} status message: {}", done.name, message);
        }

        if let Some(failure) = done.failure() {
            anyhow::bail!("Operation {} failed: {}", done.name, failure);
        }

        if let (Some(start), Some(end)) = (done.start_time, done.end_time) {
            info!(
                "Operation {} finished in {}s",
                done.name,
                (end - start).num_seconds()
            );
        }

        Ok(done)
    }
}

/// Append percent-encoded path segments to `base`
fn with_segments(base: &Url, segments: &[&str]) -> Result<Url> {
    if let Some(bad) = segments
        .iter()
        .find(|s| s.is_empty() || **s == "." || **s == "..")
    {
        anyhow::bail!("Invalid resource name in API path: {:?}", bad);
    }

    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("API endpoint cannot be a base URL: {}", base))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Decode a successful body, or turn the API error body into an error
async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();

    if status.is_success() {
        return response
            .json::<T>()
            .await
            .context("Failed to parse API response");
    }

    let error_text = response.text().await.unwrap_or_default();
    Err(api_error(status, &error_text))
}

fn api_error(status: reqwest::StatusCode, body: &str) -> anyhow::Error {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(error_response) => anyhow::anyhow!(
            "API error: {} ({}) - {}",
            error_response.error.status,
            error_response.error.code,
            error_response.error.message
        ),
        Err(_) => anyhow::anyhow!("API request failed with status {}: {}", status, body),
    }
}
