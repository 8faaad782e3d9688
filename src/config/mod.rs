/// Configuration management for gke-provisioner
use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;
use tracing::info;
use url::Url;

use crate::error::ConfigError;

pub const GCP_PROJECT: &str = "GCP_PROJECT";
pub const NETWORK: &str = "NETWORK";
pub const SUB_NETWORK: &str = "SUB_NETWORK";
pub const MACHINE_TYPE: &str = "MACHINE_TYPE";
pub const NODE_COUNT: &str = "NODE_COUNT";
pub const GKE_CLUSTER_NAME: &str = "GKE_CLUSTER_NAME";

/// Fallback project variable understood by the Google tooling
pub const GOOGLE_PROJECT: &str = "GOOGLE_PROJECT";

/// Everything needed to request a cluster, built once at start-up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterRequestConfig {
    /// GCP project identifier
    pub gcp_project: String,

    /// VPC network reference
    pub network: String,

    /// Subnetwork reference
    pub subnetwork: String,

    /// Node machine type (e.g., "e2-standard-4")
    pub machine_type: String,

    /// Initial number of nodes, between 1 and `MAX_NODE_COUNT`
    pub node_count: u32,

    /// Cluster resource name
    pub cluster_name: String,
}

impl ClusterRequestConfig {
    /// Load configuration from any name -> value lookup
    ///
    /// Missing values read as empty strings. Only the node count and the
    /// cluster name are validated; everything else is passed through.
    pub fn from_source<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).unwrap_or_default();

        let gcp_project = read(GCP_PROJECT);
        let network = read(NETWORK);
        let subnetwork = read(SUB_NETWORK);
        let machine_type = read(MACHINE_TYPE);
        let node_count_raw = read(NODE_COUNT);
        let cluster_name = read(GKE_CLUSTER_NAME);

        info!("{}: {}", GCP_PROJECT, gcp_project);
        info!("{}: {}", NETWORK, network);
        info!("{}: {}", SUB_NETWORK, subnetwork);
        info!("{}: {}", MACHINE_TYPE, machine_type);
        info!("{}: {}", NODE_COUNT, node_count_raw);
        info!("{}: {}", GKE_CLUSTER_NAME, cluster_name);

        let node_count = parse_node_count(&node_count_raw)?;

        if cluster_name.is_empty() {
            return Err(ConfigError::EmptyClusterName);
        }

        Ok(Self {
            gcp_project,
            network,
            subnetwork,
            machine_type,
            node_count,
            cluster_name,
        })
    }

    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(|key| std::env::var(key).ok())
    }
}

/// Identifies an existing cluster for `status`, `kubeconfig` and `destroy`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterRef {
    pub gcp_project: String,
    pub cluster_name: String,
}

impl ClusterRef {
    /// Read the project and cluster name from any name -> value lookup
    pub fn from_source<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let cluster_name = lookup(GKE_CLUSTER_NAME).unwrap_or_default();
        if cluster_name.is_empty() {
            return Err(ConfigError::EmptyClusterName);
        }

        Ok(Self {
            gcp_project: lookup(GCP_PROJECT).unwrap_or_default(),
            cluster_name,
        })
    }

    /// Read the project and cluster name from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(|key| std::env::var(key).ok())
    }
}

/// Largest node count the provider accepts (an int32 on the wire)
pub const MAX_NODE_COUNT: i64 = i32::MAX as i64;

/// Parse a base-10 node count; must be between 1 and `MAX_NODE_COUNT`
pub fn parse_node_count(raw: &str) -> Result<u32, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidNodeCount {
        value: raw.to_string(),
        reason,
    };

    let count: i64 = raw.parse().map_err(|e: std::num::ParseIntError| invalid(e.to_string()))?;

    if count < 1 {
        return Err(invalid("must be at least 1".to_string()));
    }

    if count > MAX_NODE_COUNT {
        return Err(invalid(format!("must not exceed {}", MAX_NODE_COUNT)));
    }

    Ok(count as u32)
}

/// Provider-side settings resolved once before talking to GKE
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// Project the cluster lives in
    pub project: String,

    /// Zone or region (e.g., "us-central1-a")
    pub location: String,

    /// Base URL of the GKE v1 API
    pub api_endpoint: Url,

    /// How long to wait for a long-running operation
    pub operation_timeout: Duration,
}

impl ProviderSettings {
    /// Resolve settings, falling back to `GOOGLE_PROJECT` when `project` is empty
    pub fn resolve<F>(
        project: &str,
        lookup: F,
        location: String,
        api_endpoint: Url,
        operation_timeout: Duration,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let project = Some(project.to_string())
            .filter(|p| !p.is_empty())
            .or_else(|| lookup(GOOGLE_PROJECT).filter(|p| !p.is_empty()))
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "GCP project not found. Set {} (or {}) in the environment",
                    GCP_PROJECT,
                    GOOGLE_PROJECT
                )
            })?;

        if location.is_empty() {
            anyhow::bail!("location cannot be empty");
        }

        Ok(Self {
            project,
            location,
            api_endpoint,
            operation_timeout,
        })
    }
}

/// Access token from `GOOGLE_OAUTH_ACCESS_TOKEN`, else from the gcloud CLI
pub async fn resolve_access_token(env_token: Option<String>) -> Result<String> {
    if let Some(token) = env_token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) {
        return Ok(token);
    }

    crate::utils::command::gcloud_access_token()
        .await
        .context("GCP access token not found. Set GOOGLE_OAUTH_ACCESS_TOKEN or log in with gcloud")
}

/// Load a dotenv file into the process environment without overriding existing variables
pub fn load_env_file(path: &Path) -> Result<()> {
    dotenvy::from_path(path)
        .with_context(|| format!("Failed to load env file {}", path.display()))?;
    info!("Loaded environment from {}", path.display());
    Ok(())
}

/// Example env file written by `init`
pub fn example_env() -> String {
    format!(
        "# Cluster inputs\n\
         {GCP_PROJECT}=my-gcp-project\n\
         {NETWORK}=default\n\
         {SUB_NETWORK}=default\n\
         {MACHINE_TYPE}=e2-standard-4\n\
         {NODE_COUNT}=3\n\
         {GKE_CLUSTER_NAME}=demo1\n\
         \n\
         # Optional provider settings\n\
         # GOOGLE_ZONE=us-central1-a\n\
         # GOOGLE_OAUTH_ACCESS_TOKEN=\n\
         # GKE_API_ENDPOINT=https://container.googleapis.com/v1\n"
    )
}
