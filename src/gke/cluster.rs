/// Cluster request building and lifecycle on GKE
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::client::GkeClient;
use super::models::{Cluster, ClusterSpec, CreateClusterRequest, NodeConfig, NodePool};
use crate::config::ClusterRequestConfig;
use crate::error::ProvisioningError;

/// Access scopes attached to every node, in this order
pub const NODE_OAUTH_SCOPES: [&str; 4] = [
    "https://www.googleapis.com/auth/compute",
    "https://www.googleapis.com/auth/devstorage.read_only",
    "https://www.googleapis.com/auth/logging.write",
    "https://www.googleapis.com/auth/monitoring",
];

pub const DEFAULT_POOL_NAME: &str = "default-pool";
pub const DELETION_PROTECTION_LABEL: &str = "deletion-protection";
pub const MANAGED_BY_LABEL: &str = "managed-by";
pub const MANAGED_BY: &str = "gke-provisioner";

/// The provider operations the provisioner depends on
#[async_trait]
pub trait ContainerApi: Send + Sync {
    /// Newest control-plane version offered for the location
    async fn latest_master_version(&self) -> Result<String>;

    /// Create the cluster and wait until it exists
    async fn create_cluster(&self, request: &ClusterRequest) -> Result<Cluster>;

    async fn get_cluster(&self, name: &str) -> Result<Cluster>;

    /// Delete the cluster and wait until it is gone
    async fn delete_cluster(&self, name: &str) -> Result<()>;
}

/// Fully resolved cluster creation request
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterRequest {
    pub name: String,
    pub deletion_protection: bool,
    pub network: String,
    pub subnetwork: String,
    pub initial_node_count: u32,
    pub min_master_version: String,
    pub node_version: String,
    pub node_config: NodeConfig,
}

impl ClusterRequest {
    /// GKE wire form: one default node pool, deletion protection kept as a label
    pub fn to_create_request(&self) -> CreateClusterRequest {
        let resource_labels = [
            (MANAGED_BY_LABEL.to_string(), MANAGED_BY.to_string()),
            (
                DELETION_PROTECTION_LABEL.to_string(),
                self.deletion_protection.to_string(),
            ),
        ]
        .into_iter()
        .collect();

        CreateClusterRequest {
            cluster: ClusterSpec {
                name: self.name.clone(),
                network: self.network.clone(),
                subnetwork: self.subnetwork.clone(),
                initial_cluster_version: self.min_master_version.clone(),
                node_pools: vec![NodePool {
                    name: DEFAULT_POOL_NAME.to_string(),
                    initial_node_count: self.initial_node_count,
                    version: self.node_version.clone(),
                    config: self.node_config.clone(),
                }],
                resource_labels,
            },
        }
    }
}

/// Map configuration to a request; control plane and nodes share `platform_version`
pub fn build_request(config: &ClusterRequestConfig, platform_version: &str) -> ClusterRequest {
    ClusterRequest {
        name: config.cluster_name.clone(),
        deletion_protection: false,
        network: config.network.clone(),
        subnetwork: config.subnetwork.clone(),
        initial_node_count: config.node_count,
        min_master_version: platform_version.to_string(),
        node_version: platform_version.to_string(),
        node_config: NodeConfig {
            machine_type: config.machine_type.clone(),
            oauth_scopes: NODE_OAUTH_SCOPES.iter().map(|s| s.to_string()).collect(),
        },
    }
}

/// Cluster manager driving a `ContainerApi`
pub struct ClusterManager<A> {
    api: A,
}

impl<A: ContainerApi> ClusterManager<A> {
    /// Create a new cluster manager
    pub fn new(api: A) -> Self {
        Self { api }
    }

    /// Look up the platform version and build the request, without creating anything
    pub async fn plan(
        &self,
        config: &ClusterRequestConfig,
    ) -> Result<ClusterRequest, ProvisioningError> {
        let version = self
            .api
            .latest_master_version()
            .await
            .map_err(ProvisioningError::VersionLookupFailed)?;

        info!("Latest platform version: {}", version);

        Ok(build_request(config, &version))
    }

    /// Create the cluster described by `config`
    pub async fn create_cluster(
        &self,
        config: &ClusterRequestConfig,
    ) -> Result<Cluster, ProvisioningError> {
        let request = self.plan(config).await?;

        info!(
            "Creating cluster {} ({} x {}, version {})",
            request.name,
            request.initial_node_count,
            request.node_config.machine_type,
            request.min_master_version
        );

        let cluster = self.api.create_cluster(&request).await.map_err(|source| {
            ProvisioningError::CreationFailed {
                cluster: request.name.clone(),
                source,
            }
        })?;

        info!(
            "Cluster created successfully: {} (endpoint: {})",
            cluster.name, cluster.endpoint
        );

        Ok(cluster)
    }

    /// Read an existing cluster
    pub async fn get_cluster(&self, name: &str) -> Result<Cluster> {
        self.api
            .get_cluster(name)
            .await
            .with_context(|| format!("Failed to read cluster {}", name))
    }

    /// Delete a cluster unless it carries deletion protection
    pub async fn destroy_cluster(&self, name: &str) -> Result<()> {
        let cluster = self.get_cluster(name).await?;

        if is_deletion_protected(&cluster) {
            anyhow::bail!(
                "Cluster {} has deletion protection enabled ({}=true); refusing to delete",
                name,
                DELETION_PROTECTION_LABEL
            );
        }

        info!("Deleting cluster: {}", name);
        self.api
            .delete_cluster(name)
            .await
            .with_context(|| format!("Failed to delete cluster {}", name))?;
        info!("Cluster deleted successfully");

        Ok(())
    }
}

/// Whether the cluster was created with deletion protection
pub fn is_deletion_protected(cluster: &Cluster) -> bool {
    cluster
        .resource_labels
        .get(DELETION_PROTECTION_LABEL)
        .is_some_and(|v| v == "true")
}

#[async_trait]
impl ContainerApi for GkeClient {
    async fn latest_master_version(&self) -> Result<String> {
        let server_config = self.get_server_config().await?;
        debug!(
            "Default cluster version: {}",
            server_config.default_cluster_version
        );

        let version = server_config.latest_master_version()?;

        if !server_config.allows_node_version(&version) {
            warn!("Version {} is not listed as a valid node version", version);
        }

        Ok(version)
    }

    async fn create_cluster(&self, request: &ClusterRequest) -> Result<Cluster> {
        let operation = GkeClient::create_cluster(self, &request.to_create_request()).await?;
        self.wait_for_operation(operation).await?;
        GkeClient::get_cluster(self, &request.name).await
    }

    async fn get_cluster(&self, name: &str) -> Result<Cluster> {
        GkeClient::get_cluster(self, name).await
    }

    async fn delete_cluster(&self, name: &str) -> Result<()> {
        let operation = GkeClient::delete_cluster(self, name).await?;
        self.wait_for_operation(operation).await?;
        Ok(())
    }
}
