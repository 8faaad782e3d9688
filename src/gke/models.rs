/// GKE v1 API data models
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Cluster resource as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub name: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub master_auth: MasterAuth,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub current_master_version: String,
    #[serde(default)]
    pub current_node_version: String,
    #[serde(default)]
    pub current_node_count: u32,
    #[serde(default)]
    pub resource_labels: HashMap<String, String>,
}

/// Master authentication bundle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterAuth {
    /// Base64-encoded PEM of the cluster CA
    #[serde(default)]
    pub cluster_ca_certificate: String,
}

/// Node pool definition used at creation time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePool {
    pub name: String,
    pub initial_node_count: u32,
    pub version: String,
    pub config: NodeConfig,
}

/// Per-node configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfig {
    pub machine_type: String,
    pub oauth_scopes: Vec<String>,
}

/// Cluster body of a create request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    pub name: String,
    pub network: String,
    pub subnetwork: String,
    pub initial_cluster_version: String,
    pub node_pools: Vec<NodePool>,
    pub resource_labels: BTreeMap<String, String>,
}

/// Request structure for creating a cluster
#[derive(Debug, Clone, Serialize)]
pub struct CreateClusterRequest {
    pub cluster: ClusterSpec,
}

/// Server configuration for a location
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default)]
    pub default_cluster_version: String,
    /// Newest first
    #[serde(default)]
    pub valid_master_versions: Vec<String>,
    #[serde(default)]
    pub valid_node_versions: Vec<String>,
}

impl ServerConfig {
    /// Newest valid control-plane version
    pub fn latest_master_version(&self) -> Result<String> {
        self.valid_master_versions
            .first()
            .cloned()
            .context("Provider reported no valid master versions")
    }

    /// Whether nodes may run `version`; an empty list means unknown
    pub fn allows_node_version(&self, version: &str) -> bool {
        self.valid_node_versions.is_empty() || self.valid_node_versions.iter().any(|v| v == version)
    }
}

/// Long-running operation
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub name: String,
    #[serde(default)]
    pub operation_type: String,
    pub status: OperationStatus,
    #[serde(default)]
    pub status_message: Option<String>,
    #[serde(default)]
    pub error: Option<Status>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
}

impl Operation {
    /// Failure message of a finished operation, if it failed
    pub fn failure(&self) -> Option<String> {
        self.error
            .as_ref()
            .map(|error| format!("{} (code {})", error.message, error.code))
    }
}

/// Operation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    StatusUnspecified,
    Pending,
    Running,
    Done,
    Aborting,
}

/// google.rpc.Status attached to failed operations
#[derive(Debug, Clone, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

/// Error response from API
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: ApiError,
}

/// API error details
#[derive(Debug, Deserialize)]
pub struct ApiError {
    pub code: u16,
    pub message: String,
    #[serde(default)]
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_deserialization() {
        let json = r#"{
            "name": "demo1",
            "endpoint": "34.1.2.3",
            "masterAuth": {"clusterCaCertificate": "LS0tLS1CRUdJTg=="},
            "status": "RUNNING",
            "location": "us-central1-a",
            "currentMasterVersion": "1.29.0-gke.1",
            "currentNodeVersion": "1.29.0-gke.1",
            "currentNodeCount": 3,
            "resourceLabels": {"deletion-protection": "false"},
            "selfLink": "ignored"
        }"#;

        let cluster: Cluster = serde_json::from_str(json).unwrap();
        assert_eq!(cluster.endpoint, "34.1.2.3");
        assert_eq!(cluster.master_auth.cluster_ca_certificate, "LS0tLS1CRUdJTg==");
        assert_eq!(cluster.current_node_count, 3);
        assert_eq!(
            cluster.resource_labels.get("deletion-protection").map(String::as_str),
            Some("false")
        );
    }

    #[test]
    fn test_provisioning_cluster_without_endpoint() {
        let cluster: Cluster =
            serde_json::from_str(r#"{"name": "demo1", "status": "PROVISIONING"}"#).unwrap();
        assert_eq!(cluster.endpoint, "");
        assert_eq!(cluster.master_auth.cluster_ca_certificate, "");
    }

    #[test]
    fn test_operation_failure() {
        let json = r#"{
            "name": "operation-123",
            "operationType": "CREATE_CLUSTER",
            "status": "DONE",
            "error": {"code": 8, "message": "Insufficient regional quota"},
            "startTime": "2024-05-01T10:00:00.000000Z",
            "endTime": "2024-05-01T10:01:30Z"
        }"#;

        let op: Operation = serde_json::from_str(json).unwrap();
        assert_eq!(op.status, OperationStatus::Done);
        assert_eq!(
            op.failure().as_deref(),
            Some("Insufficient regional quota (code 8)")
        );
        let elapsed = op.end_time.unwrap() - op.start_time.unwrap();
        assert_eq!(elapsed.num_seconds(), 90);
    }

    #[test]
    fn test_running_operation() {
        let op: Operation =
            serde_json::from_str(r#"{"name": "operation-1", "status": "RUNNING"}"#).unwrap();
        assert_eq!(op.status, OperationStatus::Running);
        assert!(op.failure().is_none());
    }

    #[test]
    fn test_status_message_alone_is_not_failure() {
        let op: Operation = serde_json::from_str(
            r#"{"name": "operation-2", "status": "DONE", "statusMessage": "Cluster is running"}"#,
        )
        .unwrap();
        assert!(op.failure().is_none());
    }

    #[test]
    fn test_server_config_deserialization() {
        let json = r#"{
            "defaultClusterVersion": "1.29.0-gke.1",
            "validMasterVersions": ["1.30.1-gke.1", "1.29.0-gke.1"],
            "validNodeVersions": ["1.30.1-gke.1", "1.29.0-gke.1", "1.28.9-gke.2"],
            "defaultImageType": "COS_CONTAINERD"
        }"#;

        let config: ServerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.default_cluster_version, "1.29.0-gke.1");
        assert_eq!(config.valid_master_versions.len(), 2);
        assert_eq!(config.latest_master_version().unwrap(), "1.30.1-gke.1");
        assert!(config.allows_node_version("1.28.9-gke.2"));
        assert!(!config.allows_node_version("1.27.0"));
    }

    #[test]
    fn test_latest_master_version_is_first_entry() {
        let config = ServerConfig {
            default_cluster_version: "1.29.0".to_string(),
            valid_master_versions: vec!["1.31.0".to_string(), "1.30.2".to_string(), "1.29.0".to_string()],
            valid_node_versions: vec![],
        };
        assert_eq!(config.latest_master_version().unwrap(), "1.31.0");
        assert!(config.allows_node_version("anything"));
    }

    #[test]
    fn test_no_master_versions_is_error() {
        let config: ServerConfig = serde_json::from_str(r#"{"validMasterVersions": []}"#).unwrap();
        let err = config.latest_master_version().unwrap_err();
        assert_eq!(err.to_string(), "Provider reported no valid master versions");
    }

    #[test]
    fn test_create_request_wire_shape() {
        let request = CreateClusterRequest {
            cluster: ClusterSpec {
                name: "demo1".to_string(),
                network: "net-a".to_string(),
                subnetwork: "sub-a".to_string(),
                initial_cluster_version: "1.29.0".to_string(),
                node_pools: vec![NodePool {
                    name: "default-pool".to_string(),
                    initial_node_count: 3,
                    version: "1.29.0".to_string(),
                    config: NodeConfig {
                        machine_type: "e2-standard-4".to_string(),
                        oauth_scopes: vec!["https://www.googleapis.com/auth/compute".to_string()],
                    },
                }],
                resource_labels: BTreeMap::new(),
            },
        };

        let value = serde_json::to_value(&request).unwrap();
        let cluster = &value["cluster"];
        assert_eq!(cluster["initialClusterVersion"], "1.29.0");
        assert_eq!(cluster["nodePools"][0]["initialNodeCount"], 3);
        assert_eq!(cluster["nodePools"][0]["version"], "1.29.0");
        assert_eq!(cluster["nodePools"][0]["config"]["machineType"], "e2-standard-4");
        assert_eq!(
            cluster["nodePools"][0]["config"]["oauthScopes"][0],
            "https://www.googleapis.com/auth/compute"
        );
    }
}
