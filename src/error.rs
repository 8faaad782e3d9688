/// Error types for configuration loading and cluster provisioning
use thiserror::Error;

/// Raised while turning raw inputs into a `ClusterRequestConfig`
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid NODE_COUNT {value:?}: {reason}")]
    InvalidNodeCount { value: String, reason: String },

    #[error("GKE_CLUSTER_NAME cannot be empty")]
    EmptyClusterName,
}

/// Raised by the cluster request builder; the cause is kept as-is
#[derive(Error, Debug)]
pub enum ProvisioningError {
    #[error("Failed to look up the latest platform version")]
    VersionLookupFailed(#[source] anyhow::Error),

    #[error("Failed to create cluster {cluster}")]
    CreationFailed {
        cluster: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_creation_failure_keeps_cause() {
        let err = ProvisioningError::CreationFailed {
            cluster: "demo1".to_string(),
            source: anyhow::anyhow!("API error: ALREADY_EXISTS (409) - Already exists"),
        };

        assert_eq!(err.to_string(), "Failed to create cluster demo1");
        assert_eq!(
            err.source().map(|s| s.to_string()),
            Some("API error: ALREADY_EXISTS (409) - Already exists".to_string())
        );
    }

    #[test]
    fn test_invalid_node_count_message() {
        let err = ConfigError::InvalidNodeCount {
            value: "three".to_string(),
            reason: "invalid digit found in string".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid NODE_COUNT \"three\": invalid digit found in string"
        );
    }
}
