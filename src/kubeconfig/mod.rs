/// Kubeconfig rendering and export
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Credential plugin kubectl invokes for GKE clusters
pub const AUTH_PLUGIN_COMMAND: &str = "gke-gcloud-auth-plugin";
pub const AUTH_PLUGIN_INSTALL_HINT: &str =
    "https://cloud.google.com/blog/products/containers-kubernetes/kubectl-auth-changes-in-gke";

/// Prefix for the cluster, context and user entries
pub const CONTEXT_PREFIX: &str = "demo_";

/// Render a kubeconfig for a cluster; the CA data is embedded as given
pub fn render_kubeconfig(endpoint: &str, name: &str, ca_cert_data: &str) -> String {
    let context = format!("{}{}", CONTEXT_PREFIX, name);

    format!(
        r#"apiVersion: v1
clusters:
- cluster:
    certificate-authority-data: {ca_cert_data}
    server: https://{endpoint}
  name: {context}
contexts:
- context:
    cluster: {context}
    user: {context}
  name: {context}
current-context: {context}
kind: Config
preferences: {{}}
users:
- name: {context}
  user:
    exec:
      apiVersion: client.authentication.k8s.io/v1beta1
      command: {AUTH_PLUGIN_COMMAND}
      installHint: Install {AUTH_PLUGIN_COMMAND} for use with kubectl by following
        {AUTH_PLUGIN_INSTALL_HINT}
      provideClusterInfo: true
"#
    )
}

/// Named program exports
#[derive(Debug, Serialize)]
pub struct Exports<'a> {
    pub kubeconfig: &'a str,
}

/// Files written by `export`
#[derive(Debug, Clone)]
pub struct ExportedFiles {
    pub kubeconfig: PathBuf,
    pub outputs: PathBuf,
}

/// Write `kubeconfig` and `outputs.json` into `output_dir`
pub async fn export(output_dir: &Path, kubeconfig: &str) -> Result<ExportedFiles> {
    tokio::fs::create_dir_all(output_dir)
        .await
        .context("Failed to create output directory")?;

    let files = ExportedFiles {
        kubeconfig: output_dir.join("kubeconfig"),
        outputs: output_dir.join("outputs.json"),
    };

    tokio::fs::write(&files.kubeconfig, kubeconfig)
        .await
        .context("Failed to write kubeconfig")?;

    let outputs = serde_json::to_string_pretty(&Exports { kubeconfig })?;
    tokio::fs::write(&files.outputs, outputs)
        .await
        .context("Failed to write outputs.json")?;

    info!("Kubeconfig written to: {}", files.kubeconfig.display());

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPECTED: &str = "apiVersion: v1
clusters:
- cluster:
    certificate-authority-data: ABC==
    server: https://1.2.3.4
  name: demo_my-cluster
contexts:
- context:
    cluster: demo_my-cluster
    user: demo_my-cluster
  name: demo_my-cluster
current-context: demo_my-cluster
kind: Config
preferences: {}
users:
- name: demo_my-cluster
  user:
    exec:
      apiVersion: client.authentication.k8s.io/v1beta1
      command: gke-gcloud-auth-plugin
      installHint: Install gke-gcloud-auth-plugin for use with kubectl by following
        https://cloud.google.com/blog/products/containers-kubernetes/kubectl-auth-changes-in-gke
      provideClusterInfo: true
";

    #[test]
    fn test_render_exact() {
        assert_eq!(render_kubeconfig("1.2.3.4", "my-cluster", "ABC=="), EXPECTED);
    }

    #[test]
    fn test_render_fields() {
        let doc = render_kubeconfig("1.2.3.4", "my-cluster", "ABC==");

        assert!(doc.contains("server: https://1.2.3.4"));
        assert!(doc.contains("certificate-authority-data: ABC=="));
        assert!(!doc.contains("name: my-cluster"));
        assert_eq!(doc.matches("demo_my-cluster").count(), 6);
    }

    #[test]
    fn test_render_is_pure() {
        let a = render_kubeconfig("10.0.0.1", "prod", "Q0E=");
        let b = render_kubeconfig("10.0.0.1", "prod", "Q0E=");
        assert_eq!(a, b);
    }

    #[test]
    fn test_render_parses_as_yaml() {
        let doc = render_kubeconfig("34.1.2.3", "demo1", "LS0tLS1CRUdJTg==");
        let value: serde_yaml::Value = serde_yaml::from_str(&doc).unwrap();

        assert_eq!(value["current-context"].as_str(), Some("demo_demo1"));
        assert_eq!(
            value["clusters"][0]["cluster"]["server"].as_str(),
            Some("https://34.1.2.3")
        );
        assert_eq!(
            value["users"][0]["user"]["exec"]["command"].as_str(),
            Some("gke-gcloud-auth-plugin")
        );
        assert_eq!(
            value["users"][0]["user"]["exec"]["installHint"].as_str(),
            Some("Install gke-gcloud-auth-plugin for use with kubectl by following https://cloud.google.com/blog/products/containers-kubernetes/kubectl-auth-changes-in-gke")
        );
    }

    #[test]
    fn test_empty_ca_still_well_formed() {
        let doc = render_kubeconfig("1.2.3.4", "my-cluster", "");
        let value: serde_yaml::Value = serde_yaml::from_str(&doc).unwrap();

        let ca = &value["clusters"][0]["cluster"]["certificate-authority-data"];
        assert!(ca.is_null() || ca.as_str() == Some(""));
        assert_eq!(value["kind"].as_str(), Some("Config"));
    }

    #[tokio::test]
    async fn test_export_writes_files() {
        let dir = std::env::temp_dir().join(format!("gke-provisioner-export-{}", std::process::id()));
        let doc = render_kubeconfig("1.2.3.4", "my-cluster", "ABC==");

        let files = export(&dir, &doc).await.unwrap();

        let written = tokio::fs::read_to_string(&files.kubeconfig).await.unwrap();
        assert_eq!(written, doc);

        let outputs: serde_json::Value =
            serde_json::from_str(&tokio::fs::read_to_string(&files.outputs).await.unwrap())
                .unwrap();
        assert_eq!(outputs["kubeconfig"].as_str(), Some(doc.as_str()));

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
