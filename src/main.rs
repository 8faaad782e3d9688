/// gke-provisioner - GKE clusters from environment inputs
///
/// Reads cluster inputs from the environment, creates a Google Kubernetes
/// Engine cluster and exports a kubeconfig for it.
mod config;
mod error;
mod gke;
mod kubeconfig;
mod utils;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use crate::config::{ClusterRef, ClusterRequestConfig, ProviderSettings};
use crate::gke::client::GKE_API_BASE;
use crate::gke::{ClusterManager, GkeClient};

const DEFAULT_LOCATION: &str = "us-central1-a";

#[derive(Parser)]
#[command(name = "gke-provisioner")]
#[command(about = "Provision GKE clusters from environment variables", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Env file loaded before reading inputs (written by `init`)
    #[arg(short, long)]
    env_file: Option<PathBuf>,

    /// Output directory for exported files
    #[arg(short, long, default_value = "./output")]
    output: PathBuf,

    /// Cluster zone or region [env: GOOGLE_ZONE, default: us-central1-a]
    #[arg(short, long)]
    location: Option<String>,

    /// GKE API base URL [env: GKE_API_ENDPOINT]
    #[arg(long)]
    api_endpoint: Option<Url>,

    /// Seconds to wait for cluster operations
    #[arg(long, default_value_t = 1800)]
    operation_timeout: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the cluster and export its kubeconfig
    Create {
        /// Print the creation request instead of sending it
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the kubeconfig of an existing cluster
    Kubeconfig,

    /// Show cluster status
    Status,

    /// Delete the cluster
    Destroy,

    /// Generate example env file
    Init,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries rendered documents
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("gke_provisioner={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = match cli.command {
        Commands::Create { dry_run } => create_cluster(&cli, dry_run).await,
        Commands::Kubeconfig => print_kubeconfig(&cli).await,
        Commands::Status => show_status(&cli).await,
        Commands::Destroy => destroy_cluster(&cli).await,
        Commands::Init => init_env(&cli).await,
    };

    if let Err(e) = result {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn load_env_file(cli: &Cli) -> Result<()> {
    match &cli.env_file {
        Some(path) => config::load_env_file(path),
        None => Ok(()),
    }
}

/// Resolve provider settings and credentials, then build a cluster manager
async fn connect(cli: &Cli, project: &str) -> Result<ClusterManager<GkeClient>> {
    let env = |key: &str| std::env::var(key).ok();

    let location = cli
        .location
        .clone()
        .or_else(|| env("GOOGLE_ZONE"))
        .unwrap_or_else(|| DEFAULT_LOCATION.to_string());

    let api_endpoint = match &cli.api_endpoint {
        Some(url) => url.clone(),
        None => {
            let raw = env("GKE_API_ENDPOINT").unwrap_or_else(|| GKE_API_BASE.to_string());
            Url::parse(&raw).with_context(|| format!("Invalid GKE_API_ENDPOINT: {}", raw))?
        }
    };

    let settings = ProviderSettings::resolve(
        project,
        env,
        location,
        api_endpoint,
        Duration::from_secs(cli.operation_timeout),
    )?;

    info!(
        "Project: {}, location: {}",
        settings.project, settings.location
    );

    let token = config::resolve_access_token(env("GOOGLE_OAUTH_ACCESS_TOKEN")).await?;
    let client = GkeClient::new(&token, &settings)?;

    Ok(ClusterManager::new(client))
}

/// Create the cluster and export its kubeconfig
async fn create_cluster(cli: &Cli, dry_run: bool) -> Result<()> {
    info!("Starting cluster creation...");

    load_env_file(cli)?;
    let config = ClusterRequestConfig::from_env().context("Failed to load configuration")?;

    let manager = connect(cli, &config.gcp_project).await?;

    if dry_run {
        let request = manager.plan(&config).await?;
        let yaml = serde_yaml::to_string(&request.to_create_request())?;
        println!("{}", yaml);
        info!("Dry run: no cluster was created");
        return Ok(());
    }

    let cluster = manager.create_cluster(&config).await?;

    let kubeconfig = kubeconfig::render_kubeconfig(
        &cluster.endpoint,
        &cluster.name,
        &cluster.master_auth.cluster_ca_certificate,
    );
    let files = kubeconfig::export(&cli.output, &kubeconfig).await?;

    info!("✓ Cluster creation completed successfully!");
    info!("");
    info!("Cluster details:");
    info!("  Name: {}", cluster.name);
    info!("  Endpoint: https://{}", cluster.endpoint);
    info!("  Nodes: {} x {}", config.node_count, config.machine_type);
    info!("");
    info!("Exports:");
    info!("  kubeconfig: {}", files.kubeconfig.display());
    info!("  outputs: {}", files.outputs.display());
    info!("");
    info!("To access your cluster:");
    info!("  export KUBECONFIG={}", files.kubeconfig.display());
    info!("  kubectl get nodes");

    Ok(())
}

/// Render the kubeconfig of an existing cluster to stdout
async fn print_kubeconfig(cli: &Cli) -> Result<()> {
    load_env_file(cli)?;
    let target = ClusterRef::from_env().context("Failed to load configuration")?;

    let manager = connect(cli, &target.gcp_project).await?;
    let cluster = manager.get_cluster(&target.cluster_name).await?;

    if cluster.endpoint.is_empty() {
        anyhow::bail!(
            "Cluster {} has no endpoint yet (status: {})",
            cluster.name,
            cluster.status
        );
    }

    print!(
        "{}",
        kubeconfig::render_kubeconfig(
            &cluster.endpoint,
            &cluster.name,
            &cluster.master_auth.cluster_ca_certificate,
        )
    );

    Ok(())
}

/// Show cluster status
async fn show_status(cli: &Cli) -> Result<()> {
    load_env_file(cli)?;
    let target = ClusterRef::from_env().context("Failed to load configuration")?;

    let manager = connect(cli, &target.gcp_project).await?;
    let cluster = manager.get_cluster(&target.cluster_name).await?;

    info!("Cluster: {}", cluster.name);
    info!("  Status: {}", cluster.status);
    info!("  Location: {}", cluster.location);
    info!("  Endpoint: {}", cluster.endpoint);
    info!("  Master version: {}", cluster.current_master_version);
    info!("  Node version: {}", cluster.current_node_version);
    info!("  Nodes: {}", cluster.current_node_count);
    info!(
        "  Deletion protection: {}",
        gke::cluster::is_deletion_protected(&cluster)
    );

    Ok(())
}

/// Delete the cluster
async fn destroy_cluster(cli: &Cli) -> Result<()> {
    info!("Starting cluster destruction...");

    load_env_file(cli)?;
    let target = ClusterRef::from_env().context("Failed to load configuration")?;

    let manager = connect(cli, &target.gcp_project).await?;
    manager.destroy_cluster(&target.cluster_name).await?;

    info!("✓ Cluster destroyed successfully");

    Ok(())
}

/// Initialize example env file
async fn init_env(cli: &Cli) -> Result<()> {
    let path = cli
        .env_file
        .clone()
        .unwrap_or_else(|| PathBuf::from(".env"));

    if path.exists() {
        anyhow::bail!("Env file already exists: {}", path.display());
    }

    tokio::fs::write(&path, config::example_env())
        .await
        .context("Failed to write env file")?;

    info!("Example env file created: {}", path.display());
    info!("");
    info!("Next steps:");
    info!("  1. Edit the env file to match your project");
    info!("  2. Log in with gcloud or set GOOGLE_OAUTH_ACCESS_TOKEN");
    info!("  3. Create the cluster:");
    info!("     gke-provisioner --env-file {} create", path.display());

    Ok(())
}
