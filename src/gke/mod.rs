/// Google Kubernetes Engine API client and cluster operations
pub mod client;
pub mod cluster;
pub mod models;

pub use client::GkeClient;
pub use cluster::ClusterManager;
