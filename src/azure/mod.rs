/// Azure Kubernetes Service API client implementation
pub mod aks;
pub mod auth;
pub mod client;
pub mod cluster;
pub mod error;
pub mod models;

pub use aks::AksClient;
pub use auth::{AksCredential, AzureCloud, AzureEndpoints};
pub use cluster::CreateClusterRequest;
pub use error::{AksError, Result};
