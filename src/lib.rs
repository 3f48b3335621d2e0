//! aks-client - Azure Kubernetes Service API client
//!
//! A thin, credential-bound wrapper around the Azure Resource Manager API for
//! managed Kubernetes clusters, VM sizes, locations and Kubernetes versions.
pub mod azure;
pub mod config;
pub mod utils;

pub use azure::{AksClient, AksCredential, AksError, AzureCloud, CreateClusterRequest};
