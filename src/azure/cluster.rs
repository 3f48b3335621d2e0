/// Cluster creation request and its translation into an ARM resource body
use serde::{Deserialize, Serialize};

use super::auth::AksCredential;
use super::error::{AksError, Result};
use super::models::{
    AgentPoolProfile, LinuxProfile, ManagedCluster, ManagedClusterProperties,
    ServicePrincipalProfile, SshConfiguration, SshPublicKey,
};

/// Parameters for creating or updating a managed cluster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateClusterRequest {
    /// Cluster name
    pub name: String,

    /// Azure region (e.g., "eastus")
    pub location: String,

    /// Resource group the cluster lives in
    pub resource_group: String,

    /// Node VM size (e.g., "Standard_D2_v2")
    pub vm_size: String,

    /// Number of nodes in the agent pool
    #[serde(default = "default_agent_count")]
    pub agent_count: u32,

    /// Agent pool name
    #[serde(default = "default_agent_name")]
    pub agent_name: String,

    /// Kubernetes version (e.g., "1.9.6")
    pub kubernetes_version: String,

    /// OpenSSH public key installed on the nodes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_public_key: Option<String>,

    /// Admin user on the nodes
    #[serde(default = "default_admin_username")]
    pub admin_username: String,

    /// DNS prefix, defaults to the cluster name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_prefix: Option<String>,
}

fn default_agent_count() -> u32 {
    1
}

fn default_agent_name() -> String {
    "agentpool1".to_string()
}

fn default_admin_username() -> String {
    "azureuser".to_string()
}

impl CreateClusterRequest {
    /// Validate the request
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(AksError::InvalidRequest("name cannot be empty".to_string()));
        }
        if self.location.is_empty() {
            return Err(AksError::InvalidRequest(
                "location cannot be empty".to_string(),
            ));
        }
        if self.resource_group.is_empty() {
            return Err(AksError::InvalidRequest(
                "resource_group cannot be empty".to_string(),
            ));
        }
        if self.vm_size.is_empty() {
            return Err(AksError::InvalidRequest(
                "vm_size cannot be empty".to_string(),
            ));
        }
        if self.agent_count == 0 {
            return Err(AksError::InvalidRequest(
                "agent_count must be at least 1".to_string(),
            ));
        }
        // Agent pool names are lowercase alphanumeric, at most 12 characters
        if self.agent_name.is_empty()
            || self.agent_name.len() > 12
            || !self
                .agent_name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        {
            return Err(AksError::InvalidRequest(format!(
                "invalid agent pool name: {}",
                self.agent_name
            )));
        }
        Ok(())
    }

    /// Build the managed cluster body, using the credential as the cluster's service principal
    pub fn to_managed_cluster(&self, credential: &AksCredential) -> ManagedCluster {
        let linux_profile = self.ssh_public_key.as_ref().map(|key| LinuxProfile {
            admin_username: self.admin_username.clone(),
            ssh: SshConfiguration {
                public_keys: vec![SshPublicKey {
                    key_data: key.trim().to_string(),
                }],
            },
        });

        ManagedCluster {
            location: self.location.clone(),
            properties: Some(ManagedClusterProperties {
                kubernetes_version: Some(self.kubernetes_version.clone()),
                dns_prefix: Some(
                    self.dns_prefix
                        .clone()
                        .unwrap_or_else(|| self.name.clone()),
                ),
                agent_pool_profiles: vec![AgentPoolProfile {
                    name: self.agent_name.clone(),
                    count: Some(self.agent_count),
                    vm_size: Some(self.vm_size.clone()),
                    ..Default::default()
                }],
                linux_profile,
                service_principal_profile: Some(ServicePrincipalProfile {
                    client_id: credential.client_id.clone(),
                    secret: Some(credential.client_secret.clone()),
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Example request used by `aks init`
    pub fn example() -> Self {
        Self {
            name: "aks-cluster".to_string(),
            location: "eastus".to_string(),
            resource_group: "aks-rg".to_string(),
            vm_size: "Standard_D2_v2".to_string(),
            agent_count: 3,
            agent_name: default_agent_name(),
            kubernetes_version: "1.9.6".to_string(),
            ssh_public_key: None,
            admin_username: default_admin_username(),
            dns_prefix: None,
        }
    }
}
