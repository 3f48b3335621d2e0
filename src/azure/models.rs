/// Azure Resource Manager data models for AKS, Compute and Subscriptions
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Managed Kubernetes cluster resource
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedCluster {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    pub location: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<ManagedClusterProperties>,
}

impl ManagedCluster {
    /// Provisioning state reported by ARM, if any
    pub fn provisioning_state(&self) -> Option<&str> {
        self.properties
            .as_ref()
            .and_then(|p| p.provisioning_state.as_deref())
    }
}

/// Properties of a managed cluster
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedClusterProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubernetes_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub agent_pool_profiles: Vec<AgentPoolProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linux_profile: Option<LinuxProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_principal_profile: Option<ServicePrincipalProfile>,
}

/// Agent pool (node pool) definition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPoolProfile {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vm_size: Option<String>,
    #[serde(rename = "osDiskSizeGB", skip_serializing_if = "Option::is_none")]
    pub os_disk_size_gb: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_profile: Option<String>,
    #[serde(rename = "vnetSubnetID", skip_serializing_if = "Option::is_none")]
    pub vnet_subnet_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_pods: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_type: Option<String>,
}

/// Linux VM profile for cluster nodes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinuxProfile {
    pub admin_username: String,
    pub ssh: SshConfiguration,
}

/// SSH configuration for Linux nodes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SshConfiguration {
    pub public_keys: Vec<SshPublicKey>,
}

/// SSH public key data
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SshPublicKey {
    pub key_data: String,
}

/// Service principal the cluster uses to manage Azure resources
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePrincipalProfile {
    pub client_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

/// Managed cluster list response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedClusterListResult {
    #[serde(default)]
    pub value: Vec<ManagedCluster>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_link: Option<String>,
}

/// Access profile carrying a kubeconfig for a cluster role
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedClusterAccessProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<AccessProfile>,
}

/// Base64 encoded kubeconfig
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kube_config: Option<String>,
}

/// Virtual machine size available in a location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineSize {
    pub name: String,
    #[serde(default)]
    pub number_of_cores: u32,
    #[serde(rename = "osDiskSizeInMB", default)]
    pub os_disk_size_in_mb: u64,
    #[serde(rename = "resourceDiskSizeInMB", default)]
    pub resource_disk_size_in_mb: u64,
    #[serde(rename = "memoryInMB", default)]
    pub memory_in_mb: u64,
    #[serde(default)]
    pub max_data_disk_count: u32,
}

/// VM size list response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualMachineSizeListResult {
    #[serde(default)]
    pub value: Vec<VirtualMachineSize>,
}

/// Azure location (region)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<String>,
}

/// Location list response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationListResult {
    #[serde(default)]
    pub value: Vec<Location>,
}

/// Orchestrator version list response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorVersionProfileListResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    pub properties: OrchestratorVersionProfileProperties,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorVersionProfileProperties {
    #[serde(default)]
    pub orchestrators: Vec<OrchestratorVersionProfile>,
}

/// A supported orchestrator version and its upgrade targets
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorVersionProfile {
    pub orchestrator_type: String,
    pub orchestrator_version: String,
    #[serde(rename = "default", default)]
    pub is_default: bool,
    #[serde(default)]
    pub upgrades: Vec<OrchestratorProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorProfile {
    pub orchestrator_type: String,
    pub orchestrator_version: String,
}

/// Successful create/update result with the status code ARM returned
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseWithValue {
    pub status_code: u16,
    pub value: ManagedCluster,
}

/// Error response from ARM
#[derive(Debug, Serialize, Deserialize)]
pub struct CloudErrorResponse {
    pub error: CloudErrorBody,
}

/// ARM error details
#[derive(Debug, Serialize, Deserialize)]
pub struct CloudErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_managed_cluster_deserialize() {
        let json = r#"{
            "id": "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.ContainerService/managedClusters/demo",
            "name": "demo",
            "type": "Microsoft.ContainerService/ManagedClusters",
            "location": "eastus",
            "properties": {
                "provisioningState": "Succeeded",
                "kubernetesVersion": "1.9.6",
                "dnsPrefix": "demo-dns",
                "fqdn": "demo-dns-1234.hcp.eastus.azmk8s.io",
                "agentPoolProfiles": [
                    {"name": "agentpool1", "count": 3, "vmSize": "Standard_D2_v2", "osDiskSizeGB": 30, "osType": "Linux"}
                ],
                "servicePrincipalProfile": {"clientId": "abc"}
            }
        }"#;

        let cluster: ManagedCluster = serde_json::from_str(json).unwrap();
        assert_eq!(cluster.name.as_deref(), Some("demo"));
        assert_eq!(cluster.provisioning_state(), Some("Succeeded"));

        let props = cluster.properties.unwrap();
        assert_eq!(props.agent_pool_profiles[0].count, Some(3));
        assert_eq!(props.agent_pool_profiles[0].os_disk_size_gb, Some(30));
        assert!(props.service_principal_profile.unwrap().secret.is_none());
    }

    #[test]
    fn test_put_body_omits_read_only_fields() {
        let cluster = ManagedCluster {
            location: "westeurope".to_string(),
            properties: Some(ManagedClusterProperties {
                dns_prefix: Some("demo".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let value = serde_json::to_value(&cluster).unwrap();
        assert!(value.get("id").is_none());
        assert!(value.get("tags").is_none());
        assert_eq!(value["properties"]["dnsPrefix"], "demo");
        assert!(value["properties"].get("provisioningState").is_none());
    }

    #[test]
    fn test_orchestrator_versions_deserialize() {
        let json = r#"{
            "id": "/subscriptions/sub/providers/Microsoft.ContainerService/locations/eastus/orchestrators",
            "name": "default",
            "type": "Microsoft.ContainerService/locations/orchestrators",
            "properties": {
                "orchestrators": [
                    {"orchestratorType": "Kubernetes", "orchestratorVersion": "1.8.11", "upgrades": [
                        {"orchestratorType": "Kubernetes", "orchestratorVersion": "1.9.6"}
                    ]},
                    {"orchestratorType": "Kubernetes", "orchestratorVersion": "1.9.6", "default": true}
                ]
            }
        }"#;

        let result: OrchestratorVersionProfileListResult = serde_json::from_str(json).unwrap();
        let orchestrators = &result.properties.orchestrators;
        assert_eq!(orchestrators.len(), 2);
        assert!(!orchestrators[0].is_default);
        assert_eq!(orchestrators[0].upgrades[0].orchestrator_version, "1.9.6");
        assert!(orchestrators[1].is_default);
        assert!(orchestrators[1].upgrades.is_empty());
    }
}
