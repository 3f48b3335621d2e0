/// Configuration management for aks-client
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::azure::{AksClient, AksCredential, AzureCloud, AzureEndpoints, CreateClusterRequest};

pub const ENV_CLIENT_ID: &str = "AZURE_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "AZURE_CLIENT_SECRET";
pub const ENV_SUBSCRIPTION_ID: &str = "AZURE_SUBSCRIPTION_ID";
pub const ENV_TENANT_ID: &str = "AZURE_TENANT_ID";

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AksConfig {
    /// Azure cloud environment (public, china, us_government)
    #[serde(default)]
    pub cloud: AzureCloud,

    /// Custom endpoints, overriding the ones of `cloud`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoints: Option<EndpointOverrides>,

    /// Service principal (missing fields are read from AZURE_* env vars)
    #[serde(default)]
    pub credentials: AksCredential,

    /// Cluster used by `create`, `get`, `delete` and friends
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<CreateClusterRequest>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Explicit ARM and Active Directory endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointOverrides {
    pub resource_manager: String,
    pub active_directory: String,
}

fn default_timeout_secs() -> u64 {
    30
}

impl AksConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AksConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than zero");
        }

        if let Some(cluster) = &self.cluster {
            cluster.validate()?;
        }

        self.endpoints()?;

        Ok(())
    }

    /// Resolve the endpoints to talk to
    pub fn endpoints(&self) -> anyhow::Result<AzureEndpoints> {
        let endpoints = match &self.endpoints {
            Some(overrides) => {
                AzureEndpoints::new(&overrides.resource_manager, &overrides.active_directory)?
            }
            None => self.cloud.endpoints()?,
        };
        Ok(endpoints)
    }

    /// Get the credential from config, filling empty fields from the environment
    pub fn credential(&self) -> AksCredential {
        self.credential_with(|key| std::env::var(key).ok())
    }

    fn credential_with<F>(&self, lookup: F) -> AksCredential
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |value: &str, key: &str| {
            if value.is_empty() {
                lookup(key).unwrap_or_default()
            } else {
                value.to_string()
            }
        };

        AksCredential {
            client_id: pick(&self.credentials.client_id, ENV_CLIENT_ID),
            client_secret: pick(&self.credentials.client_secret, ENV_CLIENT_SECRET),
            subscription_id: pick(&self.credentials.subscription_id, ENV_SUBSCRIPTION_ID),
            tenant_id: pick(&self.credentials.tenant_id, ENV_TENANT_ID),
        }
    }

    /// Get the configured cluster
    pub fn cluster(&self) -> anyhow::Result<&CreateClusterRequest> {
        self.cluster
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("No cluster section in configuration"))
    }

    /// Build an authenticated client from this configuration
    pub fn client(&self) -> anyhow::Result<AksClient> {
        let client = AksClient::with_options(
            self.credential(),
            &self.endpoints()?,
            Duration::from_secs(self.request_timeout_secs),
        )?;
        Ok(client)
    }

    /// Generate an example configuration file
    pub fn example() -> Self {
        Self {
            cloud: AzureCloud::Public,
            endpoints: None,
            credentials: AksCredential::default(),
            cluster: Some(CreateClusterRequest::example()),
            request_timeout_secs: default_timeout_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_validation() {
        let mut config = AksConfig::example();
        assert!(config.validate().is_ok());

        config.request_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = AksConfig::example();
        config.endpoints = Some(EndpointOverrides {
            resource_manager: "not a url".to_string(),
            active_directory: "https://login.microsoftonline.com/".to_string(),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_credential_env_fallback() {
        let mut config = AksConfig::example();
        config.credentials.client_id = "from-file".to_string();

        let credential = config.credential_with(|key| match key {
            ENV_CLIENT_ID => Some("from-env".to_string()),
            ENV_CLIENT_SECRET => Some("env-secret".to_string()),
            ENV_SUBSCRIPTION_ID => Some("env-sub".to_string()),
            _ => None,
        });

        assert_eq!(credential.client_id, "from-file");
        assert_eq!(credential.client_secret, "env-secret");
        assert_eq!(credential.subscription_id, "env-sub");
        assert!(credential.tenant_id.is_empty());
        assert!(credential.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
cloud: china
credentials:
  client_id: id
  client_secret: secret
  subscription_id: sub
  tenant_id: tenant
cluster:
  name: demo
  location: chinaeast2
  resource_group: demo-rg
  vm_size: Standard_D2_v2
  kubernetes_version: 1.9.6
"#
        )
        .unwrap();

        let config = AksConfig::from_file(file.path()).unwrap();
        assert_eq!(config.cloud, AzureCloud::China);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.cluster().unwrap().name, "demo");
        assert_eq!(
            config.endpoints().unwrap().resource_manager.as_str(),
            "https://management.chinacloudapi.cn/"
        );
        assert!(config.client().is_ok());
    }

    #[test]
    fn test_example_round_trips_through_yaml() {
        let yaml = serde_yaml::to_string(&AksConfig::example()).unwrap();
        let config: AksConfig = serde_yaml::from_str(&yaml).unwrap();
        assert!(config.validate().is_ok());
        assert!(config.credentials.client_id.is_empty());
    }
}
