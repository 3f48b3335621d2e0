/// Credential-bound AKS API façade
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Method;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, info_span, warn, Instrument, Span};
use url::Url;

use super::auth::{AksCredential, AzureCloud, AzureEndpoints};
use super::client::ArmClient;
use super::cluster::CreateClusterRequest;
use super::error::{AksError, Result};
use super::models::*;
use crate::utils::PollingConfig;

const CONTAINER_SERVICE_API_VERSION: &str = "2017-09-30";
const COMPUTE_API_VERSION: &str = "2018-04-01";
const SUBSCRIPTIONS_API_VERSION: &str = "2016-06-01";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Resource type used when listing orchestrator versions for AKS
pub const MANAGED_CLUSTERS_RESOURCE_TYPE: &str = "managedClusters";

/// AKS client bound to a service principal
#[derive(Clone)]
pub struct AksClient {
    arm: ArmClient,
    credential: AksCredential,
    span: Span,
}

impl AksClient {
    /// Create a client for the public Azure cloud
    pub fn new(credential: AksCredential) -> Result<Self> {
        Self::with_options(credential, &AzureCloud::Public.endpoints()?, DEFAULT_TIMEOUT)
    }

    /// Create a client against explicit endpoints with a request timeout
    ///
    /// Fails if any part of the credential is empty.
    pub fn with_options(
        credential: AksCredential,
        endpoints: &AzureEndpoints,
        timeout: Duration,
    ) -> Result<Self> {
        credential.validate()?;

        let span = info_span!("aks", subscription = %credential.subscription_id);
        let arm = ArmClient::new(credential.clone(), endpoints, timeout)?;

        Ok(Self {
            arm,
            credential,
            span,
        })
    }

    /// Replace the span every API call is recorded under
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn client_id(&self) -> &str {
        &self.credential.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.credential.client_secret
    }

    pub fn subscription_id(&self) -> &str {
        &self.credential.subscription_id
    }

    fn cluster_url(&self, resource_group: &str, name: &str, suffix: &[&str]) -> Result<Url> {
        let mut segments = vec![
            "subscriptions",
            self.credential.subscription_id.as_str(),
            "resourceGroups",
            resource_group,
            "providers",
            "Microsoft.ContainerService",
            "managedClusters",
            name,
        ];
        segments.extend_from_slice(suffix);
        self.arm
            .url(&segments, CONTAINER_SERVICE_API_VERSION, &[])
    }

    /// List all managed clusters in the subscription
    pub async fn list(&self) -> Result<Vec<ManagedCluster>> {
        async {
            let mut url = self.arm.url(
                &[
                    "subscriptions",
                    self.credential.subscription_id.as_str(),
                    "providers",
                    "Microsoft.ContainerService",
                    "managedClusters",
                ],
                CONTAINER_SERVICE_API_VERSION,
                &[],
            )?;

            let mut clusters = Vec::new();
            let mut seen = HashSet::new();
            loop {
                let page: ManagedClusterListResult = self.arm.get(url).await?;
                clusters.extend(page.value);

                let Some(link) = page.next_link.filter(|link| !link.is_empty()) else {
                    break;
                };
                let next = Url::parse(&link)?;
                // The bearer token must not leave the ARM endpoint
                if !self.arm.is_same_origin(&next) || !seen.insert(link.clone()) {
                    return Err(AksError::InvalidNextLink(link));
                }
                url = next;
            }

            debug!("Found {} managed clusters", clusters.len());
            Ok::<_, AksError>(clusters)
        }
        .instrument(self.span.clone())
        .await
    }

    /// Create or update a managed cluster
    ///
    /// Only 200 and 201 count as success; any other status is turned into an
    /// error built from the response body.
    pub async fn create_or_update(
        &self,
        request: &CreateClusterRequest,
        cluster: &ManagedCluster,
    ) -> Result<ResponseWithValue> {
        async {
            let url = self.cluster_url(&request.resource_group, &request.name, &[])?;
            let response = self.arm.execute(Method::PUT, url, Some(cluster)).await?;

            info!("Read response body");
            info!("Status code: {}", response.status);
            if response.status != 200 && response.status != 201 {
                return Err(AksError::from_status(response.status, &response.body));
            }

            info!("Create response model");
            let value: ManagedCluster = serde_json::from_slice(&response.body)?;

            Ok(ResponseWithValue {
                status_code: response.status,
                value,
            })
        }
        .instrument(self.span.clone())
        .await
    }

    /// Validate a request, build its resource body and submit it
    pub async fn create_cluster(&self, request: &CreateClusterRequest) -> Result<ResponseWithValue> {
        request.validate()?;
        let cluster = request.to_managed_cluster(&self.credential);
        async {
            info!(
                "Creating cluster {} in {} ({})",
                request.name, request.resource_group, request.location
            );
            self.create_or_update(request, &cluster).await
        }
        .instrument(self.span.clone())
        .await
    }

    /// Delete a managed cluster, returning the status code ARM answered with
    pub async fn delete(&self, resource_group: &str, name: &str) -> Result<u16> {
        async {
            let url = self.cluster_url(resource_group, name, &[])?;
            let status = self.arm.delete(url).await?;
            info!("Delete cluster {} status code: {}", name, status);
            Ok::<_, AksError>(status)
        }
        .instrument(self.span.clone())
        .await
    }

    /// Get a managed cluster
    pub async fn get(&self, resource_group: &str, name: &str) -> Result<ManagedCluster> {
        async {
            let url = self.cluster_url(resource_group, name, &[])?;
            self.arm.get(url).await
        }
        .instrument(self.span.clone())
        .await
    }

    /// Get the access profile (including kubeconfig) for a cluster role
    pub async fn get_access_profiles(
        &self,
        resource_group: &str,
        name: &str,
        role_name: &str,
    ) -> Result<ManagedClusterAccessProfile> {
        async {
            let url = self.cluster_url(
                resource_group,
                name,
                &["accessProfiles", role_name, "listCredential"],
            )?;
            self.arm.post(url).await
        }
        .instrument(self.span.clone())
        .await
    }

    /// Fetch and decode the kubeconfig of a cluster role
    pub async fn kubeconfig(
        &self,
        resource_group: &str,
        name: &str,
        role_name: &str,
    ) -> Result<String> {
        async {
            let profile = self
                .get_access_profiles(resource_group, name, role_name)
                .await?;
            debug!("Decoding kubeconfig for role {}", role_name);
            decode_kubeconfig(&profile, role_name)
        }
        .instrument(self.span.clone())
        .await
    }

    /// List VM sizes available in a location
    pub async fn list_vm_sizes(&self, location: &str) -> Result<VirtualMachineSizeListResult> {
        async {
            let url = self.arm.url(
                &[
                    "subscriptions",
                    self.credential.subscription_id.as_str(),
                    "providers",
                    "Microsoft.Compute",
                    "locations",
                    location,
                    "vmSizes",
                ],
                COMPUTE_API_VERSION,
                &[],
            )?;
            self.arm.get(url).await
        }
        .instrument(self.span.clone())
        .await
    }

    /// List locations available to the subscription
    pub async fn list_locations(&self) -> Result<LocationListResult> {
        async {
            let url = self.arm.url(
                &["subscriptions", self.credential.subscription_id.as_str(), "locations"],
                SUBSCRIPTIONS_API_VERSION,
                &[],
            )?;
            self.arm.get(url).await
        }
        .instrument(self.span.clone())
        .await
    }

    /// List supported Kubernetes versions in a location
    pub async fn list_versions(
        &self,
        location: &str,
        resource_type: &str,
    ) -> Result<OrchestratorVersionProfileListResult> {
        async {
            let mut query = Vec::new();
            if !resource_type.is_empty() {
                query.push(("resource-type", resource_type));
            }
            let url = self.arm.url(
                &[
                    "subscriptions",
                    self.credential.subscription_id.as_str(),
                    "providers",
                    "Microsoft.ContainerService",
                    "locations",
                    location,
                    "orchestrators",
                ],
                CONTAINER_SERVICE_API_VERSION,
                &query,
            )?;
            self.arm.get(url).await
        }
        .instrument(self.span.clone())
        .await
    }

    /// Poll a cluster until its provisioning state settles
    ///
    /// Returns the cluster once it reports `Succeeded`; `Failed` and `Canceled`
    /// end the wait with an error.
    pub async fn wait_for_provisioning(
        &self,
        resource_group: &str,
        name: &str,
        timeout: Duration,
        interval: Duration,
    ) -> Result<ManagedCluster> {
        let polling = PollingConfig::new(
            timeout,
            interval,
            format!("Waiting for cluster {} to be provisioned", name),
        );

        polling
            .poll(move || async move {
                let cluster = self.get(resource_group, name).await?;
                let state = cluster.provisioning_state().unwrap_or_default().to_string();
                debug!("Cluster {} provisioning state: {}", name, state);

                match state.as_str() {
                    "Succeeded" => Ok(Some(cluster)),
                    "Failed" | "Canceled" => Err(AksError::Provisioning {
                        name: name.to_string(),
                        state,
                    }),
                    "Creating" | "Updating" | "Deleting" | "Upgrading" | "Scaling" | "" => Ok(None),
                    other => {
                        warn!("Unknown provisioning state: {}", other);
                        Ok(None)
                    }
                }
            })
            .instrument(self.span.clone())
            .await
    }
}

/// Decode the base64 kubeconfig carried by an access profile
pub fn decode_kubeconfig(profile: &ManagedClusterAccessProfile, role_name: &str) -> Result<String> {
    let encoded = profile
        .properties
        .as_ref()
        .and_then(|p| p.kube_config.as_deref())
        .ok_or_else(|| AksError::MissingKubeconfig(role_name.to_string()))?;

    let bytes = STANDARD.decode(encoded.trim())?;
    Ok(String::from_utf8(bytes)?)
}
