/// Service principal authentication against Azure Active Directory
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use url::Url;

use super::error::{AksError, Result};

/// Tokens are refreshed this long before they expire
const TOKEN_REFRESH_MARGIN_SECS: i64 = 300;

/// Service principal credential used to authenticate API calls
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AksCredential {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub subscription_id: String,
    #[serde(default)]
    pub tenant_id: String,
}

impl AksCredential {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        subscription_id: impl Into<String>,
        tenant_id: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            subscription_id: subscription_id.into(),
            tenant_id: tenant_id.into(),
        }
    }

    /// Check that every field is present
    pub fn validate(&self) -> Result<()> {
        if self.client_id.is_empty() {
            return Err(AksError::MissingClientId);
        }
        if self.client_secret.is_empty() {
            return Err(AksError::MissingSecret);
        }
        if self.subscription_id.is_empty() {
            return Err(AksError::MissingSubscriptionId);
        }
        if self.tenant_id.is_empty() {
            return Err(AksError::MissingTenantId);
        }
        Ok(())
    }
}

impl std::fmt::Debug for AksCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AksCredential")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("subscription_id", &self.subscription_id)
            .field("tenant_id", &self.tenant_id)
            .finish()
    }
}

/// Azure cloud environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AzureCloud {
    #[default]
    Public,
    China,
    UsGovernment,
}

/// Endpoints of an Azure cloud environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureEndpoints {
    /// Azure Resource Manager base URL, also the token audience
    pub resource_manager: Url,
    /// Azure Active Directory authority host
    pub active_directory: Url,
}

impl AzureEndpoints {
    pub fn new(resource_manager: &str, active_directory: &str) -> Result<Self> {
        Ok(Self {
            resource_manager: Url::parse(resource_manager)?,
            active_directory: Url::parse(active_directory)?,
        })
    }
}

impl AzureCloud {
    pub fn endpoints(self) -> Result<AzureEndpoints> {
        let (resource_manager, active_directory) = match self {
            AzureCloud::Public => (
                "https://management.azure.com/",
                "https://login.microsoftonline.com/",
            ),
            AzureCloud::China => (
                "https://management.chinacloudapi.cn/",
                "https://login.chinacloudapi.cn/",
            ),
            AzureCloud::UsGovernment => (
                "https://management.usgovcloudapi.net/",
                "https://login.microsoftonline.us/",
            ),
        };

        AzureEndpoints::new(resource_manager, active_directory)
    }
}

/// Bearer token with its expiry time
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) < self.expires_at
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(deserialize_with = "seconds_from_string_or_number")]
    expires_in: i64,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

/// The v1 token endpoint reports `expires_in` as a string
fn seconds_from_string_or_number<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Seconds {
        Number(i64),
        Text(String),
    }

    match Seconds::deserialize(deserializer)? {
        Seconds::Number(n) => Ok(n),
        Seconds::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Acquires and caches ARM bearer tokens using the client credentials grant
#[derive(Clone)]
pub struct ServicePrincipalAuth {
    client: Client,
    credential: AksCredential,
    authority_host: Url,
    resource: String,
    cache: Arc<RwLock<Option<AccessToken>>>,
}

impl ServicePrincipalAuth {
    pub fn new(client: Client, credential: AksCredential, endpoints: &AzureEndpoints) -> Self {
        Self {
            client,
            credential,
            authority_host: endpoints.active_directory.clone(),
            resource: endpoints.resource_manager.to_string(),
            cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Return a valid bearer token, requesting a new one if the cached token is stale
    pub async fn token(&self) -> Result<String> {
        {
            let cache = self.cache.read().await;
            if let Some(token) = cache.as_ref().filter(|t| t.is_fresh(Utc::now())) {
                return Ok(token.token.clone());
            }
        }

        let mut cache = self.cache.write().await;
        // Another caller may have refreshed while we waited for the lock
        if let Some(token) = cache.as_ref().filter(|t| t.is_fresh(Utc::now())) {
            return Ok(token.token.clone());
        }

        let token = self.request_token().await?;
        let value = token.token.clone();
        *cache = Some(token);
        Ok(value)
    }

    async fn request_token(&self) -> Result<AccessToken> {
        let url = self.token_url()?;
        debug!("POST {}", url);

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.credential.client_id.as_str()),
            ("client_secret", self.credential.client_secret.as_str()),
            ("resource", self.resource.as_str()),
        ];

        let response = self.client.post(url).form(&params).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let message = match serde_json::from_slice::<TokenErrorResponse>(&body) {
                Ok(err) => err.error_description.unwrap_or(err.error),
                Err(_) => String::from_utf8_lossy(&body).trim().to_string(),
            };
            return Err(AksError::Auth {
                status: status.as_u16(),
                message,
            });
        }

        let token: TokenResponse = serde_json::from_slice(&body)?;
        debug!("Acquired token valid for {} seconds", token.expires_in);

        let expires_at = Duration::try_seconds(token.expires_in)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or_else(|| AksError::Auth {
                status: status.as_u16(),
                message: format!("token lifetime out of range: {}", token.expires_in),
            })?;

        Ok(AccessToken {
            token: token.access_token,
            expires_at,
        })
    }

    /// `{authority}/{tenant}/oauth2/token`, keeping any path on the authority host
    fn token_url(&self) -> Result<Url> {
        let mut url = self.authority_host.clone();
        url.path_segments_mut()
            .map_err(|_| AksError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend([self.credential.tenant_id.as_str(), "oauth2", "token"]);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credential() -> AksCredential {
        AksCredential::new("client", "secret", "sub", "tenant")
    }

    #[test]
    fn test_credential_validation() {
        assert!(credential().validate().is_ok());

        let mut cred = credential();
        cred.client_id.clear();
        assert!(matches!(cred.validate(), Err(AksError::MissingClientId)));

        let mut cred = credential();
        cred.client_secret.clear();
        assert!(matches!(cred.validate(), Err(AksError::MissingSecret)));

        let mut cred = credential();
        cred.subscription_id.clear();
        assert!(matches!(cred.validate(), Err(AksError::MissingSubscriptionId)));

        let mut cred = credential();
        cred.tenant_id.clear();
        assert!(matches!(cred.validate(), Err(AksError::MissingTenantId)));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let output = format!("{:?}", credential());
        assert!(output.contains("client"));
        assert!(!output.contains("\"secret\""));
        assert!(output.contains("<redacted>"));
    }

    #[test]
    fn test_cloud_endpoints() {
        let public = AzureCloud::Public.endpoints().unwrap();
        assert_eq!(
            public.resource_manager.as_str(),
            "https://management.azure.com/"
        );
        let china = AzureCloud::China.endpoints().unwrap();
        assert_eq!(
            china.active_directory.as_str(),
            "https://login.chinacloudapi.cn/"
        );
    }

    #[test]
    fn test_token_freshness() {
        let now = Utc::now();
        let fresh = AccessToken {
            token: "t".to_string(),
            expires_at: now + Duration::seconds(3600),
        };
        let stale = AccessToken {
            token: "t".to_string(),
            expires_at: now + Duration::seconds(60),
        };
        assert!(fresh.is_fresh(now));
        assert!(!stale.is_fresh(now));
    }

    #[tokio::test]
    async fn test_token_is_cached() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant/oauth2/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("client_id=client"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token_type": "Bearer",
                "expires_in": "3599",
                "access_token": "token-1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let endpoints = AzureEndpoints::new(&server.uri(), &server.uri()).unwrap();
        let auth = ServicePrincipalAuth::new(Client::new(), credential(), &endpoints);

        assert_eq!(auth.token().await.unwrap(), "token-1");
        assert_eq!(auth.token().await.unwrap(), "token-1");
    }

    #[test]
    fn test_token_url_keeps_authority_path() {
        let endpoints =
            AzureEndpoints::new("https://management.local/", "https://adfs.local/adfs").unwrap();
        let auth = ServicePrincipalAuth::new(Client::new(), credential(), &endpoints);
        assert_eq!(
            auth.token_url().unwrap().as_str(),
            "https://adfs.local/adfs/tenant/oauth2/token"
        );

        let endpoints = AzureCloud::Public.endpoints().unwrap();
        let auth = ServicePrincipalAuth::new(Client::new(), credential(), &endpoints);
        assert_eq!(
            auth.token_url().unwrap().as_str(),
            "https://login.microsoftonline.com/tenant/oauth2/token"
        );
    }

    #[tokio::test]
    async fn test_token_lifetime_out_of_range() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "expires_in": "9223372036854775807",
                "access_token": "t"
            })))
            .mount(&server)
            .await;

        let endpoints = AzureEndpoints::new(&server.uri(), &server.uri()).unwrap();
        let auth = ServicePrincipalAuth::new(Client::new(), credential(), &endpoints);

        match auth.token().await {
            Err(AksError::Auth { message, .. }) => assert!(message.contains("out of range")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_token_error_uses_description() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant/oauth2/token"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": "invalid_client",
                "error_description": "AADSTS7000215: Invalid client secret is provided."
            })))
            .mount(&server)
            .await;

        let endpoints = AzureEndpoints::new(&server.uri(), &server.uri()).unwrap();
        let auth = ServicePrincipalAuth::new(Client::new(), credential(), &endpoints);

        match auth.token().await {
            Err(AksError::Auth { status, message }) => {
                assert_eq!(status, 401);
                assert!(message.contains("Invalid client secret"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
