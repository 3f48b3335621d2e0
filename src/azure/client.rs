/// Azure Resource Manager REST client
use reqwest::{header, Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::auth::{AksCredential, AzureEndpoints, ServicePrincipalAuth};
use super::error::{AksError, Result};

/// Raw response kept for callers that interpret the status code themselves
#[derive(Debug)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Authenticated ARM client
#[derive(Clone)]
pub struct ArmClient {
    client: Client,
    base_url: Url,
    auth: ServicePrincipalAuth,
}

impl ArmClient {
    /// Create a new ARM client for the given credential and cloud endpoints
    pub fn new(
        credential: AksCredential,
        endpoints: &AzureEndpoints,
        timeout: Duration,
    ) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .user_agent(concat!("aks-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let auth = ServicePrincipalAuth::new(client.clone(), credential, endpoints);

        Ok(Self {
            client,
            base_url: endpoints.resource_manager.clone(),
            auth,
        })
    }

    /// Build a resource URL from path segments, the API version and extra query pairs
    pub(crate) fn url(
        &self,
        segments: &[&str],
        api_version: &str,
        query: &[(&str, &str)],
    ) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AksError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("api-version", api_version);
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }

    /// True if `url` points at the same scheme, host and port as the ARM endpoint
    pub(crate) fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.base_url.origin()
    }

    /// Attach the bearer token and send the request, returning status and body
    async fn send(&self, request: RequestBuilder) -> Result<RawResponse> {
        let token = self.auth.token().await?;
        let response = request.bearer_auth(token).send().await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        Ok(RawResponse { status, body })
    }

    /// Make a request and return the raw response without checking the status
    pub(crate) async fn execute<B: Serialize>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<RawResponse> {
        debug!("{} {}", method, url);

        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }

        self.send(request).await
    }

    /// Make a GET request to the API
    pub(crate) async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self.execute::<()>(Method::GET, url, None).await?;
        Self::handle_response(response)
    }

    /// Make a POST request without a body
    pub(crate) async fn post<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self.execute::<()>(Method::POST, url, None).await?;
        Self::handle_response(response)
    }

    /// Make a DELETE request, returning the status code on success
    pub(crate) async fn delete(&self, url: Url) -> Result<u16> {
        let response = self.execute::<()>(Method::DELETE, url, None).await?;

        match response.status {
            200 | 202 | 204 => Ok(response.status),
            status => Err(AksError::from_status(status, &response.body)),
        }
    }

    /// Decode a successful response, translating failures into errors
    fn handle_response<T: DeserializeOwned>(response: RawResponse) -> Result<T> {
        if response.is_success() {
            Ok(serde_json::from_slice(&response.body)?)
        } else {
            Err(AksError::from_status(response.status, &response.body))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ArmClient {
        let endpoints = AzureEndpoints::new(
            "https://management.azure.com/",
            "https://login.microsoftonline.com/",
        )
        .unwrap();
        ArmClient::new(
            AksCredential::new("id", "secret", "sub", "tenant"),
            &endpoints,
            Duration::from_secs(30),
        )
        .unwrap()
    }

    #[test]
    fn test_url_building() {
        let url = client()
            .url(
                &["subscriptions", "sub", "resourceGroups", "my group"],
                "2017-09-30",
                &[("resource-type", "managedClusters")],
            )
            .unwrap();

        assert_eq!(
            url.as_str(),
            "https://management.azure.com/subscriptions/sub/resourceGroups/my%20group?api-version=2017-09-30&resource-type=managedClusters"
        );
    }

    #[test]
    fn test_same_origin() {
        let client = client();
        let own = Url::parse("https://management.azure.com/subscriptions/sub?$skiptoken=x").unwrap();
        let foreign = Url::parse("https://evil.example.com/subscriptions/sub").unwrap();
        let plain = Url::parse("http://management.azure.com/subscriptions/sub").unwrap();

        assert!(client.is_same_origin(&own));
        assert!(!client.is_same_origin(&foreign));
        assert!(!client.is_same_origin(&plain));
    }

    #[test]
    fn test_handle_response() {
        let ok = RawResponse {
            status: 200,
            body: br#"{"value": []}"#.to_vec(),
        };
        let value: serde_json::Value = ArmClient::handle_response(ok).unwrap();
        assert!(value["value"].as_array().unwrap().is_empty());

        let failed = RawResponse {
            status: 403,
            body: br#"{"error":{"code":"AuthorizationFailed","message":"denied"}}"#.to_vec(),
        };
        let err = ArmClient::handle_response::<serde_json::Value>(failed).unwrap_err();
        assert_eq!(err.status_code(), Some(403));
    }
}
