/// Error types for the AKS client
use thiserror::Error;

use super::models::CloudErrorResponse;

#[derive(Error, Debug)]
pub enum AksError {
    #[error("clientID is missing")]
    MissingClientId,

    #[error("secret is missing")]
    MissingSecret,

    #[error("subscriptionID is missing")]
    MissingSubscriptionId,

    #[error("tenantID is missing")]
    MissingTenantId,

    #[error("Invalid cluster request: {0}")]
    InvalidRequest(String),

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Azure API error (status {status}): {code} - {message}")]
    Status {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Authentication failed (status {status}): {message}")]
    Auth { status: u16, message: String },

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Access profile {0} has no kubeconfig")]
    MissingKubeconfig(String),

    #[error("Kubeconfig is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Refusing to follow nextLink {0}")]
    InvalidNextLink(String),

    #[error("Cluster {name} provisioning ended in state {state}")]
    Provisioning { name: String, state: String },

    #[error("Timeout after {secs} seconds: {description}")]
    Timeout { secs: u64, description: String },
}

pub type Result<T> = std::result::Result<T, AksError>;

impl AksError {
    /// Build an error from a non-success status code and the raw response body
    ///
    /// ARM reports failures as `{"error": {"code": ..., "message": ...}}`. When the
    /// body has that shape its code and message are used, otherwise the body text
    /// becomes the message.
    pub fn from_status(status: u16, body: &[u8]) -> Self {
        if let Ok(response) = serde_json::from_slice::<CloudErrorResponse>(body) {
            return AksError::Status {
                status,
                code: response.error.code,
                message: response.error.message,
            };
        }

        AksError::Status {
            status,
            code: "Unknown".to_string(),
            message: String::from_utf8_lossy(body).trim().to_string(),
        }
    }

    /// Status code carried by the error, if it came from an HTTP response
    pub fn status_code(&self) -> Option<u16> {
        match self {
            AksError::Status { status, .. } | AksError::Auth { status, .. } => Some(*status),
            AksError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns true if the resource does not exist
    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_parses_cloud_error() {
        let body = br#"{"error":{"code":"ResourceGroupNotFound","message":"Resource group 'rg' could not be found."}}"#;
        let err = AksError::from_status(404, body);

        match &err {
            AksError::Status {
                status,
                code,
                message,
            } => {
                assert_eq!(*status, 404);
                assert_eq!(code, "ResourceGroupNotFound");
                assert!(message.contains("could not be found"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.is_not_found());
    }

    #[test]
    fn test_from_status_falls_back_to_raw_body() {
        let err = AksError::from_status(502, b"Bad Gateway\n");
        assert_eq!(
            err.to_string(),
            "Azure API error (status 502): Unknown - Bad Gateway"
        );
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_missing_credential_messages() {
        assert_eq!(AksError::MissingClientId.to_string(), "clientID is missing");
        assert_eq!(AksError::MissingSecret.to_string(), "secret is missing");
    }
}
