//! HTTP error types

use crate::types::HttpMethodError;

/// Every way a dispatched request can fail.
///
/// Build, transport, status and decode failures all land here and are
/// delivered through [`DataResponse::result`](crate::DataResponse), never
/// returned synchronously from `send`.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(#[from] HttpMethodError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid header name: {0}")]
    InvalidHeaderName(String),

    #[error("Invalid header value for {0}")]
    InvalidHeaderValue(String),

    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Response body was empty")]
    EmptyResponse,

    #[error("Response status code was unacceptable: {0}")]
    UnacceptableStatusCode(u16),

    #[error("Request was cancelled")]
    Cancelled,

    #[error("No runtime available to run the request: {0}")]
    RuntimeUnavailable(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl HttpError {
    /// Whether the HTTP client itself failed: assembling the request,
    /// connecting, sending, or reading the response body
    pub fn is_transport(&self) -> bool {
        matches!(self, HttpError::NetworkError(_))
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::UnacceptableStatusCode(code) => Some(*code),
            HttpError::NetworkError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<bucko_config::ConfigError> for HttpError {
    fn from(err: bucko_config::ConfigError) -> Self {
        HttpError::ConfigError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        assert!(!HttpError::InvalidUrl("nope".to_string()).is_transport());
        assert!(!HttpError::UnacceptableStatusCode(500).is_transport());
        assert!(!HttpError::RuntimeUnavailable("no threads".to_string()).is_transport());
        assert_eq!(HttpError::UnacceptableStatusCode(503).status(), Some(503));
        assert_eq!(HttpError::Cancelled.status(), None);
    }

    #[tokio::test]
    async fn test_client_errors_are_transport() {
        // An unparsable host fails inside the client before any status exists
        let err = reqwest::Client::new()
            .get("http://[::1")
            .send()
            .await
            .unwrap_err();
        let err = HttpError::from(err);
        assert!(err.is_transport());
        assert_eq!(err.status(), None);
    }
}
