//! HTTP methods and parameter encodings

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// HTTP methods an endpoint can use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl HttpMethod {
    /// Get the string representation of the HTTP method
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// Methods whose parameters go in the query string rather than the body
    /// when the encoding is method dependent
    pub fn encodes_in_url(&self) -> bool {
        matches!(
            self,
            HttpMethod::Get | HttpMethod::Head | HttpMethod::Delete | HttpMethod::Options
        )
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = HttpMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "PATCH" => Ok(HttpMethod::Patch),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            _ => Err(HttpMethodError::InvalidMethod(s.to_string())),
        }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Options => reqwest::Method::OPTIONS,
        }
    }
}

/// Errors that can occur when parsing HTTP methods
#[derive(Error, Debug, Clone)]
pub enum HttpMethodError {
    #[error("Invalid HTTP method: '{0}'. Supported methods are: GET, POST, PUT, DELETE, PATCH, HEAD, OPTIONS")]
    InvalidMethod(String),
}

/// Where URL-encoded parameters are placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlDestination {
    /// Query string for GET, HEAD, DELETE and OPTIONS, form body otherwise
    #[default]
    MethodDependent,
    QueryString,
    HttpBody,
}

/// How an endpoint's parameters are written into the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterEncoding {
    /// `application/x-www-form-urlencoded`, in the query or the body
    Url(UrlDestination),
    /// `application/json` body
    Json,
}

impl Default for ParameterEncoding {
    fn default() -> Self {
        ParameterEncoding::Url(UrlDestination::MethodDependent)
    }
}

impl ParameterEncoding {
    /// Default encoding for a method: URL encoding for methods without a
    /// body, JSON for the rest.
    pub fn for_method(method: HttpMethod) -> Self {
        if method.encodes_in_url() {
            ParameterEncoding::default()
        } else {
            ParameterEncoding::Json
        }
    }

    /// Whether URL-encoded parameters for `method` belong in the query string
    pub(crate) fn uses_query(&self, method: HttpMethod) -> bool {
        match self {
            ParameterEncoding::Url(UrlDestination::QueryString) => true,
            ParameterEncoding::Url(UrlDestination::HttpBody) => false,
            ParameterEncoding::Url(UrlDestination::MethodDependent) => method.encodes_in_url(),
            ParameterEncoding::Json => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_method_from_str() {
        assert_eq!("GET".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert_eq!("post".parse::<HttpMethod>().unwrap(), HttpMethod::Post);
        assert_eq!("Patch".parse::<HttpMethod>().unwrap(), HttpMethod::Patch);
        assert_eq!("options".parse::<HttpMethod>().unwrap(), HttpMethod::Options);

        let err = "FETCH".parse::<HttpMethod>().unwrap_err();
        assert!(err.to_string().contains("'FETCH'"));
    }

    #[test]
    fn test_http_method_to_reqwest() {
        for method in [
            HttpMethod::Get,
            HttpMethod::Post,
            HttpMethod::Put,
            HttpMethod::Delete,
            HttpMethod::Patch,
            HttpMethod::Head,
            HttpMethod::Options,
        ] {
            assert_eq!(reqwest::Method::from(method).as_str(), method.as_str());
            assert_eq!(format!("{}", method), method.as_str());
        }
    }

    #[test]
    fn test_default_encoding_follows_method() {
        assert_eq!(
            ParameterEncoding::for_method(HttpMethod::Get),
            ParameterEncoding::Url(UrlDestination::MethodDependent)
        );
        assert_eq!(
            ParameterEncoding::for_method(HttpMethod::Delete),
            ParameterEncoding::Url(UrlDestination::MethodDependent)
        );
        assert_eq!(
            ParameterEncoding::for_method(HttpMethod::Post),
            ParameterEncoding::Json
        );
        assert_eq!(
            ParameterEncoding::for_method(HttpMethod::Patch),
            ParameterEncoding::Json
        );
    }

    #[test]
    fn test_url_destination_placement() {
        let dependent = ParameterEncoding::Url(UrlDestination::MethodDependent);
        assert!(dependent.uses_query(HttpMethod::Get));
        assert!(!dependent.uses_query(HttpMethod::Post));

        let query = ParameterEncoding::Url(UrlDestination::QueryString);
        assert!(query.uses_query(HttpMethod::Post));

        let body = ParameterEncoding::Url(UrlDestination::HttpBody);
        assert!(!body.uses_query(HttpMethod::Get));
    }
}
