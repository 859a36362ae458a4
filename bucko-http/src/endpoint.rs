//! Endpoint descriptors
//!
//! An [`Endpoint`] describes one API call: where it goes, which method it
//! uses, and what parameters and headers it carries. Applications usually
//! implement the trait on an enum of their routes; [`Route`] covers the
//! one-off case.
//!
//! Nothing here validates or touches the network. A malformed URL or header
//! only surfaces when the endpoint is sent.

use crate::errors::HttpError;
use crate::types::{HttpMethod, ParameterEncoding};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Request parameters, keyed by name. Values may be nested.
pub type Parameters = serde_json::Map<String, JsonValue>;

/// Request headers, keyed by name. Names are matched case-insensitively
/// once applied to a request.
pub type Headers = BTreeMap<String, String>;

/// Description of a single HTTP call.
///
/// ```
/// use bucko_http::{Endpoint, HttpMethod, Parameters};
/// use serde_json::json;
///
/// enum Api {
///     GetUser { id: u64 },
///     CreateUser { name: String },
/// }
///
/// impl Endpoint for Api {
///     fn base_url(&self) -> String {
///         "https://api.example.com".to_string()
///     }
///
///     fn path(&self) -> String {
///         match self {
///             Api::GetUser { id } => format!("/users/{}", id),
///             Api::CreateUser { .. } => "/users".to_string(),
///         }
///     }
///
///     fn method(&self) -> HttpMethod {
///         match self {
///             Api::GetUser { .. } => HttpMethod::Get,
///             Api::CreateUser { .. } => HttpMethod::Post,
///         }
///     }
///
///     fn parameters(&self) -> Option<Parameters> {
///         match self {
///             Api::CreateUser { name } => json!({ "name": name }).as_object().cloned(),
///             _ => None,
///         }
///     }
/// }
///
/// assert_eq!(Api::GetUser { id: 1 }.full_url(), "https://api.example.com/users/1");
/// ```
pub trait Endpoint {
    /// Base URL, e.g. `https://api.example.com`
    fn base_url(&self) -> String;

    /// Path appended to the base URL, e.g. `/users/1`
    fn path(&self) -> String;

    fn method(&self) -> HttpMethod;

    fn parameters(&self) -> Option<Parameters> {
        None
    }

    fn headers(&self) -> Headers {
        Headers::new()
    }

    fn encoding(&self) -> ParameterEncoding {
        ParameterEncoding::for_method(self.method())
    }

    /// `base_url` followed by `path`, joined as-is
    fn full_url(&self) -> String {
        format!("{}{}", self.base_url(), self.path())
    }
}

impl<E: Endpoint + ?Sized> Endpoint for &E {
    fn base_url(&self) -> String {
        (**self).base_url()
    }

    fn path(&self) -> String {
        (**self).path()
    }

    fn method(&self) -> HttpMethod {
        (**self).method()
    }

    fn parameters(&self) -> Option<Parameters> {
        (**self).parameters()
    }

    fn headers(&self) -> Headers {
        (**self).headers()
    }

    fn encoding(&self) -> ParameterEncoding {
        (**self).encoding()
    }

    fn full_url(&self) -> String {
        (**self).full_url()
    }
}

/// A ready-made endpoint value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub base_url: String,
    pub path: String,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Parameters>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: Headers,
    /// Falls back to the method's default encoding when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<ParameterEncoding>,
}

impl Route {
    pub fn new(method: HttpMethod, base_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            path: path.into(),
            method,
            parameters: None,
            headers: Headers::new(),
            encoding: None,
        }
    }

    pub fn get(base_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, base_url, path)
    }

    pub fn post(base_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, base_url, path)
    }

    pub fn put(base_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, base_url, path)
    }

    pub fn patch(base_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, base_url, path)
    }

    pub fn delete(base_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, base_url, path)
    }

    /// Replace the parameter set
    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Add one parameter
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.parameters
            .get_or_insert_with(Parameters::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_encoding(mut self, encoding: ParameterEncoding) -> Self {
        self.encoding = Some(encoding);
        self
    }
}

impl Endpoint for Route {
    fn base_url(&self) -> String {
        self.base_url.clone()
    }

    fn path(&self) -> String {
        self.path.clone()
    }

    fn method(&self) -> HttpMethod {
        self.method
    }

    fn parameters(&self) -> Option<Parameters> {
        self.parameters.clone()
    }

    fn headers(&self) -> Headers {
        self.headers.clone()
    }

    fn encoding(&self) -> ParameterEncoding {
        self.encoding
            .unwrap_or_else(|| ParameterEncoding::for_method(self.method))
    }
}

/// Flatten parameters into form/query pairs.
///
/// Top-level keys are sorted. Nested objects become `key[sub]`, arrays
/// become repeated `key[]`, booleans are written as `1`/`0` and `null` as an
/// empty value. Percent-encoding is left to the transport.
pub fn query_components(parameters: &Parameters) -> Vec<(String, String)> {
    let mut entries: Vec<(&String, &JsonValue)> = parameters.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    let mut components = Vec::new();
    for (key, value) in entries {
        append_components(&mut components, key.clone(), value);
    }
    components
}

fn append_components(components: &mut Vec<(String, String)>, key: String, value: &JsonValue) {
    match value {
        JsonValue::Object(map) => {
            for (nested_key, nested) in map {
                append_components(components, format!("{}[{}]", key, nested_key), nested);
            }
        }
        JsonValue::Array(items) => {
            let array_key = format!("{}[]", key);
            for item in items {
                append_components(components, array_key.clone(), item);
            }
        }
        JsonValue::Bool(flag) => components.push((key, if *flag { "1" } else { "0" }.to_string())),
        JsonValue::Null => components.push((key, String::new())),
        JsonValue::String(text) => components.push((key, text.clone())),
        JsonValue::Number(number) => components.push((key, number.to_string())),
    }
}

/// Convert string headers into a `HeaderMap`, rejecting invalid names or values
pub(crate) fn header_map(headers: &Headers) -> Result<HeaderMap, HttpError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| HttpError::InvalidHeaderName(name.clone()))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|_| HttpError::InvalidHeaderValue(name.clone()))?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UrlDestination;
    use serde_json::json;

    fn params(value: JsonValue) -> Parameters {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_full_url_is_plain_concatenation() {
        let route = Route::get("https://api.example.com", "/users/1");
        assert_eq!(route.full_url(), "https://api.example.com/users/1");

        let doubled = Route::get("https://api.example.com/", "/users");
        assert_eq!(doubled.full_url(), "https://api.example.com//users");

        let missing = Route::get("https://api.example.com", "users");
        assert_eq!(missing.full_url(), "https://api.example.comusers");
    }

    #[test]
    fn test_route_default_encoding() {
        assert_eq!(
            Route::get("http://h", "/").encoding(),
            ParameterEncoding::Url(UrlDestination::MethodDependent)
        );
        assert_eq!(Route::post("http://h", "/").encoding(), ParameterEncoding::Json);

        let forced = Route::post("http://h", "/")
            .with_encoding(ParameterEncoding::Url(UrlDestination::HttpBody));
        assert_eq!(
            forced.encoding(),
            ParameterEncoding::Url(UrlDestination::HttpBody)
        );
    }

    #[test]
    fn test_route_builders() {
        let route = Route::put("http://h", "/items/9")
            .with_parameter("name", "widget")
            .with_parameter("count", 3)
            .with_header("Authorization", "Bearer abc");

        assert_eq!(route.method(), HttpMethod::Put);
        assert_eq!(
            route.parameters(),
            Some(params(json!({"name": "widget", "count": 3})))
        );
        assert_eq!(
            route.headers().get("Authorization").map(String::as_str),
            Some("Bearer abc")
        );
        assert_eq!(Route::get("http://h", "/").parameters(), None);
    }

    #[test]
    fn test_query_components_flattening() {
        let components = query_components(&params(json!({
            "q": "rust lang",
            "page": 2,
            "active": true,
            "archived": false,
            "tags": ["a", "b"],
            "filter": {"owner": "me", "size": {"min": 1}},
            "cursor": null,
        })));

        let expected: Vec<(String, String)> = [
            ("active", "1"),
            ("archived", "0"),
            ("cursor", ""),
            ("filter[owner]", "me"),
            ("filter[size][min]", "1"),
            ("page", "2"),
            ("q", "rust lang"),
            ("tags[]", "a"),
            ("tags[]", "b"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        assert_eq!(components, expected);
    }

    #[test]
    fn test_query_components_empty() {
        assert!(query_components(&Parameters::new()).is_empty());
    }

    #[test]
    fn test_header_map_is_case_insensitive() {
        let mut headers = Headers::new();
        headers.insert("X-Trace".to_string(), "1".to_string());
        let map = header_map(&headers).unwrap();
        assert_eq!(map.get("x-trace").unwrap(), "1");
    }

    #[test]
    fn test_header_map_rejects_invalid() {
        let mut headers = Headers::new();
        headers.insert("bad header".to_string(), "1".to_string());
        assert!(matches!(
            header_map(&headers),
            Err(HttpError::InvalidHeaderName(name)) if name == "bad header"
        ));

        let mut headers = Headers::new();
        headers.insert("X-Ok".to_string(), "line\nbreak".to_string());
        assert!(matches!(
            header_map(&headers),
            Err(HttpError::InvalidHeaderValue(name)) if name == "X-Ok"
        ));
    }
}
