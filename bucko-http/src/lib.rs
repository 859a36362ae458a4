//! Endpoint-based HTTP dispatch
//!
//! Describe API calls as [`Endpoint`]s, send them through a [`Bucko`]
//! dispatcher backed by one shared `reqwest::Client`, and receive validated
//! JSON responses through a completion callback or an awaitable
//! [`DataRequest`]. An optional [`ErrorHandler`] delegate observes every
//! failure in one place.

pub mod client;
pub mod config;
pub mod delegate;
pub mod endpoint;
pub mod errors;
pub mod logging;
pub mod request;
pub mod response;
pub mod types;

// Re-export main types for convenience
pub use client::Bucko;
pub use config::{build_client, HttpConfig};
pub use delegate::ErrorHandler;
pub use endpoint::{query_components, Endpoint, Headers, Parameters, Route};
pub use errors::HttpError;
pub use request::DataRequest;
pub use response::{DataResponse, RequestEcho, Timeline};
pub use types::{HttpMethod, HttpMethodError, ParameterEncoding, UrlDestination};
