//! Response model handed to callers

use crate::errors::HttpError;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode, Url};
use serde_json::Value as JsonValue;
use std::fmt;

/// The request that was actually built for an endpoint.
///
/// Client-wide default headers are added by the client at send time and are
/// not part of the echo.
#[derive(Debug, Clone)]
pub struct RequestEcho {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
}

impl RequestEcho {
    pub(crate) fn from_request(request: &reqwest::Request) -> Self {
        Self {
            method: request.method().clone(),
            url: request.url().clone(),
            headers: request.headers().clone(),
        }
    }
}

impl fmt::Display for RequestEcho {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// When the request started and how long it took until the response was
/// fully read
#[derive(Debug, Clone, Copy)]
pub struct Timeline {
    pub request_start: DateTime<Utc>,
    pub total_duration: chrono::Duration,
}

impl Timeline {
    pub(crate) fn since(request_start: DateTime<Utc>) -> Self {
        Self {
            request_start,
            total_duration: Utc::now() - request_start,
        }
    }
}

/// Outcome of one request
#[derive(Debug)]
pub struct DataResponse<T> {
    /// `None` if the request could not be built
    pub request: Option<RequestEcho>,
    pub status: Option<StatusCode>,
    pub headers: HeaderMap,
    /// Raw body, when one was received
    pub data: Option<Bytes>,
    pub result: Result<T, HttpError>,
    pub timeline: Timeline,
}

impl<T> DataResponse<T> {
    pub(crate) fn failure(
        request: Option<RequestEcho>,
        error: HttpError,
        request_start: DateTime<Utc>,
    ) -> Self {
        Self {
            request,
            status: None,
            headers: HeaderMap::new(),
            data: None,
            result: Err(error),
            timeline: Timeline::since(request_start),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn is_failure(&self) -> bool {
        self.result.is_err()
    }

    pub fn value(&self) -> Option<&T> {
        self.result.as_ref().ok()
    }

    pub fn error(&self) -> Option<&HttpError> {
        self.result.as_ref().err()
    }

    pub fn into_result(self) -> Result<T, HttpError> {
        self.result
    }

    /// Best-effort JSON view of the raw body, typically an error payload.
    /// `None` when there is no body or it is not valid JSON.
    pub fn server_error(&self) -> Option<JsonValue> {
        self.data
            .as_ref()
            .and_then(|data| serde_json::from_slice(data).ok())
    }

    fn map_result<U>(
        self,
        f: impl FnOnce(Option<StatusCode>, Result<T, HttpError>) -> Result<U, HttpError>,
    ) -> DataResponse<U> {
        let DataResponse {
            request,
            status,
            headers,
            data,
            result,
            timeline,
        } = self;

        DataResponse {
            request,
            status,
            headers,
            data,
            result: f(status, result),
            timeline,
        }
    }
}

impl DataResponse<Bytes> {
    /// Fail the response unless the status is in `200..=299`.
    /// Responses that already failed are left untouched.
    pub fn validate(self) -> Self {
        self.map_result(|status, result| match (result, status) {
            (Ok(_), Some(status)) if !status.is_success() => {
                Err(HttpError::UnacceptableStatusCode(status.as_u16()))
            }
            (result, _) => result,
        })
    }

    /// Decode the body as JSON.
    ///
    /// An empty body is `null` for 204/205 and an error for any other status.
    pub fn into_json(self) -> DataResponse<JsonValue> {
        self.map_result(|status, result| result.and_then(|body| decode_json(status, &body)))
    }
}

impl DataResponse<JsonValue> {
    /// One-line summary, `SUCCESS: <json>` or `FAILURE: <error>`
    pub fn description(&self) -> String {
        match &self.result {
            Ok(value) => format!("SUCCESS: {}", value),
            Err(error) => format!("FAILURE: {}", error),
        }
    }
}

fn decode_json(status: Option<StatusCode>, body: &Bytes) -> Result<JsonValue, HttpError> {
    if body.is_empty() {
        return match status {
            Some(StatusCode::NO_CONTENT) | Some(StatusCode::RESET_CONTENT) => Ok(JsonValue::Null),
            _ => Err(HttpError::EmptyResponse),
        };
    }

    Ok(serde_json::from_slice(body)?)
}
