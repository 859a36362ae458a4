//! Request assembly, execution and the in-flight handle

use crate::endpoint::{header_map, query_components, Endpoint};
use crate::errors::HttpError;
use crate::response::{DataResponse, RequestEcho, Timeline};
use crate::types::ParameterEncoding;
use bytes::Bytes;
use chrono::Utc;
use once_cell::sync::Lazy;
use reqwest::{Client, Url};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Runs requests issued from threads that are not inside a tokio runtime
static BACKGROUND: Lazy<Result<Runtime, std::io::Error>> = Lazy::new(|| {
    Builder::new_multi_thread()
        .enable_all()
        .thread_name("bucko-worker")
        .build()
});

/// The caller's runtime, or the background runtime if there is none
pub(crate) fn runtime() -> Result<Handle, HttpError> {
    if let Ok(handle) = Handle::try_current() {
        return Ok(handle);
    }

    debug!("No ambient tokio runtime, using background runtime");
    match &*BACKGROUND {
        Ok(runtime) => Ok(runtime.handle().clone()),
        Err(e) => {
            error!("Background runtime failed to start: {}", e);
            Err(HttpError::RuntimeUnavailable(e.to_string()))
        }
    }
}

/// An endpoint mapped onto the client, ready to execute
pub(crate) struct PreparedRequest {
    pub description: String,
    pub echo: Option<RequestEcho>,
    pub request: Result<reqwest::Request, HttpError>,
}

impl PreparedRequest {
    pub fn new<E: Endpoint + ?Sized>(client: &Client, endpoint: &E) -> Self {
        match build_request(client, endpoint) {
            Ok(request) => {
                let echo = RequestEcho::from_request(&request);
                Self {
                    description: echo.to_string(),
                    echo: Some(echo),
                    request: Ok(request),
                }
            }
            Err(e) => Self {
                description: format!("{} {}", endpoint.method(), endpoint.full_url()),
                echo: None,
                request: Err(e),
            },
        }
    }
}

fn build_request<E: Endpoint + ?Sized>(
    client: &Client,
    endpoint: &E,
) -> Result<reqwest::Request, HttpError> {
    let full_url = endpoint.full_url();
    let url = Url::parse(&full_url)
        .map_err(|e| HttpError::InvalidUrl(format!("{}: {}", full_url, e)))?;
    let method = endpoint.method();
    let headers = header_map(&endpoint.headers())?;

    let mut builder = client.request(method.into(), url).headers(headers);

    if let Some(parameters) = endpoint.parameters() {
        match endpoint.encoding() {
            ParameterEncoding::Json => {
                builder = builder.json(&parameters);
            }
            encoding => {
                let components = query_components(&parameters);
                if !components.is_empty() {
                    builder = if encoding.uses_query(method) {
                        builder.query(&components)
                    } else {
                        builder.form(&components)
                    };
                }
            }
        }
    }

    Ok(builder.build()?)
}

/// Execute a prepared request and read the whole body. Any status counts as
/// a successful transfer here; see [`DataResponse::validate`].
pub(crate) async fn execute(client: Client, prepared: PreparedRequest) -> DataResponse<Bytes> {
    let started = Utc::now();
    let PreparedRequest {
        description,
        echo,
        request,
    } = prepared;

    let request = match request {
        Ok(request) => request,
        Err(e) => return DataResponse::failure(echo, e, started),
    };

    let response = match client.execute(request).await {
        Ok(response) => response,
        Err(e) => return DataResponse::failure(echo, e.into(), started),
    };

    let status = response.status();
    let headers = response.headers().clone();
    debug!("{} -> {}", description, status);

    let (data, result) = match response.bytes().await {
        Ok(body) => {
            debug!("Read {} byte response body", body.len());
            (Some(body.clone()), Ok(body))
        }
        Err(e) => (None, Err(e.into())),
    };

    DataResponse {
        request: echo,
        status: Some(status),
        headers,
        data,
        result,
        timeline: Timeline::since(started),
    }
}

enum Task<T> {
    Running(JoinHandle<T>),
    /// Output produced without spawning, e.g. when no runtime could be started
    Ready(Option<T>),
}

/// Handle to a request running in the background.
///
/// Await it for the task's output, or [`cancel`](Self::cancel) it. Dropping
/// the handle does not cancel the request.
pub struct DataRequest<T> {
    description: String,
    request: Option<RequestEcho>,
    task: Task<T>,
}

// `T` is moved out of the handle, never pinned
impl<T> Unpin for DataRequest<T> {}

impl<T> DataRequest<T> {
    pub(crate) fn new(description: String, request: Option<RequestEcho>, task: JoinHandle<T>) -> Self {
        Self {
            description,
            request,
            task: Task::Running(task),
        }
    }

    /// A handle that is already finished with `output`
    pub(crate) fn ready(description: String, request: Option<RequestEcho>, output: T) -> Self {
        Self {
            description,
            request,
            task: Task::Ready(Some(output)),
        }
    }

    /// `METHOD url` of the outgoing request
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The request as built, `None` if building failed
    pub fn request(&self) -> Option<&RequestEcho> {
        self.request.as_ref()
    }

    pub fn cancel(&self) {
        if let Task::Running(task) = &self.task {
            task.abort();
        }
    }

    pub fn is_finished(&self) -> bool {
        match &self.task {
            Task::Running(task) => task.is_finished(),
            Task::Ready(_) => true,
        }
    }
}

impl<T> Future for DataRequest<T> {
    type Output = Result<T, HttpError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match &mut this.task {
            Task::Running(task) => Pin::new(task).poll(cx).map(|joined| {
                joined.map_err(|e| {
                    if e.is_panic() {
                        error!("Request task for {} panicked", this.description);
                    }
                    HttpError::Cancelled
                })
            }),
            // Polled again after the output was taken
            Task::Ready(output) => Poll::Ready(output.take().ok_or(HttpError::Cancelled)),
        }
    }
}

impl<T> fmt::Debug for DataRequest<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataRequest")
            .field("description", &self.description)
            .field("finished", &self.is_finished())
            .finish()
    }
}

impl<T> fmt::Display for DataRequest<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}
