//! The request dispatcher

use crate::config::{build_client, HttpConfig};
use crate::delegate::ErrorHandler;
use crate::endpoint::Endpoint;
use crate::errors::HttpError;
use crate::request::{execute, runtime, DataRequest, PreparedRequest};
use crate::response::{DataResponse, RequestEcho};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use reqwest::Client;
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

static SHARED: Lazy<Bucko> = Lazy::new(Bucko::new);

/// Sends [`Endpoint`]s through one shared `reqwest::Client`.
///
/// Configure the client and delegate before handing the dispatcher out;
/// both setters take `&mut self`. Every send returns immediately with a
/// [`DataRequest`] while the request runs on a tokio task.
///
/// ```no_run
/// use bucko_http::{Bucko, Route};
///
/// # async fn run() {
/// let bucko = Bucko::new();
/// let request = bucko.send_with_completion(&Route::get("https://api.example.com", "/users/1"), |response| {
///     match response.value() {
///         Some(user) => println!("user: {}", user),
///         None => println!("failed: {:?}", response.server_error()),
///     }
/// });
/// let _ = request.await;
/// # }
/// ```
pub struct Bucko {
    client: Client,
    delegate: Option<Weak<dyn ErrorHandler>>,
}

impl Default for Bucko {
    fn default() -> Self {
        Self::new()
    }
}

impl Bucko {
    /// Create a dispatcher with the default `HttpConfig`
    pub fn new() -> Self {
        match Self::with_config(&HttpConfig::default()) {
            Ok(bucko) => bucko,
            Err(e) => {
                warn!("Falling back to a plain HTTP client: {}", e);
                Self::with_client(Client::new())
            }
        }
    }

    /// Create a dispatcher whose client is built from `config`
    pub fn with_config(config: &HttpConfig) -> Result<Self, HttpError> {
        Ok(Self::with_client(build_client(config)?))
    }

    /// Create a dispatcher around an existing client
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            delegate: None,
        }
    }

    /// Process-wide dispatcher with default settings, created on first use.
    /// Build your own instance when you need a custom client or a delegate.
    pub fn shared() -> &'static Bucko {
        &SHARED
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Replace the underlying client, e.g. to change trust or proxy settings
    pub fn set_client(&mut self, client: Client) {
        self.client = client;
    }

    /// Register an error delegate. Only a weak reference is kept.
    pub fn set_delegate<H>(&mut self, delegate: &Arc<H>)
    where
        H: ErrorHandler + 'static,
    {
        let weak: Weak<H> = Arc::downgrade(delegate);
        self.delegate = Some(weak);
    }

    /// Register a delegate that is already type-erased, e.g. one taken from
    /// an `Arc<dyn ErrorHandler>` with `Arc::downgrade`
    pub fn set_weak_delegate(&mut self, delegate: Weak<dyn ErrorHandler>) {
        self.delegate = Some(delegate);
    }

    pub fn clear_delegate(&mut self) {
        self.delegate = None;
    }

    /// The registered delegate, if it is still alive
    pub fn delegate(&self) -> Option<Arc<dyn ErrorHandler>> {
        self.delegate.as_ref().and_then(Weak::upgrade)
    }

    /// Send a request without validating or decoding the response.
    ///
    /// The handle resolves to the raw body for any status; only build,
    /// transport and runtime failures produce an error result.
    pub fn send<E>(&self, endpoint: &E) -> DataRequest<DataResponse<Bytes>>
    where
        E: Endpoint + ?Sized,
    {
        self.send_on(runtime(), endpoint)
    }

    /// Send a request, validate its status and decode the body as JSON.
    /// Failures are reported to the delegate before the handle resolves.
    pub fn send_json<E>(&self, endpoint: &E) -> DataRequest<DataResponse<JsonValue>>
    where
        E: Endpoint + ?Sized,
    {
        self.send_json_on(runtime(), endpoint)
    }

    /// Like [`send_json`](Self::send_json), but hands the response to
    /// `completion` instead of the handle.
    ///
    /// `completion` runs exactly once: with the response, or with
    /// [`HttpError::Cancelled`] if the request is cancelled first.
    pub fn send_with_completion<E, F>(&self, endpoint: &E, completion: F) -> DataRequest<()>
    where
        E: Endpoint + ?Sized,
        F: FnOnce(DataResponse<JsonValue>) + Send + 'static,
    {
        self.send_with_completion_on(runtime(), endpoint, completion)
    }

    fn send_on<E>(
        &self,
        runtime: Result<Handle, HttpError>,
        endpoint: &E,
    ) -> DataRequest<DataResponse<Bytes>>
    where
        E: Endpoint + ?Sized,
    {
        let prepared = self.prepare(endpoint);
        let description = prepared.description.clone();
        let echo = prepared.echo.clone();

        match runtime {
            Ok(handle) => {
                let task = handle.spawn(execute(self.client.clone(), prepared));
                DataRequest::new(description, echo, task)
            }
            Err(e) => {
                let response = DataResponse::failure(echo.clone(), e, Utc::now());
                DataRequest::ready(description, echo, response)
            }
        }
    }

    fn send_json_on<E>(
        &self,
        runtime: Result<Handle, HttpError>,
        endpoint: &E,
    ) -> DataRequest<DataResponse<JsonValue>>
    where
        E: Endpoint + ?Sized,
    {
        let prepared = self.prepare(endpoint);
        let description = prepared.description.clone();
        let echo = prepared.echo.clone();

        match runtime {
            Ok(handle) => {
                let task = handle.spawn(json_response(
                    self.client.clone(),
                    prepared,
                    self.delegate.clone(),
                ));
                DataRequest::new(description, echo, task)
            }
            Err(e) => {
                let response = DataResponse::failure(echo.clone(), e, Utc::now());
                report(&response, self.delegate.as_ref());
                DataRequest::ready(description, echo, response)
            }
        }
    }

    fn send_with_completion_on<E, F>(
        &self,
        runtime: Result<Handle, HttpError>,
        endpoint: &E,
        completion: F,
    ) -> DataRequest<()>
    where
        E: Endpoint + ?Sized,
        F: FnOnce(DataResponse<JsonValue>) + Send + 'static,
    {
        let prepared = self.prepare(endpoint);
        let description = prepared.description.clone();
        let echo = prepared.echo.clone();

        let guard = CompletionGuard::new(completion, echo.clone());
        match runtime {
            Ok(handle) => {
                let response = json_response(self.client.clone(), prepared, self.delegate.clone());
                let task = handle.spawn(async move {
                    guard.complete(response.await);
                });
                DataRequest::new(description, echo, task)
            }
            Err(e) => {
                let response = DataResponse::failure(echo.clone(), e, Utc::now());
                report(&response, self.delegate.as_ref());
                guard.complete(response);
                DataRequest::ready(description, echo, ())
            }
        }
    }

    fn prepare<E>(&self, endpoint: &E) -> PreparedRequest
    where
        E: Endpoint + ?Sized,
    {
        let prepared = PreparedRequest::new(&self.client, endpoint);
        info!("{}", prepared.description);
        prepared
    }
}

impl fmt::Debug for Bucko {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bucko")
            .field("client", &self.client)
            .field("delegate", &self.delegate().is_some())
            .finish()
    }
}

async fn json_response(
    client: Client,
    prepared: PreparedRequest,
    delegate: Option<Weak<dyn ErrorHandler>>,
) -> DataResponse<JsonValue> {
    let response = execute(client, prepared).await.validate().into_json();
    report(&response, delegate.as_ref());
    response
}

/// Log the outcome and forward failures to the delegate
fn report(response: &DataResponse<JsonValue>, delegate: Option<&Weak<dyn ErrorHandler>>) {
    let error = match &response.result {
        Ok(_) => {
            debug!("{}", response.description());
            return;
        }
        Err(error) => error,
    };

    warn!("{}", response.description());
    if let Some(payload) = response.server_error() {
        warn!("Server error payload: {}", payload);
    }

    let Some(request) = response.request.as_ref() else {
        return;
    };

    match delegate.and_then(Weak::upgrade) {
        Some(handler) => handler.request_failed(request, error),
        None => debug!("No error delegate registered for {}", request),
    }
}

/// Owns a completion callback and guarantees it runs once, even if the task
/// is dropped before a response arrives
struct CompletionGuard<F>
where
    F: FnOnce(DataResponse<JsonValue>),
{
    completion: Option<F>,
    request: Option<RequestEcho>,
    started: DateTime<Utc>,
}

impl<F> CompletionGuard<F>
where
    F: FnOnce(DataResponse<JsonValue>),
{
    fn new(completion: F, request: Option<RequestEcho>) -> Self {
        Self {
            completion: Some(completion),
            request,
            started: Utc::now(),
        }
    }

    fn complete(mut self, response: DataResponse<JsonValue>) {
        if let Some(completion) = self.completion.take() {
            completion(response);
        }
    }
}

impl<F> Drop for CompletionGuard<F>
where
    F: FnOnce(DataResponse<JsonValue>),
{
    fn drop(&mut self) {
        if let Some(completion) = self.completion.take() {
            debug!("Request dropped before completion, reporting cancellation");
            completion(DataResponse::failure(
                self.request.take(),
                HttpError::Cancelled,
                self.started,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::Route;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[test]
    fn test_delegate_is_not_owned() {
        let mut bucko = Bucko::new();
        let handler = Arc::new(|_: &RequestEcho, _: &HttpError| {});
        bucko.set_delegate(&handler);
        assert!(bucko.delegate().is_some());
        assert_eq!(Arc::strong_count(&handler), 1);

        drop(handler);
        assert!(bucko.delegate().is_none());
    }

    #[test]
    fn test_clear_delegate() {
        let mut bucko = Bucko::new();
        let handler = Arc::new(|_: &RequestEcho, _: &HttpError| {});
        bucko.set_delegate(&handler);
        bucko.clear_delegate();
        assert!(bucko.delegate().is_none());
    }

    #[test]
    fn test_shared_is_one_instance() {
        assert!(std::ptr::eq(Bucko::shared(), Bucko::shared()));
    }

    #[test]
    fn test_completion_guard_runs_once_on_drop() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(None));

        let guard = {
            let calls = calls.clone();
            let seen = seen.clone();
            CompletionGuard::new(
                move |response: DataResponse<JsonValue>| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    *seen.lock().unwrap() = Some(matches!(
                        response.error(),
                        Some(HttpError::Cancelled)
                    ));
                },
                None,
            )
        };
        drop(guard);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*seen.lock().unwrap(), Some(true));
    }

    #[test]
    fn test_completion_guard_complete_does_not_fire_twice() {
        let calls = Arc::new(AtomicUsize::new(0));
        let guard = {
            let calls = calls.clone();
            CompletionGuard::new(
                move |_: DataResponse<JsonValue>| {
                    calls.fetch_add(1, Ordering::SeqCst);
                },
                None,
            )
        };

        guard.complete(DataResponse::failure(None, HttpError::EmptyResponse, Utc::now()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_report_skips_delegate_without_request() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = {
            let calls = calls.clone();
            Arc::new(move |_: &RequestEcho, _: &HttpError| {
                calls.fetch_add(1, Ordering::SeqCst);
            })
        };
        let weak = Arc::downgrade(&handler);
        let weak: Weak<dyn ErrorHandler> = weak;

        let response: DataResponse<JsonValue> =
            DataResponse::failure(None, HttpError::InvalidUrl("nope".to_string()), Utc::now());
        report(&response, Some(&weak));

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_type_erased_delegate() {
        let mut bucko = Bucko::new();
        let handler: Arc<dyn ErrorHandler> = Arc::new(|_: &RequestEcho, _: &HttpError| {});
        bucko.set_weak_delegate(Arc::downgrade(&handler));
        assert!(bucko.delegate().is_some());

        drop(handler);
        assert!(bucko.delegate().is_none());
    }

    fn unavailable() -> Result<Handle, HttpError> {
        Err(HttpError::RuntimeUnavailable("worker threads exhausted".to_string()))
    }

    #[test]
    fn test_missing_runtime_reaches_completion_and_delegate() {
        let failures = Arc::new(AtomicUsize::new(0));
        let handler = {
            let failures = failures.clone();
            Arc::new(move |request: &RequestEcho, error: &HttpError| {
                assert_eq!(request.to_string(), "GET http://localhost/users");
                assert!(matches!(error, HttpError::RuntimeUnavailable(_)));
                failures.fetch_add(1, Ordering::SeqCst);
            })
        };
        let mut bucko = Bucko::new();
        bucko.set_delegate(&handler);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let request = {
            let seen = seen.clone();
            bucko.send_with_completion_on(
                unavailable(),
                &Route::get("http://localhost", "/users"),
                move |response: DataResponse<JsonValue>| {
                    seen.lock().unwrap().push(response.description());
                },
            )
        };

        assert!(request.is_finished());
        assert_eq!(failures.load(Ordering::SeqCst), 1);
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["FAILURE: No runtime available to run the request: worker threads exhausted".to_string()]
        );
    }

    #[tokio::test]
    async fn test_missing_runtime_resolves_handles_with_failure() {
        let bucko = Bucko::new();
        let route = Route::get("http://localhost", "/users");

        let raw = bucko.send_on(unavailable(), &route).await.unwrap();
        assert!(matches!(raw.error(), Some(HttpError::RuntimeUnavailable(_))));
        assert!(raw.request.is_some());

        let json = bucko.send_json_on(unavailable(), &route).await.unwrap();
        assert!(matches!(json.error(), Some(HttpError::RuntimeUnavailable(_))));
        assert_eq!(json.status, None);
    }
}
