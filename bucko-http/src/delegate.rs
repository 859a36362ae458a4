//! Global error observer

use crate::errors::HttpError;
use crate::response::RequestEcho;

/// Notified whenever a JSON request fails, alongside the completion callback.
///
/// The dispatcher holds its delegate weakly; keep your own `Arc` alive for as
/// long as you want notifications. Calls happen on the runtime worker that
/// handled the response and must not block.
pub trait ErrorHandler: Send + Sync {
    fn request_failed(&self, request: &RequestEcho, error: &HttpError);
}

impl<F> ErrorHandler for F
where
    F: Fn(&RequestEcho, &HttpError) + Send + Sync,
{
    fn request_failed(&self, request: &RequestEcho, error: &HttpError) {
        self(request, error)
    }
}
