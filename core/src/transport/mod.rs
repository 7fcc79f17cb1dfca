//! Transport boundary.
//!
//! # Design
//! The client resolves the whole configuration chain into a plain
//! [`HttpRequest`] before calling a transport, so a transport only moves
//! bytes. Connection pooling, retries, TLS and timeouts live here and
//! nowhere else.

#[cfg(feature = "ureq-transport")]
mod ureq_transport;
#[cfg(feature = "ureq-transport")]
pub use ureq_transport::UreqTransport;

use crate::error::HttpError;
use crate::http::{HttpRequest, HttpResponse};

/// Executes a resolved request.
///
/// Implementations must return non-2xx responses as `Ok`; status handling is
/// the client's job.
pub trait Transport: Send + Sync {
    /// # Errors
    /// `HttpError::Transport` for connection or IO failures.
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

impl<F> Transport for F
where
    F: Fn(HttpRequest) -> Result<HttpResponse, HttpError> + Send + Sync,
{
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        self(request)
    }
}
