//! Error types for the chained HTTP client.
//!
//! # Design
//! Configuration problems are detected before any network activity and get
//! their own `ConfigError` so callers can tell "my setup is wrong" apart from
//! "the server said no." Transport, encoder and parser failures box their
//! source so the original error stays reachable through `source()`.

use std::error::Error as StdError;

use thiserror::Error;

use crate::payload::Payload;

/// Boxed error produced by transports, encoders and parsers.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Problems with how a request or node was configured.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// A body is present but no encoder is registered for its content type
    /// anywhere in the chain.
    #[error("no encoder registered for content type '{content_type}'")]
    MissingEncoder { content_type: String },

    /// The node was frozen (library root, or already executed) and can no
    /// longer be mutated.
    #[error("configuration node is frozen")]
    Frozen,

    /// `configure_shared` was called on a node created with exclusive storage.
    #[error("configuration node does not use shared storage")]
    NotShared,

    /// The transport cannot perform the requested authentication scheme.
    #[error("authentication scheme '{0}' is not supported by this transport")]
    UnsupportedAuth(String),

    /// The client was built without a transport and no default is compiled in.
    #[error("no transport configured")]
    MissingTransport,
}

/// Errors returned by `HttpClient` and the configuration chain.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HttpError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The merged URI could not be turned into a valid URI.
    #[error("invalid URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    /// Connection or IO failure reported by the transport.
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    /// Response status >= 400 with no handler registered for it.
    #[error("HTTP {status} {message}")]
    Status {
        status: u16,
        message: String,
        headers: Vec<(String, String)>,
        body: Option<Payload>,
    },

    /// A registered encoder failed to turn the body into bytes.
    #[error("encoding request body failed: {0}")]
    Encode(#[source] BoxError),

    /// A registered parser failed to read the response body.
    #[error("parsing response body failed: {0}")]
    Parse(#[source] BoxError),

    /// The handler result could not be cast to the requested type.
    #[error("unexpected result type, expected {expected}")]
    UnexpectedResult { expected: &'static str },

    /// No runtime was available for an async call, or the blocking task died.
    #[error("executor error: {0}")]
    Executor(String),
}

impl HttpError {
    pub(crate) fn invalid_uri(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        HttpError::InvalidUri {
            uri: uri.into(),
            reason: reason.into(),
        }
    }

    /// Status code carried by a `Status` error.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for errors raised before any transport call was attempted.
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(self, HttpError::Config(_) | HttpError::InvalidUri { .. })
    }
}
