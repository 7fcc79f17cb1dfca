//! Verb dispatch over the configuration chain.
//!
//! # Design
//! Every call derives an exclusive request node from the client node, applies
//! the caller's closure, freezes it and hands it to the verb's interceptor (or
//! straight to the pipeline). The pipeline is split the same way a request is
//! described and consumed:
//! - [`prepare`] resolves the chain into a plain [`HttpRequest`];
//! - the [`Transport`] performs the round-trip;
//! - [`interpret`] turns the response into the call result through the
//!   parser and status handler of the chain.
//!
//! `HttpClient` is `Clone + Send + Sync`; clones share the client node,
//! cookie store and concurrency permits.

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use serde::de::DeserializeOwned;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tracing::{debug, trace};

use crate::auth::AuthKind;
use crate::builder::HttpClientBuilder;
use crate::config::{resolve_handler, Concurrency, ConfigNode, NodeConfig};
use crate::content_type::{self, DEFAULT_CONTENT_TYPE};
use crate::cookie::{self, CookieStore};
use crate::error::{ConfigError, HttpError};
use crate::from_server::FromServer;
use crate::http::{HttpMethod, HttpRequest};
use crate::interceptor::Interceptors;
use crate::payload::Payload;
use crate::transport::Transport;

#[derive(Clone)]
pub struct HttpClient {
    inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    pub(crate) config: Arc<ConfigNode>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) interceptors: Interceptors,
    pub(crate) cookie_store: Option<CookieStore>,
    pub(crate) executor: Option<Handle>,
    pub(crate) permits: Arc<Semaphore>,
}

macro_rules! verbs {
    ($($verb:ident, $sync_name:ident, $async_name:ident;)*) => {
        $(
            #[doc = concat!("Execute a ", stringify!($verb), " request configured by `configure`.")]
            ///
            /// # Errors
            /// See [`HttpClient::execute`].
            pub fn $sync_name<F>(&self, configure: F) -> Result<Option<Payload>, HttpError>
            where
                F: FnOnce(&mut NodeConfig) -> Result<(), HttpError>,
            {
                self.execute(HttpMethod::$verb, configure)
            }

            #[doc = concat!("Execute a ", stringify!($verb), " request on the client's executor.")]
            ///
            /// # Errors
            /// See [`HttpClient::execute_async`].
            pub async fn $async_name<F>(&self, configure: F) -> Result<Option<Payload>, HttpError>
            where
                F: FnOnce(&mut NodeConfig) -> Result<(), HttpError> + Send + 'static,
            {
                self.execute_async(HttpMethod::$verb, configure).await
            }
        )*
    };
}

impl HttpClient {
    #[must_use]
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::new()
    }

    pub(crate) fn from_inner(inner: ClientInner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// The client-level node. Request nodes derive from it.
    #[must_use]
    pub fn config(&self) -> &Arc<ConfigNode> {
        &self.inner.config
    }

    /// Change client-level settings. Requests already in flight keep the
    /// snapshot they started with.
    ///
    /// # Errors
    /// Whatever `f` returns; nothing is applied in that case.
    pub fn reconfigure<F>(&self, f: F) -> Result<(), HttpError>
    where
        F: Fn(&mut NodeConfig) -> Result<(), HttpError>,
    {
        self.inner.config.configure_shared(f)
    }

    /// Cookies collected from successful responses, if the store is enabled.
    #[must_use]
    pub fn cookie_store(&self) -> Option<&CookieStore> {
        self.inner.cookie_store.as_ref()
    }

    /// Run one request through the interceptor for `verb` and the pipeline.
    ///
    /// Returns the status handler's result, or the parsed body when no
    /// handler is registered for a success status.
    ///
    /// # Errors
    /// - `HttpError::Config` / `HttpError::InvalidUri` before anything is sent;
    /// - `HttpError::Encode` when the body encoder fails;
    /// - `HttpError::Transport` / `HttpError::Parse` unless an exception
    ///   handler recovers;
    /// - `HttpError::Status` for a failure status without a handler. Its
    ///   `body` is `None` for HEAD requests and for empty responses;
    ///   otherwise it holds the parsed body.
    pub fn execute<F>(&self, verb: HttpMethod, configure: F) -> Result<Option<Payload>, HttpError>
    where
        F: FnOnce(&mut NodeConfig) -> Result<(), HttpError>,
    {
        let mut node = ConfigNode::derive(&self.inner.config, Concurrency::Exclusive);
        node.configure(configure)?;
        node.freeze();
        let node = Arc::new(node);

        let pipeline = |request_node: &ConfigNode| self.inner.perform(verb, request_node);
        self.inner.interceptors.dispatch(verb, &node, &pipeline)
    }

    /// Like [`execute`](Self::execute), with the result cast to `T`.
    ///
    /// # Errors
    /// `HttpError::UnexpectedResult` when there is no result or it is not a `T`.
    pub fn execute_as<T, F>(&self, verb: HttpMethod, configure: F) -> Result<T, HttpError>
    where
        T: Any + Clone,
        F: FnOnce(&mut NodeConfig) -> Result<(), HttpError>,
    {
        cast_result(self.execute(verb, configure)?)
    }

    /// Like [`execute`](Self::execute), with the result deserialized from
    /// JSON. Works on parsed `serde_json::Value` results as well as raw bytes
    /// or text.
    ///
    /// # Errors
    /// `HttpError::Parse` when deserialization fails, or
    /// `HttpError::UnexpectedResult` for any other result type.
    pub fn execute_json<T, F>(&self, verb: HttpMethod, configure: F) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
        F: FnOnce(&mut NodeConfig) -> Result<(), HttpError>,
    {
        json_result(self.execute(verb, configure)?)
    }

    /// Run [`execute`](Self::execute) on a blocking thread of the client's
    /// executor, or of the current tokio runtime when none was configured.
    ///
    /// At most `max_concurrency` requests of one client run at the same time;
    /// further calls wait for a permit.
    ///
    /// # Errors
    /// `HttpError::Executor` when no runtime is available or the blocking
    /// task panicked, otherwise as [`execute`](Self::execute).
    pub async fn execute_async<F>(&self, verb: HttpMethod, configure: F) -> Result<Option<Payload>, HttpError>
    where
        F: FnOnce(&mut NodeConfig) -> Result<(), HttpError> + Send + 'static,
    {
        let handle = match &self.inner.executor {
            Some(handle) => handle.clone(),
            None => Handle::try_current().map_err(|e| HttpError::Executor(e.to_string()))?,
        };
        let permit = Arc::clone(&self.inner.permits)
            .acquire_owned()
            .await
            .map_err(|e| HttpError::Executor(e.to_string()))?;
        let client = self.clone();
        handle
            .spawn_blocking(move || {
                let _permit = permit;
                client.execute(verb, configure)
            })
            .await
            .map_err(|e| HttpError::Executor(e.to_string()))?
    }

    /// [`execute_async`](Self::execute_async) with the result cast to `T`.
    ///
    /// # Errors
    /// As [`execute_async`](Self::execute_async), plus
    /// `HttpError::UnexpectedResult` when there is no result or it is not a `T`.
    pub async fn execute_as_async<T, F>(&self, verb: HttpMethod, configure: F) -> Result<T, HttpError>
    where
        T: Any + Clone,
        F: FnOnce(&mut NodeConfig) -> Result<(), HttpError> + Send + 'static,
    {
        cast_result(self.execute_async(verb, configure).await?)
    }

    /// [`execute_async`](Self::execute_async) with the result deserialized
    /// from JSON, as [`execute_json`](Self::execute_json) does.
    ///
    /// # Errors
    /// As [`execute_async`](Self::execute_async) and
    /// [`execute_json`](Self::execute_json).
    pub async fn execute_json_async<T, F>(&self, verb: HttpMethod, configure: F) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
        F: FnOnce(&mut NodeConfig) -> Result<(), HttpError> + Send + 'static,
    {
        json_result(self.execute_async(verb, configure).await?)
    }

    verbs! {
        Get, get, get_async;
        Head, head, head_async;
        Post, post, post_async;
        Put, put, put_async;
        Delete, delete, delete_async;
        Patch, patch, patch_async;
        Options, options, options_async;
        Trace, trace, trace_async;
    }
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.inner.config)
            .field("interceptors", &self.inner.interceptors)
            .field("cookies_enabled", &self.inner.cookie_store.is_some())
            .field("available_permits", &self.inner.permits.available_permits())
            .finish_non_exhaustive()
    }
}

impl ClientInner {
    fn perform(&self, verb: HttpMethod, node: &ConfigNode) -> Result<Option<Payload>, HttpError> {
        let now = SystemTime::now();
        let request = prepare(verb, node, self.cookie_store.as_ref(), now)?;
        let uri = request.uri.clone();
        debug!(method = %verb, uri = %uri, "sending request");

        let response = match self.transport.execute(request) {
            Ok(response) => response,
            Err(err) => return recover(node, err),
        };
        debug!(method = %verb, uri = %uri, status = response.status, "received response");

        let from_server = FromServer::new(uri, response);
        if let Some(store) = &self.cookie_store {
            if from_server.is_success() {
                store.store(from_server.cookies(now), now);
            }
        }
        interpret(verb, node, &from_server)
    }
}

/// Resolve `node`'s chain into the request handed to the transport.
///
/// # Errors
/// `HttpError::InvalidUri`, `ConfigError::MissingEncoder`, or whatever the
/// selected encoder reports.
pub fn prepare(
    verb: HttpMethod,
    node: &ConfigNode,
    store: Option<&CookieStore>,
    now: SystemTime,
) -> Result<HttpRequest, HttpError> {
    let uri = node.actual_uri().to_url()?.to_string();
    let mut headers: Vec<(String, String)> = node.actual_headers().into_iter().collect();

    let mut cookies = store.map(|s| s.cookies(now)).unwrap_or_default();
    cookie::merge_by_name(&mut cookies, node.actual_cookies());
    if let Some(value) = cookie::cookie_header(&cookies, now) {
        headers.push(("Cookie".to_string(), value));
    }

    let auth = node.actual_auth();
    if let Some(auth) = &auth {
        if auth.kind == AuthKind::Basic && auth.preemptive && !has_header(&headers, "authorization") {
            headers.push(("Authorization".to_string(), auth.basic_header_value()));
        }
    }

    let body = match node.actual_body() {
        Some(payload) => {
            let content_type = node
                .actual_content_type()
                .map(|ct| content_type::media_type(&ct).to_string())
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
            let encoder = node
                .actual_encoder(&content_type)
                .ok_or_else(|| ConfigError::MissingEncoder {
                    content_type: content_type.clone(),
                })?;
            trace!(content_type = %content_type, body = payload.type_name(), "encoding request body");
            let bytes = encoder(node, &payload)?;
            if !has_header(&headers, "content-type") {
                let charset = node.actual_charset();
                headers.push((
                    "Content-Type".to_string(),
                    content_type::header_value(&content_type, charset.as_deref()),
                ));
            }
            Some(bytes)
        }
        None => None,
    };

    Ok(HttpRequest {
        method: verb,
        uri,
        headers,
        body,
        auth,
    })
}

/// Parse the body and run the status handler for `from_server`.
///
/// # Errors
/// `HttpError::Parse` (after the exception handler declines),
/// `HttpError::Status` for an unhandled failure status, or the handler's
/// own error.
pub fn interpret(verb: HttpMethod, node: &ConfigNode, from_server: &FromServer) -> Result<Option<Payload>, HttpError> {
    let body = match parse_body(verb, node, from_server) {
        Ok(body) => body,
        Err(err) => return recover(node, err),
    };

    let status = from_server.status();
    match resolve_handler(node, status) {
        Some((handler, matched)) => {
            trace!(status, ?matched, "running status handler");
            handler(from_server, body)
        }
        None if from_server.is_success() => Ok(body),
        None => Err(HttpError::Status {
            status,
            message: from_server.message().to_string(),
            headers: from_server.headers().to_vec(),
            body,
        }),
    }
}

fn parse_body(verb: HttpMethod, node: &ConfigNode, from_server: &FromServer) -> Result<Option<Payload>, HttpError> {
    if verb == HttpMethod::Head || !from_server.has_body() {
        return Ok(None);
    }
    match node.actual_parser(from_server.content_type()) {
        Some(parser) => {
            trace!(content_type = from_server.content_type(), "parsing response body");
            parser(node, from_server).map(Some)
        }
        None => Ok(Some(Payload::new(from_server.body().clone()))),
    }
}

/// Hand a transport or parser failure to the nearest exception handler.
fn recover(node: &ConfigNode, err: HttpError) -> Result<Option<Payload>, HttpError> {
    if err.is_config() {
        return Err(err);
    }
    match node.actual_exception() {
        Some(handler) => {
            debug!(error = %err, "routing error to exception handler");
            handler(err)
        }
        None => Err(err),
    }
}

fn cast_result<T: Any + Clone>(payload: Option<Payload>) -> Result<T, HttpError> {
    payload
        .and_then(|payload| payload.downcast_ref::<T>().cloned())
        .ok_or(HttpError::UnexpectedResult {
            expected: type_name::<T>(),
        })
}

fn json_result<T: DeserializeOwned>(payload: Option<Payload>) -> Result<T, HttpError> {
    let unexpected = || HttpError::UnexpectedResult {
        expected: type_name::<T>(),
    };
    let payload = payload.ok_or_else(unexpected)?;
    let parsed = if let Some(value) = payload.downcast_ref::<serde_json::Value>() {
        T::deserialize(value)
    } else if let Some(bytes) = payload.downcast_ref::<bytes::Bytes>() {
        serde_json::from_slice(bytes)
    } else if let Some(text) = payload.downcast_ref::<String>() {
        serde_json::from_str(text)
    } else {
        return Err(unexpected());
    };
    parsed.map_err(|e| HttpError::Parse(Box::new(e)))
}

fn has_header(headers: &[(String, String)], name: &str) -> bool {
    headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
}
