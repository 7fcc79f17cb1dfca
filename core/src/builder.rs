//! Builder for [`HttpClient`].

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::client::{ClientInner, HttpClient};
use crate::config::{library_root, Concurrency, ConfigNode, NodeConfig};
use crate::cookie::CookieStore;
use crate::error::HttpError;
use crate::http::HttpMethod;
use crate::interceptor::{Interceptors, Next};
use crate::payload::Payload;
use crate::settings::ClientSettings;
use crate::transport::Transport;

/// Default bound on concurrently running async requests per client.
pub const DEFAULT_MAX_CONCURRENCY: usize = 16;

/// Collects client-level settings; errors are reported by [`build`](Self::build).
pub struct HttpClientBuilder {
    parent: Option<Arc<ConfigNode>>,
    config: NodeConfig,
    transport: Option<Arc<dyn Transport>>,
    interceptors: Interceptors,
    cookies_enabled: bool,
    max_concurrency: usize,
    executor: Option<Handle>,
    error: Option<HttpError>,
}

impl HttpClientBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: None,
            config: NodeConfig::default(),
            transport: None,
            interceptors: Interceptors::default(),
            cookies_enabled: true,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            executor: None,
            error: None,
        }
    }

    /// Derive the client node from `parent` instead of the library root.
    #[must_use]
    pub fn parent(mut self, parent: Arc<ConfigNode>) -> Self {
        self.parent = Some(parent);
        self
    }

    #[must_use]
    pub fn transport<T: Transport + 'static>(self, transport: T) -> Self {
        self.transport_arc(Arc::new(transport))
    }

    #[must_use]
    pub fn transport_arc(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Edit the client-level node. The first failure is kept and returned by
    /// `build`.
    #[must_use]
    pub fn configure<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&mut NodeConfig) -> Result<(), HttpError>,
    {
        if self.error.is_none() {
            if let Err(err) = f(&mut self.config) {
                self.error = Some(err);
            }
        }
        self
    }

    #[must_use]
    pub fn base_uri(self, uri: &str) -> Self {
        self.configure(|c| c.request.set_uri(uri).map(|_| ()))
    }

    /// Apply `settings`; later builder calls override it.
    #[must_use]
    pub fn settings(mut self, settings: &ClientSettings) -> Self {
        if let Some(n) = settings.max_concurrency {
            self.max_concurrency = n;
        }
        if let Some(enabled) = settings.cookies_enabled {
            self.cookies_enabled = enabled;
        }
        self.configure(|c| settings.apply(c))
    }

    /// Install `f` as the interceptor for every verb in `verbs`.
    #[must_use]
    pub fn interceptor<F>(mut self, verbs: &[HttpMethod], f: F) -> Self
    where
        F: Fn(&Arc<ConfigNode>, &Next<'_>) -> Result<Option<Payload>, HttpError> + Send + Sync + 'static,
    {
        self.interceptors.register(verbs, f);
        self
    }

    #[must_use]
    pub fn cookies_enabled(mut self, enabled: bool) -> Self {
        self.cookies_enabled = enabled;
        self
    }

    /// Bound on concurrently running async requests. Zero is treated as one.
    #[must_use]
    pub fn max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    /// Runtime used by the `*_async` verbs.
    #[must_use]
    pub fn executor(mut self, handle: Handle) -> Self {
        self.executor = Some(handle);
        self
    }

    /// # Errors
    /// The first error recorded by `configure`, `base_uri` or `settings`, or
    /// `ConfigError::MissingTransport` when no transport is available.
    pub fn build(self) -> Result<HttpClient, HttpError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let transport = match self.transport {
            Some(transport) => transport,
            None => default_transport()?,
        };
        let parent = self.parent.unwrap_or_else(library_root);
        let config = Arc::new(ConfigNode::from_config(
            Some(parent),
            self.config,
            Concurrency::Shared,
        ));
        let max_concurrency = self.max_concurrency.max(1);
        debug!(max_concurrency, cookies_enabled = self.cookies_enabled, "building http client");

        Ok(HttpClient::from_inner(ClientInner {
            config,
            transport,
            interceptors: self.interceptors,
            cookie_store: self.cookies_enabled.then(CookieStore::new),
            executor: self.executor,
            permits: Arc::new(Semaphore::new(max_concurrency)),
        }))
    }
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "ureq-transport")]
fn default_transport() -> Result<Arc<dyn Transport>, HttpError> {
    Ok(Arc::new(crate::transport::UreqTransport::new()))
}

#[cfg(not(feature = "ureq-transport"))]
fn default_transport() -> Result<Arc<dyn Transport>, HttpError> {
    Err(crate::error::ConfigError::MissingTransport.into())
}
