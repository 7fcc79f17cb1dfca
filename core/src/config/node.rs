use std::collections::BTreeMap;
use std::fmt;
use std::iter;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::auth::Auth;
use crate::config::registry::{Encoder, Parser};
use crate::config::response::{ExceptionHandler, Handler};
use crate::config::{status, NodeConfig};
use crate::cookie::{self, Cookie};
use crate::error::{ConfigError, HttpError};
use crate::payload::Payload;
use crate::uri::UriBuilder;

/// Storage strategy for a node's local settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Concurrency {
    /// Plain fields mutated through `&mut self`. For short-lived request nodes.
    Exclusive,
    /// Settings behind an atomically swapped `Arc`. Readers always see a
    /// complete snapshot, and the node can be reconfigured through `&self`
    /// while children are resolving against it.
    Shared,
}

enum Storage {
    Exclusive(NodeConfig),
    Shared(ArcSwap<NodeConfig>),
}

/// One level of the configuration chain.
pub struct ConfigNode {
    parent: Option<Arc<ConfigNode>>,
    storage: Storage,
    frozen: AtomicBool,
}

impl ConfigNode {
    /// An unparented node with nothing set.
    #[must_use]
    pub fn root() -> Self {
        Self::from_config(None, NodeConfig::default(), Concurrency::Exclusive)
    }

    /// A child of `parent`. The parent is never modified through the child.
    #[must_use]
    pub fn derive(parent: &Arc<ConfigNode>, concurrency: Concurrency) -> Self {
        Self::from_config(Some(Arc::clone(parent)), NodeConfig::default(), concurrency)
    }

    pub(crate) fn from_config(
        parent: Option<Arc<ConfigNode>>,
        config: NodeConfig,
        concurrency: Concurrency,
    ) -> Self {
        let storage = match concurrency {
            Concurrency::Exclusive => Storage::Exclusive(config),
            Concurrency::Shared => Storage::Shared(ArcSwap::from_pointee(config)),
        };
        Self {
            parent,
            storage,
            frozen: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn parent(&self) -> Option<&Arc<ConfigNode>> {
        self.parent.as_ref()
    }

    #[must_use]
    pub fn concurrency(&self) -> Concurrency {
        match self.storage {
            Storage::Exclusive(_) => Concurrency::Exclusive,
            Storage::Shared(_) => Concurrency::Shared,
        }
    }

    /// Reject any further mutation.
    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    fn ensure_mutable(&self) -> Result<(), HttpError> {
        if self.is_frozen() {
            return Err(ConfigError::Frozen.into());
        }
        Ok(())
    }

    /// Apply `f` to this node's local settings. If `f` fails nothing changes.
    ///
    /// # Errors
    /// Returns `ConfigError::Frozen` for a frozen node, or whatever `f` returns.
    pub fn configure<F>(&mut self, f: F) -> Result<&mut Self, HttpError>
    where
        F: FnOnce(&mut NodeConfig) -> Result<(), HttpError>,
    {
        self.ensure_mutable()?;
        match &mut self.storage {
            Storage::Exclusive(config) => {
                let mut next = config.clone();
                f(&mut next)?;
                *config = next;
            }
            Storage::Shared(swap) => {
                let mut next = NodeConfig::clone(&swap.load());
                f(&mut next)?;
                swap.store(Arc::new(next));
            }
        }
        Ok(self)
    }

    /// Reconfigure a shared node in place while it may be read concurrently.
    ///
    /// `f` may run more than once if another writer races this one.
    ///
    /// # Errors
    /// Returns `ConfigError::NotShared` for an exclusive node,
    /// `ConfigError::Frozen` for a frozen one, or the first error from `f`.
    pub fn configure_shared<F>(&self, f: F) -> Result<(), HttpError>
    where
        F: Fn(&mut NodeConfig) -> Result<(), HttpError>,
    {
        self.ensure_mutable()?;
        let Storage::Shared(swap) = &self.storage else {
            return Err(ConfigError::NotShared.into());
        };
        let mut failure = None;
        swap.rcu(|current| {
            failure = None;
            let mut next = NodeConfig::clone(current);
            match f(&mut next) {
                Ok(()) => Arc::new(next),
                Err(err) => {
                    failure = Some(err);
                    Arc::clone(current)
                }
            }
        });
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Run `f` against this node's local settings only.
    pub fn with_config<R>(&self, f: impl FnOnce(&NodeConfig) -> R) -> R {
        match &self.storage {
            Storage::Exclusive(config) => f(config),
            Storage::Shared(swap) => {
                let guard = swap.load();
                f(&**guard)
            }
        }
    }

    /// This node followed by each ancestor up to the root.
    pub fn chain(&self) -> impl Iterator<Item = &ConfigNode> {
        iter::successors(Some(self), |n| n.parent.as_deref())
    }

    fn nearest<R>(&self, f: impl Fn(&NodeConfig) -> Option<R>) -> Option<R> {
        self.chain().find_map(|node| node.with_config(&f))
    }

    /// Visit every level from the root down to this node.
    fn root_to_leaf(&self, mut f: impl FnMut(&NodeConfig)) {
        let levels: Vec<&ConfigNode> = self.chain().collect();
        for node in levels.into_iter().rev() {
            node.with_config(&mut f);
        }
    }

    #[must_use]
    pub fn actual_content_type(&self) -> Option<String> {
        self.nearest(|c| c.request.content_type().map(str::to_string))
    }

    #[must_use]
    pub fn actual_charset(&self) -> Option<String> {
        self.nearest(|c| c.request.charset().map(str::to_string))
    }

    #[must_use]
    pub fn actual_body(&self) -> Option<Payload> {
        self.nearest(|c| c.request.body().cloned())
    }

    #[must_use]
    pub fn actual_auth(&self) -> Option<Auth> {
        self.nearest(|c| c.request.auth().cloned())
    }

    /// Headers from every level; a child's value wins for a shared key.
    #[must_use]
    pub fn actual_headers(&self) -> BTreeMap<String, String> {
        let mut merged = BTreeMap::new();
        self.root_to_leaf(|c| {
            merged.extend(c.request.headers().iter().map(|(k, v)| (k.clone(), v.clone())));
        });
        merged
    }

    /// Cookies from every level; a child's cookie replaces a parent's cookie
    /// with the same name.
    #[must_use]
    pub fn actual_cookies(&self) -> Vec<Cookie> {
        let mut merged = Vec::new();
        self.root_to_leaf(|c| cookie::merge_by_name(&mut merged, c.request.cookies().iter().cloned()));
        merged
    }

    /// The URI builder chain mirrored from this node's chain.
    #[must_use]
    pub fn actual_uri(&self) -> UriBuilder {
        let parent = self.parent.as_ref().map(|p| Arc::new(p.actual_uri()));
        self.with_config(|c| c.request.uri().relinked(parent))
    }

    #[must_use]
    pub fn actual_encoder(&self, content_type: &str) -> Option<Encoder> {
        self.nearest(|c| c.request.encoder(content_type).cloned())
    }

    #[must_use]
    pub fn actual_parser(&self, content_type: &str) -> Option<Parser> {
        self.nearest(|c| c.response.parser(content_type).cloned())
    }

    #[must_use]
    pub fn actual_context(&self, content_type: &str, id: &str) -> Option<Payload> {
        self.nearest(|c| c.context(content_type, id).cloned())
    }

    /// Nearest exact-code handler for `status`.
    #[must_use]
    pub fn actual_when(&self, status: u16) -> Option<Handler> {
        self.nearest(|c| c.response.handler_for(status).cloned())
    }

    #[must_use]
    pub fn actual_success(&self) -> Option<Handler> {
        self.nearest(|c| c.response.success_handler().cloned())
    }

    #[must_use]
    pub fn actual_failure(&self) -> Option<Handler> {
        self.nearest(|c| c.response.failure_handler().cloned())
    }

    #[must_use]
    pub fn actual_exception(&self) -> Option<ExceptionHandler> {
        self.nearest(|c| c.response.exception_handler().cloned())
    }

    /// Handler for `status`: exact code anywhere in the chain first, then the
    /// nearest success/failure bucket.
    #[must_use]
    pub fn actual_handler(&self, status: u16) -> Option<Handler> {
        status::resolve_handler(self, status).map(|(handler, _)| handler)
    }
}

impl fmt::Debug for ConfigNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with_config(|config| {
            f.debug_struct("ConfigNode")
                .field("concurrency", &self.concurrency())
                .field("frozen", &self.is_frozen())
                .field("config", config)
                .field("parent", &self.parent)
                .finish()
        })
    }
}
