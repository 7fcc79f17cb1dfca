//! Per-verb interceptor slots wrapping the request pipeline.
//!
//! An interceptor receives the frozen request node and a [`Next`]
//! continuation. It may run code around `next.run(..)`, short-circuit with its
//! own result, or derive a child node carrying extra settings and run the
//! pipeline against that instead.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::ConfigNode;
use crate::error::HttpError;
use crate::http::HttpMethod;
use crate::payload::Payload;

pub type InterceptorFn =
    dyn Fn(&Arc<ConfigNode>, &Next<'_>) -> Result<Option<Payload>, HttpError> + Send + Sync;
pub type Interceptor = Arc<InterceptorFn>;

/// The rest of the pipeline: resolve, encode, send, parse, handle.
pub struct Next<'a> {
    run: &'a (dyn Fn(&ConfigNode) -> Result<Option<Payload>, HttpError> + 'a),
}

impl<'a> Next<'a> {
    pub(crate) fn new(run: &'a (dyn Fn(&ConfigNode) -> Result<Option<Payload>, HttpError> + 'a)) -> Self {
        Self { run }
    }

    /// Execute the request described by `node`.
    ///
    /// # Errors
    /// Whatever the pipeline reports for this request.
    pub fn run(&self, node: &ConfigNode) -> Result<Option<Payload>, HttpError> {
        (self.run)(node)
    }
}

/// One interceptor slot per verb. Empty slots call straight through.
#[derive(Clone, Default)]
pub struct Interceptors {
    slots: HashMap<HttpMethod, Interceptor>,
}

impl Interceptors {
    /// Install `f` in every slot listed in `verbs`, replacing what was there.
    pub fn register<F>(&mut self, verbs: &[HttpMethod], f: F) -> &mut Self
    where
        F: Fn(&Arc<ConfigNode>, &Next<'_>) -> Result<Option<Payload>, HttpError> + Send + Sync + 'static,
    {
        let interceptor: Interceptor = Arc::new(f);
        for verb in verbs {
            self.slots.insert(*verb, Arc::clone(&interceptor));
        }
        self
    }

    #[must_use]
    pub fn get(&self, verb: HttpMethod) -> Option<&Interceptor> {
        self.slots.get(&verb)
    }

    /// Run `verb`'s interceptor around `pipeline`, or `pipeline` alone.
    pub(crate) fn dispatch(
        &self,
        verb: HttpMethod,
        node: &Arc<ConfigNode>,
        pipeline: &dyn Fn(&ConfigNode) -> Result<Option<Payload>, HttpError>,
    ) -> Result<Option<Payload>, HttpError> {
        match self.get(verb) {
            Some(interceptor) => {
                tracing::trace!(method = %verb, "running interceptor");
                interceptor(node, &Next::new(pipeline))
            }
            None => pipeline(node),
        }
    }
}

impl fmt::Debug for Interceptors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verbs: Vec<&str> = HttpMethod::ALL
            .iter()
            .filter(|v| self.slots.contains_key(*v))
            .map(|v| v.as_str())
            .collect();
        f.debug_struct("Interceptors").field("verbs", &verbs).finish()
    }
}
