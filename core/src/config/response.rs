//! Response half of a configuration node: status handlers, parsers and the
//! exception handler.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::registry::{Parser, ParserFn, Registry};
use crate::config::ConfigNode;
use crate::error::HttpError;
use crate::from_server::FromServer;
use crate::payload::Payload;

/// Produces the call result from the response envelope and the parsed body.
pub type HandlerFn =
    dyn Fn(&FromServer, Option<Payload>) -> Result<Option<Payload>, HttpError> + Send + Sync;
pub type Handler = Arc<HandlerFn>;

/// Receives transport and parser failures; may recover with a result.
pub type ExceptionFn = dyn Fn(HttpError) -> Result<Option<Payload>, HttpError> + Send + Sync;
pub type ExceptionHandler = Arc<ExceptionFn>;

#[derive(Clone, Default)]
pub struct ResponseConfig {
    when: HashMap<u16, Handler>,
    success: Option<Handler>,
    failure: Option<Handler>,
    exception: Option<ExceptionHandler>,
    parsers: Registry<ParserFn>,
}

impl ResponseConfig {
    /// Handler for exactly `status` at this level.
    pub fn when<F>(&mut self, status: u16, handler: F) -> &mut Self
    where
        F: Fn(&FromServer, Option<Payload>) -> Result<Option<Payload>, HttpError> + Send + Sync + 'static,
    {
        self.when.insert(status, Arc::new(handler));
        self
    }

    /// Register one handler for several exact status codes.
    pub fn when_any<F>(&mut self, statuses: &[u16], handler: F) -> &mut Self
    where
        F: Fn(&FromServer, Option<Payload>) -> Result<Option<Payload>, HttpError> + Send + Sync + 'static,
    {
        let handler: Handler = Arc::new(handler);
        for status in statuses {
            self.when.insert(*status, Arc::clone(&handler));
        }
        self
    }

    /// Handler for any status below 400 without an exact-code handler.
    pub fn success<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&FromServer, Option<Payload>) -> Result<Option<Payload>, HttpError> + Send + Sync + 'static,
    {
        self.success = Some(Arc::new(handler));
        self
    }

    /// Handler for any status of 400 or above without an exact-code handler.
    pub fn failure<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&FromServer, Option<Payload>) -> Result<Option<Payload>, HttpError> + Send + Sync + 'static,
    {
        self.failure = Some(Arc::new(handler));
        self
    }

    pub fn exception<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(HttpError) -> Result<Option<Payload>, HttpError> + Send + Sync + 'static,
    {
        self.exception = Some(Arc::new(handler));
        self
    }

    pub fn set_parser<F>(&mut self, content_type: &str, parser: F) -> &mut Self
    where
        F: Fn(&ConfigNode, &FromServer) -> Result<Payload, HttpError> + Send + Sync + 'static,
    {
        self.parsers.insert(content_type, Arc::new(parser));
        self
    }

    /// Register one parser under several content types at once.
    pub fn set_parser_for<F>(&mut self, content_types: &[&str], parser: F) -> &mut Self
    where
        F: Fn(&ConfigNode, &FromServer) -> Result<Payload, HttpError> + Send + Sync + 'static,
    {
        let parser: Parser = Arc::new(parser);
        self.parsers.insert_all(content_types, &parser);
        self
    }

    pub fn set_parser_arc(&mut self, content_types: &[&str], parser: &Parser) -> &mut Self {
        self.parsers.insert_all(content_types, parser);
        self
    }

    #[must_use]
    pub fn handler_for(&self, status: u16) -> Option<&Handler> {
        self.when.get(&status)
    }

    #[must_use]
    pub fn success_handler(&self) -> Option<&Handler> {
        self.success.as_ref()
    }

    #[must_use]
    pub fn failure_handler(&self) -> Option<&Handler> {
        self.failure.as_ref()
    }

    #[must_use]
    pub fn exception_handler(&self) -> Option<&ExceptionHandler> {
        self.exception.as_ref()
    }

    #[must_use]
    pub fn parsers(&self) -> &Registry<ParserFn> {
        &self.parsers
    }

    #[must_use]
    pub fn parser(&self, content_type: &str) -> Option<&Parser> {
        self.parsers.get(content_type)
    }
}

impl fmt::Debug for ResponseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut codes: Vec<u16> = self.when.keys().copied().collect();
        codes.sort_unstable();
        f.debug_struct("ResponseConfig")
            .field("when", &codes)
            .field("success", &self.success.is_some())
            .field("failure", &self.failure.is_some())
            .field("exception", &self.exception.is_some())
            .field("parsers", &self.parsers)
            .finish()
    }
}
