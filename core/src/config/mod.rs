//! Chained request/response configuration.
//!
//! # Design
//! A [`ConfigNode`] is one level of configuration: the library root, a
//! client, or a single request. Each node owns a [`NodeConfig`] holding only
//! the values set at that level and keeps a shared, read-only link to its
//! parent. The `actual_*` getters on the node resolve effective values by
//! walking toward the root; headers, cookies and query parameters merge
//! across levels instead of short-circuiting.

mod node;
mod registry;
mod request;
mod response;
mod root;
mod status;

use std::collections::HashMap;

pub use node::{Concurrency, ConfigNode};
pub use registry::{Encoder, EncoderFn, Parser, ParserFn, Registry};
pub use request::RequestConfig;
pub use response::{ExceptionFn, ExceptionHandler, Handler, HandlerFn, ResponseConfig};
pub use root::library_root;
pub use status::{resolve_handler, StatusMatch};

use crate::payload::Payload;

/// Everything set at one level of the chain.
#[derive(Debug, Clone, Default)]
pub struct NodeConfig {
    pub request: RequestConfig,
    pub response: ResponseConfig,
    context: HashMap<(String, String), Payload>,
}

impl NodeConfig {
    /// Store an auxiliary object for encoders/parsers of `content_type`.
    pub fn set_context<T>(&mut self, content_type: &str, id: &str, value: T) -> &mut Self
    where
        T: std::any::Any + Send + Sync,
    {
        self.context
            .insert((content_type.to_string(), id.to_string()), Payload::new(value));
        self
    }

    #[must_use]
    pub fn context(&self, content_type: &str, id: &str) -> Option<&Payload> {
        self.context
            .get(&(content_type.to_string(), id.to_string()))
    }
}
