//! Content-type keyed tables of encoders and parsers.
//!
//! Keys are matched exactly; there is no wildcard or suffix matching. Chain
//! lookup lives on [`ConfigNode`], which asks each level's registry in turn.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::config::ConfigNode;
use crate::error::HttpError;
use crate::from_server::FromServer;
use crate::payload::Payload;

/// Turns a request body into bytes. Receives the request node so it can read
/// the charset or a context object.
pub type EncoderFn = dyn Fn(&ConfigNode, &Payload) -> Result<Bytes, HttpError> + Send + Sync;
pub type Encoder = Arc<EncoderFn>;

/// Turns a response body into a value handed to the status handler.
pub type ParserFn = dyn Fn(&ConfigNode, &FromServer) -> Result<Payload, HttpError> + Send + Sync;
pub type Parser = Arc<ParserFn>;

pub struct Registry<F: ?Sized> {
    entries: HashMap<String, Arc<F>>,
}

impl<F: ?Sized> Registry<F> {
    #[must_use]
    pub fn get(&self, content_type: &str) -> Option<&Arc<F>> {
        self.entries.get(content_type)
    }

    pub fn insert(&mut self, content_type: impl Into<String>, f: Arc<F>) {
        self.entries.insert(content_type.into(), f);
    }

    /// Register the same function under every key.
    pub fn insert_all(&mut self, content_types: &[&str], f: &Arc<F>) {
        for ct in content_types {
            self.entries.insert((*ct).to_string(), Arc::clone(f));
        }
    }

    pub fn remove(&mut self, content_type: &str) -> Option<Arc<F>> {
        self.entries.remove(content_type)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered content types, sorted.
    #[must_use]
    pub fn content_types(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

impl<F: ?Sized> Default for Registry<F> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<F: ?Sized> Clone for Registry<F> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<F: ?Sized> fmt::Debug for Registry<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.content_types()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upper() -> Encoder {
        Arc::new(|_: &ConfigNode, body: &Payload| {
            let s = body.downcast_ref::<String>().cloned().unwrap_or_default();
            Ok::<_, HttpError>(Bytes::from(s.to_uppercase()))
        })
    }

    #[test]
    fn insert_all_shares_one_function() {
        let mut reg: Registry<EncoderFn> = Registry::default();
        let enc = upper();
        reg.insert_all(&["application/json", "text/javascript"], &enc);
        let a = reg.get("application/json").unwrap();
        let b = reg.get("text/javascript").unwrap();
        assert!(Arc::ptr_eq(a, b));
        assert!(Arc::ptr_eq(a, &enc));
        assert_eq!(reg.content_types(), ["application/json", "text/javascript"]);
    }

    #[test]
    fn lookup_is_exact() {
        let mut reg: Registry<EncoderFn> = Registry::default();
        reg.insert("application/json", upper());
        assert!(reg.get("application/json").is_some());
        assert!(reg.get("application/json; charset=utf-8").is_none());
        assert!(reg.get("application/*").is_none());
        assert!(reg.remove("application/json").is_some());
        assert!(reg.is_empty());
    }
}
