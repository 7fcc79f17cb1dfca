//! Client settings loadable from configuration files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::NodeConfig;
use crate::error::HttpError;

/// Declarative client-level settings.
///
/// Every field is optional; unset fields leave the client node (and so the
/// library defaults) untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Absolute URI every request starts from.
    pub base_uri: Option<String>,
    /// Headers sent with every request.
    pub headers: BTreeMap<String, String>,
    /// Content type for request bodies that do not set one.
    pub content_type: Option<String>,
    pub charset: Option<String>,
    /// Upper bound on concurrently running async requests.
    pub max_concurrency: Option<usize>,
    /// Keep cookies from successful responses and send them back.
    pub cookies_enabled: Option<bool>,
}

impl ClientSettings {
    /// # Errors
    /// `HttpError::Parse` when `json` is not a valid settings document.
    pub fn from_json(json: &str) -> Result<Self, HttpError> {
        serde_json::from_str(json).map_err(|e| HttpError::Parse(Box::new(e)))
    }

    /// Write the node-level fields into `config`.
    ///
    /// # Errors
    /// `HttpError::InvalidUri` when `base_uri` cannot be parsed.
    pub fn apply(&self, config: &mut NodeConfig) -> Result<(), HttpError> {
        if let Some(uri) = &self.base_uri {
            config.request.set_uri(uri)?;
        }
        config
            .request
            .set_headers(self.headers.iter().map(|(k, v)| (k.clone(), v.clone())));
        if let Some(ct) = &self.content_type {
            config.request.set_content_type(ct.clone());
        }
        if let Some(charset) = &self.charset {
            config.request.set_charset(charset.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_default() {
        let settings = ClientSettings::from_json(r#"{"base_uri": "http://example.com/v1"}"#).unwrap();
        assert_eq!(settings.base_uri.as_deref(), Some("http://example.com/v1"));
        assert!(settings.headers.is_empty());
        assert_eq!(settings.max_concurrency, None);
        assert_eq!(settings.cookies_enabled, None);
    }

    #[test]
    fn apply_sets_node_fields() {
        let settings = ClientSettings::from_json(
            r#"{
                "base_uri": "https://api.example.com/v2?key=abc",
                "headers": {"Accept": "application/json"},
                "content_type": "application/json",
                "charset": "ISO-8859-1"
            }"#,
        )
        .unwrap();
        let mut config = NodeConfig::default();
        settings.apply(&mut config).unwrap();
        assert_eq!(config.request.headers()["Accept"], "application/json");
        assert_eq!(config.request.content_type(), Some("application/json"));
        assert_eq!(config.request.charset(), Some("ISO-8859-1"));
        assert_eq!(
            config.request.uri().to_uri().unwrap(),
            "https://api.example.com/v2?key=abc"
        );
    }

    #[test]
    fn bad_base_uri_is_rejected() {
        let settings = ClientSettings {
            base_uri: Some("::not a uri".into()),
            ..ClientSettings::default()
        };
        let err = settings.apply(&mut NodeConfig::default()).unwrap_err();
        assert!(matches!(err, HttpError::InvalidUri { .. }));
    }

    #[test]
    fn malformed_document_is_parse_error() {
        assert!(matches!(
            ClientSettings::from_json("{\"max_concurrency\": \"many\"}"),
            Err(HttpError::Parse(_))
        ));
    }
}
