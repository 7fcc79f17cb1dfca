//! Request half of a configuration node.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;

use crate::auth::Auth;
use crate::config::registry::{Encoder, EncoderFn, Registry};
use crate::config::ConfigNode;
use crate::content_type::ContentTypes;
use crate::cookie::Cookie;
use crate::error::HttpError;
use crate::payload::Payload;
use crate::uri::UriBuilder;

/// Values set at one level of the chain. Unset fields fall back to the
/// parent node when resolved through [`ConfigNode`].
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    uri: UriBuilder,
    content_type: Option<String>,
    charset: Option<String>,
    headers: BTreeMap<String, String>,
    body: Option<Payload>,
    cookies: Vec<Cookie>,
    auth: Option<Auth>,
    encoders: Registry<EncoderFn>,
}

impl RequestConfig {
    #[must_use]
    pub fn uri(&self) -> &UriBuilder {
        &self.uri
    }

    pub fn uri_mut(&mut self) -> &mut UriBuilder {
        &mut self.uri
    }

    /// Set every URI field at this level from an absolute URI.
    ///
    /// # Errors
    /// Returns `HttpError::InvalidUri` if `uri` is not absolute.
    pub fn set_uri(&mut self, uri: &str) -> Result<&mut Self, HttpError> {
        self.uri.set_full(uri)?;
        Ok(self)
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn set_content_type(&mut self, content_type: impl Into<String>) -> &mut Self {
        self.content_type = Some(content_type.into());
        self
    }

    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    pub fn set_charset(&mut self, charset: impl Into<String>) -> &mut Self {
        self.charset = Some(charset.into());
        self
    }

    #[must_use]
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn set_headers<I, K, V>(&mut self, headers: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    #[must_use]
    pub fn body(&self) -> Option<&Payload> {
        self.body.as_ref()
    }

    pub fn set_body<T: Any + Send + Sync>(&mut self, body: T) -> &mut Self {
        self.body = Some(Payload::new(body));
        self
    }

    pub fn set_body_payload(&mut self, body: Payload) -> &mut Self {
        self.body = Some(body);
        self
    }

    /// Serialize `value` to a JSON body and set the JSON content type.
    ///
    /// # Errors
    /// Returns `HttpError::Encode` if `value` cannot be represented as JSON.
    pub fn set_json<T: Serialize>(&mut self, value: &T) -> Result<&mut Self, HttpError> {
        let json = serde_json::to_value(value).map_err(|e| HttpError::Encode(Box::new(e)))?;
        self.body = Some(Payload::new(json));
        self.content_type = Some(ContentTypes::JSON[0].to_string());
        Ok(self)
    }

    /// Set a text body with the `text/plain` content type.
    pub fn set_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.body = Some(Payload::new(text.into()));
        self.content_type = Some(ContentTypes::TEXT[0].to_string());
        self
    }

    /// Set a raw byte body with the `application/octet-stream` content type.
    pub fn set_bytes(&mut self, bytes: impl Into<Bytes>) -> &mut Self {
        self.body = Some(Payload::new(bytes.into()));
        self.content_type = Some(ContentTypes::BINARY[0].to_string());
        self
    }

    #[must_use]
    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    /// Add a cookie, replacing one with the same name at this level.
    pub fn add_cookie(&mut self, cookie: Cookie) -> &mut Self {
        crate::cookie::merge_by_name(&mut self.cookies, [cookie]);
        self
    }

    pub fn cookie(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.add_cookie(Cookie::new(name, value))
    }

    #[must_use]
    pub fn auth(&self) -> Option<&Auth> {
        self.auth.as_ref()
    }

    pub fn set_auth(&mut self, auth: Auth) -> &mut Self {
        self.auth = Some(auth);
        self
    }

    pub fn basic(&mut self, user: impl Into<String>, password: impl Into<String>, preemptive: bool) -> &mut Self {
        self.set_auth(Auth::basic(user, password).preemptive(preemptive))
    }

    pub fn digest(&mut self, user: impl Into<String>, password: impl Into<String>) -> &mut Self {
        self.set_auth(Auth::digest(user, password))
    }

    #[must_use]
    pub fn encoders(&self) -> &Registry<EncoderFn> {
        &self.encoders
    }

    #[must_use]
    pub fn encoder(&self, content_type: &str) -> Option<&Encoder> {
        self.encoders.get(content_type)
    }

    pub fn set_encoder<F>(&mut self, content_type: &str, encoder: F) -> &mut Self
    where
        F: Fn(&ConfigNode, &Payload) -> Result<Bytes, HttpError> + Send + Sync + 'static,
    {
        self.encoders.insert(content_type, Arc::new(encoder));
        self
    }

    /// Register one encoder under several content types at once.
    pub fn set_encoder_for<F>(&mut self, content_types: &[&str], encoder: F) -> &mut Self
    where
        F: Fn(&ConfigNode, &Payload) -> Result<Bytes, HttpError> + Send + Sync + 'static,
    {
        let encoder: Encoder = Arc::new(encoder);
        self.encoders.insert_all(content_types, &encoder);
        self
    }

    pub fn set_encoder_arc(&mut self, content_types: &[&str], encoder: &Encoder) -> &mut Self {
        self.encoders.insert_all(content_types, encoder);
        self
    }
}
