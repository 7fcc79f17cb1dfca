//! Response envelope handed to parsers and status handlers.

use std::time::SystemTime;

use bytes::Bytes;

use crate::content_type::{self, DEFAULT_CHARSET, DEFAULT_CONTENT_TYPE};
use crate::cookie::Cookie;
use crate::http::HttpResponse;

/// A transport response plus the values derived from its headers.
#[derive(Debug, Clone)]
pub struct FromServer {
    uri: String,
    response: HttpResponse,
    content_type: String,
    charset: String,
}

impl FromServer {
    pub fn new(uri: impl Into<String>, response: HttpResponse) -> Self {
        let header = response.header("content-type");
        let content_type = header
            .map(content_type::base_type)
            .filter(|ct| !ct.is_empty())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
        let charset = header
            .and_then(content_type::charset_param)
            .unwrap_or_else(|| DEFAULT_CHARSET.to_string());
        Self {
            uri: uri.into(),
            response,
            content_type,
            charset,
        }
    }

    /// URI the request was sent to.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.response.status
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.response.message
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.response.status < 400
    }

    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.response.headers
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.response.header(name)
    }

    /// Media type of the body without parameters, `application/octet-stream`
    /// when the server sent none.
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Charset from the `Content-Type` header, `UTF-8` when absent.
    #[must_use]
    pub fn charset(&self) -> &str {
        &self.charset
    }

    #[must_use]
    pub fn has_body(&self) -> bool {
        !self.response.body.is_empty()
    }

    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.response.body
    }

    /// Cookies from `Set-Cookie` headers; unparsable headers are skipped.
    #[must_use]
    pub fn cookies(&self, now: SystemTime) -> Vec<Cookie> {
        self.response
            .header_values("set-cookie")
            .filter_map(|h| Cookie::parse_set_cookie(h, now))
            .collect()
    }

    #[must_use]
    pub fn into_response(self) -> HttpResponse {
        self.response
    }
}
