//! Blocking transport backed by [`ureq`].
//!
//! Basic credentials that are not preemptive are sent only after the server
//! answers `401` with a Basic challenge, and only once. Digest is not
//! supported and is reported as a configuration error.

use std::io::Read as _;
use std::time::Duration;

use bytes::Bytes;
use tracing::debug;

use crate::auth::AuthKind;
use crate::error::{ConfigError, HttpError};
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::Transport;

#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    /// Transport with no global timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(None)
    }

    #[must_use]
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(timeout)
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }

    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, HttpError> {
        let mut builder = http::Request::builder()
            .method(http::Method::from(request.method))
            .uri(request.uri.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let result = match &request.body {
            Some(body) => {
                let req = builder
                    .body(body.to_vec())
                    .map_err(|e| HttpError::Transport(Box::new(e)))?;
                self.agent.run(req)
            }
            None => {
                let req = builder
                    .body(())
                    .map_err(|e| HttpError::Transport(Box::new(e)))?;
                self.agent.run(req)
            }
        };

        let response = result.map_err(|e| HttpError::Transport(Box::new(e)))?;
        convert_response(response)
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        if let Some(auth) = &request.auth {
            if auth.kind == AuthKind::Digest {
                return Err(ConfigError::UnsupportedAuth(auth.kind.to_string()).into());
            }
        }

        let response = self.send(&request)?;
        match challenge_retry(&request, &response) {
            Some(retry) => {
                debug!(uri = %request.uri, "answering Basic challenge");
                self.send(&retry)
            }
            None => Ok(response),
        }
    }
}

/// The request to resend with credentials after a Basic `401` challenge.
fn challenge_retry(request: &HttpRequest, response: &HttpResponse) -> Option<HttpRequest> {
    let auth = request.auth.as_ref()?;
    if response.status != 401 || auth.kind != AuthKind::Basic || request.header("authorization").is_some() {
        return None;
    }
    let basic_challenge = response
        .header_values("www-authenticate")
        .any(|v| v.trim_start().to_ascii_lowercase().starts_with("basic"));
    if !basic_challenge {
        return None;
    }
    let mut retry = request.clone();
    retry
        .headers
        .push(("Authorization".to_string(), auth.basic_header_value()));
    Some(retry)
}

fn convert_response(response: http::Response<ureq::Body>) -> Result<HttpResponse, HttpError> {
    let (parts, body) = response.into_parts();

    let mut body_bytes = Vec::new();
    body.into_reader()
        .read_to_end(&mut body_bytes)
        .map_err(|e| HttpError::Transport(Box::new(e)))?;

    let headers = parts
        .headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    Ok(HttpResponse {
        status: parts.status.as_u16(),
        message: parts.status.canonical_reason().unwrap_or_default().to_string(),
        headers,
        body: Bytes::from(body_bytes),
    })
}
