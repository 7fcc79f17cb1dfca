//! Authentication descriptors attached to a request.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthKind {
    Basic,
    Digest,
}

impl fmt::Display for AuthKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthKind::Basic => f.write_str("Basic"),
            AuthKind::Digest => f.write_str("Digest"),
        }
    }
}

/// Credentials plus the scheme used to present them.
///
/// With `preemptive` set, Basic credentials are sent on the first request
/// instead of waiting for a `401` challenge.
#[derive(Clone, PartialEq, Eq)]
pub struct Auth {
    pub kind: AuthKind,
    pub user: String,
    pub password: String,
    pub preemptive: bool,
}

impl Auth {
    pub fn basic(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            kind: AuthKind::Basic,
            user: user.into(),
            password: password.into(),
            preemptive: false,
        }
    }

    pub fn digest(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            kind: AuthKind::Digest,
            user: user.into(),
            password: password.into(),
            preemptive: false,
        }
    }

    #[must_use]
    pub fn preemptive(mut self, preemptive: bool) -> Self {
        self.preemptive = preemptive;
        self
    }

    /// `Authorization` header value for Basic credentials.
    #[must_use]
    pub fn basic_header_value(&self) -> String {
        let token = STANDARD.encode(format!("{}:{}", self.user, self.password));
        format!("Basic {token}")
    }
}

// Keep passwords out of logs.
impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth")
            .field("kind", &self.kind)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("preemptive", &self.preemptive)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_header_is_base64_of_user_colon_password() {
        let auth = Auth::basic("Aladdin", "open sesame");
        assert_eq!(auth.basic_header_value(), "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==");
        assert!(!auth.preemptive);
        assert!(auth.clone().preemptive(true).preemptive);
    }

    #[test]
    fn debug_redacts_password() {
        let dbg = format!("{:?}", Auth::digest("u", "hunter2"));
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("Digest"));
    }
}
