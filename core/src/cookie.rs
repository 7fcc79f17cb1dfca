//! Cookies configured on the chain and the client-wide cookie store.
//!
//! `Set-Cookie` parsing is delegated to the [`cookie`] crate; only the
//! name, value and effective expiry are kept.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use tracing::{trace, warn};

/// An immutable cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    name: String,
    value: String,
    expires: Option<SystemTime>,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            expires: None,
        }
    }

    pub fn with_expiry(name: impl Into<String>, value: impl Into<String>, expires: SystemTime) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            expires: Some(expires),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub fn expires(&self) -> Option<SystemTime> {
        self.expires
    }

    #[must_use]
    pub fn is_expired(&self, now: SystemTime) -> bool {
        self.expires.is_some_and(|at| at <= now)
    }

    /// Parse a `Set-Cookie` header value. `Max-Age` wins over `Expires`.
    #[must_use]
    pub fn parse_set_cookie(header: &str, now: SystemTime) -> Option<Cookie> {
        let parsed = match cookie::Cookie::parse(header) {
            Ok(c) => c,
            Err(err) => {
                warn!(header_value = %header, error = %err, "failed to parse Set-Cookie header");
                return None;
            }
        };

        let expires = match parsed.max_age() {
            Some(max_age) => match Duration::try_from(max_age) {
                // past the representable range: no practical expiry
                Ok(d) => now.checked_add(d),
                // negative Max-Age means "delete now"
                Err(_) => Some(UNIX_EPOCH),
            },
            None => parsed
                .expires_datetime()
                .map(|at: time::OffsetDateTime| SystemTime::from(at)),
        };

        Some(Cookie {
            name: parsed.name().to_string(),
            value: parsed.value().to_string(),
            expires,
        })
    }
}

/// Merge `overrides` into `base` by name, replacing in place so the first
/// position of a name is kept.
pub(crate) fn merge_by_name(base: &mut Vec<Cookie>, overrides: impl IntoIterator<Item = Cookie>) {
    for cookie in overrides {
        match base.iter_mut().find(|c| c.name == cookie.name) {
            Some(slot) => *slot = cookie,
            None => base.push(cookie),
        }
    }
}

/// `Cookie` request header value for the unexpired cookies, if any.
pub(crate) fn cookie_header(cookies: &[Cookie], now: SystemTime) -> Option<String> {
    let pairs: Vec<String> = cookies
        .iter()
        .filter(|c| !c.is_expired(now))
        .map(|c| format!("{}={}", c.name, c.value))
        .collect();
    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join("; "))
    }
}

/// Client-wide cookie store keyed by cookie name.
///
/// Safe to share between in-flight requests. Storing a cookie replaces any
/// previous cookie with the same name; storing an expired cookie removes it.
#[derive(Debug, Default)]
pub struct CookieStore {
    cookies: DashMap<String, Cookie>,
}

impl CookieStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store<I>(&self, cookies: I, now: SystemTime)
    where
        I: IntoIterator<Item = Cookie>,
    {
        for cookie in cookies {
            if cookie.is_expired(now) {
                trace!(name = %cookie.name, "removing expired cookie from store");
                self.cookies.remove(&cookie.name);
            } else {
                trace!(name = %cookie.name, "storing cookie");
                self.cookies.insert(cookie.name.clone(), cookie);
            }
        }
    }

    /// Unexpired cookies, sorted by name.
    #[must_use]
    pub fn cookies(&self, now: SystemTime) -> Vec<Cookie> {
        let mut out: Vec<Cookie> = self
            .cookies
            .iter()
            .filter(|entry| !entry.value().is_expired(now))
            .map(|entry| entry.value().clone())
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn clear(&self) {
        self.cookies.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(1_700_000_000)
    }

    #[test]
    fn parse_plain_set_cookie() {
        let c = Cookie::parse_set_cookie("session=abc123; Path=/; HttpOnly", now()).unwrap();
        assert_eq!(c.name(), "session");
        assert_eq!(c.value(), "abc123");
        assert_eq!(c.expires(), None);
    }

    #[test]
    fn max_age_sets_expiry_relative_to_now() {
        let c = Cookie::parse_set_cookie("a=1; Max-Age=60", now()).unwrap();
        assert_eq!(c.expires(), Some(now() + Duration::from_secs(60)));
        assert!(!c.is_expired(now()));
        assert!(c.is_expired(now() + Duration::from_secs(61)));
    }

    #[test]
    fn huge_max_age_never_expires() {
        let c = Cookie::parse_set_cookie("a=1; Max-Age=99999999999999999999", SystemTime::now()).unwrap();
        assert_eq!(c.value(), "1");
        assert!(!c.is_expired(SystemTime::now()));

        let c = Cookie::parse_set_cookie("a=1; Max-Age=9223372036854775807", now()).unwrap();
        assert!(!c.is_expired(now()));
    }

    #[test]
    fn negative_max_age_expires_immediately() {
        let c = Cookie::parse_set_cookie("a=1; Max-Age=-1", now()).unwrap();
        assert!(c.is_expired(now()));
    }

    #[test]
    fn expires_attribute_is_parsed() {
        let c = Cookie::parse_set_cookie("a=1; Expires=Wed, 21 Oct 2015 07:28:00 GMT", now()).unwrap();
        let expected = time::OffsetDateTime::from_unix_timestamp(1_445_412_480).unwrap();
        assert_eq!(c.expires(), Some(SystemTime::from(expected)));
        assert!(c.is_expired(now()));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(Cookie::parse_set_cookie("", now()).is_none());
    }

    #[test]
    fn merge_replaces_by_name_and_keeps_position() {
        let mut base = vec![Cookie::new("a", "1"), Cookie::new("b", "2")];
        merge_by_name(&mut base, vec![Cookie::new("a", "9"), Cookie::new("c", "3")]);
        let pairs: Vec<(&str, &str)> = base.iter().map(|c| (c.name(), c.value())).collect();
        assert_eq!(pairs, [("a", "9"), ("b", "2"), ("c", "3")]);
    }

    #[test]
    fn header_skips_expired() {
        let cookies = vec![
            Cookie::new("a", "1"),
            Cookie::with_expiry("old", "x", now() - Duration::from_secs(1)),
            Cookie::new("b", "2"),
        ];
        assert_eq!(cookie_header(&cookies, now()).as_deref(), Some("a=1; b=2"));
        assert_eq!(cookie_header(&[], now()), None);
    }

    #[test]
    fn store_deduplicates_by_name() {
        let store = CookieStore::new();
        store.store(vec![Cookie::new("id", "1"), Cookie::new("theme", "dark")], now());
        store.store(vec![Cookie::new("id", "2")], now());
        assert_eq!(store.len(), 2);
        let values: Vec<(String, String)> = store
            .cookies(now())
            .into_iter()
            .map(|c| (c.name().to_string(), c.value().to_string()))
            .collect();
        assert_eq!(values, [("id".to_string(), "2".to_string()), ("theme".to_string(), "dark".to_string())]);
    }

    #[test]
    fn storing_expired_cookie_removes_it() {
        let store = CookieStore::new();
        store.store(vec![Cookie::new("id", "1")], now());
        store.store(vec![Cookie::with_expiry("id", "", UNIX_EPOCH)], now());
        assert!(store.is_empty());
    }
}
