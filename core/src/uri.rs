//! Parent-linked URI builder.
//!
//! Each field resolves independently to the nearest value set on this builder
//! or one of its ancestors. Query parameters are the exception: every level
//! contributes, and a child replaces a parent's values only for the keys it
//! sets itself.

use std::collections::BTreeMap;
use std::iter;
use std::sync::Arc;

use url::form_urlencoded;
use url::Url;

use crate::error::HttpError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UriBuilder {
    parent: Option<Arc<UriBuilder>>,
    scheme: Option<String>,
    user_info: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    path: Option<String>,
    query: BTreeMap<String, Vec<String>>,
    fragment: Option<String>,
    raw: Option<String>,
}

impl UriBuilder {
    /// A builder with no parent and no fields set. `to_uri()` yields `""`.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// A builder whose unset fields fall back to `parent`.
    #[must_use]
    pub fn child(parent: &Arc<UriBuilder>) -> Self {
        Self {
            parent: Some(Arc::clone(parent)),
            ..Self::default()
        }
    }

    /// Copy of this builder's local fields re-linked under `parent`.
    pub(crate) fn relinked(&self, parent: Option<Arc<UriBuilder>>) -> Self {
        Self {
            parent,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn parent(&self) -> Option<&Arc<UriBuilder>> {
        self.parent.as_ref()
    }

    pub fn set_scheme(&mut self, scheme: impl Into<String>) -> &mut Self {
        self.scheme = Some(scheme.into());
        self
    }

    pub fn set_user_info(&mut self, user_info: impl Into<String>) -> &mut Self {
        self.user_info = Some(user_info.into());
        self
    }

    pub fn set_host(&mut self, host: impl Into<String>) -> &mut Self {
        self.host = Some(host.into());
        self
    }

    pub fn set_port(&mut self, port: u16) -> &mut Self {
        self.port = Some(port);
        self
    }

    pub fn set_path(&mut self, path: impl Into<String>) -> &mut Self {
        self.path = Some(path.into());
        self
    }

    /// Replace the values for `key` at this level.
    pub fn set_query(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.query.insert(key.into(), vec![value.into()]);
        self
    }

    /// Append another value for `key` at this level.
    pub fn add_query(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.query.entry(key.into()).or_default().push(value.into());
        self
    }

    pub fn set_fragment(&mut self, fragment: impl Into<String>) -> &mut Self {
        self.fragment = Some(fragment.into());
        self
    }

    /// Use `raw` verbatim, bypassing field merging and percent-encoding.
    pub fn set_raw(&mut self, raw: impl Into<String>) -> &mut Self {
        self.raw = Some(raw.into());
        self
    }

    /// Split an absolute URI into fields set at this level.
    ///
    /// The query is decoded into pairs and re-encoded by [`to_uri`](Self::to_uri)
    /// as form data: `%20` comes back as `+` and a key without a value gains a
    /// trailing `=`. Use [`set_raw`](Self::set_raw) to send a URI unchanged.
    ///
    /// # Errors
    /// Returns `HttpError::InvalidUri` if `full` is not an absolute URI.
    pub fn set_full(&mut self, full: &str) -> Result<&mut Self, HttpError> {
        let url = Url::parse(full).map_err(|e| HttpError::invalid_uri(full, e.to_string()))?;
        self.scheme = Some(url.scheme().to_string());
        self.host = url.host_str().map(str::to_string);
        self.port = url.port();
        self.user_info = match (url.username(), url.password()) {
            ("", None) => None,
            (user, None) => Some(user.to_string()),
            (user, Some(pass)) => Some(format!("{user}:{pass}")),
        };
        self.path = Some(url.path().to_string());
        self.query = BTreeMap::new();
        for (k, v) in url.query_pairs() {
            self.query.entry(k.into_owned()).or_default().push(v.into_owned());
        }
        self.fragment = url.fragment().map(str::to_string);
        Ok(self)
    }

    fn levels(&self) -> impl Iterator<Item = &UriBuilder> {
        iter::successors(Some(self), |b| b.parent.as_deref())
    }

    fn nearest<T>(&self, field: impl Fn(&UriBuilder) -> Option<&T>) -> Option<&T>
    where
        T: ?Sized,
    {
        self.levels().find_map(field)
    }

    #[must_use]
    pub fn scheme(&self) -> Option<&str> {
        self.nearest(|b| b.scheme.as_deref())
    }

    #[must_use]
    pub fn user_info(&self) -> Option<&str> {
        self.nearest(|b| b.user_info.as_deref())
    }

    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.nearest(|b| b.host.as_deref())
    }

    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.nearest(|b| b.port.as_ref()).copied()
    }

    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.nearest(|b| b.path.as_deref())
    }

    #[must_use]
    pub fn fragment(&self) -> Option<&str> {
        self.nearest(|b| b.fragment.as_deref())
    }

    #[must_use]
    pub fn raw(&self) -> Option<&str> {
        self.nearest(|b| b.raw.as_deref())
    }

    /// Query parameters merged root to leaf.
    #[must_use]
    pub fn query(&self) -> BTreeMap<String, Vec<String>> {
        let levels: Vec<&UriBuilder> = self.levels().collect();
        let mut merged = BTreeMap::new();
        for level in levels.into_iter().rev() {
            for (k, v) in &level.query {
                merged.insert(k.clone(), v.clone());
            }
        }
        merged
    }

    /// Materialize the merged URI.
    ///
    /// With nothing set the result is the empty relative reference `""`.
    /// A raw override is returned untouched.
    ///
    /// # Errors
    /// Returns `HttpError::InvalidUri` when a scheme, port or user-info is set
    /// without a host, when a host has no scheme, or when the parts do not
    /// form a valid URI.
    pub fn to_uri(&self) -> Result<String, HttpError> {
        if let Some(raw) = self.raw() {
            return Ok(raw.to_string());
        }

        let query = self.query();
        let (scheme, host) = (self.scheme(), self.host());

        if scheme.is_none() && host.is_none() && self.user_info().is_none() && self.port().is_none() {
            return Ok(relative_reference(self.path(), &query, self.fragment()));
        }

        let Some(host) = host else {
            return Err(HttpError::invalid_uri(self.describe(), "missing host"));
        };
        let Some(scheme) = scheme else {
            return Err(HttpError::invalid_uri(self.describe(), "missing scheme"));
        };

        let base = format!("{scheme}://{host}");
        let mut url = Url::parse(&base).map_err(|e| HttpError::invalid_uri(&base, e.to_string()))?;

        if let Some(user_info) = self.user_info() {
            let (user, pass) = match user_info.split_once(':') {
                Some((u, p)) => (u, Some(p)),
                None => (user_info, None),
            };
            url.set_username(user)
                .and_then(|()| url.set_password(pass))
                .map_err(|()| HttpError::invalid_uri(&base, "user info not allowed for this scheme"))?;
        }
        if let Some(port) = self.port() {
            url.set_port(Some(port))
                .map_err(|()| HttpError::invalid_uri(&base, "port not allowed for this scheme"))?;
        }
        if let Some(path) = self.path() {
            url.set_path(path);
        }
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, values) in &query {
                for v in values {
                    pairs.append_pair(k, v);
                }
            }
        }
        if let Some(fragment) = self.fragment() {
            url.set_fragment(Some(fragment));
        }
        Ok(url.into())
    }

    /// Materialize the merged URI and require it to be absolute.
    ///
    /// # Errors
    /// Returns `HttpError::InvalidUri` for anything `to_uri` rejects and for
    /// relative references.
    pub fn to_url(&self) -> Result<Url, HttpError> {
        let uri = self.to_uri()?;
        Url::parse(&uri).map_err(|e| HttpError::invalid_uri(uri, e.to_string()))
    }

    fn describe(&self) -> String {
        format!(
            "scheme={:?} user_info={:?} host={:?} port={:?} path={:?}",
            self.scheme(),
            self.user_info().map(|_| "<set>"),
            self.host(),
            self.port(),
            self.path()
        )
    }
}

fn relative_reference(
    path: Option<&str>,
    query: &BTreeMap<String, Vec<String>>,
    fragment: Option<&str>,
) -> String {
    let mut out = path.unwrap_or_default().to_string();
    if !query.is_empty() {
        let mut ser = form_urlencoded::Serializer::new(String::new());
        for (k, values) in query {
            for v in values {
                ser.append_pair(k, v);
            }
        }
        out.push('?');
        out.push_str(&ser.finish());
    }
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}
