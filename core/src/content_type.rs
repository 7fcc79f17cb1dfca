//! Content type groups and `Content-Type` header helpers.

/// Well-known content types, grouped the way codecs are usually registered.
pub struct ContentTypes;

impl ContentTypes {
    pub const ANY: &'static [&'static str] = &["*/*"];
    pub const TEXT: &'static [&'static str] = &["text/plain"];
    pub const BINARY: &'static [&'static str] = &["application/octet-stream"];
    pub const URLENC: &'static [&'static str] = &["application/x-www-form-urlencoded"];
    pub const JSON: &'static [&'static str] =
        &["application/json", "application/javascript", "text/javascript"];
    pub const XML: &'static [&'static str] = &[
        "application/xml",
        "text/xml",
        "application/xhtml+xml",
        "application/atom+xml",
    ];
    pub const HTML: &'static [&'static str] = &["text/html"];
}

/// Content type assumed for responses without a `Content-Type` header and for
/// request bodies with no content type configured.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Charset assumed when none is given.
pub const DEFAULT_CHARSET: &str = "UTF-8";

/// Media type without parameters, trimmed. Case is kept, so the result can
/// be used as a registry key exactly as it was configured.
#[must_use]
pub fn media_type(header: &str) -> &str {
    header.split(';').next().unwrap_or_default().trim()
}

/// Media type without parameters, trimmed and lowercased.
#[must_use]
pub fn base_type(header: &str) -> String {
    media_type(header).to_ascii_lowercase()
}

/// Value of the `charset` parameter, unquoted.
#[must_use]
pub fn charset_param(header: &str) -> Option<String> {
    header.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_string())
    })
}

/// Whether a charset parameter is meaningful for this media type.
#[must_use]
pub fn is_textual(content_type: &str) -> bool {
    let content_type = content_type.to_ascii_lowercase();
    let content_type = content_type.as_str();
    content_type.starts_with("text/")
        || ContentTypes::JSON.contains(&content_type)
        || ContentTypes::URLENC.contains(&content_type)
        || ContentTypes::XML.contains(&content_type)
}

/// `Content-Type` request header value, with a charset for textual types.
#[must_use]
pub fn header_value(content_type: &str, charset: Option<&str>) -> String {
    match charset {
        Some(cs) if is_textual(content_type) => format!("{content_type}; charset={cs}"),
        _ => content_type.to_string(),
    }
}
