//! Built-in encoders and parsers plus the capability table the library root
//! is populated from.
//!
//! # Design
//! Optional codecs are gated by a probe instead of being registered
//! unconditionally. A probe is a pure function (today a cargo feature check),
//! so evaluating it again is harmless. A codec whose probe says no is simply
//! left out; that is not an error.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::config::{ConfigNode, Encoder, NodeConfig, Parser};
use crate::content_type::ContentTypes;
use crate::error::HttpError;
use crate::from_server::FromServer;
use crate::payload::Payload;

pub type EncodeFn = fn(&ConfigNode, &Payload) -> Result<Bytes, HttpError>;
pub type ParseFn = fn(&ConfigNode, &FromServer) -> Result<Payload, HttpError>;

/// One optional codec: registered under `content_types` when `probe` says
/// its dependency is available.
#[derive(Clone, Copy)]
pub struct Capability {
    pub name: &'static str,
    pub probe: fn() -> bool,
    pub content_types: &'static [&'static str],
    pub encoder: Option<EncodeFn>,
    pub parser: Option<ParseFn>,
}

pub const CAPABILITIES: &[Capability] = &[
    Capability {
        name: "binary",
        probe: always,
        content_types: ContentTypes::BINARY,
        encoder: Some(encode_binary),
        parser: Some(parse_binary),
    },
    Capability {
        name: "text",
        probe: always,
        content_types: ContentTypes::TEXT,
        encoder: Some(encode_text),
        parser: Some(parse_text),
    },
    Capability {
        name: "xml-as-text",
        probe: always,
        content_types: ContentTypes::XML,
        encoder: Some(encode_text),
        parser: Some(parse_text),
    },
    Capability {
        name: "html-as-text",
        probe: always,
        content_types: ContentTypes::HTML,
        encoder: Some(encode_text),
        parser: Some(parse_text),
    },
    Capability {
        name: "form",
        probe: form_available,
        content_types: ContentTypes::URLENC,
        encoder: Some(encode_form),
        parser: Some(parse_form),
    },
    Capability {
        name: "json",
        probe: json_available,
        content_types: ContentTypes::JSON,
        encoder: Some(encode_json),
        parser: Some(parse_json),
    },
];

fn always() -> bool {
    true
}

fn json_available() -> bool {
    cfg!(feature = "json")
}

fn form_available() -> bool {
    cfg!(feature = "form")
}

/// Register every available capability into `config`.
pub fn install(config: &mut NodeConfig, capabilities: &[Capability]) {
    for cap in capabilities {
        if !(cap.probe)() {
            debug!(codec = cap.name, "codec not available, skipping");
            continue;
        }
        if let Some(encode) = cap.encoder {
            let encoder: Encoder = Arc::new(encode);
            config.request.set_encoder_arc(cap.content_types, &encoder);
        }
        if let Some(parse) = cap.parser {
            let parser: Parser = Arc::new(parse);
            config.response.set_parser_arc(cap.content_types, &parser);
        }
        debug!(codec = cap.name, content_types = ?cap.content_types, "registered codec");
    }
}

fn unsupported(codec: &str, body: &Payload) -> HttpError {
    HttpError::Encode(format!("{codec} encoder cannot encode a body of type {}", body.type_name()).into())
}

fn as_bytes(body: &Payload) -> Option<Bytes> {
    if let Some(b) = body.downcast_ref::<Bytes>() {
        return Some(b.clone());
    }
    if let Some(v) = body.downcast_ref::<Vec<u8>>() {
        return Some(Bytes::from(v.clone()));
    }
    if let Some(s) = body.downcast_ref::<&'static [u8]>() {
        return Some(Bytes::from_static(s));
    }
    as_text(body).map(Bytes::from)
}

fn as_text(body: &Payload) -> Option<String> {
    if let Some(s) = body.downcast_ref::<String>() {
        return Some(s.clone());
    }
    body.downcast_ref::<&'static str>().map(|s| (*s).to_string())
}

/// Encodes `Bytes`, `Vec<u8>`, `&'static [u8]` and strings as-is.
pub fn encode_binary(_: &ConfigNode, body: &Payload) -> Result<Bytes, HttpError> {
    as_bytes(body).ok_or_else(|| unsupported("binary", body))
}

/// Encodes strings; the charset is always written as UTF-8.
pub fn encode_text(node: &ConfigNode, body: &Payload) -> Result<Bytes, HttpError> {
    if let Some(charset) = node.actual_charset() {
        if !charset.eq_ignore_ascii_case("utf-8") {
            warn!(%charset, "only UTF-8 text bodies are supported, encoding as UTF-8");
        }
    }
    as_text(body)
        .map(Bytes::from)
        .ok_or_else(|| unsupported("text", body))
}

/// Encodes `serde_json::Value`, or passes through strings assumed to be JSON.
pub fn encode_json(_: &ConfigNode, body: &Payload) -> Result<Bytes, HttpError> {
    if let Some(value) = body.downcast_ref::<serde_json::Value>() {
        return serde_json::to_vec(value)
            .map(Bytes::from)
            .map_err(|e| HttpError::Encode(Box::new(e)));
    }
    as_bytes(body).ok_or_else(|| unsupported("json", body))
}

/// Encodes pair lists and string maps; a string is taken as already encoded.
pub fn encode_form(_: &ConfigNode, body: &Payload) -> Result<Bytes, HttpError> {
    let encoded = if let Some(pairs) = body.downcast_ref::<Vec<(String, String)>>() {
        serde_urlencoded::to_string(pairs)
    } else if let Some(map) = body.downcast_ref::<BTreeMap<String, String>>() {
        serde_urlencoded::to_string(map)
    } else if let Some(map) = body.downcast_ref::<HashMap<String, String>>() {
        serde_urlencoded::to_string(map)
    } else {
        return as_text(body)
            .map(Bytes::from)
            .ok_or_else(|| unsupported("form", body));
    };
    encoded
        .map(Bytes::from)
        .map_err(|e| HttpError::Encode(Box::new(e)))
}

/// Raw body as `Bytes`.
pub fn parse_binary(_: &ConfigNode, from_server: &FromServer) -> Result<Payload, HttpError> {
    Ok(Payload::new(from_server.body().clone()))
}

/// Body as a `String`. Invalid UTF-8 is replaced rather than rejected.
pub fn parse_text(_: &ConfigNode, from_server: &FromServer) -> Result<Payload, HttpError> {
    let charset = from_server.charset();
    if !charset.eq_ignore_ascii_case("utf-8") && !charset.eq_ignore_ascii_case("us-ascii") {
        warn!(%charset, uri = from_server.uri(), "decoding non UTF-8 body as UTF-8");
    }
    let text = String::from_utf8_lossy(from_server.body()).into_owned();
    Ok(Payload::new(text))
}

/// Body as a `serde_json::Value`.
pub fn parse_json(_: &ConfigNode, from_server: &FromServer) -> Result<Payload, HttpError> {
    let value: serde_json::Value =
        serde_json::from_slice(from_server.body()).map_err(|e| HttpError::Parse(Box::new(e)))?;
    Ok(Payload::new(value))
}

/// Body as `Vec<(String, String)>`, keeping duplicate keys.
pub fn parse_form(_: &ConfigNode, from_server: &FromServer) -> Result<Payload, HttpError> {
    let pairs: Vec<(String, String)> =
        serde_urlencoded::from_bytes(from_server.body()).map_err(|e| HttpError::Parse(Box::new(e)))?;
    Ok(Payload::new(pairs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpResponse;

    fn node() -> ConfigNode {
        ConfigNode::root()
    }

    fn response(body: &'static str, content_type: &str) -> FromServer {
        FromServer::new(
            "http://h/",
            HttpResponse::new(200, body).with_header("Content-Type", content_type),
        )
    }

    #[test]
    fn install_registers_each_content_type() {
        let mut config = NodeConfig::default();
        install(&mut config, CAPABILITIES);
        for ct in ContentTypes::BINARY.iter().chain(ContentTypes::TEXT).chain(ContentTypes::XML) {
            assert!(config.request.encoder(ct).is_some(), "{ct}");
            assert!(config.response.parser(ct).is_some(), "{ct}");
        }
        assert_eq!(config.request.encoder("application/json").is_some(), cfg!(feature = "json"));
    }

    #[test]
    fn probe_failure_skips_codec() {
        fn never() -> bool {
            false
        }
        let caps = [Capability {
            name: "missing",
            probe: never,
            content_types: &["text/csv"],
            encoder: Some(encode_text),
            parser: Some(parse_text),
        }];
        let mut config = NodeConfig::default();
        install(&mut config, &caps);
        assert!(config.request.encoders().is_empty());
        assert!(config.response.parsers().is_empty());
    }

    #[test]
    fn binary_accepts_bytes_and_strings() {
        let n = node();
        assert_eq!(encode_binary(&n, &Payload::new(vec![1u8, 2])).unwrap(), Bytes::from_static(&[1, 2]));
        assert_eq!(encode_binary(&n, &Payload::new("hi")).unwrap(), "hi");
        let err = encode_binary(&n, &Payload::new(42u32)).unwrap_err();
        assert!(matches!(err, HttpError::Encode(_)));
    }

    #[test]
    fn json_round_trips_values() {
        let n = node();
        let bytes = encode_json(&n, &Payload::new(serde_json::json!({"a": [1, 2]}))).unwrap();
        assert_eq!(bytes, r#"{"a":[1,2]}"#);
        let parsed = parse_json(&n, &response(r#"{"a":[1,2]}"#, "application/json")).unwrap();
        assert_eq!(parsed.downcast_ref::<serde_json::Value>().unwrap()["a"][1], 2);
    }

    #[test]
    fn json_parse_error_is_reported() {
        let err = parse_json(&node(), &response("{oops", "application/json")).unwrap_err();
        assert!(matches!(err, HttpError::Parse(_)));
    }

    #[test]
    fn form_encodes_pairs_and_parses_back() {
        let n = node();
        let body = Payload::new(vec![
            ("q".to_string(), "rust lang".to_string()),
            ("page".to_string(), "2".to_string()),
        ]);
        let bytes = encode_form(&n, &body).unwrap();
        assert_eq!(bytes, "q=rust+lang&page=2");
        let parsed = parse_form(&n, &response("a=1&a=2", "application/x-www-form-urlencoded")).unwrap();
        let pairs = parsed.downcast_ref::<Vec<(String, String)>>().unwrap();
        assert_eq!(pairs.len(), 2);
    }

    #[test]
    fn text_parser_is_lossy() {
        let fs = FromServer::new("http://h/", HttpResponse::new(200, vec![b'o', b'k', 0xff]));
        let parsed = parse_text(&node(), &fs).unwrap();
        assert_eq!(parsed.downcast_ref::<String>().unwrap(), "ok\u{fffd}");
    }
}
