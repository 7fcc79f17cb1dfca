//! Configurable HTTP client built on a chain of configuration nodes.
//!
//! # Overview
//! Requests and responses are described declaratively on three levels: the
//! process-wide library root, a client, and a single request. Each level only
//! stores what it sets; lookups walk toward the root. The resolved request is
//! handed to a pluggable [`Transport`] as plain data, so the core itself never
//! touches the network and is fully testable with fake transports.
//!
//! # Design
//! - [`ConfigNode`] holds one level. Request nodes are exclusive and
//!   short-lived; client nodes are shared and can be reconfigured while
//!   requests read them.
//! - Encoders and parsers are registered per content type. The library root
//!   carries the built-in codecs for text, binary, form and JSON bodies.
//! - Status handlers resolve in two passes: an exact status code anywhere in
//!   the chain first, then the nearest success or failure handler.
//! - Each verb has an interceptor slot wrapping the request pipeline.
//!
//! ```ignore
//! let client = HttpClient::builder()
//!     .base_uri("https://api.example.com/v1")
//!     .build()?;
//! let user: User = client.execute_json(HttpMethod::Get, |c| {
//!     c.request.uri_mut().set_path("/v1/users/42");
//!     Ok(())
//! })?;
//! ```

pub mod auth;
pub mod builder;
pub mod client;
pub mod codecs;
pub mod config;
pub mod content_type;
pub mod cookie;
pub mod error;
pub mod from_server;
pub mod http;
pub mod interceptor;
pub mod payload;
pub mod settings;
pub mod transport;
pub mod uri;

pub use auth::{Auth, AuthKind};
pub use builder::HttpClientBuilder;
pub use client::HttpClient;
pub use config::{library_root, Concurrency, ConfigNode, NodeConfig, StatusMatch};
pub use content_type::ContentTypes;
pub use cookie::{Cookie, CookieStore};
pub use error::{ConfigError, HttpError};
pub use from_server::FromServer;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use interceptor::{Interceptors, Next};
pub use payload::Payload;
pub use settings::ClientSettings;
pub use transport::Transport;
#[cfg(feature = "ureq-transport")]
pub use transport::UreqTransport;
pub use uri::UriBuilder;
