//! The process-wide library root.

use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::codecs;
use crate::config::{Concurrency, ConfigNode, NodeConfig};
use crate::content_type::DEFAULT_CHARSET;

static ROOT: OnceLock<Arc<ConfigNode>> = OnceLock::new();

/// Root of every client chain: built-in codecs and the default charset.
///
/// Initialized on first use and frozen afterwards; clients customize their own
/// node instead.
pub fn library_root() -> Arc<ConfigNode> {
    Arc::clone(ROOT.get_or_init(|| {
        let mut config = NodeConfig::default();
        config.request.set_charset(DEFAULT_CHARSET);
        codecs::install(&mut config, codecs::CAPABILITIES);
        let root = ConfigNode::from_config(None, config, Concurrency::Exclusive);
        root.freeze();
        debug!("library root initialized");
        Arc::new(root)
    }))
}
