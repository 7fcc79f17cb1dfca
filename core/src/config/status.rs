//! Status code to handler resolution.
//!
//! The exact-code search covers the whole chain before any success/failure
//! bucket is consulted, so an exact handler on the root beats a bucket
//! handler on the request.

use crate::config::response::Handler;
use crate::config::ConfigNode;

/// Which tier produced the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusMatch {
    Exact,
    Success,
    Failure,
}

#[must_use]
pub fn is_success(status: u16) -> bool {
    status < 400
}

/// Resolve the handler for `status` starting at `node`.
#[must_use]
pub fn resolve_handler(node: &ConfigNode, status: u16) -> Option<(Handler, StatusMatch)> {
    if let Some(handler) = node.actual_when(status) {
        return Some((handler, StatusMatch::Exact));
    }
    if is_success(status) {
        node.actual_success().map(|h| (h, StatusMatch::Success))
    } else {
        node.actual_failure().map(|h| (h, StatusMatch::Failure))
    }
}
