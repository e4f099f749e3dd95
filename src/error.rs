//! Error types for the watch-check pipeline boundary.

use std::fmt;

/// Errors surfaced to callers of [`WatchCheck`](crate::pipeline::WatchCheck).
///
/// Upstream failures never appear here; they degrade to empty catalogs or a
/// fallback assessment long before reaching the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchCheckError {
    /// The caller supplied an empty or whitespace-only query.
    InvalidQuery(String),
    /// Internal error while producing or encoding a result.
    Internal(String),
}

impl fmt::Display for WatchCheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidQuery(msg) => write!(f, "Invalid query: {msg}"),
            Self::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for WatchCheckError {}
