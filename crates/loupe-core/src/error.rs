//! Error types for loupe-core.
//!
//! The taxonomy mirrors the composer's failure model: transient absence is
//! not an error at all (it is simply omission from the current pane list),
//! record-level defects are diagnostics that never abort a rebuild, and only
//! upstream feed failures and handle misuse surface as `Err`.

use thiserror::Error;

/// Result type alias using the library's error type.
pub type Result<T> = std::result::Result<T, ComposeError>;

/// Main error type for loupe-core.
#[derive(Error, Debug)]
pub enum ComposeError {
    /// An upstream feed failed.
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),

    /// The composer task has been torn down; the handle is no longer usable.
    #[error("composer is disposed")]
    Disposed,

    /// JSON serialization errors (diagnostic snapshots, config).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure of one upstream asynchronous source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// The source itself reported an error.
    #[error("upstream failure: {0}")]
    Upstream(String),

    /// The source channel closed before the composer was torn down.
    #[error("feed closed unexpectedly")]
    Closed,
}
