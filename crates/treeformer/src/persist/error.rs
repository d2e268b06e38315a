//! Persistence errors.

/// Failure while reading a persisted tree or ensemble.
///
/// There is no partial recovery: one bad node rejects the whole input.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("tree depth exceeds {max}")]
    TooDeep { max: usize },

    #[error("invalid tree {tree_idx}: {reason}")]
    InvalidTree { tree_idx: usize, reason: String },

    #[error("validation failed: {0}")]
    Validation(String),
}

/// Failure while persisting a tree or ensemble.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}
