//! Error types for memory operations.

/// Errors returned by memory providers and the store.
///
/// Quality gate rejections are not errors; see [`crate::RejectReason`].
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Deny pattern compilation error.
    #[error("regex error: {0}")]
    Regex(String),
    /// A persisted file name could not be mapped back to a user id.
    #[error("invalid user key: {0}")]
    InvalidUserKey(String),
    /// Provider-specific failure.
    #[error("backend error: {0}")]
    Backend(String),
}
