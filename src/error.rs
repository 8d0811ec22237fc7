//! Error types for the conversion pipeline and the short-link store.
//!
//! Per-endpoint failures (`UnsupportedScheme`, `MissingCredential`,
//! `InvalidPort`) are recoverable: the offending line is skipped and counted,
//! and the batch continues. Batch-level failures (`UnrecognizedInputFormat`,
//! `EmptyNodeSet`) abort the whole conversion. `NotFound` and `DecodeError`
//! belong to short-link resolution.

use thiserror::Error;

/// Result type for conversion operations
pub type Result<T> = std::result::Result<T, ConvertError>;

/// Errors produced by the conversion pipeline and the short-link store
#[derive(Error, Debug)]
pub enum ConvertError {
    /// Input matched none of the recognized subscription shapes
    #[error("unrecognized subscription format")]
    UnrecognizedInputFormat,

    /// URI scheme is not hysteria2:// or hy2://
    #[error("unsupported URI scheme: {0}")]
    UnsupportedScheme(String),

    /// URI carries no password, neither in userinfo nor in the query
    #[error("missing password in URI")]
    MissingCredential,

    /// Port is absent, zero, or not a valid 16-bit integer
    #[error("missing or invalid port: {0}")]
    InvalidPort(String),

    /// No valid endpoint survived parsing
    #[error("subscription contains no valid nodes")]
    EmptyNodeSet,

    /// Unknown short identifier
    #[error("no subscription found for id: {0}")]
    NotFound(String),

    /// Malformed Base64 or non-JSON payload on resolution
    #[error("failed to decode configuration: {0}")]
    DecodeError(String),

    /// Storage IO failure
    #[error("store error: {0}")]
    Store(String),

    /// Unexpected internal failure
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            ConvertError::UnrecognizedInputFormat.to_string(),
            "unrecognized subscription format"
        );
        assert_eq!(
            ConvertError::UnsupportedScheme("vmess".to_string()).to_string(),
            "unsupported URI scheme: vmess"
        );
        assert_eq!(
            ConvertError::NotFound("abc123".to_string()).to_string(),
            "no subscription found for id: abc123"
        );
    }

    #[test]
    fn test_is_std_error() {
        fn assert_error<E: std::error::Error>(_e: E) {}
        assert_error(ConvertError::EmptyNodeSet);
    }
}
