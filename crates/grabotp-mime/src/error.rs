//! Error types for payload decoding.

use std::io;

/// Result type alias for payload operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Payload decoding error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// HTML could not be read into a document tree.
    #[error("HTML parse error: {0}")]
    Html(#[from] io::Error),
}
