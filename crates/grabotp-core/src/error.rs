//! Error types for the core library.

use thiserror::Error;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Authorization or token refresh failed.
    #[error("OAuth error: {0}")]
    OAuth(#[from] grabotp_oauth::Error),

    /// Transport-level HTTP failure talking to the mail API.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The mail API answered with a non-success status.
    #[error("Mail API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, as returned.
        message: String,
    },

    /// A message id that cannot be safely placed in a request path.
    #[error("Invalid message id: {0:?}")]
    InvalidMessageId(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Credential storage error.
    #[error("Credential error: {0}")]
    Credential(#[from] crate::account::credentials::CredentialError),

    /// A fetch task panicked or was cancelled.
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    /// True when the stored authorization is unusable and the account must be
    /// added again.
    #[must_use]
    pub const fn needs_reauthorization(&self) -> bool {
        match self {
            Self::OAuth(e) => e.is_authorization_failure(),
            Self::Api { status, .. } => *status == 401,
            _ => false,
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
