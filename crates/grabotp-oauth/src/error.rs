//! Error types for `OAuth2` operations.

use std::io;

/// Result type alias for `OAuth2` operations.
pub type Result<T> = std::result::Result<T, Error>;

/// `OAuth2` error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error (binding or serving the loopback listener).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// `OAuth2` error from server.
    #[error("OAuth2 error: {error} - {description}")]
    OAuth {
        /// Error code (e.g., `invalid_grant`).
        error: String,
        /// Human-readable description.
        description: String,
    },

    /// No refresh token available.
    #[error("No refresh token available")]
    NoRefreshToken,

    /// Invalid token response.
    #[error("Invalid token response: {0}")]
    InvalidResponse(String),

    /// Authorization timeout.
    #[error("Authorization timed out after {0} seconds")]
    Timeout(u64),

    /// User denied authorization.
    #[error("User denied authorization")]
    AccessDenied,

    /// The redirect carried a `state` that does not match the one we issued.
    #[error("State mismatch in authorization redirect (possible CSRF)")]
    StateMismatch,

    /// The redirect carried no authorization code.
    #[error("Authorization redirect did not include a code")]
    MissingCode,

    /// The loopback listener stopped before delivering a result.
    #[error("Authorization listener closed before a redirect arrived")]
    ListenerClosed,

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// URL parsing error.
    #[error("URL error: {0}")]
    UrlError(#[from] url::ParseError),
}

impl Error {
    /// Creates an OAuth error from error code and description.
    #[must_use]
    pub fn oauth_error(error: impl Into<String>, description: impl Into<String>) -> Self {
        Self::OAuth {
            error: error.into(),
            description: description.into(),
        }
    }

    /// Returns true for failures of the interactive authorization protocol.
    ///
    /// These abort the current attempt; a new attempt needs fresh user consent.
    #[must_use]
    pub const fn is_authorization_failure(&self) -> bool {
        matches!(
            self,
            Self::OAuth { .. }
                | Self::Timeout(_)
                | Self::AccessDenied
                | Self::StateMismatch
                | Self::MissingCode
                | Self::ListenerClosed
                | Self::NoRefreshToken
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_failures() {
        assert!(Error::StateMismatch.is_authorization_failure());
        assert!(Error::MissingCode.is_authorization_failure());
        assert!(Error::Timeout(300).is_authorization_failure());
        assert!(Error::NoRefreshToken.is_authorization_failure());
        assert!(Error::oauth_error("invalid_grant", "expired").is_authorization_failure());
    }

    #[test]
    fn test_other_errors_are_not_authorization_failures() {
        assert!(!Error::InvalidResponse("empty".into()).is_authorization_failure());
        assert!(!Error::InvalidConfig("no redirect".into()).is_authorization_failure());
        assert!(!Error::Io(io::Error::other("bind")).is_authorization_failure());
    }
}
