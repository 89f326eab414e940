//! Account model types.

use serde::{Deserialize, Serialize};

/// A mail address identifying one account.
///
/// Scopes stored credentials and is the unit of fetch parallelism.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountIdentity(String);

impl AccountIdentity {
    /// Create an account identity from a mail address.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// The mail address.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison of addresses.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl std::fmt::Display for AccountIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountIdentity {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

impl From<String> for AccountIdentity {
    fn from(address: String) -> Self {
        Self(address)
    }
}
