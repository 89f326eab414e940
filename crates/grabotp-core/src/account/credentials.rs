//! Secure token storage.
//!
//! Each account's `OAuth2` token is stored as a JSON blob under a fixed
//! service name, keyed by the account's mail address. The default backend is
//! the platform's native credential storage:
//! - Linux: Secret Service (GNOME Keyring, `KWallet`)
//! - macOS: Keychain
//! - Windows: Credential Manager

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use grabotp_oauth::Token;
use keyring::Entry;
use tracing::{debug, warn};

use super::AccountIdentity;

/// Service name used for keyring entries.
pub const SERVICE_NAME: &str = "grabotp";

/// Error type for credential operations.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// Failed to access keyring.
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    /// The stored blob is not a valid token.
    #[error("Stored token is corrupt: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Result type for credential operations.
pub type CredentialResult<T> = std::result::Result<T, CredentialError>;

/// Per-account get/set/delete of a stored token.
///
/// A missing entry is `Ok(None)` from [`get`](Self::get) and a no-op for
/// [`delete`](Self::delete). Distinct accounts may be accessed concurrently.
pub trait CredentialStore: Send + Sync {
    /// Loads the token stored for `account`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or the stored blob is corrupt.
    fn get(&self, account: &AccountIdentity) -> CredentialResult<Option<Token>>;

    /// Stores `token` for `account`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn set(&self, account: &AccountIdentity, token: &Token) -> CredentialResult<()>;

    /// Removes the token stored for `account`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails (except for missing entries).
    fn delete(&self, account: &AccountIdentity) -> CredentialResult<()>;
}

/// Token storage in the system keyring.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    /// Keyring storage under [`SERVICE_NAME`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    /// Keyring storage under a different service name.
    #[must_use]
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, account: &AccountIdentity) -> CredentialResult<Entry> {
        Ok(Entry::new(&self.service, account.as_str())?)
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeyringStore {
    fn get(&self, account: &AccountIdentity) -> CredentialResult<Option<Token>> {
        match self.entry(account)?.get_password() {
            Ok(token_json) => Ok(Some(serde_json::from_str(&token_json)?)),
            Err(keyring::Error::NoEntry) => {
                debug!("No OAuth2 token found for {account}");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, account: &AccountIdentity, token: &Token) -> CredentialResult<()> {
        let token_json = serde_json::to_string(token)?;
        self.entry(account)?.set_password(&token_json)?;
        debug!("Stored OAuth2 token for {account}");
        Ok(())
    }

    fn delete(&self, account: &AccountIdentity) -> CredentialResult<()> {
        match self.entry(account)?.delete_credential() {
            Ok(()) => {
                debug!("Deleted OAuth2 token for {account}");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => {
                debug!("No OAuth2 token to delete for {account}");
                Ok(())
            }
            Err(e) => {
                warn!("Failed to delete OAuth2 token: {e}");
                Err(e.into())
            }
        }
    }
}

/// Process-local token storage. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tokens: Mutex<HashMap<AccountIdentity, String>>,
}

impl MemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// True when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// Blobs are kept serialized so corrupt-entry handling matches the keyring.
impl CredentialStore for MemoryStore {
    fn get(&self, account: &AccountIdentity) -> CredentialResult<Option<Token>> {
        let tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        tokens
            .get(account)
            .map(|blob| serde_json::from_str(blob))
            .transpose()
            .map_err(Into::into)
    }

    fn set(&self, account: &AccountIdentity, token: &Token) -> CredentialResult<()> {
        let blob = serde_json::to_string(token)?;
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(account.clone(), blob);
        Ok(())
    }

    fn delete(&self, account: &AccountIdentity) -> CredentialResult<()> {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(account);
        Ok(())
    }
}
