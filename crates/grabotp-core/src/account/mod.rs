//! Account management module.
//!
//! Provides account identities and secure token storage.

pub mod credentials;
mod model;

pub use credentials::{CredentialError, CredentialResult, CredentialStore, KeyringStore, MemoryStore};
pub use model::AccountIdentity;
