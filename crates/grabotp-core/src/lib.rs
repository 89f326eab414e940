//! # grabotp-core
//!
//! Core logic for `grabotp`.
//!
//! This crate provides:
//! - Account identities and secure token storage (system keyring)
//! - Authenticated Gmail sessions, authorizing accounts on demand
//! - The concurrent fetch pipeline that turns recent mail into OTPs
//! - On-disk configuration

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod account;
pub mod config;
mod error;
pub mod service;

pub use account::credentials;
pub use account::{
    AccountIdentity, CredentialError, CredentialResult, CredentialStore, KeyringStore, MemoryStore,
};
pub use config::Config;
pub use error::{Error, Result};
pub use service::{
    Authorizer, FetchOptions, FetchPipeline, GmailMessage, GmailSession, InteractiveAuthorizer,
    MessageRef, ParsedOtp, SessionManager,
};
