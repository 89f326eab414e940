//! # grabotp-oauth
//!
//! `OAuth2` authorization for a command-line mail reader.
//!
//! ## Features
//!
//! - **Authorization Code Flow with PKCE**: S256 challenge plus a random
//!   `state` nonce, fresh for every attempt
//! - **Loopback redirect listener**: single-use local HTTP listener that
//!   validates the redirect and shuts itself down
//! - **Token management**: code exchange, refresh, expiry checks
//!
//! ## Quick Start
//!
//! ```ignore
//! use grabotp_oauth::{AuthorizationCodeFlow, LoopbackConfig, OAuthClient, Provider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = OAuthClient::new("your_client_id", Provider::google()?);
//!     let mut flow = AuthorizationCodeFlow::new(client);
//!
//!     let token = flow
//!         .authorize(&LoopbackConfig::default(), |url| println!("Visit: {url}"))
//!         .await?;
//!
//!     println!("Authorized, expires at {:?}", token.expires_at);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
pub mod flow;
pub mod provider;
pub mod token;

pub use error::{Error, Result};
pub use flow::{
    AuthorizationCodeFlow, FlowState, LoopbackConfig, LoopbackListener, OAuthClient, PkceChallenge,
};
pub use provider::Provider;
pub use token::Token;
