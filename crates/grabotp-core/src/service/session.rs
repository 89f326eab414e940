//! Authenticated sessions per account.
//!
//! A stored token is reused as is. Without one, an interactive authorization
//! runs and its token is stored under the address the provider reports for
//! the consenting user.

use std::future::Future;
use std::sync::Arc;

use grabotp_oauth::{AuthorizationCodeFlow, LoopbackConfig, OAuthClient, Token};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use super::gmail::{GMAIL_API_BASE, GmailSession};
use crate::account::{AccountIdentity, CredentialStore};
use crate::error::Result;

/// Obtains a fresh token through user consent.
pub trait Authorizer: Send + Sync {
    /// Runs one authorization attempt.
    fn authorize(&self) -> impl Future<Output = grabotp_oauth::Result<Token>> + Send;
}

/// Receives the authorization URL the user must visit.
pub type Presenter = Arc<dyn Fn(&Url) + Send + Sync>;

/// Browser-based authorization through the loopback redirect flow.
///
/// Every call starts a new [`AuthorizationCodeFlow`], so no PKCE secret,
/// nonce or listener is shared between attempts.
#[derive(Clone)]
pub struct InteractiveAuthorizer {
    client: OAuthClient,
    loopback: LoopbackConfig,
    present: Presenter,
}

impl InteractiveAuthorizer {
    /// Creates an authorizer that hands each authorization URL to `present`.
    pub fn new(client: OAuthClient, present: impl Fn(&Url) + Send + Sync + 'static) -> Self {
        Self {
            client,
            loopback: LoopbackConfig::default(),
            present: Arc::new(present),
        }
    }

    /// Overrides the loopback listener settings.
    #[must_use]
    pub fn with_loopback(mut self, loopback: LoopbackConfig) -> Self {
        self.loopback = loopback;
        self
    }
}

impl std::fmt::Debug for InteractiveAuthorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractiveAuthorizer")
            .field("client", &self.client)
            .field("loopback", &self.loopback)
            .finish_non_exhaustive()
    }
}

impl Authorizer for InteractiveAuthorizer {
    async fn authorize(&self) -> grabotp_oauth::Result<Token> {
        let mut flow = AuthorizationCodeFlow::new(self.client.clone());
        flow.authorize(&self.loopback, |url| (self.present)(url)).await
    }
}

/// Hands out authenticated sessions, authorizing accounts on demand.
///
/// At most one interactive authorization runs at a time; the loopback
/// listener binds a fixed port.
#[derive(Debug)]
pub struct SessionManager<S, A> {
    store: S,
    authorizer: A,
    oauth: OAuthClient,
    api_base: String,
    authorizing: Mutex<()>,
}

impl<S: CredentialStore, A: Authorizer> SessionManager<S, A> {
    /// Creates a manager over a token store and an authorizer.
    ///
    /// `oauth` is the client used to refresh expired access tokens.
    pub fn new(store: S, authorizer: A, oauth: OAuthClient) -> Self {
        Self {
            store,
            authorizer,
            oauth,
            api_base: GMAIL_API_BASE.to_string(),
            authorizing: Mutex::new(()),
        }
    }

    /// Points sessions at a different mail API base URL.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// The underlying token store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// The authorizer used when no token is stored.
    pub const fn authorizer(&self) -> &A {
        &self.authorizer
    }

    /// Returns a session for `account`.
    ///
    /// Uses the stored token when there is one; the authorizer is not
    /// consulted. Otherwise authorizes interactively and stores the token
    /// under the profile address, which may differ from `account`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or authorization fails.
    pub async fn session(&self, account: &AccountIdentity) -> Result<GmailSession> {
        if let Some(token) = self.store.get(account)? {
            debug!("Using stored token for {account}");
            return Ok(self.open(token));
        }

        let _turn = self.authorizing.lock().await;
        if let Some(token) = self.store.get(account)? {
            debug!("Token for {account} was stored while waiting to authorize");
            return Ok(self.open(token));
        }

        info!("No stored token for {account}; authorization required");
        let (session, identity) = self.authorize_and_store().await?;
        if !identity.matches(account) {
            warn!("Authorized {identity} while a session for {account} was requested");
        }
        Ok(session)
    }

    /// Makes sure `account` has a usable authorization and returns the
    /// address the provider reports for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the store, authorization, or profile lookup fails.
    pub async fn ensure_authorized(&self, account: &AccountIdentity) -> Result<AccountIdentity> {
        self.session(account).await?.profile().await
    }

    /// Runs an interactive authorization regardless of stored tokens and
    /// returns the address of the account the user consented with.
    ///
    /// # Errors
    ///
    /// Returns an error if authorization, profile lookup, or storing fails.
    pub async fn authorize_new(&self) -> Result<AccountIdentity> {
        let _turn = self.authorizing.lock().await;
        let (_, identity) = self.authorize_and_store().await?;
        Ok(identity)
    }

    /// Deletes the stored token for `account`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn forget(&self, account: &AccountIdentity) -> Result<()> {
        self.store.delete(account)?;
        info!("Forgot stored token for {account}");
        Ok(())
    }

    /// Callers hold `authorizing`.
    async fn authorize_and_store(&self) -> Result<(GmailSession, AccountIdentity)> {
        let token = self.authorizer.authorize().await?;
        let session = self.open(token.clone());
        let identity = session.profile().await?;

        self.store.set(&identity, &token)?;
        info!("Authorized {identity}");
        Ok((session, identity))
    }

    fn open(&self, token: Token) -> GmailSession {
        GmailSession::new(self.oauth.clone(), token).with_base_url(self.api_base.clone())
    }
}
