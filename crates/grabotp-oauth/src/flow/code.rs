//! Authorization Code Flow with PKCE and a loopback redirect.

use super::{LoopbackConfig, LoopbackListener, OAuthClient, PkceChallenge};
use crate::error::{Error, Result};
use crate::token::Token;
use tracing::{debug, warn};
use url::Url;

/// Progress of one authorization attempt.
///
/// `Idle → AwaitingRedirect → Exchanging → Authorized`, or `Failed` from any
/// step. Nothing returns to `Idle`; a retry needs a new flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    /// Nothing started yet.
    Idle,
    /// URL presented, listener waiting for the browser.
    AwaitingRedirect,
    /// Code received, talking to the token endpoint.
    Exchanging,
    /// Token obtained.
    Authorized,
    /// Attempt aborted.
    Failed,
}

/// Authorization Code Flow for `OAuth2`.
///
/// Each flow owns a freshly generated PKCE challenge and state nonce and can
/// run [`AuthorizationCodeFlow::authorize`] once.
#[derive(Debug)]
pub struct AuthorizationCodeFlow {
    client: OAuthClient,
    pkce: PkceChallenge,
    state: FlowState,
}

impl AuthorizationCodeFlow {
    /// Creates a new authorization code flow with a fresh PKCE challenge.
    #[must_use]
    pub fn new(client: OAuthClient) -> Self {
        Self {
            client,
            pkce: PkceChallenge::generate(),
            state: FlowState::Idle,
        }
    }

    /// Returns where this attempt currently stands.
    #[must_use]
    pub const fn state(&self) -> FlowState {
        self.state
    }

    /// Returns the PKCE challenge of this attempt.
    #[must_use]
    pub const fn pkce(&self) -> &PkceChallenge {
        &self.pkce
    }

    /// Builds the authorization URL for user consent.
    ///
    /// # Arguments
    ///
    /// * `scopes` - Optional scopes to request (uses provider defaults if None)
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be constructed.
    pub fn authorization_url(&self, scopes: Option<&[String]>) -> Result<Url> {
        let mut url = self.client.provider.auth_url.clone();

        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("client_id", &self.client.client_id)
                .append_pair("response_type", "code");

            if let Some(redirect_uri) = &self.client.redirect_uri {
                pairs.append_pair("redirect_uri", redirect_uri);
            }

            let scope_str = scopes.map_or_else(
                || self.client.provider.default_scopes.join(" "),
                |s| s.join(" "),
            );

            if !scope_str.is_empty() {
                pairs.append_pair("scope", &scope_str);
            }

            pairs
                .append_pair("state", self.pkce.state())
                .append_pair("code_challenge", self.pkce.challenge())
                .append_pair("code_challenge_method", self.pkce.method());

            // Offline access so the stored token carries a refresh token.
            if self.client.provider.name == "Google" {
                pairs
                    .append_pair("access_type", "offline")
                    .append_pair("prompt", "consent");
            }
        }

        Ok(url)
    }

    /// Exchanges the authorization code for an access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token exchange fails.
    pub async fn exchange_code(&self, code: &str) -> Result<Token> {
        self.client
            .exchange_code(code, None, Some(self.pkce.verifier()))
            .await
    }

    /// Runs the interactive attempt end to end.
    ///
    /// Binds the loopback listener, hands the authorization URL to `present`,
    /// waits up to `config.timeout` for the redirect, tears the listener down,
    /// and exchanges the code. Any failure leaves the flow in
    /// [`FlowState::Failed`].
    ///
    /// # Errors
    ///
    /// Returns an error if the flow was already used, the listener cannot be
    /// bound, the redirect is invalid or late, or the exchange is rejected.
    pub async fn authorize<F>(&mut self, config: &LoopbackConfig, present: F) -> Result<Token>
    where
        F: FnOnce(&Url),
    {
        if self.state != FlowState::Idle {
            return Err(Error::InvalidConfig(
                "authorization attempt already used; start a new flow".into(),
            ));
        }

        let result = self.run(config, present).await;
        self.transition(if result.is_ok() {
            FlowState::Authorized
        } else {
            FlowState::Failed
        });
        result
    }

    async fn run<F>(&mut self, config: &LoopbackConfig, present: F) -> Result<Token>
    where
        F: FnOnce(&Url),
    {
        let mut listener = LoopbackListener::bind(config, self.pkce.state()).await?;
        self.client.redirect_uri = Some(listener.redirect_uri());

        let url = self.authorization_url(None)?;
        self.transition(FlowState::AwaitingRedirect);
        present(&url);

        let outcome = listener.wait_for_code(config.timeout).await;
        if let Err(e) = listener.shutdown().await {
            warn!("loopback listener did not shut down cleanly: {e}");
        }
        let code = outcome?;

        self.transition(FlowState::Exchanging);
        self.exchange_code(&code).await
    }

    fn transition(&mut self, next: FlowState) {
        debug!(from = ?self.state, to = ?next, "authorization flow");
        self.state = next;
    }
}
