//! Concurrent OTP retrieval across accounts.
//!
//! One task per account lists recent messages; one nested task per message
//! retrieves it and extracts a code. Every task is awaited before results
//! are merged and ordered newest first.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::gmail::GmailSession;
use super::session::{Authorizer, SessionManager};
use crate::account::{AccountIdentity, CredentialStore};
use crate::error::{Error, Result};

/// How far back to look for messages.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(10 * 60);

/// Maximum number of messages listed per account.
pub const DEFAULT_MAX_MESSAGES: u32 = 3;

/// An OTP found in a recent message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedOtp {
    /// Account the message was delivered to.
    pub to: AccountIdentity,
    /// Sender as shown in the `From` header.
    pub from: String,
    /// Delivery time.
    pub timestamp: DateTime<Utc>,
    /// The six-digit code.
    pub otp: String,
}

/// Recency window and per-account message cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Only messages delivered within this window are considered.
    pub window: Duration,
    /// At most this many messages are listed per account.
    pub max_messages: u32,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            max_messages: DEFAULT_MAX_MESSAGES,
        }
    }
}

/// Fetches recent OTPs for a set of accounts.
#[derive(Debug)]
pub struct FetchPipeline<S, A> {
    sessions: Arc<SessionManager<S, A>>,
    options: FetchOptions,
}

impl<S, A> FetchPipeline<S, A>
where
    S: CredentialStore + 'static,
    A: Authorizer + 'static,
{
    /// Creates a pipeline with the default window and cap.
    pub fn new(sessions: Arc<SessionManager<S, A>>) -> Self {
        Self {
            sessions,
            options: FetchOptions::default(),
        }
    }

    /// Overrides the window and cap.
    #[must_use]
    pub const fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns every OTP found for `accounts`, newest first.
    ///
    /// Messages that cannot be retrieved are logged and skipped; messages
    /// without a code are left out. Accounts with nothing to report
    /// contribute nothing.
    ///
    /// # Errors
    ///
    /// Returns the first account-level failure (authorization, credential
    /// storage, or listing). All tasks still run to completion first.
    pub async fn fetch(&self, accounts: &[AccountIdentity]) -> Result<Vec<ParsedOtp>> {
        let mut tasks = JoinSet::new();
        for account in accounts {
            let sessions = Arc::clone(&self.sessions);
            let account = account.clone();
            let options = self.options;
            tasks.spawn(async move { fetch_account(&sessions, account, options).await });
        }

        let mut otps = Vec::new();
        let mut failure = None;
        while let Some(joined) = tasks.join_next().await {
            match joined.map_err(Error::from).and_then(|found| found) {
                Ok(found) => otps.extend(found),
                Err(e) if failure.is_none() => failure = Some(e),
                Err(e) => warn!("Additional account failure: {e}"),
            }
        }

        if let Some(e) = failure {
            return Err(e);
        }

        otps.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(otps)
    }
}

async fn fetch_account<S, A>(
    sessions: &SessionManager<S, A>,
    account: AccountIdentity,
    options: FetchOptions,
) -> Result<Vec<ParsedOtp>>
where
    S: CredentialStore,
    A: Authorizer,
{
    let session = Arc::new(sessions.session(&account).await?);
    let refs = session
        .list_recent(options.window, options.max_messages)
        .await?;
    debug!("{account}: {} recent message(s)", refs.len());

    let mut tasks = JoinSet::new();
    for message in refs {
        let session = Arc::clone(&session);
        let account = account.clone();
        tasks.spawn(async move { fetch_message(&session, account, &message.id).await });
    }

    let mut otps = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Some(otp)) => otps.push(otp),
            Ok(None) => {}
            Err(e) => warn!("{account}: message task failed: {e}"),
        }
    }
    Ok(otps)
}

async fn fetch_message(session: &GmailSession, account: AccountIdentity, id: &str) -> Option<ParsedOtp> {
    let message = match session.get_message(id).await {
        Ok(message) => message,
        Err(e) => {
            warn!("{account}: unable to retrieve message {id}: {e}");
            return None;
        }
    };

    let Some(otp) = grabotp_mime::extract_code(&message.payload) else {
        debug!("{account}: no code in message {id}");
        return None;
    };

    Some(ParsedOtp {
        to: account,
        from: message.sender().to_string(),
        timestamp: message.timestamp(),
        otp,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::account::MemoryStore;
    use crate::service::session::tests::{StubAuthorizer, manager};
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE;
    use grabotp_oauth::Token;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ALICE: &str = "alice@example.com";
    const BOB: &str = "bob@example.com";

    fn store_with(accounts: &[&str]) -> MemoryStore {
        let store = MemoryStore::new();
        for account in accounts {
            store
                .set(&(*account).into(), &Token::new(format!("token-{account}"), "Bearer"))
                .unwrap();
        }
        store
    }

    fn pipeline(
        server: &MockServer,
        store: MemoryStore,
    ) -> FetchPipeline<MemoryStore, StubAuthorizer> {
        FetchPipeline::new(Arc::new(manager(server, store, StubAuthorizer::denying())))
    }

    async fn mount_list(server: &MockServer, account: &str, ids: &[&str]) {
        let messages: Vec<_> = ids.iter().map(|id| json!({"id": id, "threadId": id})).collect();
        Mock::given(method("GET"))
            .and(path("/gmail/messages"))
            .and(header("authorization", format!("Bearer token-{account}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"messages": messages})))
            .mount(server)
            .await;
    }

    async fn mount_message(server: &MockServer, id: &str, from: &str, millis: i64, body: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/gmail/messages/{id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": id,
                "internalDate": millis.to_string(),
                "payload": {
                    "mimeType": "multipart/alternative",
                    "headers": [{"name": "From", "value": from}],
                    "body": {"size": 0},
                    "parts": [
                        {"mimeType": "text/plain", "body": {"data": URL_SAFE.encode(body)}}
                    ]
                }
            })))
            .mount(server)
            .await;
    }

    async fn mount_failure(server: &MockServer, id: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/gmail/messages/{id}")))
            .respond_with(ResponseTemplate::new(500).set_body_string("backend error"))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_no_accounts() {
        let server = MockServer::start().await;
        let otps = pipeline(&server, MemoryStore::new()).fetch(&[]).await.unwrap();
        assert!(otps.is_empty());
    }

    #[tokio::test]
    async fn test_no_qualifying_messages() {
        let server = MockServer::start().await;
        mount_list(&server, ALICE, &[]).await;

        let otps = pipeline(&server, store_with(&[ALICE]))
            .fetch(&[ALICE.into()])
            .await
            .unwrap();
        assert!(otps.is_empty());
    }

    #[tokio::test]
    async fn test_merges_accounts_newest_first() {
        let server = MockServer::start().await;
        mount_list(&server, ALICE, &["a1", "a2", "a3"]).await;
        mount_list(&server, BOB, &["b1", "b2"]).await;
        mount_message(&server, "a1", "Bank", 1_000, "code 111111").await;
        mount_message(&server, "a2", "Shop", 4_000, "newsletter, nothing here").await;
        mount_message(&server, "a3", "Gov", 3_000, "use 333333 to sign in").await;
        mount_message(&server, "b1", "Chat", 2_000, "your code: 222222").await;
        mount_message(&server, "b2", "Game", 5_000, "pin 555555").await;

        let otps = pipeline(&server, store_with(&[ALICE, BOB]))
            .fetch(&[ALICE.into(), BOB.into()])
            .await
            .unwrap();

        let codes: Vec<_> = otps.iter().map(|o| o.otp.as_str()).collect();
        assert_eq!(codes, ["555555", "333333", "222222", "111111"]);
        assert!(otps.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));

        assert_eq!(otps[0].to, AccountIdentity::new(BOB));
        assert_eq!(otps[0].from, "Game");
        assert_eq!(otps[1].to, AccountIdentity::new(ALICE));
        assert_eq!(otps[1].timestamp.timestamp_millis(), 3_000);
    }

    #[tokio::test]
    async fn test_failed_messages_are_skipped() {
        let server = MockServer::start().await;
        mount_list(&server, ALICE, &["ok1", "bad", "ok2"]).await;
        mount_message(&server, "ok1", "Bank", 1_000, "code 101010").await;
        mount_failure(&server, "bad").await;
        mount_message(&server, "ok2", "Bank", 2_000, "code 202020").await;

        let otps = pipeline(&server, store_with(&[ALICE]))
            .fetch(&[ALICE.into()])
            .await
            .unwrap();

        let codes: Vec<_> = otps.iter().map(|o| o.otp.as_str()).collect();
        assert_eq!(codes, ["202020", "101010"]);
    }

    #[tokio::test]
    async fn test_stored_tokens_never_authorize() {
        let server = MockServer::start().await;
        mount_list(&server, ALICE, &[]).await;

        let pipeline = pipeline(&server, store_with(&[ALICE]));
        pipeline.fetch(&[ALICE.into()]).await.unwrap();

        assert_eq!(pipeline.sessions.authorizer().calls(), 0);
    }

    #[tokio::test]
    async fn test_accounts_without_tokens_authorize_in_turn() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gmail/profile"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"emailAddress": ALICE})))
            .mount(&server)
            .await;
        mount_list(&server, "shared", &[]).await;

        let sessions = Arc::new(manager(
            &server,
            MemoryStore::new(),
            StubAuthorizer::granting("token-shared"),
        ));
        let otps = FetchPipeline::new(Arc::clone(&sessions))
            .fetch(&[ALICE.into(), BOB.into()])
            .await
            .unwrap();

        assert!(otps.is_empty());
        assert_eq!(sessions.authorizer().max_in_flight(), 1);
    }

    #[tokio::test]
    async fn test_account_failure_is_fatal() {
        let server = MockServer::start().await;
        mount_list(&server, ALICE, &["a1"]).await;
        mount_message(&server, "a1", "Bank", 1_000, "code 111111").await;

        // Bob has no stored token and the authorizer refuses.
        let err = pipeline(&server, store_with(&[ALICE]))
            .fetch(&[ALICE.into(), BOB.into()])
            .await
            .unwrap_err();

        assert!(err.needs_reauthorization());
    }

    #[tokio::test]
    async fn test_listing_failure_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gmail/messages"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = pipeline(&server, store_with(&[ALICE]))
            .fetch(&[ALICE.into()])
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Api { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_custom_options_are_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gmail/messages"))
            .and(wiremock::matchers::query_param("maxResults", "7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        pipeline(&server, store_with(&[ALICE]))
            .with_options(FetchOptions {
                window: Duration::from_secs(60),
                max_messages: 7,
            })
            .fetch(&[ALICE.into()])
            .await
            .unwrap();
    }

    #[test]
    fn test_parsed_otp_json_shape() {
        let otp = ParsedOtp {
            to: ALICE.into(),
            from: "Bank <otp@bank.example>".into(),
            timestamp: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            otp: "123456".into(),
        };

        let value = serde_json::to_value(&otp).unwrap();
        assert_eq!(value["to"], ALICE);
        assert_eq!(value["otp"], "123456");
        assert_eq!(value["timestamp"], "2023-11-14T22:13:20Z");
    }
}
