//! Authenticated access to the Gmail REST API.
//!
//! Only three read-only calls are used: list recent messages, get one
//! message in `full` format, and read the account profile.

use std::time::Duration;

use chrono::{DateTime, Utc};
use grabotp_mime::MessagePart;
use grabotp_oauth::{OAuthClient, Token};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::debug;

use crate::account::AccountIdentity;
use crate::error::{Error, Result};

/// Gmail API base URL for the authenticated user.
pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

/// A message handle returned by the list call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    /// Message id.
    pub id: String,
    /// Thread id.
    #[serde(default)]
    pub thread_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileResponse {
    email_address: String,
}

/// A message in `full` format.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmailMessage {
    /// Message id.
    pub id: String,
    /// Delivery time in epoch milliseconds, as a decimal string.
    #[serde(default)]
    pub internal_date: Option<String>,
    /// MIME payload.
    #[serde(default)]
    pub payload: MessagePart,
}

impl GmailMessage {
    /// The `From` header, or an empty string.
    #[must_use]
    pub fn sender(&self) -> &str {
        self.payload.header("From").unwrap_or_default()
    }

    /// Delivery time. Missing or malformed dates map to the Unix epoch.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.internal_date
            .as_deref()
            .and_then(|ms| ms.parse::<i64>().ok())
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or_default()
    }
}

/// An authenticated session for one account.
///
/// Expired access tokens are refreshed in memory before a request. The
/// refreshed token is not written back to credential storage.
#[derive(Debug)]
pub struct GmailSession {
    http_client: Client,
    base_url: String,
    oauth: OAuthClient,
    token: Mutex<Token>,
}

impl GmailSession {
    /// Creates a session against the public Gmail API.
    #[must_use]
    pub fn new(oauth: OAuthClient, token: Token) -> Self {
        Self {
            http_client: Client::new(),
            base_url: GMAIL_API_BASE.to_string(),
            oauth,
            token: Mutex::new(token),
        }
    }

    /// Points the session at a different API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// A copy of the token currently in use.
    pub async fn token(&self) -> Token {
        self.token.lock().await.clone()
    }

    /// Lists messages delivered within `window`, at most `max_results`.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be refreshed or the API call fails.
    pub async fn list_recent(&self, window: Duration, max_results: u32) -> Result<Vec<MessageRef>> {
        let window_secs = i64::try_from(window.as_secs()).unwrap_or(i64::MAX);
        let after = Utc::now().timestamp().saturating_sub(window_secs);
        let query = format!("after:{after}");
        let max_results = max_results.to_string();

        let list: ListResponse = self
            .get_json(
                "messages",
                &[("q", query.as_str()), ("maxResults", max_results.as_str())],
            )
            .await?;

        debug!(count = list.messages.len(), %query, "listed recent messages");
        Ok(list.messages)
    }

    /// Retrieves a single message in `full` format.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is unsafe, the token cannot be refreshed,
    /// or the API call fails.
    pub async fn get_message(&self, id: &str) -> Result<GmailMessage> {
        validate_message_id(id)?;
        self.get_json(&format!("messages/{id}"), &[("format", "full")])
            .await
    }

    /// Address of the authenticated account.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be refreshed or the API call fails.
    pub async fn profile(&self) -> Result<AccountIdentity> {
        let profile: ProfileResponse = self.get_json("profile", &[]).await?;
        Ok(AccountIdentity::new(profile.email_address))
    }

    async fn access_token(&self) -> Result<String> {
        let mut token = self.token.lock().await;
        if token.is_expired() {
            debug!("access token expired, refreshing");
            *token = self.oauth.refresh_token(&token).await?;
        }
        Ok(token.access_token.clone())
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let access_token = self.access_token().await?;

        let response = self
            .http_client
            .get(format!("{}/{path}", self.base_url))
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

fn validate_message_id(id: &str) -> Result<()> {
    if id.is_empty() || id.contains('/') || id.contains('\\') || id.contains("..") {
        return Err(Error::InvalidMessageId(id.to_string()));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use grabotp_oauth::Provider;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn oauth_client(server: &MockServer) -> OAuthClient {
        let provider = Provider::new(
            "Mock",
            format!("{}/auth", server.uri()),
            format!("{}/token", server.uri()),
        )
        .unwrap();
        OAuthClient::new("test_client", provider)
    }

    fn session(server: &MockServer, token: Token) -> GmailSession {
        GmailSession::new(oauth_client(server), token).with_base_url(format!("{}/gmail/", server.uri()))
    }

    #[tokio::test]
    async fn test_list_recent_sends_window_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gmail/messages"))
            .and(query_param("maxResults", "3"))
            .and(header("authorization", "Bearer live"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "messages": [{"id": "m1", "threadId": "t1"}, {"id": "m2", "threadId": "t2"}],
                "resultSizeEstimate": 2
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = session(&server, Token::new("live", "Bearer"));
        let refs = session
            .list_recent(Duration::from_secs(600), 3)
            .await
            .unwrap();

        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].id, "m1");

        let requests = server.received_requests().await.unwrap();
        let q = requests[0]
            .url
            .query_pairs()
            .find(|(k, _)| k == "q")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        let after: i64 = q.strip_prefix("after:").unwrap().parse().unwrap();
        let expected = Utc::now().timestamp() - 600;
        assert!((expected - after).abs() <= 5, "query {q} outside window");
    }

    #[tokio::test]
    async fn test_list_recent_empty_mailbox() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gmail/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"resultSizeEstimate": 0})))
            .mount(&server)
            .await;

        let session = session(&server, Token::new("live", "Bearer"));
        assert!(session.list_recent(Duration::from_secs(60), 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_message_parses_sender_and_timestamp() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gmail/messages/m1"))
            .and(query_param("format", "full"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "m1",
                "internalDate": "1700000000123",
                "payload": {
                    "mimeType": "text/plain",
                    "headers": [{"name": "from", "value": "Bank <otp@bank.example>"}],
                    "body": {"size": 6, "data": "MTIzNDU2"}
                }
            })))
            .mount(&server)
            .await;

        let message = session(&server, Token::new("live", "Bearer"))
            .get_message("m1")
            .await
            .unwrap();

        assert_eq!(message.sender(), "Bank <otp@bank.example>");
        assert_eq!(message.timestamp().timestamp_millis(), 1_700_000_000_123);
        assert_eq!(grabotp_mime::extract_code(&message.payload).as_deref(), Some("123456"));
    }

    #[tokio::test]
    async fn test_api_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gmail/messages/gone"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let err = session(&server, Token::new("live", "Bearer"))
            .get_message("gone")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Api { status: 404, ref message } if message == "not found"));
    }

    #[tokio::test]
    async fn test_unsafe_message_ids_rejected() {
        let server = MockServer::start().await;
        let session = session(&server, Token::new("live", "Bearer"));

        for id in ["", "../profile", "a/b", "a\\b"] {
            assert!(matches!(
                session.get_message(id).await,
                Err(Error::InvalidMessageId(_))
            ));
        }
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_profile() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gmail/profile"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "emailAddress": "me@example.com",
                "messagesTotal": 10
            })))
            .mount(&server)
            .await;

        let identity = session(&server, Token::new("live", "Bearer"))
            .profile()
            .await
            .unwrap();
        assert_eq!(identity, AccountIdentity::new("me@example.com"));
    }

    #[tokio::test]
    async fn test_expired_token_refreshed_in_memory() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "fresh",
                "token_type": "Bearer",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/gmail/profile"))
            .and(header("authorization", "Bearer fresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"emailAddress": "me@example.com"})))
            .expect(2)
            .mount(&server)
            .await;

        let stale = Token::new("stale", "Bearer")
            .with_refresh_token("refresh-1")
            .with_expires_at(Utc::now() - ChronoDuration::minutes(5));
        let session = session(&server, stale);

        session.profile().await.unwrap();
        session.profile().await.unwrap();

        let current = session.token().await;
        assert_eq!(current.access_token, "fresh");
        assert_eq!(current.refresh_token.as_deref(), Some("refresh-1"));
    }

    #[tokio::test]
    async fn test_expired_token_without_refresh_token() {
        let server = MockServer::start().await;
        let stale = Token::new("stale", "Bearer").with_expires_at(Utc::now() - ChronoDuration::minutes(5));

        let err = session(&server, stale).profile().await.unwrap_err();
        assert!(err.needs_reauthorization());
    }

    #[test]
    fn test_timestamp_fallback() {
        let message: GmailMessage = serde_json::from_value(json!({"id": "x"})).unwrap();
        assert_eq!(message.timestamp().timestamp(), 0);
        assert_eq!(message.sender(), "");
    }
}
