//! Single-use loopback listener that receives the authorization redirect.
//!
//! The listener serves exactly one route. The first request on that route
//! decides the outcome: its `state` must match the nonce the listener was
//! created with and it must carry a `code`. The browser gets a short page,
//! the outcome goes to the waiting flow through a one-shot channel, and the
//! server is told to shut down gracefully so the response is flushed before
//! the socket closes.

use crate::error::{Error, Result};
use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use serde::Deserialize;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Default port for the redirect listener.
pub const DEFAULT_PORT: u16 = 8085;

/// Default redirect path.
pub const DEFAULT_PATH: &str = "/callback";

/// How long the user has to complete consent in the browser.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Where the listener binds and how long the flow waits for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopbackConfig {
    /// Local port. `0` picks a free port (tests).
    pub port: u16,
    /// Redirect path served by the listener.
    pub path: String,
    /// Time allowed between presenting the URL and receiving the redirect.
    pub timeout: Duration,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            path: DEFAULT_PATH.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl LoopbackConfig {
    /// Sets the port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Deserialize)]
struct RedirectParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

type OutcomeSender = oneshot::Sender<Result<String>>;

#[derive(Clone)]
struct RedirectState {
    expected_state: Arc<str>,
    outcome: Arc<Mutex<Option<OutcomeSender>>>,
    shutdown: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

/// A loopback HTTP listener bound for one authorization attempt.
///
/// Dropping the listener signals shutdown; [`LoopbackListener::shutdown`]
/// additionally waits until the server task has finished.
pub struct LoopbackListener {
    local_addr: SocketAddr,
    path: String,
    outcome_rx: Option<oneshot::Receiver<Result<String>>>,
    shutdown_tx: Arc<Mutex<Option<oneshot::Sender<()>>>>,
    server: Option<JoinHandle<io::Result<()>>>,
}

impl LoopbackListener {
    /// Binds `127.0.0.1:<port>` and starts serving the redirect path.
    ///
    /// # Errors
    ///
    /// Returns an error if the port cannot be bound.
    pub async fn bind(config: &LoopbackConfig, expected_state: impl Into<String>) -> Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, config.port)).await?;
        let local_addr = listener.local_addr()?;

        let (outcome_tx, outcome_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let shutdown_tx = Arc::new(Mutex::new(Some(shutdown_tx)));

        let state = RedirectState {
            expected_state: Arc::from(expected_state.into()),
            outcome: Arc::new(Mutex::new(Some(outcome_tx))),
            shutdown: Arc::clone(&shutdown_tx),
        };

        let router = Router::new()
            .route(&config.path, get(handle_redirect))
            .with_state(state);

        let server = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    // Either an explicit signal or the sender being dropped.
                    let _ = shutdown_rx.await;
                })
                .await
        });

        debug!(%local_addr, path = %config.path, "loopback listener started");

        Ok(Self {
            local_addr,
            path: config.path.clone(),
            outcome_rx: Some(outcome_rx),
            shutdown_tx,
            server: Some(server),
        })
    }

    /// Returns the bound socket address.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the redirect URI to register with the authorization request.
    #[must_use]
    pub fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}{}", self.local_addr.port(), self.path)
    }

    /// Waits for the redirect and returns the authorization code.
    ///
    /// Can only be called once per listener.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] if nothing arrives in time,
    /// [`Error::StateMismatch`] or [`Error::MissingCode`] for a bad redirect,
    /// [`Error::AccessDenied`] if the user declined consent.
    pub async fn wait_for_code(&mut self, timeout: Duration) -> Result<String> {
        let outcome_rx = self.outcome_rx.take().ok_or(Error::ListenerClosed)?;

        match tokio::time::timeout(timeout, outcome_rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(Error::ListenerClosed),
            Err(_) => Err(Error::Timeout(timeout.as_secs())),
        }
    }

    /// Stops the server and waits for it to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if the server task failed.
    pub async fn shutdown(mut self) -> Result<()> {
        self.signal_shutdown();
        if let Some(server) = self.server.take() {
            server.await.map_err(io::Error::other)??;
        }
        debug!(local_addr = %self.local_addr, "loopback listener stopped");
        Ok(())
    }

    fn signal_shutdown(&self) {
        if let Some(tx) = self.shutdown_tx.lock().ok().and_then(|mut tx| tx.take()) {
            let _ = tx.send(());
        }
    }
}

impl Drop for LoopbackListener {
    fn drop(&mut self) {
        if self.server.is_some() {
            self.signal_shutdown();
        }
    }
}

async fn handle_redirect(
    State(state): State<RedirectState>,
    Query(params): Query<RedirectParams>,
) -> (StatusCode, Html<String>) {
    let Some(outcome_tx) = state.outcome.lock().ok().and_then(|mut tx| tx.take()) else {
        return (
            StatusCode::GONE,
            page("This authorization attempt has already finished."),
        );
    };

    let outcome = validate_redirect(&state.expected_state, params);
    let response = match &outcome {
        Ok(_) => (
            StatusCode::OK,
            page("Authorization complete. You can close this window and return to the terminal."),
        ),
        Err(e) => {
            warn!("rejected authorization redirect: {e}");
            (
                StatusCode::BAD_REQUEST,
                page(&format!(
                    "Authorization failed: {}. Return to the terminal and try again.",
                    failure_reason(e)
                )),
            )
        }
    };

    // The flow may already have given up (timeout); nothing to deliver then.
    let _ = outcome_tx.send(outcome);

    if let Some(tx) = state.shutdown.lock().ok().and_then(|mut tx| tx.take()) {
        let _ = tx.send(());
    }

    response
}

fn validate_redirect(expected_state: &str, params: RedirectParams) -> Result<String> {
    if params.state.as_deref() != Some(expected_state) {
        return Err(Error::StateMismatch);
    }

    if let Some(error) = params.error {
        return Err(if error == "access_denied" {
            Error::AccessDenied
        } else {
            Error::oauth_error(error, "authorization redirect reported an error")
        });
    }

    params
        .code
        .filter(|code| !code.is_empty())
        .ok_or(Error::MissingCode)
}

// Fixed text only; redirect parameters never reach the page.
const fn failure_reason(error: &Error) -> &'static str {
    match error {
        Error::StateMismatch => "the response does not belong to this request",
        Error::AccessDenied => "access was denied",
        Error::MissingCode => "the response carried no authorization code",
        Error::OAuth { .. } => "the provider reported an error",
        _ => "unexpected response",
    }
}

fn page(message: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html><html><head><title>grabotp</title></head><body><p>{message}</p></body></html>"
    ))
}
