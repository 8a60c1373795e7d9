//! Component J: the external-MCP OAuth coordinator.
//!
//! Browser UX (launching the system browser on the authorization URL) is a
//! UI-shell concern; this crate hands back the URL and does the loopback
//! listener, PKCE, discovery, and token-exchange plumbing around it.

mod discovery;
mod pkce;
mod token;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::routing::get;
use serde::Deserialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use uuid::Uuid;

pub use discovery::AuthorizationServerMetadata;
pub use token::OauthTokens;

pub const FLOW_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Error)]
pub enum OauthError {
    #[error("authorization server discovery failed: {0}")]
    Discovery(#[source] reqwest::Error),
    #[error("authorization server discovery returned HTTP {0}")]
    DiscoveryStatus(u16),
    #[error("authorization server has no registration_endpoint and no client_id was supplied")]
    NoRegistrationEndpoint,
    #[error("token exchange failed: {0}")]
    TokenExchange(#[source] reqwest::Error),
    #[error("token exchange returned HTTP {0}")]
    TokenExchangeStatus(u16),
    #[error("failed to bind oauth callback listener: {0}")]
    Listener(#[source] std::io::Error),
    #[error("oauth flow `{0}` not found")]
    FlowNotFound(String),
}

pub struct InitiateOutcome {
    pub authorization_url: String,
    pub redirect_uri: String,
}

pub struct OauthCompletion {
    pub server_id: String,
    pub tokens: Option<OauthTokens>,
    pub error: Option<String>,
}

/// Pushed to a connected client as `code:mcp:oauthComplete`.
pub trait OauthSink: Send + Sync {
    fn complete(&self, completion: OauthCompletion);
}

struct FlowHandle {
    cancel: oneshot::Sender<()>,
}

pub struct OauthCoordinator {
    http: reqwest::Client,
    flows: Mutex<HashMap<String, FlowHandle>>,
}

impl Default for OauthCoordinator {
    fn default() -> Self {
        Self { http: reqwest::Client::new(), flows: Mutex::new(HashMap::new()) }
    }
}

impl OauthCoordinator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// `initiate(serverId, serverUrl)`.
    pub async fn initiate(
        self: &Arc<Self>,
        server_id: String,
        server_url: String,
        sink: Arc<dyn OauthSink>,
    ) -> Result<InitiateOutcome, OauthError> {
        let metadata = discovery::discover(&self.http, &server_url).await?;

        let listener = TcpListener::bind("127.0.0.1:0").await.map_err(OauthError::Listener)?;
        let port = listener.local_addr().map_err(OauthError::Listener)?.port();
        let redirect_uri = format!("http://127.0.0.1:{port}/callback");

        let client_id = match &metadata.registration_endpoint {
            Some(endpoint) => discovery::register_client(&self.http, endpoint, &redirect_uri).await?,
            None => return Err(OauthError::NoRegistrationEndpoint),
        };

        let verifier = pkce::generate_verifier();
        let challenge = pkce::challenge_s256(&verifier);
        let state = Uuid::new_v4().to_string();

        let authorization_url = build_authorization_url(&metadata.authorization_endpoint, &client_id, &redirect_uri, &challenge, &state);

        let (callback_tx, callback_rx) = oneshot::channel::<CallbackOutcome>();
        let callback_state = Arc::new(CallbackState {
            expected_state: state,
            tx: Mutex::new(Some(callback_tx)),
        });
        let app = axum::Router::new().route("/callback", get(handle_callback)).with_state(callback_state);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
        });

        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        {
            let mut flows = self.flows.lock().expect("oauth flow map poisoned");
            if let Some(previous) = flows.remove(&server_id) {
                let _ = previous.cancel.send(());
            }
            flows.insert(server_id.clone(), FlowHandle { cancel: cancel_tx });
        }

        let coordinator = self.clone();
        let token_endpoint = metadata.token_endpoint.clone();
        tokio::spawn(coordinator.drive_flow(
            server_id,
            token_endpoint,
            client_id,
            redirect_uri.clone(),
            verifier,
            sink,
            callback_rx,
            cancel_rx,
            shutdown_tx,
        ));

        Ok(InitiateOutcome { authorization_url, redirect_uri })
    }

    #[allow(clippy::too_many_arguments)]
    async fn drive_flow(
        self: Arc<Self>,
        server_id: String,
        token_endpoint: String,
        client_id: String,
        redirect_uri: String,
        code_verifier: String,
        sink: Arc<dyn OauthSink>,
        callback_rx: oneshot::Receiver<CallbackOutcome>,
        cancel_rx: oneshot::Receiver<()>,
        shutdown_tx: oneshot::Sender<()>,
    ) {
        let outcome = tokio::select! {
            result = callback_rx => result.ok().map(FlowOutcome::Callback).unwrap_or(FlowOutcome::ListenerDropped),
            _ = cancel_rx => FlowOutcome::Cancelled,
            _ = tokio::time::sleep(FLOW_TIMEOUT) => FlowOutcome::TimedOut,
        };

        self.flows.lock().expect("oauth flow map poisoned").remove(&server_id);
        let _ = shutdown_tx.send(());

        let completion = match outcome {
            FlowOutcome::Callback(CallbackOutcome::Code(code)) => {
                match token::exchange_code(&self.http, &token_endpoint, &client_id, &code, &redirect_uri, &code_verifier).await {
                    Ok(tokens) => OauthCompletion { server_id: server_id.clone(), tokens: Some(tokens), error: None },
                    Err(err) => OauthCompletion { server_id: server_id.clone(), tokens: None, error: Some(err.to_string()) },
                }
            }
            FlowOutcome::Callback(CallbackOutcome::Error(message)) => {
                OauthCompletion { server_id: server_id.clone(), tokens: None, error: Some(message) }
            }
            FlowOutcome::Cancelled => {
                OauthCompletion { server_id: server_id.clone(), tokens: None, error: Some("cancelled".to_string()) }
            }
            FlowOutcome::TimedOut => {
                OauthCompletion { server_id: server_id.clone(), tokens: None, error: Some("timed out".to_string()) }
            }
            FlowOutcome::ListenerDropped => {
                OauthCompletion { server_id: server_id.clone(), tokens: None, error: Some("callback listener closed unexpectedly".to_string()) }
            }
        };
        sink.complete(completion);
    }

    /// `cancel(serverId)`.
    pub fn cancel(&self, server_id: &str) -> Result<(), OauthError> {
        let mut flows = self.flows.lock().expect("oauth flow map poisoned");
        let handle = flows.remove(server_id).ok_or_else(|| OauthError::FlowNotFound(server_id.to_string()))?;
        let _ = handle.cancel.send(());
        Ok(())
    }

    /// `code:mcp:testConnection`: discovery succeeding is treated as the
    /// connection test passing.
    pub async fn test_connection(&self, server_url: &str) -> Result<(), OauthError> {
        discovery::discover(&self.http, server_url).await.map(|_| ())
    }

    /// `refresh(serverUrl, refreshToken)`.
    pub async fn refresh(&self, server_url: &str, refresh_token: &str, client_id: &str) -> Result<OauthTokens, OauthError> {
        let metadata = discovery::discover(&self.http, server_url).await?;
        token::exchange_refresh_token(&self.http, &metadata.token_endpoint, client_id, refresh_token).await
    }
}

enum CallbackOutcome {
    Code(String),
    Error(String),
}

enum FlowOutcome {
    Callback(CallbackOutcome),
    Cancelled,
    TimedOut,
    ListenerDropped,
}

struct CallbackState {
    expected_state: String,
    tx: Mutex<Option<oneshot::Sender<CallbackOutcome>>>,
}

#[derive(Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

async fn handle_callback(State(state): State<Arc<CallbackState>>, Query(query): Query<CallbackQuery>) -> &'static str {
    let outcome = if let Some(message) = query.error {
        CallbackOutcome::Error(message)
    } else if query.state.as_deref() != Some(state.expected_state.as_str()) {
        CallbackOutcome::Error("state mismatch".to_string())
    } else if let Some(code) = query.code {
        CallbackOutcome::Code(code)
    } else {
        CallbackOutcome::Error("callback missing code".to_string())
    };

    if let Some(tx) = state.tx.lock().expect("callback lock poisoned").take() {
        let _ = tx.send(outcome);
    }
    "You can close this window and return to the app."
}

fn build_authorization_url(endpoint: &str, client_id: &str, redirect_uri: &str, challenge: &str, state: &str) -> String {
    let separator = if endpoint.contains('?') { '&' } else { '?' };
    format!(
        "{endpoint}{separator}response_type=code&client_id={client_id}&redirect_uri={redirect_uri}&code_challenge={challenge}&code_challenge_method=S256&state={state}",
        client_id = urlencode(client_id),
        redirect_uri = urlencode(redirect_uri),
        challenge = urlencode(challenge),
        state = urlencode(state),
    )
}

fn urlencode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_url_percent_encodes_redirect_uri() {
        let url = build_authorization_url(
            "https://auth.example.com/authorize",
            "client-123",
            "http://127.0.0.1:4567/callback",
            "challenge-value",
            "state-value",
        );
        assert!(url.contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A4567%2Fcallback"));
        assert!(url.contains("code_challenge_method=S256"));
    }

    #[test]
    fn cancel_on_unknown_flow_errors_without_panicking() {
        let coordinator = OauthCoordinator::default();
        assert!(matches!(coordinator.cancel("unknown"), Err(OauthError::FlowNotFound(_))));
    }
}
