//! Component C: an in-process HTTP MCP endpoint that exposes UI-provided
//! tools to a CLI harness, bearer-authenticated and bounded by a maximum
//! inflight call count.

mod auth;
mod service;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::{StreamableHttpServerConfig, StreamableHttpService};
use serde_json::Value;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use auth::AuthState;
use service::ToolServerService;

/// Minimum concurrent inflight calls per §4.C ("implementation-defined, >= 8").
pub const DEFAULT_MAX_INFLIGHT: usize = 8;

#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Outcome of invoking a client-defined tool handler.
pub enum ToolCallResult {
    Content(String),
    Error(String),
}

/// Dispatches a `call_tool(name, args)` request to whatever owns the actual
/// tool implementation. In the full broker this is backed by
/// `broker_core::bridge::ToolCallBridge`, awaiting the UI's `tool_response`.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, name: &str, args: Value) -> ToolCallResult;
}

#[derive(Debug, Error)]
pub enum ToolServerError {
    #[error("failed to bind tool server listener: {0}")]
    Bind(#[source] std::io::Error),
}

pub struct StartOptions {
    pub tools: Vec<ToolDefinition>,
    pub max_inflight: usize,
}

impl StartOptions {
    pub fn new(tools: Vec<ToolDefinition>) -> Self {
        Self {
            tools,
            max_inflight: DEFAULT_MAX_INFLIGHT,
        }
    }
}

/// What `start()` hands back to the harness layer: connection details to put
/// in the CLI's MCP server config, plus a `stop()` to tear it all down.
pub struct ServerConfig {
    pub url: String,
    pub headers: HashMap<String, String>,
}

pub struct Handle {
    pub server_config: ServerConfig,
    join: JoinHandle<()>,
}

impl Handle {
    /// Closes the listener, aborts inflight calls, and revokes the token
    /// (§4.C "stop()").
    pub fn stop(&self) {
        self.join.abort();
    }

    pub fn is_stopped(&self) -> bool {
        self.join.is_finished()
    }
}

/// `start(tools, opts) -> Handle{serverConfig, env?, stop}`.
pub async fn start(handler: Arc<dyn ToolHandler>, opts: StartOptions) -> Result<Handle, ToolServerError> {
    let token = auth::generate_token();
    let tools = Arc::new(opts.tools);
    let inflight = Arc::new(Semaphore::new(opts.max_inflight.max(DEFAULT_MAX_INFLIGHT)));

    let mcp_service = ToolServerService {
        tools,
        handler,
        inflight,
    };

    let session_manager = Arc::new(LocalSessionManager::default());
    let streamable: StreamableHttpService<ToolServerService, LocalSessionManager> = StreamableHttpService::new(
        {
            let mcp_service = mcp_service.clone();
            move || Ok(mcp_service.clone())
        },
        session_manager,
        StreamableHttpServerConfig {
            stateful_mode: false,
            sse_keep_alive: None,
        },
    );

    let auth_state = AuthState { expected: token.clone() };
    let router = axum::Router::new()
        .nest_service("/mcp", streamable)
        .route_layer(axum::middleware::from_fn_with_state(auth_state, auth::require_bearer));

    let listener = TcpListener::bind("127.0.0.1:0").await.map_err(ToolServerError::Bind)?;
    let addr: SocketAddr = listener.local_addr().map_err(ToolServerError::Bind)?;

    let join = tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    let mut headers = HashMap::new();
    headers.insert("Authorization".to_string(), format!("Bearer {token}"));

    tracing::info!(%addr, "tool server listening");

    Ok(Handle {
        server_config: ServerConfig {
            url: format!("http://{addr}/mcp"),
            headers,
        },
        join,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoHandler;

    #[async_trait]
    impl ToolHandler for EchoHandler {
        async fn call(&self, name: &str, _args: Value) -> ToolCallResult {
            ToolCallResult::Content(format!("called {name}"))
        }
    }

    #[tokio::test]
    async fn start_binds_an_ephemeral_loopback_port() {
        let handle = start(Arc::new(EchoHandler), StartOptions::new(vec![])).await.unwrap();
        assert!(handle.server_config.url.starts_with("http://127.0.0.1:"));
        assert!(handle.server_config.headers.contains_key("Authorization"));
        handle.stop();
    }
}
