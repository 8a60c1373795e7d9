//! Execution broker daemon binary.
//!
//! Starts the loopback RPC listener (component I) and wires the broker,
//! PTY/process supervisors, and OAuth coordinator behind it.
//!
//! # Environment variables
//!
//! - `BROKER_PORT` — loopback TCP port to bind (default: an OS-assigned
//!   ephemeral port).
//! - `RUST_LOG` — tracing filter (default: "info").
//! - `NODE_ENV` — `"production"` relaxes the origin allow-list to also admit
//!   `file:` origins (see [`broker_core::transport::OriginPolicy`]).

mod protocol;
mod sinks;
mod tools;
mod ws;

use std::sync::Arc;

use broker_core::{Broker, HarnessRegistry, Transport};
use oauth_coordinator::OauthCoordinator;
use process_supervisor::ProcessSupervisor;
use pty_supervisor::PtySupervisor;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Picks up the interactive shell's PATH (login shells on macOS strip it
    // from the GUI-launched process environment) before any harness spawns.
    if let Err(err) = subprocess_runner::capture_login_shell_path().await {
        tracing::warn!(%err, "login shell PATH capture failed");
    }

    let registry = HarnessRegistry::with_defaults();
    let broker = Broker::new(registry);
    let transport = Arc::new(Transport::new(broker.clone()));

    let state = ws::AppState {
        broker,
        transport,
        origin_policy: Arc::new(broker_core::OriginPolicy::from_env()),
        ptys: PtySupervisor::new(),
        processes: ProcessSupervisor::new(),
        oauth: OauthCoordinator::new(),
        tool_servers: Arc::new(tools::ToolServers::default()),
    };

    let port: u16 = std::env::var("BROKER_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(0);
    let bind_addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&bind_addr).await.expect("failed to bind broker RPC listener");
    let local_addr = listener.local_addr().expect("bound listener has a local address");

    tracing::info!(addr = %local_addr, "broker RPC listener starting");

    axum::serve(listener, ws::router(state)).await.expect("broker RPC server failed");
}
