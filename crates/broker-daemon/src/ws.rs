//! The single RPC listener: one loopback websocket per connected client,
//! carrying every command channel named in §6 and streaming every event
//! channel back out over the same socket.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use broker_core::model::CommandEnvelopeKind;
use broker_core::{Broker, CommandRequest, CommandResponse, OriginPolicy, Transport};
use futures_util::{SinkExt, StreamExt};
use oauth_coordinator::OauthCoordinator;
use process_supervisor::ProcessSupervisor;
use pty_supervisor::PtySupervisor;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::{protocol, sinks};
use crate::tools::ToolServers;

#[derive(Clone)]
pub struct AppState {
    pub broker: Arc<Broker>,
    pub transport: Arc<Transport>,
    pub origin_policy: Arc<OriginPolicy>,
    pub ptys: Arc<PtySupervisor>,
    pub processes: Arc<ProcessSupervisor>,
    pub oauth: Arc<OauthCoordinator>,
    pub tool_servers: Arc<ToolServers>,
}

pub fn router(state: AppState) -> Router {
    Router::new().route("/rpc", get(ws_handler)).with_state(state)
}

async fn ws_handler(ws: WebSocketUpgrade, headers: HeaderMap, State(state): State<AppState>) -> impl IntoResponse {
    let origin = headers.get(axum::http::header::ORIGIN).and_then(|v| v.to_str().ok()).unwrap_or("").to_string();
    if state.origin_policy.check(&origin).is_err() {
        return (StatusCode::FORBIDDEN, "origin not allow-listed").into_response();
    }
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let writer = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = receiver.next().await {
        let Message::Text(text) = message else { continue };
        dispatch(&text, &state, &tx).await;
    }

    writer.abort();
}

#[derive(Deserialize)]
struct Frame {
    id: String,
    channel: String,
    #[serde(flatten)]
    rest: Value,
}

async fn dispatch(text: &str, state: &AppState, tx: &mpsc::UnboundedSender<String>) {
    let raw: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(err) => {
            reply_err(tx, "", format!("malformed json: {err}"));
            return;
        }
    };
    let envelope: Frame = match serde_json::from_value(raw) {
        Ok(e) => e,
        Err(err) => {
            reply_err(tx, "", format!("malformed envelope: {err}"));
            return;
        }
    };

    match envelope.channel.as_str() {
        "harness:command" => dispatch_harness(envelope, state, tx).await,
        "pty:spawn" => dispatch_pty_spawn(envelope, state, tx),
        "pty:write" => dispatch_pty_write(envelope, state, tx),
        "pty:resize" => dispatch_pty_resize(envelope, state, tx),
        "pty:kill" => dispatch_pty_kill(envelope, state, tx),
        "pty:reconnect" => dispatch_pty_reconnect(envelope, state, tx),
        "pty:killAll" => {
            state.ptys.kill_all();
            reply_ok(tx, &envelope.id, json!({}));
        }
        "process:runCmd" => dispatch_process_run_cmd(envelope, state, tx),
        "process:runScript" => dispatch_process_run_script(envelope, state, tx),
        "process:reconnect" => dispatch_process_reconnect(envelope, state, tx),
        "process:kill" => dispatch_process_kill(envelope, state, tx).await,
        "process:list" => {
            let summaries: Vec<Value> = state
                .processes
                .list()
                .into_iter()
                .map(|p| json!({"processId": p.id.0, "status": format!("{:?}", p.status)}))
                .collect();
            reply_ok(tx, &envelope.id, json!({"processes": summaries}));
        }
        "process:killAll" => {
            state.processes.kill_all().await;
            reply_ok(tx, &envelope.id, json!({}));
        }
        "code:system:setGlobalEnv" => dispatch_set_global_env(envelope, tx),
        "code:mcp:testConnection" => dispatch_mcp_test_connection(envelope, state, tx).await,
        "code:mcp:initiateOAuth" => dispatch_mcp_initiate_oauth(envelope, state, tx).await,
        "code:mcp:cancelOAuth" => dispatch_mcp_cancel_oauth(envelope, state, tx),
        "code:mcp:refreshOAuth" => dispatch_mcp_refresh_oauth(envelope, state, tx).await,
        other => reply_err(tx, &envelope.id, format!("unknown channel `{other}`")),
    }
}

fn reply_ok(tx: &mpsc::UnboundedSender<String>, id: &str, extra: Value) {
    let mut body = extra;
    if let Value::Object(ref mut map) = body {
        map.insert("id".to_string(), json!(id));
        map.insert("ok".to_string(), json!(true));
    }
    let _ = tx.send(body.to_string());
}

fn reply_err(tx: &mpsc::UnboundedSender<String>, id: &str, error: impl std::fmt::Display) {
    let _ = tx.send(json!({"id": id, "ok": false, "error": error.to_string()}).to_string());
}

fn reply_command_response(tx: &mpsc::UnboundedSender<String>, id: &str, response: CommandResponse) {
    let mut value = serde_json::to_value(&response).unwrap_or_else(|_| json!({"ok": false, "error": "internal serialization error"}));
    if let Value::Object(ref mut map) = value {
        map.insert("id".to_string(), json!(id));
    }
    let _ = tx.send(value.to_string());
}

async fn dispatch_harness(envelope: Frame, state: &AppState, tx: &mpsc::UnboundedSender<String>) {
    // `CommandRequest`'s `type` field nests the whole tagged `CommandEnvelopeKind`
    // (tag `kind`), so `execution_id` lives one level down from this envelope.
    let execution_id = envelope
        .rest
        .get("type")
        .and_then(|t| t.get("execution_id"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let mut full = envelope.rest;
    if let Value::Object(ref mut map) = full {
        map.insert("id".to_string(), json!(envelope.id));
    }
    let mut request: CommandRequest = match serde_json::from_value(full) {
        Ok(r) => r,
        Err(err) => {
            reply_err(tx, &envelope.id, format!("malformed harness command: {err}"));
            return;
        }
    };

    if let CommandEnvelopeKind::StartQuery { ref mut options, .. } = request.kind {
        if let Err(err) = crate::tools::provision(&state.tool_servers, state.broker.clone(), &execution_id, options).await {
            reply_err(tx, &envelope.id, format!("failed to start client-tool server: {err}"));
            return;
        }
    }
    let tears_down_tools = matches!(request.kind, CommandEnvelopeKind::Abort { .. } | CommandEnvelopeKind::ClearBuffer { .. });

    let client = sinks::wrap_client(execution_id.clone(), tx.clone());
    // Origin already validated at connect time; re-passed here only because
    // `Transport::handle`'s signature takes it per call.
    let response = state.transport.handle("loopback", request, protocol::build_harness_query, Some(client));
    if tears_down_tools {
        state.tool_servers.stop(&execution_id);
    }
    reply_command_response(tx, &envelope.id, response);
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PtySpawnPayload {
    pty_id: String,
    cwd: Option<String>,
    cols: u16,
    rows: u16,
    #[serde(default)]
    env: HashMap<String, String>,
}

fn dispatch_pty_spawn(envelope: Frame, state: &AppState, tx: &mpsc::UnboundedSender<String>) {
    let payload: PtySpawnPayload = match serde_json::from_value(envelope.rest) {
        Ok(p) => p,
        Err(err) => return reply_err(tx, &envelope.id, err),
    };
    let sink = Arc::new(sinks::PtyClientSink { pty_id: payload.pty_id.clone(), tx: tx.clone() });
    let result = state.ptys.spawn(
        pty_supervisor::PtyId(payload.pty_id),
        payload.cwd.as_deref(),
        payload.cols,
        payload.rows,
        &payload.env,
        Some(sink),
    );
    match result {
        Ok(()) => reply_ok(tx, &envelope.id, json!({})),
        Err(err) => reply_err(tx, &envelope.id, err),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PtyWritePayload {
    pty_id: String,
    data_base64: String,
}

fn dispatch_pty_write(envelope: Frame, state: &AppState, tx: &mpsc::UnboundedSender<String>) {
    let payload: PtyWritePayload = match serde_json::from_value(envelope.rest) {
        Ok(p) => p,
        Err(err) => return reply_err(tx, &envelope.id, err),
    };
    match state.ptys.write(&pty_supervisor::PtyId(payload.pty_id), &payload.data_base64) {
        Ok(()) => reply_ok(tx, &envelope.id, json!({})),
        Err(err) => reply_err(tx, &envelope.id, err),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PtyResizePayload {
    pty_id: String,
    cols: u16,
    rows: u16,
}

fn dispatch_pty_resize(envelope: Frame, state: &AppState, tx: &mpsc::UnboundedSender<String>) {
    let payload: PtyResizePayload = match serde_json::from_value(envelope.rest) {
        Ok(p) => p,
        Err(err) => return reply_err(tx, &envelope.id, err),
    };
    match state.ptys.resize(&pty_supervisor::PtyId(payload.pty_id), payload.cols, payload.rows) {
        Ok(()) => reply_ok(tx, &envelope.id, json!({})),
        Err(err) => reply_err(tx, &envelope.id, err),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PtyIdPayload {
    pty_id: String,
}

fn dispatch_pty_kill(envelope: Frame, state: &AppState, tx: &mpsc::UnboundedSender<String>) {
    let payload: PtyIdPayload = match serde_json::from_value(envelope.rest) {
        Ok(p) => p,
        Err(err) => return reply_err(tx, &envelope.id, err),
    };
    match state.ptys.kill(&pty_supervisor::PtyId(payload.pty_id)) {
        Ok(()) => reply_ok(tx, &envelope.id, json!({})),
        Err(err) => reply_err(tx, &envelope.id, err),
    }
}

fn dispatch_pty_reconnect(envelope: Frame, state: &AppState, tx: &mpsc::UnboundedSender<String>) {
    let payload: PtyIdPayload = match serde_json::from_value(envelope.rest) {
        Ok(p) => p,
        Err(err) => return reply_err(tx, &envelope.id, err),
    };
    let sink = Arc::new(sinks::PtyClientSink { pty_id: payload.pty_id.clone(), tx: tx.clone() });
    match state.ptys.reconnect(&pty_supervisor::PtyId(payload.pty_id), sink) {
        Ok(()) => reply_ok(tx, &envelope.id, json!({})),
        Err(err) => reply_err(tx, &envelope.id, err),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProcessRunCmdPayload {
    process_id: String,
    program: String,
    #[serde(default)]
    args: Vec<String>,
    cwd: Option<String>,
    #[serde(default)]
    env: HashMap<String, String>,
    timeout_ms: Option<u64>,
}

fn dispatch_process_run_cmd(envelope: Frame, state: &AppState, tx: &mpsc::UnboundedSender<String>) {
    let payload: ProcessRunCmdPayload = match serde_json::from_value(envelope.rest) {
        Ok(p) => p,
        Err(err) => return reply_err(tx, &envelope.id, err),
    };
    let sink = Arc::new(sinks::ProcessClientSink { process_id: payload.process_id.clone(), tx: tx.clone() });
    let result = state.processes.run_cmd(
        process_supervisor::ProcessId(payload.process_id),
        &payload.program,
        &payload.args,
        payload.cwd.as_deref(),
        &payload.env,
        payload.timeout_ms.map(std::time::Duration::from_millis),
        Some(sink),
    );
    match result {
        Ok(()) => reply_ok(tx, &envelope.id, json!({})),
        Err(err) => reply_err(tx, &envelope.id, err),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProcessRunScriptPayload {
    process_id: String,
    script: String,
    cwd: Option<String>,
    #[serde(default)]
    env: HashMap<String, String>,
    timeout_ms: Option<u64>,
}

fn dispatch_process_run_script(envelope: Frame, state: &AppState, tx: &mpsc::UnboundedSender<String>) {
    let payload: ProcessRunScriptPayload = match serde_json::from_value(envelope.rest) {
        Ok(p) => p,
        Err(err) => return reply_err(tx, &envelope.id, err),
    };
    let sink = Arc::new(sinks::ProcessClientSink { process_id: payload.process_id.clone(), tx: tx.clone() });
    let result = state.processes.run_script(
        process_supervisor::ProcessId(payload.process_id),
        &payload.script,
        payload.cwd.as_deref(),
        &payload.env,
        payload.timeout_ms.map(std::time::Duration::from_millis),
        Some(sink),
    );
    match result {
        Ok(()) => reply_ok(tx, &envelope.id, json!({})),
        Err(err) => reply_err(tx, &envelope.id, err),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProcessIdPayload {
    process_id: String,
}

fn dispatch_process_reconnect(envelope: Frame, state: &AppState, tx: &mpsc::UnboundedSender<String>) {
    let payload: ProcessIdPayload = match serde_json::from_value(envelope.rest) {
        Ok(p) => p,
        Err(err) => return reply_err(tx, &envelope.id, err),
    };
    let sink = Arc::new(sinks::ProcessClientSink { process_id: payload.process_id.clone(), tx: tx.clone() });
    match state.processes.reconnect(&process_supervisor::ProcessId(payload.process_id), sink) {
        Ok(()) => reply_ok(tx, &envelope.id, json!({})),
        Err(err) => reply_err(tx, &envelope.id, err),
    }
}

async fn dispatch_process_kill(envelope: Frame, state: &AppState, tx: &mpsc::UnboundedSender<String>) {
    let payload: ProcessIdPayload = match serde_json::from_value(envelope.rest) {
        Ok(p) => p,
        Err(err) => return reply_err(tx, &envelope.id, err),
    };
    match state.processes.kill(&process_supervisor::ProcessId(payload.process_id)).await {
        Ok(()) => reply_ok(tx, &envelope.id, json!({})),
        Err(err) => reply_err(tx, &envelope.id, err),
    }
}

fn dispatch_set_global_env(envelope: Frame, tx: &mpsc::UnboundedSender<String>) {
    #[derive(Deserialize)]
    struct Payload {
        env: HashMap<String, String>,
    }
    let payload: Payload = match serde_json::from_value(envelope.rest) {
        Ok(p) => p,
        Err(err) => return reply_err(tx, &envelope.id, err),
    };
    broker_core::transport::apply_global_env(payload.env);
    reply_ok(tx, &envelope.id, json!({}));
}

async fn dispatch_mcp_test_connection(envelope: Frame, state: &AppState, tx: &mpsc::UnboundedSender<String>) {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Payload {
        server_url: String,
    }
    let payload: Payload = match serde_json::from_value(envelope.rest) {
        Ok(p) => p,
        Err(err) => return reply_err(tx, &envelope.id, err),
    };
    match state.oauth.test_connection(&payload.server_url).await {
        Ok(()) => reply_ok(tx, &envelope.id, json!({})),
        Err(err) => reply_err(tx, &envelope.id, err),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OauthInitiatePayload {
    server_id: String,
    server_url: String,
}

async fn dispatch_mcp_initiate_oauth(envelope: Frame, state: &AppState, tx: &mpsc::UnboundedSender<String>) {
    let payload: OauthInitiatePayload = match serde_json::from_value(envelope.rest) {
        Ok(p) => p,
        Err(err) => return reply_err(tx, &envelope.id, err),
    };
    let sink = Arc::new(sinks::OauthClientSink { tx: tx.clone() });
    match state.oauth.initiate(payload.server_id, payload.server_url, sink).await {
        Ok(outcome) => reply_ok(tx, &envelope.id, json!({"authorizationUrl": outcome.authorization_url, "redirectUri": outcome.redirect_uri})),
        Err(err) => reply_err(tx, &envelope.id, err),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OauthCancelPayload {
    server_id: String,
}

fn dispatch_mcp_cancel_oauth(envelope: Frame, state: &AppState, tx: &mpsc::UnboundedSender<String>) {
    let payload: OauthCancelPayload = match serde_json::from_value(envelope.rest) {
        Ok(p) => p,
        Err(err) => return reply_err(tx, &envelope.id, err),
    };
    match state.oauth.cancel(&payload.server_id) {
        Ok(()) => reply_ok(tx, &envelope.id, json!({})),
        Err(err) => reply_err(tx, &envelope.id, err),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OauthRefreshPayload {
    server_url: String,
    refresh_token: String,
    client_id: String,
}

async fn dispatch_mcp_refresh_oauth(envelope: Frame, state: &AppState, tx: &mpsc::UnboundedSender<String>) {
    let payload: OauthRefreshPayload = match serde_json::from_value(envelope.rest) {
        Ok(p) => p,
        Err(err) => return reply_err(tx, &envelope.id, err),
    };
    match state.oauth.refresh(&payload.server_url, &payload.refresh_token, &payload.client_id).await {
        Ok(tokens) => reply_ok(
            tx,
            &envelope.id,
            json!({"tokens": {"accessToken": tokens.access_token, "refreshToken": tokens.refresh_token, "tokenType": tokens.token_type, "expiresAt": tokens.expires_at}}),
        ),
        Err(err) => reply_err(tx, &envelope.id, err),
    }
}
