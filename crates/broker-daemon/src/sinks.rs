//! Per-connection sinks that turn broker/PTY/process/OAuth callbacks into
//! outbound RPC frames on a single websocket. Frames are built as plain
//! `serde_json::Value`s rather than through a shared enum, since each
//! channel's payload shape is independent (§6 "Event streams").

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use broker_core::model::{ClientSink, Envelope};
use oauth_coordinator::{OauthCompletion, OauthSink};
use process_supervisor::{ProcessSink, ProcessStatus};
use pty_supervisor::PtySink;
use serde_json::json;
use tokio::sync::mpsc::UnboundedSender;

/// Shared by every sink: best-effort send, never blocks the caller. A
/// disconnected client silently drops the frame (§5 backpressure).
fn push(tx: &UnboundedSender<String>, frame: serde_json::Value) {
    let _ = tx.send(frame.to_string());
}

pub struct HarnessClientSink {
    pub execution_id: String,
    pub tx: UnboundedSender<String>,
}

impl ClientSink for HarnessClientSink {
    fn send(&self, envelope: Envelope) {
        push(&self.tx, json!({"channel": "harness:event", "executionId": self.execution_id, "envelope": envelope}));
    }
}

pub struct PtyClientSink {
    pub pty_id: String,
    pub tx: UnboundedSender<String>,
}

impl PtySink for PtyClientSink {
    fn output(&self, chunk_base64: &str) {
        push(&self.tx, json!({"channel": format!("pty:output:{}", self.pty_id), "chunkBase64": chunk_base64}));
    }

    fn exit(&self, exit_code: Option<i32>) {
        push(&self.tx, json!({"channel": format!("pty:exit:{}", self.pty_id), "exitCode": exit_code}));
    }
}

pub struct ProcessClientSink {
    pub process_id: String,
    pub tx: UnboundedSender<String>,
}

impl ProcessSink for ProcessClientSink {
    fn stdout(&self, chunk: &[u8]) {
        push(
            &self.tx,
            json!({"channel": format!("process:output:{}", self.process_id), "stream": "stdout", "dataBase64": BASE64.encode(chunk)}),
        );
    }

    fn stderr(&self, chunk: &[u8]) {
        push(
            &self.tx,
            json!({"channel": format!("process:output:{}", self.process_id), "stream": "stderr", "dataBase64": BASE64.encode(chunk)}),
        );
    }

    fn exit(&self, status: ProcessStatus) {
        push(&self.tx, json!({"channel": format!("process:exit:{}", self.process_id), "status": format!("{status:?}")}));
    }

    fn error(&self, message: &str) {
        push(&self.tx, json!({"channel": format!("process:error:{}", self.process_id), "message": message}));
    }
}

pub struct OauthClientSink {
    pub tx: UnboundedSender<String>,
}

impl OauthSink for OauthClientSink {
    fn complete(&self, completion: OauthCompletion) {
        let tokens = completion.tokens.map(|t| {
            json!({
                "accessToken": t.access_token,
                "refreshToken": t.refresh_token,
                "tokenType": t.token_type,
                "expiresAt": t.expires_at,
            })
        });
        push(
            &self.tx,
            json!({
                "channel": "code:mcp:oauthComplete",
                "serverId": completion.server_id,
                "tokens": tokens,
                "error": completion.error,
            }),
        );
    }
}

pub fn wrap_client(execution_id: String, tx: UnboundedSender<String>) -> Arc<dyn ClientSink> {
    Arc::new(HarnessClientSink { execution_id, tx })
}
