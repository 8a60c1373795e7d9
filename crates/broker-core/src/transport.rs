use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::broker::Broker;
use crate::error::BrokerError;
use crate::harness::HarnessQuery;
use crate::model::{ClientSink, CommandEnvelopeKind, Envelope};

/// Component I. Grounded on the origin-check-then-dispatch shape used by
/// RPC layers in `other_examples`'s broker sketch: every request is checked
/// against an allow-list before a handler ever touches broker state.
#[derive(Clone, Copy, Eq, PartialEq)]
pub enum Environment {
    Development,
    Release,
}

pub struct OriginPolicy {
    env: Environment,
}

impl OriginPolicy {
    pub fn from_env() -> Self {
        let env = match std::env::var("NODE_ENV") {
            Ok(value) if value == "production" => Environment::Release,
            _ => Environment::Development,
        };
        Self { env }
    }

    pub fn new(env: Environment) -> Self {
        Self { env }
    }

    /// Loopback hostnames are always allowed; `file:` origins only in release
    /// builds (§4.I).
    pub fn check(&self, origin: &str) -> Result<(), BrokerError> {
        let is_loopback = origin.starts_with("http://localhost")
            || origin.starts_with("http://127.0.0.1")
            || origin.starts_with("https://localhost")
            || origin.starts_with("https://127.0.0.1");
        let is_file = origin.starts_with("file:");

        let allowed = is_loopback || (self.env == Environment::Release && is_file);
        if allowed {
            Ok(())
        } else {
            Err(BrokerError::OriginRejected(origin.to_string()))
        }
    }
}

/// A `{id, type, …payload}` request as received from the transport. The
/// RPC layer deserializes into this before translating into a
/// [`CommandEnvelopeKind`].
#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: CommandEnvelopeKind,
}

/// `{ok, …}` response envelope.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CommandResponse {
    Ok { ok: bool },
    OkWithEvents { ok: bool, events: Vec<Envelope> },
    Err { ok: bool, error: String },
}

impl CommandResponse {
    fn error(err: BrokerError) -> Self {
        CommandResponse::Err {
            ok: false,
            error: err.to_string(),
        }
    }
}

/// Validates the origin, then dispatches a typed command to the broker.
/// Per §7's propagation policy: pre-flight failures never create an
/// Execution and never emit an envelope.
pub struct Transport {
    origin_policy: OriginPolicy,
    broker: Arc<Broker>,
}

impl Transport {
    pub fn new(broker: Arc<Broker>) -> Self {
        Self {
            origin_policy: OriginPolicy::from_env(),
            broker,
        }
    }

    pub fn handle(
        &self,
        origin: &str,
        request: CommandRequest,
        harness_query: impl FnOnce(&Value, &Value) -> Result<(String, HarnessQuery), BrokerError>,
        client: Option<Arc<dyn ClientSink>>,
    ) -> CommandResponse {
        if let Err(err) = self.origin_policy.check(origin) {
            return CommandResponse::error(err);
        }

        match request.kind {
            CommandEnvelopeKind::StartQuery {
                execution_id,
                prompt,
                options,
            } => match harness_query(&prompt, &options) {
                Ok((harness_id, query)) => {
                    match self.broker.start_query(execution_id, &harness_id, query, client) {
                        Ok(()) => CommandResponse::Ok { ok: true },
                        Err(err) => CommandResponse::error(err),
                    }
                }
                Err(err) => CommandResponse::error(err),
            },
            CommandEnvelopeKind::ToolResponse {
                call_id, result, error, ..
            } => {
                let result = result.as_ref().and_then(content_text_blocks);
                match self.broker.tool_response(&call_id, result, error) {
                    Ok(()) => CommandResponse::Ok { ok: true },
                    Err(err) => CommandResponse::error(err),
                }
            }
            CommandEnvelopeKind::Abort { execution_id } => match self.broker.abort(&execution_id) {
                Ok(()) => CommandResponse::Ok { ok: true },
                Err(err) => CommandResponse::error(err),
            },
            CommandEnvelopeKind::Reconnect { execution_id } => {
                let Some(client) = client else {
                    return CommandResponse::error(BrokerError::MalformedCommand(
                        "reconnect requires a client sink".to_string(),
                    ));
                };
                match self.broker.reconnect(&execution_id, client) {
                    Ok(events) => CommandResponse::OkWithEvents { ok: true, events },
                    Err(err) => CommandResponse::error(err),
                }
            }
            CommandEnvelopeKind::ClearBuffer { execution_id } => {
                self.broker.clear_buffer(&execution_id);
                CommandResponse::Ok { ok: true }
            }
        }
    }
}

/// Extracts `result.content[].text` from a `tool_response`'s structured
/// `{content: [{type, text}, …]}` payload (§4.F / spec line 219). `result`
/// itself is never a bare string on the wire.
fn content_text_blocks(result: &Value) -> Option<Vec<String>> {
    let blocks = result.get("content")?.as_array()?;
    let texts: Vec<String> = blocks
        .iter()
        .filter_map(|block| block.get("text").and_then(Value::as_str))
        .map(|s| s.to_string())
        .collect();
    Some(texts)
}

/// `code:system:setGlobalEnv { env: {K:V, …} }`.
pub fn apply_global_env(env: std::collections::HashMap<String, String>) {
    subprocess_runner::GlobalEnvOverrides::set_globals(env);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_origins_allowed_in_dev() {
        let policy = OriginPolicy::new(Environment::Development);
        assert!(policy.check("http://localhost:1234").is_ok());
        assert!(policy.check("file:///index.html").is_err());
    }

    #[test]
    fn file_origin_only_allowed_in_release() {
        let policy = OriginPolicy::new(Environment::Release);
        assert!(policy.check("file:///index.html").is_ok());
        assert!(policy.check("http://evil.example.com").is_err());
    }

    #[test]
    fn content_text_blocks_extracts_and_preserves_order() {
        let result = serde_json::json!({
            "content": [
                {"type": "text", "text": "hello "},
                {"type": "text", "text": "world"},
            ]
        });
        assert_eq!(
            content_text_blocks(&result),
            Some(vec!["hello ".to_string(), "world".to_string()])
        );
    }

    #[test]
    fn content_text_blocks_skips_non_text_blocks() {
        let result = serde_json::json!({
            "content": [
                {"type": "image", "data": "base64..."},
                {"type": "text", "text": "only this"},
            ]
        });
        assert_eq!(content_text_blocks(&result), Some(vec!["only this".to_string()]));
    }

    #[test]
    fn content_text_blocks_none_without_content_array() {
        let result = serde_json::json!({"foo": "bar"});
        assert_eq!(content_text_blocks(&result), None);
    }
}
