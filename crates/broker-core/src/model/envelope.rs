use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ErrorCode;
use crate::model::ids::{CallId, EnvelopeId, ExecutionId};

/// The unified stream item persisted into `Execution.events`, per §3.
/// Insertion order equals emission order (invariant 2) and is never rewound.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "direction", rename_all = "snake_case")]
pub enum Envelope {
    Execution(ExecutionEnvelope),
    Command(CommandEnvelope),
}

impl Envelope {
    pub fn id(&self) -> &EnvelopeId {
        match self {
            Envelope::Execution(e) => &e.id,
            Envelope::Command(c) => &c.id,
        }
    }

    /// True once the envelope represents one of the terminal states named in
    /// invariant 3 (`complete`/`error` with a terminal status, or `aborted`
    /// surfaced through `kind: "error"`/`"complete"`).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Envelope::Execution(ExecutionEnvelope {
                kind: ExecutionEnvelopeKind::Complete { .. } | ExecutionEnvelopeKind::Error { .. },
                ..
            })
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionEnvelope {
    pub id: EnvelopeId,
    #[serde(flatten)]
    pub kind: ExecutionEnvelopeKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionEnvelopeKind {
    RawMessage { message: Value },
    Stderr { data: String },
    Complete { usage: Option<Usage> },
    Error { error: String, code: Option<ErrorCode> },
    ToolCall { call_id: CallId, tool_name: String, args: Value },
    SessionStarted { session_id: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read_tokens: Option<u64>,
    pub cache_write_tokens: Option<u64>,
    /// Claude only.
    pub cost_usd: Option<f64>,
    /// Codex only; computed from wall clock rather than reported by the CLI.
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub id: EnvelopeId,
    #[serde(flatten)]
    pub kind: CommandEnvelopeKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandEnvelopeKind {
    StartQuery {
        execution_id: ExecutionId,
        prompt: Value,
        options: Value,
    },
    ToolResponse {
        execution_id: ExecutionId,
        call_id: CallId,
        result: Option<Value>,
        error: Option<String>,
    },
    Abort {
        execution_id: ExecutionId,
    },
    Reconnect {
        execution_id: ExecutionId,
    },
    ClearBuffer {
        execution_id: ExecutionId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_and_error_are_terminal_raw_message_is_not() {
        let complete = Envelope::Execution(ExecutionEnvelope {
            id: EnvelopeId::generate(),
            kind: ExecutionEnvelopeKind::Complete { usage: None },
        });
        let raw = Envelope::Execution(ExecutionEnvelope {
            id: EnvelopeId::generate(),
            kind: ExecutionEnvelopeKind::RawMessage { message: Value::Null },
        });
        assert!(complete.is_terminal());
        assert!(!raw.is_terminal());
    }
}
