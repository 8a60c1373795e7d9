use std::time::{Duration, Instant};

use tokio::sync::oneshot;

use crate::model::ids::{CallId, ExecutionId};

/// Per §5's timeouts table: a tool call is rejected after 5 minutes unless
/// aborted earlier.
pub const TOOL_CALL_TIMEOUT: Duration = Duration::from_secs(5 * 60);

#[derive(Debug)]
pub enum ToolCallOutcome {
    Result { content: String },
    Error { error: String },
    Aborted,
    Timeout,
}

/// `{ callId, executionId, toolName, resolve, reject, deadline }` from §3.
/// `resolve`/`reject` are collapsed into a single oneshot sender carrying
/// [`ToolCallOutcome`].
pub struct PendingToolCall {
    pub call_id: CallId,
    pub execution_id: ExecutionId,
    pub tool_name: String,
    pub deadline: Instant,
    pub resolver: oneshot::Sender<ToolCallOutcome>,
}
