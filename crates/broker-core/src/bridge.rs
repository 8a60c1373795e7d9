use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tokio::sync::oneshot;
use tokio::time::sleep;
use tracing::debug;

use crate::error::BrokerError;
use crate::model::{CallId, ExecutionId, PendingToolCall, ToolCallOutcome, TOOL_CALL_TIMEOUT};

/// Component F: a process-wide registry of pending tool calls, grounded on
/// `codex::mcp::CodexCallHandle`'s request-id + event-stream + oneshot-response
/// shape.
#[derive(Default)]
pub struct ToolCallBridge {
    pending: Mutex<HashMap<CallId, PendingEntry>>,
}

struct PendingEntry {
    execution_id: ExecutionId,
    tool_name: String,
    deadline: Instant,
    resolver: oneshot::Sender<ToolCallOutcome>,
}

impl ToolCallBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new pending call and spawns its timeout watchdog. Returns
    /// the receiver half the caller awaits for the tool's eventual outcome.
    pub fn register(
        self: &std::sync::Arc<Self>,
        call_id: CallId,
        execution_id: ExecutionId,
        tool_name: String,
    ) -> oneshot::Receiver<ToolCallOutcome> {
        let (tx, rx) = oneshot::channel();
        let deadline = Instant::now() + TOOL_CALL_TIMEOUT;
        {
            let mut pending = self.pending.lock().expect("bridge lock poisoned");
            pending.insert(
                call_id.clone(),
                PendingEntry {
                    execution_id,
                    tool_name,
                    deadline,
                    resolver: tx,
                },
            );
        }

        let bridge = self.clone();
        let watchdog_call_id = call_id;
        tokio::spawn(async move {
            sleep(TOOL_CALL_TIMEOUT).await;
            bridge.timeout(&watchdog_call_id);
        });

        rx
    }

    /// `tool_response` with `result` resolves with joined text content; with
    /// `error` resolves to an error outcome; unknown `callId` is a no-op.
    pub fn resolve(&self, call_id: &CallId, result: Option<Vec<String>>, error: Option<String>) -> Result<(), BrokerError> {
        let entry = self.take(call_id).ok_or_else(|| BrokerError::UnknownCall(call_id.as_str().to_string()))?;
        let outcome = match (result, error) {
            (Some(parts), _) => ToolCallOutcome::Result { content: parts.join("") },
            (None, Some(error)) => ToolCallOutcome::Error { error },
            (None, None) => ToolCallOutcome::Error {
                error: "tool_response carried neither result nor error".to_string(),
            },
        };
        let _ = entry.resolver.send(outcome);
        Ok(())
    }

    /// Rejects every pending call owned by `execution_id` with `"aborted"`.
    pub fn reject_for_execution(&self, execution_id: &ExecutionId) {
        let mut pending = self.pending.lock().expect("bridge lock poisoned");
        let doomed: Vec<CallId> = pending
            .iter()
            .filter(|(_, entry)| &entry.execution_id == execution_id)
            .map(|(id, _)| id.clone())
            .collect();
        for call_id in doomed {
            if let Some(entry) = pending.remove(&call_id) {
                let _ = entry.resolver.send(ToolCallOutcome::Aborted);
            }
        }
    }

    fn timeout(&self, call_id: &CallId) {
        let Some(entry) = self.take(call_id) else {
            return;
        };
        debug!(call_id = %call_id, tool = %entry.tool_name, "tool call timed out");
        let _ = entry.resolver.send(ToolCallOutcome::Timeout);
    }

    fn take(&self, call_id: &CallId) -> Option<PendingEntry> {
        self.pending.lock().expect("bridge lock poisoned").remove(call_id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().expect("bridge lock poisoned").len()
    }

    /// Time remaining for `call_id`, if still pending. Exposed for tests and
    /// GC sweeps rather than normal control flow.
    pub fn deadline(&self, call_id: &CallId) -> Option<Duration> {
        let pending = self.pending.lock().expect("bridge lock poisoned");
        pending.get(call_id).map(|entry| entry.deadline.saturating_duration_since(Instant::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn resolve_with_result_joins_content() {
        let bridge = Arc::new(ToolCallBridge::new());
        let rx = bridge.register(CallId::generate(), ExecutionId::generate(), "tool".to_string());
        let call_id = bridge.pending.lock().unwrap().keys().next().unwrap().clone();
        bridge.resolve(&call_id, Some(vec!["a".to_string(), "b".to_string()]), None).unwrap();
        match rx.await.unwrap() {
            ToolCallOutcome::Result { content } => assert_eq!(content, "ab"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn abort_rejects_only_owning_executions_calls() {
        let bridge = Arc::new(ToolCallBridge::new());
        let exec_a = ExecutionId::generate();
        let exec_b = ExecutionId::generate();
        let rx_a = bridge.register(CallId::generate(), exec_a.clone(), "t".to_string());
        let rx_b = bridge.register(CallId::generate(), exec_b, "t".to_string());

        bridge.reject_for_execution(&exec_a);

        assert!(matches!(rx_a.await.unwrap(), ToolCallOutcome::Aborted));
        assert_eq!(bridge.pending_count(), 1);
        drop(rx_b);
    }

    #[test]
    fn unknown_call_id_resolve_is_err() {
        let bridge = ToolCallBridge::new();
        let result = bridge.resolve(&CallId::generate(), Some(vec!["x".to_string()]), None);
        assert!(result.is_err());
    }
}
