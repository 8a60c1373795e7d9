use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::oneshot;
use tracing::debug;

use crate::bridge::ToolCallBridge;
use crate::error::{BrokerError, ErrorCode};
use crate::harness::{HarnessEvent, HarnessQuery, HarnessRegistry};
use crate::model::{
    CallId, ClientSink, Envelope, EnvelopeId, Execution, ExecutionEnvelope, ExecutionEnvelopeKind,
    ExecutionId, ToolCallOutcome,
};

const GC_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Component E: the per-execution state machine described in §4.E.
pub struct Broker {
    executions: Mutex<HashMap<ExecutionId, Execution>>,
    harnesses: HarnessRegistry,
    bridge: Arc<ToolCallBridge>,
}

impl Broker {
    pub fn new(harnesses: HarnessRegistry) -> Arc<Self> {
        let broker = Arc::new(Self {
            executions: Mutex::new(HashMap::new()),
            harnesses,
            bridge: Arc::new(ToolCallBridge::new()),
        });
        spawn_gc_sweep(broker.clone());
        broker
    }

    pub fn bridge(&self) -> Arc<ToolCallBridge> {
        self.bridge.clone()
    }

    /// `start_query`: precondition is that `executionId` is not already live.
    pub fn start_query(
        self: &Arc<Self>,
        execution_id: ExecutionId,
        harness_id: &str,
        query: HarnessQuery,
        client: Option<Arc<dyn ClientSink>>,
    ) -> Result<(), BrokerError> {
        {
            let executions = self.executions.lock().expect("executions lock poisoned");
            if executions.contains_key(&execution_id) {
                return Err(BrokerError::ExecutionAlreadyLive(execution_id.as_str().to_string()));
            }
        }

        let harness = self
            .harnesses
            .get(harness_id)
            .ok_or_else(|| BrokerError::UnknownHarness(harness_id.to_string()))?;

        let (stream, cancel) = harness.query(query);
        let mut execution = Execution::new(execution_id.clone(), harness_id, cancel);
        execution.client = client;

        {
            let mut executions = self.executions.lock().expect("executions lock poisoned");
            executions.insert(execution_id.clone(), execution);
        }

        let broker = self.clone();
        tokio::spawn(async move {
            broker.drive_stream(execution_id, stream).await;
        });

        Ok(())
    }

    async fn drive_stream(
        self: Arc<Self>,
        execution_id: ExecutionId,
        mut stream: crate::harness::HarnessEventStream,
    ) {
        use futures_util::StreamExt;

        loop {
            let event = match stream.next().await {
                Some(event) => event,
                None => break,
            };

            let terminal = matches!(event, HarnessEvent::Complete { .. } | HarnessEvent::Error { .. });
            let envelope = harness_event_to_envelope(event);

            let mut executions = self.executions.lock().expect("executions lock poisoned");
            let Some(execution) = executions.get_mut(&execution_id) else {
                break;
            };
            if execution.status.is_terminal() {
                // Invariant 3: after abort/terminal, no further envelopes append.
                break;
            }
            execution.append(envelope);
            if terminal {
                match execution.events.last() {
                    Some(Envelope::Execution(ExecutionEnvelope {
                        kind: ExecutionEnvelopeKind::Error { .. },
                        ..
                    })) => execution.mark_error(),
                    _ => execution.mark_completed(),
                }
                drop(executions);
                break;
            }
        }

        // Stream ended without an explicit terminal envelope (e.g. abort):
        // make sure the Execution still reaches a terminal status.
        let mut executions = self.executions.lock().expect("executions lock poisoned");
        if let Some(execution) = executions.get_mut(&execution_id) {
            if !execution.status.is_terminal() {
                execution.mark_aborted();
            }
        }
    }

    /// `tool_response(executionId, callId, result?/error?)`.
    pub fn tool_response(
        &self,
        call_id: &CallId,
        result: Option<Vec<String>>,
        error: Option<String>,
    ) -> Result<(), BrokerError> {
        self.bridge.resolve(call_id, result, error)
    }

    /// Called by the tool server (component C) when the CLI invokes a client
    /// tool. Appends the `tool_call` envelope and registers the pending
    /// bridge entry, per §4.F rule 1.
    pub fn record_tool_call(
        self: &Arc<Self>,
        execution_id: &ExecutionId,
        call_id: CallId,
        tool_name: String,
        args: Value,
    ) -> Result<oneshot::Receiver<ToolCallOutcome>, BrokerError> {
        {
            let mut executions = self.executions.lock().expect("executions lock poisoned");
            let execution = executions
                .get_mut(execution_id)
                .ok_or_else(|| BrokerError::ExecutionNotFound(execution_id.as_str().to_string()))?;
            execution.append(Envelope::Execution(ExecutionEnvelope {
                id: EnvelopeId::generate(),
                kind: ExecutionEnvelopeKind::ToolCall {
                    call_id: call_id.clone(),
                    tool_name: tool_name.clone(),
                    args,
                },
            }));
        }

        Ok(self.bridge.register(call_id, execution_id.clone(), tool_name))
    }

    /// `abort(executionId)`: fires the cancel handle, transitions to
    /// `aborted`, rejects pending tool calls, and resets the GC timer.
    pub fn abort(&self, execution_id: &ExecutionId) -> Result<(), BrokerError> {
        let mut executions = self.executions.lock().expect("executions lock poisoned");
        let execution = executions
            .get_mut(execution_id)
            .ok_or_else(|| BrokerError::ExecutionNotFound(execution_id.as_str().to_string()))?;

        if execution.status.is_terminal() {
            return Ok(());
        }

        execution.cancel.cancel();
        execution.append(Envelope::Execution(ExecutionEnvelope {
            id: EnvelopeId::generate(),
            kind: ExecutionEnvelopeKind::Error {
                error: "aborted".to_string(),
                code: Some(ErrorCode::Aborted),
            },
        }));
        execution.mark_aborted();
        drop(executions);

        self.bridge.reject_for_execution(execution_id);
        Ok(())
    }

    /// `reconnect(executionId)`: replaces the client sink and returns the
    /// buffered history in original order.
    pub fn reconnect(
        &self,
        execution_id: &ExecutionId,
        client: Arc<dyn ClientSink>,
    ) -> Result<Vec<Envelope>, BrokerError> {
        let mut executions = self.executions.lock().expect("executions lock poisoned");
        let execution = executions
            .get_mut(execution_id)
            .ok_or_else(|| BrokerError::ExecutionNotFound(execution_id.as_str().to_string()))?;
        execution.client = Some(client);
        execution.gc_deadline = Instant::now() + crate::model::EXECUTION_RETENTION;
        Ok(execution.events.clone())
    }

    /// `clear_buffer(executionId)`: always `{ok:true}`, even if already gone.
    pub fn clear_buffer(&self, execution_id: &ExecutionId) {
        let mut executions = self.executions.lock().expect("executions lock poisoned");
        if let Some(execution) = executions.remove(execution_id) {
            if !execution.status.is_terminal() {
                execution.cancel.cancel();
            }
        }
    }

    fn gc_sweep(&self) {
        let now = Instant::now();
        let mut executions = self.executions.lock().expect("executions lock poisoned");
        let doomed: Vec<ExecutionId> = executions
            .iter()
            .filter(|(_, execution)| execution.is_gc_eligible(now))
            .map(|(id, _)| id.clone())
            .collect();
        for id in doomed {
            debug!(execution_id = %id, "GC sweep removing retained execution");
            executions.remove(&id);
        }
    }
}

fn spawn_gc_sweep(broker: Arc<Broker>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(GC_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            broker.gc_sweep();
        }
    });
}

fn harness_event_to_envelope(event: HarnessEvent) -> Envelope {
    let kind = match event {
        HarnessEvent::Message(message) => ExecutionEnvelopeKind::RawMessage { message },
        HarnessEvent::SessionStarted { session_id } => ExecutionEnvelopeKind::SessionStarted { session_id },
        HarnessEvent::Complete { usage } => ExecutionEnvelopeKind::Complete { usage },
        HarnessEvent::Error { error, code } => ExecutionEnvelopeKind::Error { error, code },
        HarnessEvent::Stderr { data } => ExecutionEnvelopeKind::Stderr { data },
    };
    Envelope::Execution(ExecutionEnvelope {
        id: EnvelopeId::generate(),
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::{Harness, HarnessCapabilities, HarnessEventStream, InstallStatus};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubSink {
        count: AtomicUsize,
    }

    impl ClientSink for StubSink {
        fn send(&self, _envelope: Envelope) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct StubHarness;

    #[async_trait]
    impl Harness for StubHarness {
        fn id(&self) -> &'static str {
            "stub"
        }
        fn models(&self) -> Vec<String> {
            vec![]
        }
        fn capabilities(&self) -> HarnessCapabilities {
            HarnessCapabilities::default()
        }
        async fn check_install_status(&self) -> InstallStatus {
            InstallStatus::Installed { version: "0".to_string() }
        }
        async fn discover_slash_commands(&self, _cwd: &str) -> Vec<String> {
            vec![]
        }
        fn query(&self, _query: HarnessQuery) -> (HarnessEventStream, jsonl_stream::CancelHandle) {
            let (cancel, _signal) = jsonl_stream::CancelHandle::new();
            let events = vec![
                HarnessEvent::SessionStarted { session_id: "s1".to_string() },
                HarnessEvent::Message(serde_json::json!({"type": "assistant"})),
                HarnessEvent::Complete { usage: None },
            ];
            let stream = futures_util::stream::iter(events);
            (Box::pin(stream), cancel)
        }
    }

    #[tokio::test]
    async fn start_query_rejects_duplicate_execution_id() {
        let mut registry = HarnessRegistry::new();
        registry.register(Arc::new(StubHarness));
        let broker = Broker::new(registry);
        let id = ExecutionId::generate();
        broker
            .start_query(id.clone(), "stub", HarnessQuery::new("/tmp"), None)
            .unwrap();
        let err = broker.start_query(id, "stub", HarnessQuery::new("/tmp"), None);
        assert!(matches!(err, Err(BrokerError::ExecutionAlreadyLive(_))));
    }

    #[tokio::test]
    async fn unknown_execution_commands_do_not_allocate_state() {
        let registry = HarnessRegistry::new();
        let broker = Broker::new(registry);
        let id = ExecutionId::generate();
        assert!(broker.abort(&id).is_err());
        assert!(matches!(
            broker.reconnect(&id, Arc::new(StubSink { count: AtomicUsize::new(0) })),
            Err(BrokerError::ExecutionNotFound(_))
        ));
        // clear_buffer is always ok, even for unknown ids.
        broker.clear_buffer(&id);
    }
}
