use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::model::envelope::Envelope;
use crate::model::ids::ExecutionId;

/// Default GC retention after a terminal status change or last activity
/// (§3 invariant 5, §5 timeouts table).
pub const EXECUTION_RETENTION: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ExecutionStatus {
    InProgress,
    Completed,
    Error,
    Aborted,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ExecutionStatus::InProgress)
    }
}

/// A sink the broker can push envelopes to when a client is connected.
/// Sending to a destroyed sink is a silent no-op (§4.E "Client sink"); the
/// buffer in [`Execution::events`] remains the source of truth.
pub trait ClientSink: Send + Sync {
    fn send(&self, envelope: Envelope);
}

/// One logical CLI invocation, per §3's "Execution" entity.
pub struct Execution {
    pub id: ExecutionId,
    pub harness_id: String,
    pub status: ExecutionStatus,
    pub session_id: Option<String>,
    pub cwd: Option<String>,
    pub events: Vec<Envelope>,
    pub cancel: jsonl_stream::CancelHandle,
    pub client: Option<Arc<dyn ClientSink>>,
    pub created_at: Instant,
    pub completed_at: Option<Instant>,
    pub gc_deadline: Instant,
}

impl Execution {
    pub fn new(id: ExecutionId, harness_id: impl Into<String>, cancel: jsonl_stream::CancelHandle) -> Self {
        let now = Instant::now();
        Self {
            id,
            harness_id: harness_id.into(),
            status: ExecutionStatus::InProgress,
            session_id: None,
            cwd: None,
            events: Vec::new(),
            cancel,
            client: None,
            created_at: now,
            completed_at: None,
            gc_deadline: now + EXECUTION_RETENTION,
        }
    }

    /// Appends an envelope, sends it to the current client sink if any, and
    /// resets the GC timer (§3 invariant 5). Terminal envelopes also flip
    /// `status`/`completed_at`; the caller must not append further
    /// `raw_message` envelopes afterward (§3 invariant 3).
    pub fn append(&mut self, envelope: Envelope) {
        self.gc_deadline = Instant::now() + EXECUTION_RETENTION;
        if let Some(sink) = &self.client {
            sink.send(envelope.clone());
        }
        self.events.push(envelope);
    }

    pub fn mark_completed(&mut self) {
        self.status = ExecutionStatus::Completed;
        self.completed_at = Some(Instant::now());
    }

    pub fn mark_error(&mut self) {
        self.status = ExecutionStatus::Error;
        self.completed_at = Some(Instant::now());
    }

    pub fn mark_aborted(&mut self) {
        self.status = ExecutionStatus::Aborted;
        self.completed_at = Some(Instant::now());
    }

    pub fn is_gc_eligible(&self, now: Instant) -> bool {
        self.status.is_terminal() && now >= self.gc_deadline
    }
}
