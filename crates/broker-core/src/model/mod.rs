pub mod envelope;
pub mod execution;
pub mod ids;
pub mod pending_call;

pub use envelope::{CommandEnvelope, CommandEnvelopeKind, Envelope, ExecutionEnvelope, ExecutionEnvelopeKind, Usage};
pub use execution::{ClientSink, Execution, ExecutionStatus, EXECUTION_RETENTION};
pub use ids::{CallId, EnvelopeId, ExecutionId, ProcessId, PtyId, ServerId};
pub use pending_call::{PendingToolCall, ToolCallOutcome, TOOL_CALL_TIMEOUT};
