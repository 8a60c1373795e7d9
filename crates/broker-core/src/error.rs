use serde::{Deserialize, Serialize};
use thiserror::Error;

/// §7's error taxonomy, shared by harness event classification and RPC
/// handler failures.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ErrorCode {
    NotInstalled,
    AuthFailed,
    RateLimited,
    ContextOverflow,
    ProcessCrashed,
    Aborted,
    Timeout,
    Unknown,
}

/// Pre-flight / RPC-handler failures. These never create an Execution and
/// never produce an envelope — they're returned directly as `{ok:false,
/// error}` per §7's propagation policy.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("execution `{0}` is already live")]
    ExecutionAlreadyLive(String),
    #[error("execution `{0}` not found")]
    ExecutionNotFound(String),
    #[error("unknown harness `{0}`")]
    UnknownHarness(String),
    #[error("pending tool call `{0}` not found")]
    UnknownCall(String),
    #[error("request origin `{0}` is not allow-listed")]
    OriginRejected(String),
    #[error("malformed command: {0}")]
    MalformedCommand(String),
}
