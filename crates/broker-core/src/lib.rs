//! Core of the Execution broker: the orchestrator that mediates between an
//! untrusted UI client and long-running AI-coding CLI harnesses, normalizing
//! their JSONL event streams into a unified envelope, buffering events for
//! disconnected clients, and routing client-defined tool calls back to the
//! UI.

pub mod bridge;
pub mod broker;
pub mod error;
pub mod harness;
pub mod model;
pub mod paths;
pub mod transport;

pub use bridge::ToolCallBridge;
pub use broker::Broker;
pub use error::{BrokerError, ErrorCode};
pub use harness::{Harness, HarnessEventStream, HarnessRegistry};
pub use paths::StateRoot;
pub use transport::{CommandRequest, CommandResponse, Environment, OriginPolicy, Transport};
