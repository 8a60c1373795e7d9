#![forbid(unsafe_code)]
//! Component B: the generic JSONL stream spawner.
//!
//! Spawns a child, reads stdout line by line through a harness-specific
//! [`wrapper_events::LineParser`], accumulates stderr, and emits both as a
//! single ordered [`futures_core::Stream`]. Cancellation escalates
//! SIGTERM→SIGKILL exactly like [`subprocess_runner`]'s one-shot runner,
//! reusing the same kill path by shelling out through `subprocess-runner`'s
//! process group helpers where available.

mod cancel;
mod spawn;

pub use cancel::CancelHandle;
pub use spawn::{spawn_jsonl_stream, ExitOutcome, StreamItem, StreamSpec};
