#![forbid(unsafe_code)]
//! Component A: the subprocess runner.
//!
//! Launches and awaits a single child with a merged environment, bounded
//! output buffers, a timeout, and SIGTERM→SIGKILL escalation. Generalizes the
//! `spawn_with_retry`/`tee_stream` pair that both `claude_code::process` and
//! `codex::process` implement nearly identically.

mod env;
mod error;
mod kill;
mod run;

pub use env::{capture_login_shell_path, GlobalEnvOverrides};
pub use error::{FailureKind, RunnerError, SpawnFailure};
pub use kill::{escalating_kill, escalating_kill_group};
pub use run::{run, RunOutput, RunSpec};
