use std::path::PathBuf;

use thiserror::Error;

/// Coarse failure classification. Per the component contract, only these two
/// cases need separating from the generic non-zero-exit bucket; everything
/// else is reported through [`crate::RunOutput`] with `success = false`.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FailureKind {
    NotInstalled,
    Timeout,
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to join output-draining task: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("failed to capture login shell PATH: {0}")]
    ShellProbe(#[source] std::io::Error),
    #[error("failed to wait for child process: {0}")]
    Wait(#[source] std::io::Error),
}

#[derive(Debug, Error)]
#[error("program `{program}` could not be spawned: {source}")]
pub struct SpawnFailure {
    pub program: PathBuf,
    #[source]
    pub source: std::io::Error,
}

impl SpawnFailure {
    pub fn is_not_installed(&self) -> bool {
        self.source.kind() == std::io::ErrorKind::NotFound
    }
}
