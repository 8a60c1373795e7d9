use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::warn;

use crate::env::GlobalEnvOverrides;
use crate::error::RunnerError;
use crate::kill::escalating_kill;

const DEFAULT_MAX_BUFFER: usize = 50 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct RunSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: HashMap<String, String>,
    pub timeout: Option<Duration>,
    pub max_buffer: usize,
}

impl RunSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: HashMap::new(),
            timeout: None,
            max_buffer: DEFAULT_MAX_BUFFER,
        }
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn max_buffer(mut self, max_buffer: usize) -> Self {
        self.max_buffer = max_buffer;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: Option<i32>,
    pub success: bool,
    pub timed_out: bool,
}

/// Runs `spec` to completion. Never returns `Err` for ordinary process
/// failures (ENOENT, non-zero exit, timeout) — those are reported via the
/// returned [`RunOutput`] per §4.A's `Spawn error becomes success=false`
/// rule. `Err` is reserved for internal plumbing failures (output-drain task
/// panics).
pub async fn run(spec: RunSpec) -> Result<RunOutput, RunnerError> {
    let mut command = Command::new(&spec.program);
    command.args(&spec.args);
    if let Some(cwd) = &spec.cwd {
        command.current_dir(cwd);
    }
    for (key, value) in GlobalEnvOverrides::snapshot() {
        command.env(key, value);
    }
    for (key, value) in &spec.env {
        command.env(key, value);
    }
    command
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .kill_on_drop(true);

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(source) => {
            return Ok(RunOutput {
                stdout: Vec::new(),
                stderr: source.to_string().into_bytes(),
                exit_code: None,
                success: false,
                timed_out: false,
            });
        }
    };

    let stdout = child.stdout.take().expect("stdout piped");
    let stderr = child.stderr.take().expect("stderr piped");
    let max_buffer = spec.max_buffer;

    let stdout_task = tokio::spawn(drain_normalized(stdout, max_buffer));
    let stderr_task = tokio::spawn(drain_normalized(stderr, max_buffer));

    let wait_result = match spec.timeout {
        Some(duration) => timeout(duration, child.wait()).await,
        None => Ok(child.wait().await),
    };

    let (status, timed_out) = match wait_result {
        Ok(status) => (status.map_err(RunnerError::Wait), false),
        Err(_) => {
            escalating_kill(&mut child).await;
            (child.wait().await.map_err(RunnerError::Wait), true)
        }
    };

    let stdout = stdout_task.await.map_err(RunnerError::Join)?;
    let stderr = stderr_task.await.map_err(RunnerError::Join)?;

    let status = match status {
        Ok(status) => status,
        Err(source) => {
            warn!(error = %source, "failed to wait for child process");
            return Ok(RunOutput {
                stdout,
                stderr: source.to_string().into_bytes(),
                exit_code: None,
                success: false,
                timed_out,
            });
        }
    };

    Ok(RunOutput {
        stdout,
        stderr,
        exit_code: status.code(),
        success: status.success() && !timed_out,
        timed_out,
    })
}

async fn drain_normalized<R>(mut reader: R, max_buffer: usize) -> Vec<u8>
where
    R: AsyncRead + Unpin,
{
    let mut raw = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let n = match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(_) => break,
        };
        if raw.len() < max_buffer {
            let remaining = max_buffer - raw.len();
            let take = remaining.min(n);
            raw.extend_from_slice(&chunk[..take]);
        }
    }
    normalize_line_endings(&raw)
}

fn normalize_line_endings(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut iter = input.iter().peekable();
    while let Some(&byte) = iter.next() {
        if byte == b'\r' {
            if iter.peek() == Some(&&b'\n') {
                continue;
            }
            out.push(b'\n');
        } else {
            out.push(byte);
        }
    }
    out
}

#[allow(dead_code)]
fn io_error_is_not_found(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::NotFound
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_crlf_to_lf() {
        assert_eq!(normalize_line_endings(b"a\r\nb\rc\n"), b"a\nb\nc\n");
    }

    #[tokio::test]
    async fn spawn_failure_is_reported_as_unsuccessful() {
        let spec = RunSpec::new("definitely-not-a-real-binary-xyz");
        let output = run(spec).await.expect("run should not error on ENOENT");
        assert!(!output.success);
        assert!(output.exit_code.is_none());
        assert!(!output.stderr.is_empty());
    }

    #[tokio::test]
    async fn runs_true_successfully() {
        let spec = RunSpec::new("true");
        let output = run(spec).await.expect("run should succeed");
        assert!(output.success);
        assert_eq!(output.exit_code, Some(0));
    }
}
