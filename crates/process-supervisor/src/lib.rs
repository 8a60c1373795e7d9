//! Component H: detached shell command/script supervision. Near-duplicate
//! in shape to `jsonl-stream`'s child-process loop, but carries raw
//! stdout/stderr byte buffers instead of parsed JSONL records, and kills by
//! process group rather than a single child.

mod buffer;
mod script;

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::mpsc;
use uuid::Uuid;

pub use script::{write_temp_script, ScriptError};

pub const MAX_CONCURRENT_PROCESSES: usize = 100;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10 * 60);
pub const RETENTION: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ProcessId(pub String);

impl ProcessId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ProcessStatus {
    Running,
    Exited(Option<i32>),
    Killed,
    TimedOut,
}

impl ProcessStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProcessStatus::Running)
    }
}

pub trait ProcessSink: Send + Sync {
    fn stdout(&self, chunk: &[u8]);
    fn stderr(&self, chunk: &[u8]);
    fn exit(&self, status: ProcessStatus);
    fn error(&self, message: &str);
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("maximum of {MAX_CONCURRENT_PROCESSES} concurrent processes already live")]
    TooManyProcesses,
    #[error("process `{0}` not found")]
    NotFound(String),
    #[error("failed to spawn process: {0}")]
    Spawn(#[source] std::io::Error),
    #[error(transparent)]
    Script(#[from] ScriptError),
}

pub struct ProcessSummary {
    pub id: ProcessId,
    pub status: ProcessStatus,
    pub started_at: Instant,
}

struct ProcessEntry {
    /// `None` once the kill path has taken ownership of the child to await
    /// its escalating-kill outside the process map's lock.
    child: Option<tokio::process::Child>,
    script_path: Option<PathBuf>,
    stdout_buf: buffer::StreamBuffer,
    stderr_buf: buffer::StreamBuffer,
    client: Option<Arc<dyn ProcessSink>>,
    status: ProcessStatus,
    started_at: Instant,
    gc_deadline: Instant,
}

impl ProcessEntry {
    fn touch(&mut self) {
        self.gc_deadline = Instant::now() + RETENTION;
    }

    fn cleanup_script(&self) {
        if let Some(path) = &self.script_path {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[derive(Default)]
pub struct ProcessSupervisor {
    processes: Mutex<HashMap<ProcessId, ProcessEntry>>,
}

impl ProcessSupervisor {
    pub fn new() -> Arc<Self> {
        let supervisor = Arc::new(Self::default());
        spawn_gc(supervisor.clone());
        supervisor
    }

    /// `runCmd(processId, program, args, cwd, env, timeout?)`.
    pub fn run_cmd(
        self: &Arc<Self>,
        process_id: ProcessId,
        program: &str,
        args: &[String],
        cwd: Option<&str>,
        env: &HashMap<String, String>,
        timeout: Option<Duration>,
        client: Option<Arc<dyn ProcessSink>>,
    ) -> Result<(), ProcessError> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        self.spawn_entry(process_id, cmd, cwd, env, None, timeout, client)
    }

    /// `runScript(processId, script, cwd, env, timeout?)`.
    pub fn run_script(
        self: &Arc<Self>,
        process_id: ProcessId,
        script_text: &str,
        cwd: Option<&str>,
        env: &HashMap<String, String>,
        timeout: Option<Duration>,
        client: Option<Arc<dyn ProcessSink>>,
    ) -> Result<(), ProcessError> {
        let path = write_temp_script(script_text)?;
        let cmd = Command::new(&path);
        self.spawn_entry(process_id, cmd, cwd, env, Some(path), timeout, client)
    }

    fn spawn_entry(
        self: &Arc<Self>,
        process_id: ProcessId,
        mut cmd: Command,
        cwd: Option<&str>,
        env: &HashMap<String, String>,
        script_path: Option<PathBuf>,
        timeout: Option<Duration>,
        client: Option<Arc<dyn ProcessSink>>,
    ) -> Result<(), ProcessError> {
        {
            let processes = self.processes.lock().expect("process map poisoned");
            if processes.len() >= MAX_CONCURRENT_PROCESSES {
                return Err(ProcessError::TooManyProcesses);
            }
        }

        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        // process env ∪ globalOverrides ∪ perCallEnv, matching the merge order
        // harness invocations use (§4.A).
        cmd.envs(subprocess_runner::GlobalEnvOverrides::snapshot());
        cmd.envs(env);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.as_std_mut().process_group(0);
        }

        let mut child = cmd.spawn().map_err(ProcessError::Spawn)?;
        let stdout = child.stdout.take().expect("piped stdout");
        let stderr = child.stderr.take().expect("piped stderr");

        let now = Instant::now();
        {
            let mut processes = self.processes.lock().expect("process map poisoned");
            processes.insert(
                process_id.clone(),
                ProcessEntry {
                    child: Some(child),
                    script_path,
                    stdout_buf: buffer::StreamBuffer::default(),
                    stderr_buf: buffer::StreamBuffer::default(),
                    client,
                    status: ProcessStatus::Running,
                    started_at: now,
                    gc_deadline: now + RETENTION,
                },
            );
        }

        spawn_drain(self.clone(), process_id.clone(), stdout, Stream::Stdout);
        spawn_drain(self.clone(), process_id.clone(), stderr, Stream::Stderr);
        spawn_watchdog(self.clone(), process_id, timeout.unwrap_or(DEFAULT_TIMEOUT));

        Ok(())
    }

    /// `kill(processId)`: SIGTERM-then-5s-SIGKILL the process group, then
    /// cleans up the temp script and buffers.
    pub async fn kill(&self, process_id: &ProcessId) -> Result<(), ProcessError> {
        let child = {
            let mut processes = self.processes.lock().expect("process map poisoned");
            let entry = processes.get_mut(process_id).ok_or_else(|| ProcessError::NotFound(process_id.0.clone()))?;
            entry.child.take()
        };
        if let Some(mut child) = child {
            kill_process_group(&mut child).await;
        }

        let mut processes = self.processes.lock().expect("process map poisoned");
        if let Some(entry) = processes.remove(process_id) {
            entry.cleanup_script();
            if let Some(client) = &entry.client {
                client.exit(ProcessStatus::Killed);
            }
        }
        Ok(())
    }

    /// `killAll`.
    pub async fn kill_all(&self) {
        let children: Vec<tokio::process::Child> = {
            let mut processes = self.processes.lock().expect("process map poisoned");
            let children = processes.values_mut().filter_map(|entry| entry.child.take()).collect();
            for (_, entry) in processes.iter() {
                entry.cleanup_script();
            }
            children
        };
        for mut child in children {
            kill_process_group(&mut child).await;
        }
        self.processes.lock().expect("process map poisoned").clear();
    }

    /// `list`.
    pub fn list(&self) -> Vec<ProcessSummary> {
        let processes = self.processes.lock().expect("process map poisoned");
        processes
            .iter()
            .map(|(id, entry)| ProcessSummary {
                id: id.clone(),
                status: entry.status.clone(),
                started_at: entry.started_at,
            })
            .collect()
    }

    /// `reconnect(processId)`: replays both buffers in order, then a
    /// synthesized exit if already terminated.
    pub fn reconnect(&self, process_id: &ProcessId, client: Arc<dyn ProcessSink>) -> Result<(), ProcessError> {
        let mut processes = self.processes.lock().expect("process map poisoned");
        let entry = processes.get_mut(process_id).ok_or_else(|| ProcessError::NotFound(process_id.0.clone()))?;
        entry.touch();
        for chunk in entry.stdout_buf.replay() {
            client.stdout(&chunk);
        }
        for chunk in entry.stderr_buf.replay() {
            client.stderr(&chunk);
        }
        if entry.status.is_terminal() {
            client.exit(entry.status.clone());
        }
        entry.client = Some(client);
        Ok(())
    }

    fn record_chunk(&self, process_id: &ProcessId, stream: Stream, bytes: Vec<u8>) {
        let mut processes = self.processes.lock().expect("process map poisoned");
        let Some(entry) = processes.get_mut(process_id) else {
            return;
        };
        entry.touch();
        match stream {
            Stream::Stdout => {
                if let Some(client) = &entry.client {
                    client.stdout(&bytes);
                }
                entry.stdout_buf.push(bytes);
            }
            Stream::Stderr => {
                if let Some(client) = &entry.client {
                    client.stderr(&bytes);
                }
                entry.stderr_buf.push(bytes);
            }
        }
    }

    fn record_exit(&self, process_id: &ProcessId, exit_code: Option<i32>) {
        let mut processes = self.processes.lock().expect("process map poisoned");
        let Some(entry) = processes.get_mut(process_id) else {
            return;
        };
        if entry.status.is_terminal() {
            return;
        }
        entry.status = ProcessStatus::Exited(exit_code);
        entry.cleanup_script();
        if let Some(client) = &entry.client {
            client.exit(entry.status.clone());
        }
    }

    async fn record_timeout(&self, process_id: &ProcessId) {
        let child = {
            let mut processes = self.processes.lock().expect("process map poisoned");
            let Some(entry) = processes.get_mut(process_id) else {
                return;
            };
            if entry.status.is_terminal() {
                return;
            }
            entry.status = ProcessStatus::TimedOut;
            entry.cleanup_script();
            entry.child.take()
        };
        if let Some(mut child) = child {
            kill_process_group(&mut child).await;
        }

        let processes = self.processes.lock().expect("process map poisoned");
        if let Some(entry) = processes.get(process_id) {
            if let Some(client) = &entry.client {
                client.error("process timed out");
                client.exit(ProcessStatus::TimedOut);
            }
        }
    }

    fn gc_sweep(&self) {
        let now = Instant::now();
        let mut processes = self.processes.lock().expect("process map poisoned");
        let doomed: Vec<ProcessId> = processes
            .iter()
            .filter(|(_, entry)| entry.status.is_terminal() && now >= entry.gc_deadline)
            .map(|(id, _)| id.clone())
            .collect();
        for id in doomed {
            processes.remove(&id);
        }
    }
}

#[derive(Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

fn spawn_drain<R>(supervisor: Arc<ProcessSupervisor>, process_id: ProcessId, mut reader: R, stream: Stream)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut chunk = [0u8; 8192];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => supervisor.record_chunk(&process_id, stream, chunk[..n].to_vec()),
            }
        }
    });
}

fn spawn_watchdog(supervisor: Arc<ProcessSupervisor>, process_id: ProcessId, timeout: Duration) {
    tokio::spawn(async move {
        let (tx, mut rx) = mpsc::channel::<Option<i32>>(1);
        {
            let supervisor = supervisor.clone();
            let process_id = process_id.clone();
            tokio::spawn(async move {
                let status = {
                    let mut processes = supervisor.processes.lock().expect("process map poisoned");
                    processes.get_mut(&process_id).map(|entry| entry.child.as_ref().and_then(|c| c.id()))
                };
                if status.is_none() {
                    return;
                }
                // Polling wait rather than awaiting `child.wait()` directly so the
                // map lock is never held across a suspension point.
                loop {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    let done = {
                        let mut processes = supervisor.processes.lock().expect("process map poisoned");
                        let Some(entry) = processes.get_mut(&process_id) else {
                            return;
                        };
                        if entry.status.is_terminal() {
                            return;
                        }
                        match entry.child.as_mut() {
                            Some(child) => match child.try_wait() {
                                Ok(Some(status)) => Some(status.code()),
                                Ok(None) => None,
                                Err(_) => Some(None),
                            },
                            // Already taken by a concurrent kill/timeout.
                            None => Some(None),
                        }
                    };
                    if let Some(code) = done {
                        let _ = tx.send(code).await;
                        return;
                    }
                }
            });
        }

        match tokio::time::timeout(timeout, rx.recv()).await {
            Ok(Some(code)) => supervisor.record_exit(&process_id, code),
            Ok(None) => {}
            Err(_) => supervisor.record_timeout(&process_id),
        }
    });
}

/// SIGTERM the process group, then SIGKILL 5 s later if it's still alive
/// (§4.H), via the same escalation primitive `jsonl-stream` uses for single
/// children.
async fn kill_process_group(child: &mut tokio::process::Child) {
    subprocess_runner::escalating_kill_group(child).await;
}

fn spawn_gc(supervisor: Arc<ProcessSupervisor>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        loop {
            interval.tick().await;
            supervisor.gc_sweep();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopSink;
    impl ProcessSink for NoopSink {
        fn stdout(&self, _chunk: &[u8]) {}
        fn stderr(&self, _chunk: &[u8]) {}
        fn exit(&self, _status: ProcessStatus) {}
        fn error(&self, _message: &str) {}
    }

    #[tokio::test]
    async fn unknown_process_operations_error_without_panicking() {
        let supervisor = ProcessSupervisor::default();
        let id = ProcessId::generate();
        assert!(matches!(supervisor.kill(&id).await, Err(ProcessError::NotFound(_))));
        assert!(matches!(supervisor.reconnect(&id, Arc::new(NoopSink)), Err(ProcessError::NotFound(_))));
        assert!(supervisor.list().is_empty());
    }

    #[tokio::test]
    async fn run_cmd_reaches_a_terminal_status() {
        let supervisor = ProcessSupervisor::new();
        let id = ProcessId::generate();
        supervisor
            .run_cmd(id.clone(), "true", &[], None, &HashMap::new(), Some(Duration::from_secs(5)), None)
            .unwrap();

        for _ in 0..50 {
            let done = supervisor.list().iter().all(|p| p.id != id || p.status.is_terminal());
            if supervisor.list().iter().find(|p| p.id == id).map(|p| p.status.is_terminal()).unwrap_or(true) {
                let _ = done;
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    #[tokio::test]
    async fn kill_sigterms_a_long_running_process_and_removes_it() {
        let supervisor = ProcessSupervisor::new();
        let id = ProcessId::generate();
        supervisor
            .run_cmd(id.clone(), "sleep", &["30".to_string()], None, &HashMap::new(), Some(Duration::from_secs(60)), None)
            .unwrap();

        supervisor.kill(&id).await.unwrap();

        assert!(supervisor.list().iter().all(|p| p.id != id));
    }
}
