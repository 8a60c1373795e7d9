//! Component G: interactive PTY allocation and supervision, generalized
//! from `claude_code::client::setup_token`'s `portable-pty` usage (there a
//! single ad hoc PTY for the OAuth login flow; here a registry of
//! independently addressable PTYs).

mod buffer;
mod shell;

use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use portable_pty::{native_pty_system, Child as PtyChild, CommandBuilder, MasterPty, PtySize};
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

pub use shell::default_shell;

pub const MAX_CONCURRENT_PTYS: usize = 50;
pub const RETENTION: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct PtyId(pub String);

impl PtyId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// Pushed to a connected client as the PTY produces output or exits.
pub trait PtySink: Send + Sync {
    fn output(&self, chunk_base64: &str);
    fn exit(&self, exit_code: Option<i32>);
}

#[derive(Debug, Error)]
pub enum PtyError {
    #[error("maximum of {MAX_CONCURRENT_PTYS} concurrent PTYs already live")]
    TooManyPtys,
    #[error("pty `{0}` not found")]
    NotFound(String),
    #[error("failed to open pty: {0}")]
    Open(String),
    #[error("failed to spawn pty command: {0}")]
    Spawn(String),
    #[error("failed to decode base64 input")]
    InvalidBase64,
}

struct PtyEntry {
    writer: Box<dyn Write + Send>,
    master: Box<dyn MasterPty + Send>,
    child: Box<dyn PtyChild + Send + Sync>,
    buffer: buffer::RingBuffer,
    client: Option<Arc<dyn PtySink>>,
    exit_code: Option<i32>,
    gc_deadline: Instant,
}

impl PtyEntry {
    fn touch(&mut self) {
        self.gc_deadline = Instant::now() + RETENTION;
    }
}

#[derive(Default)]
pub struct PtySupervisor {
    ptys: Mutex<HashMap<PtyId, PtyEntry>>,
}

impl PtySupervisor {
    pub fn new() -> Arc<Self> {
        let supervisor = Arc::new(Self::default());
        spawn_gc(supervisor.clone());
        supervisor
    }

    /// `spawn(ptyId, cwd, cols, rows, env?)`. Re-spawning a live `ptyId`
    /// simply rebinds the client sink per §4.G.
    pub fn spawn(
        self: &Arc<Self>,
        pty_id: PtyId,
        cwd: Option<&str>,
        cols: u16,
        rows: u16,
        env: &HashMap<String, String>,
        client: Option<Arc<dyn PtySink>>,
    ) -> Result<(), PtyError> {
        {
            let mut ptys = self.ptys.lock().expect("pty map poisoned");
            if let Some(entry) = ptys.get_mut(&pty_id) {
                entry.client = client;
                entry.touch();
                return Ok(());
            }
            if ptys.len() >= MAX_CONCURRENT_PTYS {
                return Err(PtyError::TooManyPtys);
            }
        }

        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| PtyError::Open(e.to_string()))?;

        let mut cmd = CommandBuilder::new(default_shell());
        if let Some(dir) = cwd {
            cmd.cwd(dir);
        }
        for (key, value) in env {
            cmd.env(key, value);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| PtyError::Spawn(e.to_string()))?;
        drop(pair.slave);

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| PtyError::Open(e.to_string()))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| PtyError::Open(e.to_string()))?;

        {
            let mut ptys = self.ptys.lock().expect("pty map poisoned");
            ptys.insert(
                pty_id.clone(),
                PtyEntry {
                    writer,
                    master: pair.master,
                    child,
                    buffer: buffer::RingBuffer::default(),
                    client,
                    exit_code: None,
                    gc_deadline: Instant::now() + RETENTION,
                },
            );
        }

        spawn_output_pump(self.clone(), pty_id, reader);
        Ok(())
    }

    /// `write(ptyId, base64)`.
    pub fn write(&self, pty_id: &PtyId, data_base64: &str) -> Result<(), PtyError> {
        let bytes = BASE64.decode(data_base64).map_err(|_| PtyError::InvalidBase64)?;
        let mut ptys = self.ptys.lock().expect("pty map poisoned");
        let entry = ptys.get_mut(pty_id).ok_or_else(|| PtyError::NotFound(pty_id.0.clone()))?;
        entry.writer.write_all(&bytes).map_err(|e| PtyError::Open(e.to_string()))?;
        entry.touch();
        Ok(())
    }

    /// `resize(ptyId, cols, rows)`.
    pub fn resize(&self, pty_id: &PtyId, cols: u16, rows: u16) -> Result<(), PtyError> {
        let ptys = self.ptys.lock().expect("pty map poisoned");
        let entry = ptys.get(pty_id).ok_or_else(|| PtyError::NotFound(pty_id.0.clone()))?;
        entry
            .master
            .resize(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| PtyError::Open(e.to_string()))
    }

    /// `kill(ptyId)`.
    pub fn kill(&self, pty_id: &PtyId) -> Result<(), PtyError> {
        let mut ptys = self.ptys.lock().expect("pty map poisoned");
        let entry = ptys.get_mut(pty_id).ok_or_else(|| PtyError::NotFound(pty_id.0.clone()))?;
        let _ = entry.child.kill();
        Ok(())
    }

    /// `killAll`.
    pub fn kill_all(&self) {
        let mut ptys = self.ptys.lock().expect("pty map poisoned");
        for entry in ptys.values_mut() {
            let _ = entry.child.kill();
        }
    }

    /// `reconnect(ptyId)`: replays buffered chunks in order, then a
    /// synthesized exit event if the process already terminated.
    pub fn reconnect(&self, pty_id: &PtyId, client: Arc<dyn PtySink>) -> Result<(), PtyError> {
        let mut ptys = self.ptys.lock().expect("pty map poisoned");
        let entry = ptys.get_mut(pty_id).ok_or_else(|| PtyError::NotFound(pty_id.0.clone()))?;
        entry.touch();
        for chunk in entry.buffer.replay() {
            client.output(&chunk);
        }
        if let Some(code) = entry.exit_code {
            client.exit(Some(code));
        }
        entry.client = Some(client);
        Ok(())
    }

    fn record_output(&self, pty_id: &PtyId, bytes: &[u8]) {
        let chunk = BASE64.encode(bytes);
        let mut ptys = self.ptys.lock().expect("pty map poisoned");
        let Some(entry) = ptys.get_mut(pty_id) else {
            return;
        };
        entry.touch();
        if let Some(client) = &entry.client {
            client.output(&chunk);
        }
        entry.buffer.push(chunk);
    }

    fn record_exit(&self, pty_id: &PtyId, exit_code: Option<i32>) {
        let mut ptys = self.ptys.lock().expect("pty map poisoned");
        let Some(entry) = ptys.get_mut(pty_id) else {
            return;
        };
        entry.exit_code = exit_code;
        if let Some(client) = &entry.client {
            client.exit(exit_code);
        }
    }

    fn gc_sweep(&self) {
        let now = Instant::now();
        let mut ptys = self.ptys.lock().expect("pty map poisoned");
        let doomed: Vec<PtyId> = ptys
            .iter()
            .filter(|(_, entry)| entry.exit_code.is_some() && now >= entry.gc_deadline)
            .map(|(id, _)| id.clone())
            .collect();
        for id in doomed {
            ptys.remove(&id);
        }
    }
}

fn spawn_output_pump(supervisor: Arc<PtySupervisor>, pty_id: PtyId, mut reader: Box<dyn Read + Send>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();

    tokio::task::spawn_blocking(move || {
        let mut chunk = [0u8; 8192];
        loop {
            match reader.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if tx.send(chunk[..n].to_vec()).is_err() {
                        break;
                    }
                }
            }
        }
    });

    tokio::spawn(async move {
        while let Some(bytes) = rx.recv().await {
            supervisor.record_output(&pty_id, &bytes);
        }
        supervisor.record_exit(&pty_id, None);
    });
}

fn spawn_gc(supervisor: Arc<PtySupervisor>) {
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
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSink {
        outputs: AtomicUsize,
        exits: AtomicUsize,
    }

    impl PtySink for CountingSink {
        fn output(&self, _chunk_base64: &str) {
            self.outputs.fetch_add(1, Ordering::SeqCst);
        }
        fn exit(&self, _exit_code: Option<i32>) {
            self.exits.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn unknown_pty_operations_error_without_panicking() {
        let supervisor = PtySupervisor::default();
        let id = PtyId::generate();
        assert!(matches!(supervisor.write(&id, "aGk="), Err(PtyError::NotFound(_))));
        assert!(matches!(supervisor.kill(&id), Err(PtyError::NotFound(_))));
        assert!(matches!(
            supervisor.reconnect(
                &id,
                Arc::new(CountingSink {
                    outputs: AtomicUsize::new(0),
                    exits: AtomicUsize::new(0)
                })
            ),
            Err(PtyError::NotFound(_))
        ));
    }
}
