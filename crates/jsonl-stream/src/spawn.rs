use std::collections::HashMap;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_core::Stream;
use tokio::io::AsyncRead;
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use wrapper_events::{AsyncLineIngestor, IngestConfig, LineParser};

use crate::cancel::{CancelHandle, CancelSignal};

pub struct StreamSpec<P: LineParser> {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub cwd: Option<PathBuf>,
    pub parser: P,
    pub ingest_config: IngestConfig,
    pub adapter_name: &'static str,
    /// Called once the child exits; may synthesize trailing events from the
    /// accumulated stderr buffer (e.g. a final `complete`/`error` envelope).
    pub on_exit: Box<dyn FnOnce(ExitOutcome) -> Vec<P::Event> + Send>,
}

pub struct ExitOutcome {
    pub exit_code: Option<i32>,
    pub stderr: Vec<u8>,
    pub cancelled: bool,
}

pub enum StreamItem<E> {
    RawMessage(E),
    Stderr(Vec<u8>),
}

pub struct JsonlStream<E> {
    rx: mpsc::UnboundedReceiver<StreamItem<E>>,
}

impl<E> Stream for JsonlStream<E> {
    type Item = StreamItem<E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Spawns `spec.program`, streams parsed stdout events and raw stderr chunks
/// through the returned stream, and returns a [`CancelHandle`] the caller can
/// fire to SIGTERM→SIGKILL the child. Partial final lines with no trailing
/// newline are discarded, matching the contract's assumption that harnesses
/// always terminate lines with `\n`.
pub fn spawn_jsonl_stream<P>(spec: StreamSpec<P>) -> (JsonlStream<P::Event>, CancelHandle)
where
    P: LineParser + Send + 'static,
    P::Event: Send + 'static,
{
    let (cancel, mut cancel_signal) = CancelHandle::new();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        run_child(spec, tx, &mut cancel_signal).await;
    });

    (JsonlStream { rx }, cancel)
}

async fn run_child<P>(
    spec: StreamSpec<P>,
    tx: mpsc::UnboundedSender<StreamItem<P::Event>>,
    cancel_signal: &mut CancelSignal,
) where
    P: LineParser + Send + 'static,
    P::Event: Send + 'static,
{
    let mut command = Command::new(&spec.program);
    command.args(&spec.args);
    if let Some(cwd) = &spec.cwd {
        command.current_dir(cwd);
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
            warn!(program = %spec.program.display(), error = %source, "failed to spawn jsonl stream child");
            let events = (spec.on_exit)(ExitOutcome {
                exit_code: None,
                stderr: source.to_string().into_bytes(),
                cancelled: false,
            });
            for event in events {
                let _ = tx.send(StreamItem::RawMessage(event));
            }
            return;
        }
    };

    let stdout = child.stdout.take().expect("stdout piped");
    let stderr = child.stderr.take().expect("stderr piped");

    let (stderr_tx, mut stderr_rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let stderr_task = tokio::spawn(drain_stderr(stderr, stderr_tx));

    let mut ingestor = AsyncLineIngestor::new(stdout, spec.parser, spec.ingest_config, spec.adapter_name);

    let mut stderr_accum = Vec::new();
    let mut cancelled = false;
    let mut stderr_open = true;

    loop {
        tokio::select! {
            biased;
            _ = cancel_signal.cancelled() => {
                cancelled = true;
                subprocess_runner::escalating_kill(&mut child).await;
                break;
            }
            maybe_chunk = stderr_rx.recv(), if stderr_open => {
                match maybe_chunk {
                    Some(chunk) => {
                        stderr_accum.extend_from_slice(&chunk);
                        let _ = tx.send(StreamItem::Stderr(chunk));
                    }
                    None => {
                        stderr_open = false;
                    }
                }
            }
            record = ingestor.next_record() => {
                match record {
                    Some(record) => {
                        match record.outcome {
                            Ok(Some(event)) => {
                                let _ = tx.send(StreamItem::RawMessage(event));
                            }
                            Ok(None) => {}
                            Err(err) => {
                                debug!(line_number = record.line_number, error = %err, "skipping malformed jsonl line");
                            }
                        }
                    }
                    None => break,
                }
            }
        }
    }

    // Drain any remaining stderr that arrived after stdout closed.
    while let Some(chunk) = stderr_rx.recv().await {
        stderr_accum.extend_from_slice(&chunk);
        let _ = tx.send(StreamItem::Stderr(chunk));
    }
    let _ = stderr_task.await;

    let status = if cancelled {
        None
    } else {
        child.wait().await.ok()
    };

    let events = (spec.on_exit)(ExitOutcome {
        exit_code: status.and_then(|s| s.code()),
        stderr: stderr_accum,
        cancelled,
    });
    for event in events {
        let _ = tx.send(StreamItem::RawMessage(event));
    }
}

async fn drain_stderr<R>(mut reader: R, tx: mpsc::UnboundedSender<Vec<u8>>)
where
    R: AsyncRead + Unpin,
{
    use tokio::io::AsyncReadExt;
    let mut chunk = [0u8; 4096];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if tx.send(chunk[..n].to_vec()).is_err() {
                    break;
                }
            }
        }
    }
}

#[allow(dead_code)]
fn default_timeout() -> Duration {
    Duration::from_secs(30)
}
