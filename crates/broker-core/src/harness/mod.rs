mod claude;
mod codex;
mod mcp_config;
mod types;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

pub use claude::ClaudeHarness;
pub use codex::CodexHarness;
pub use types::{
    ClientToolSpec, HarnessCapabilities, HarnessEvent, HarnessQuery, InstallStatus,
    McpServerSpec, McpTransportSpec, Mode, PromptBlock, PromptContent, Thinking,
};

pub type HarnessEventStream =
    std::pin::Pin<Box<dyn futures_core::Stream<Item = HarnessEvent> + Send>>;

/// A one-shot stream carrying a single pre-spawn failure (e.g. the mcp
/// config temp file couldn't be written), so `Harness::query` never needs
/// a fallible return type.
pub(crate) fn immediate_error(message: String) -> (HarnessEventStream, jsonl_stream::CancelHandle) {
    let (cancel, _signal) = jsonl_stream::CancelHandle::new();
    let stream = futures_util::stream::once(async move { HarnessEvent::Error { error: message, code: None } });
    (Box::pin(stream), cancel)
}

/// Component D's public surface: `meta()`, `models()`, `capabilities()`,
/// `checkInstallStatus()`, `discoverSlashCommands(cwd, cancel?)`, `query(q)`.
#[async_trait]
pub trait Harness: Send + Sync {
    fn id(&self) -> &'static str;
    fn models(&self) -> Vec<String>;
    fn capabilities(&self) -> HarnessCapabilities;

    async fn check_install_status(&self) -> InstallStatus;
    async fn discover_slash_commands(&self, cwd: &str) -> Vec<String>;

    /// Starts the query. Returns the event stream plus a cancel handle the
    /// broker stores as the Execution's `cancelHandle`.
    fn query(&self, query: HarnessQuery) -> (HarnessEventStream, jsonl_stream::CancelHandle);
}

/// Maps a `harnessId` to the concrete implementation (§9 "Dynamic dispatch
/// across harnesses").
#[derive(Clone, Default)]
pub struct HarnessRegistry {
    harnesses: HashMap<&'static str, Arc<dyn Harness>>,
}

impl HarnessRegistry {
    pub fn new() -> Self {
        Self {
            harnesses: HashMap::new(),
        }
    }

    pub fn register(&mut self, harness: Arc<dyn Harness>) {
        self.harnesses.insert(harness.id(), harness);
    }

    pub fn get(&self, harness_id: &str) -> Option<Arc<dyn Harness>> {
        self.harnesses.get(harness_id).cloned()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ClaudeHarness::default()));
        registry.register(Arc::new(CodexHarness::default()));
        registry
    }
}
