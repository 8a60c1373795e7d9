use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ErrorCode;
use crate::model::Usage;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    ReadOnly,
    Yolo,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Thinking {
    Low,
    Med,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PromptContent {
    Text(String),
    Blocks(Vec<PromptBlock>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PromptBlock {
    Text { text: String },
    Image { data_base64: String, mime_type: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServerSpec {
    pub name: String,
    pub transport: McpTransportSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum McpTransportSpec {
    Stdio { command: String, args: Vec<String> },
    Http { url: String, bearer_token: Option<String> },
}

/// The normalized query accepted by every harness, per §4.D.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarnessQuery {
    pub prompt: Option<PromptContent>,
    pub cwd: String,
    pub mode: Option<Mode>,
    pub system_prompt: Option<String>,
    pub append_system_prompt: Option<String>,
    pub model: Option<String>,
    pub force_subagent_model: bool,
    pub thinking: Option<Thinking>,
    pub resume_session_id: Option<String>,
    pub fork_session: bool,
    pub additional_directories: Vec<String>,
    pub env: HashMap<String, String>,
    pub allowed_tools: Vec<String>,
    pub disallowed_tools: Vec<String>,
    pub mcp_servers: Vec<McpServerSpec>,
    pub client_tools: Vec<ClientToolSpec>,
}

impl HarnessQuery {
    pub fn new(cwd: impl Into<String>) -> Self {
        Self {
            cwd: cwd.into(),
            ..Default::default()
        }
    }
}

/// The unified envelope a harness yields for each CLI output line, per
/// §4.D's `HarnessEvent<M>`.
#[derive(Debug, Clone)]
pub enum HarnessEvent {
    Message(Value),
    SessionStarted { session_id: String },
    Complete { usage: Option<Usage> },
    Error { error: String, code: Option<ErrorCode> },
    Stderr { data: String },
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum InstallStatus {
    Installed { version: String },
    NotInstalled,
    AuthRequired,
}

#[derive(Debug, Clone, Default)]
pub struct HarnessCapabilities {
    pub supports_resume: bool,
    pub supports_fork_session: bool,
    pub supports_images: bool,
    pub supports_client_tools: bool,
}
