//! Translates the wire protocol's camelCase JSON (§6 "Command RPC") into
//! `broker-core`'s snake_case domain types. This boundary is where
//! camelCase<->snake_case translation belongs, rather than inside the core.

use std::collections::HashMap;

use broker_core::error::BrokerError;
use broker_core::harness::{ClientToolSpec, HarnessQuery, McpServerSpec, McpTransportSpec, Mode, PromptBlock, PromptContent, Thinking};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartQueryOptions {
    pub harness_id: String,
    pub cwd: String,
    pub mode: Option<Mode>,
    pub model: Option<String>,
    #[serde(default)]
    pub force_subagent_model: bool,
    pub thinking: Option<Thinking>,
    pub append_system_prompt: Option<String>,
    pub system_prompt: Option<String>,
    pub resume_session_id: Option<String>,
    #[serde(default)]
    pub fork_session: bool,
    #[serde(default)]
    pub additional_directories: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub allowed_tools: Vec<String>,
    #[serde(default)]
    pub disallowed_tools: Vec<String>,
    #[serde(default)]
    pub mcp_server_configs: Vec<McpServerConfig>,
    #[serde(default)]
    pub client_tools: Vec<ClientToolSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpServerConfig {
    pub name: String,
    #[serde(flatten)]
    pub transport: McpTransportSpec,
}

/// Builds `(harnessId, HarnessQuery)` from `start_query`'s `prompt`/`options`
/// payload, per §6's `start_query.options` shape.
pub fn build_harness_query(prompt: &Value, options: &Value) -> Result<(String, HarnessQuery), BrokerError> {
    let options: StartQueryOptions =
        serde_json::from_value(options.clone()).map_err(|e| BrokerError::MalformedCommand(e.to_string()))?;

    let prompt = parse_prompt(prompt)?;

    let query = HarnessQuery {
        prompt: Some(prompt),
        cwd: options.cwd,
        mode: options.mode,
        system_prompt: options.system_prompt,
        append_system_prompt: options.append_system_prompt,
        model: options.model,
        force_subagent_model: options.force_subagent_model,
        thinking: options.thinking,
        resume_session_id: options.resume_session_id,
        fork_session: options.fork_session,
        additional_directories: options.additional_directories,
        env: options.env,
        allowed_tools: options.allowed_tools,
        disallowed_tools: options.disallowed_tools,
        mcp_servers: options.mcp_server_configs.into_iter().map(|c| McpServerSpec { name: c.name, transport: c.transport }).collect(),
        client_tools: options.client_tools,
    };

    Ok((options.harness_id, query))
}

fn parse_prompt(prompt: &Value) -> Result<PromptContent, BrokerError> {
    if let Some(text) = prompt.as_str() {
        return Ok(PromptContent::Text(text.to_string()));
    }
    serde_json::from_value::<Vec<PromptBlock>>(prompt.clone())
        .map(PromptContent::Blocks)
        .map_err(|e| BrokerError::MalformedCommand(format!("invalid prompt: {e}")))
}
