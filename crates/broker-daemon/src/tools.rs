//! Bridges `start_query.options.clientTools` to a per-execution embedded MCP
//! tool server (component C), wiring its URL/bearer token back into
//! `mcpServerConfigs` before the harness ever sees the query, and routing
//! every `CallTool` back through the broker's tool-call bridge.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use broker_core::model::{CallId, ExecutionId, ToolCallOutcome};
use broker_core::Broker;
use serde::Deserialize;
use serde_json::{json, Value};
use tool_server::{StartOptions, ToolCallResult, ToolDefinition, ToolHandler};

pub struct ToolServers {
    handles: std::sync::Mutex<HashMap<String, tool_server::Handle>>,
}

impl Default for ToolServers {
    fn default() -> Self {
        Self { handles: std::sync::Mutex::new(HashMap::new()) }
    }
}

impl ToolServers {
    pub fn stop(&self, execution_id: &str) {
        if let Some(handle) = self.handles.lock().expect("tool server map poisoned").remove(execution_id) {
            handle.stop();
        }
    }

    fn insert(&self, execution_id: String, handle: tool_server::Handle) {
        let mut handles = self.handles.lock().expect("tool server map poisoned");
        if let Some(previous) = handles.insert(execution_id, handle) {
            previous.stop();
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireClientTool {
    name: String,
    description: String,
    input_schema: Value,
}

struct BridgeToolHandler {
    broker: Arc<Broker>,
    execution_id: ExecutionId,
}

#[async_trait]
impl ToolHandler for BridgeToolHandler {
    async fn call(&self, name: &str, args: Value) -> ToolCallResult {
        let receiver = match self.broker.record_tool_call(&self.execution_id, CallId::generate(), name.to_string(), args) {
            Ok(receiver) => receiver,
            Err(err) => return ToolCallResult::Error(err.to_string()),
        };
        match receiver.await {
            Ok(ToolCallOutcome::Result { content }) => ToolCallResult::Content(content),
            Ok(ToolCallOutcome::Error { error }) => ToolCallResult::Error(error),
            Ok(ToolCallOutcome::Aborted) => ToolCallResult::Error("execution aborted".to_string()),
            Ok(ToolCallOutcome::Timeout) => ToolCallResult::Error("tool call timed out".to_string()),
            Err(_) => ToolCallResult::Error("tool call bridge dropped".to_string()),
        }
    }
}

/// If `options.clientTools` is non-empty, starts a tool server scoped to
/// this execution and appends its HTTP transport to `options.mcpServerConfigs`.
pub async fn provision(
    servers: &ToolServers,
    broker: Arc<Broker>,
    execution_id: &str,
    options: &mut Value,
) -> Result<(), String> {
    let Some(raw_tools) = options.get("clientTools") else { return Ok(()) };
    let wire_tools: Vec<WireClientTool> = serde_json::from_value(raw_tools.clone()).map_err(|e| e.to_string())?;
    if wire_tools.is_empty() {
        return Ok(());
    }

    let definitions: Vec<ToolDefinition> = wire_tools
        .into_iter()
        .map(|t| ToolDefinition { name: t.name, description: t.description, input_schema: t.input_schema })
        .collect();

    let handler = Arc::new(BridgeToolHandler { broker, execution_id: ExecutionId::from(execution_id) });
    let handle = tool_server::start(handler, StartOptions::new(definitions)).await.map_err(|e| e.to_string())?;

    let bearer_token = handle
        .server_config
        .headers
        .get("Authorization")
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default()
        .to_string();
    let entry = json!({
        "name": "client-tools",
        "transport": { "type": "http", "url": handle.server_config.url, "bearerToken": bearer_token },
    });

    match options.get_mut("mcpServerConfigs") {
        Some(Value::Array(configs)) => configs.push(entry),
        _ => {
            if let Value::Object(map) = options {
                map.insert("mcpServerConfigs".to_string(), Value::Array(vec![entry]));
            }
        }
    }

    servers.insert(execution_id.to_string(), handle);
    Ok(())
}
