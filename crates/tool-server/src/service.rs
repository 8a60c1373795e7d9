use std::sync::Arc;

use rmcp::model as mcp;
use rmcp::{RoleServer, Service as McpService};
use tokio::sync::Semaphore;

use crate::{ToolCallResult, ToolDefinition, ToolHandler};

/// Grounded on `BouncerService`'s `McpService<RoleServer>` implementation:
/// `InitializeRequest`/`ListToolsRequest`/`CallToolRequest` are the only
/// methods a client tool surface needs to answer (§4.C).
#[derive(Clone)]
pub struct ToolServerService {
    pub(crate) tools: Arc<Vec<ToolDefinition>>,
    pub(crate) handler: Arc<dyn ToolHandler>,
    pub(crate) inflight: Arc<Semaphore>,
}

impl McpService<RoleServer> for ToolServerService {
    async fn handle_request(
        &self,
        request: mcp::ClientRequest,
        _context: rmcp::service::RequestContext<RoleServer>,
    ) -> Result<mcp::ServerResult, mcp::ErrorData> {
        match request {
            mcp::ClientRequest::InitializeRequest(_req) => {
                let capabilities = mcp::ServerCapabilities::builder().enable_tools().build();
                Ok(mcp::ServerResult::InitializeResult(mcp::InitializeResult {
                    protocol_version: mcp::ProtocolVersion::V_2025_03_26,
                    capabilities,
                    server_info: mcp::Implementation {
                        name: "client-tools".into(),
                        title: None,
                        version: env!("CARGO_PKG_VERSION").into(),
                        icons: None,
                        website_url: None,
                    },
                    instructions: None,
                }))
            }
            mcp::ClientRequest::ListToolsRequest(_req) => {
                let tools = self.tools.iter().map(to_mcp_tool).collect();
                Ok(mcp::ServerResult::ListToolsResult(mcp::ListToolsResult {
                    tools,
                    next_cursor: None,
                }))
            }
            mcp::ClientRequest::CallToolRequest(req) => {
                let name = req.params.name.to_string();
                let args = req
                    .params
                    .arguments
                    .clone()
                    .map(serde_json::Value::Object)
                    .unwrap_or(serde_json::Value::Null);

                let Ok(_permit) = self.inflight.clone().try_acquire_owned() else {
                    return Ok(mcp::ServerResult::CallToolResult(mcp::CallToolResult {
                        content: vec![mcp::Content::text("too many inflight tool calls".to_string())],
                        structured_content: None,
                        is_error: Some(true),
                        meta: None,
                    }));
                };

                let result = self.handler.call(&name, args).await;
                let (content, is_error) = match result {
                    ToolCallResult::Content(text) => (text, false),
                    ToolCallResult::Error(message) => (message, true),
                };
                Ok(mcp::ServerResult::CallToolResult(mcp::CallToolResult {
                    content: vec![mcp::Content::text(content)],
                    structured_content: None,
                    is_error: Some(is_error),
                    meta: None,
                }))
            }
            other => {
                let _ = other;
                Ok(mcp::ServerResult::empty(()))
            }
        }
    }

    async fn handle_notification(
        &self,
        _notification: mcp::ClientNotification,
        _context: rmcp::service::NotificationContext<RoleServer>,
    ) -> Result<(), mcp::ErrorData> {
        Ok(())
    }

    fn get_info(&self) -> mcp::ServerInfo {
        mcp::ServerInfo {
            protocol_version: mcp::ProtocolVersion::V_2025_03_26,
            capabilities: mcp::ServerCapabilities::builder().enable_tools().build(),
            server_info: mcp::Implementation {
                name: "client-tools".into(),
                title: None,
                version: env!("CARGO_PKG_VERSION").into(),
                icons: None,
                website_url: None,
            },
            instructions: None,
        }
    }
}

fn to_mcp_tool(def: &ToolDefinition) -> mcp::Tool {
    let schema = def.input_schema.as_object().cloned().unwrap_or_default();
    mcp::Tool::new(def.name.clone(), def.description.clone(), schema)
}
