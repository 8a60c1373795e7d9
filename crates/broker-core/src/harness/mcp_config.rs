//! Translates `mcpServers`/`clientTools` into each harness's native
//! configuration surface (§4.D, §9 "MCP server / client tool wiring").
//!
//! Claude reads a JSON config file passed via `--mcp-config`; Codex takes
//! repeated `-c mcp_servers.<name>.<field>=<toml-value>` overrides with
//! bearer tokens indirected through an ephemeral env var rather than argv.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;

use serde_json::{json, Value};
use thiserror::Error;

use crate::harness::types::{McpServerSpec, McpTransportSpec};

#[derive(Debug, Error)]
pub enum McpConfigError {
    #[error("failed to create mcp config temp file: {0}")]
    Create(#[source] std::io::Error),
    #[error("failed to write mcp config temp file: {0}")]
    Write(#[source] std::io::Error),
    #[error("failed to serialize mcp config: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// A Claude `--mcp-config <path> --strict-mcp-config` config file, owned by
/// the caller; removed once the harness process has exited.
pub struct ClaudeMcpConfig {
    pub path: PathBuf,
}

impl ClaudeMcpConfig {
    pub fn cleanup(&self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Writes `{mcpServers: {<name>: stdioOrHttpConfig}}` to a temp path. Does
/// not write anything and returns `None` when `servers` is empty, since an
/// absent `--mcp-config` flag is indistinguishable from an empty one.
pub fn write_claude_config(servers: &[McpServerSpec]) -> Result<Option<ClaudeMcpConfig>, McpConfigError> {
    if servers.is_empty() {
        return Ok(None);
    }

    let mut entries = serde_json::Map::new();
    for server in servers {
        entries.insert(server.name.clone(), claude_transport_json(&server.transport));
    }
    let document = json!({ "mcpServers": Value::Object(entries) });
    let body = serde_json::to_vec_pretty(&document).map_err(McpConfigError::Serialize)?;

    let path = std::env::temp_dir().join(format!("broker-mcp-config-{}-{}.json", std::process::id(), uuid::Uuid::new_v4()));
    let mut file = std::fs::File::create(&path).map_err(McpConfigError::Create)?;
    file.write_all(&body).map_err(McpConfigError::Write)?;

    Ok(Some(ClaudeMcpConfig { path }))
}

fn claude_transport_json(transport: &McpTransportSpec) -> Value {
    match transport {
        McpTransportSpec::Stdio { command, args } => json!({ "command": command, "args": args }),
        McpTransportSpec::Http { url, bearer_token } => {
            let mut headers = serde_json::Map::new();
            if let Some(token) = bearer_token {
                headers.insert("Authorization".to_string(), json!(format!("Bearer {token}")));
            }
            json!({ "url": url, "headers": Value::Object(headers) })
        }
    }
}

/// Codex's `-c mcp_servers.<name>.<field>=<toml-value>` overrides, plus the
/// env vars any bearer tokens must be indirected through (never on argv).
pub struct CodexMcpOverrides {
    pub flags: Vec<String>,
    pub env: HashMap<String, String>,
}

pub fn codex_mcp_overrides(servers: &[McpServerSpec]) -> CodexMcpOverrides {
    let mut flags = Vec::new();
    let mut env = HashMap::new();

    for server in servers {
        let prefix = format!("mcp_servers.{}", toml_key(&server.name));
        match &server.transport {
            McpTransportSpec::Stdio { command, args } => {
                flags.push("-c".to_string());
                flags.push(format!("{prefix}.command={}", toml_string(command)));
                if !args.is_empty() {
                    flags.push("-c".to_string());
                    flags.push(format!("{prefix}.args={}", toml_string_array(args)));
                }
            }
            McpTransportSpec::Http { url, bearer_token } => {
                flags.push("-c".to_string());
                flags.push(format!("{prefix}.url={}", toml_string(url)));
                if let Some(token) = bearer_token {
                    let var_name = format!("MCP_BEARER_{}_{}", sanitize_env_key(&server.name), uuid::Uuid::new_v4().simple());
                    flags.push("-c".to_string());
                    flags.push(format!("{prefix}.bearer_token_env_var={}", toml_string(&var_name)));
                    env.insert(var_name, token.clone());
                }
            }
        }
    }

    CodexMcpOverrides { flags, env }
}

fn toml_key(name: &str) -> String {
    if name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') && !name.is_empty() {
        name.to_string()
    } else {
        toml_string(name)
    }
}

fn toml_string(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn toml_string_array(values: &[String]) -> String {
    let rendered: Vec<String> = values.iter().map(|v| toml_string(v)).collect();
    format!("[{}]", rendered.join(","))
}

fn sanitize_env_key(name: &str) -> String {
    name.chars().map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http_server(name: &str, token: Option<&str>) -> McpServerSpec {
        McpServerSpec {
            name: name.to_string(),
            transport: McpTransportSpec::Http {
                url: "http://127.0.0.1:9999/mcp".to_string(),
                bearer_token: token.map(str::to_string),
            },
        }
    }

    #[test]
    fn empty_servers_skip_writing_a_claude_config() {
        assert!(write_claude_config(&[]).unwrap().is_none());
    }

    #[test]
    fn claude_config_contains_url_and_bearer_header() {
        let config = write_claude_config(&[http_server("client-tools", Some("secret-token"))]).unwrap().unwrap();
        let contents = std::fs::read_to_string(&config.path).unwrap();
        assert!(contents.contains("client-tools"));
        assert!(contents.contains("Bearer secret-token"));
        config.cleanup();
        assert!(!config.path.exists());
    }

    #[test]
    fn codex_overrides_indirect_bearer_tokens_through_env_not_argv() {
        let overrides = codex_mcp_overrides(&[http_server("client-tools", Some("secret-token"))]);
        assert!(overrides.flags.iter().any(|f| f.contains("bearer_token_env_var")));
        assert!(!overrides.flags.iter().any(|f| f.contains("secret-token")));
        assert_eq!(overrides.env.len(), 1);
        assert_eq!(overrides.env.values().next().map(String::as_str), Some("secret-token"));
    }

    #[test]
    fn codex_stdio_overrides_render_command_and_args() {
        let server = McpServerSpec {
            name: "fs".to_string(),
            transport: McpTransportSpec::Stdio { command: "npx".to_string(), args: vec!["-y".to_string(), "mcp-fs".to_string()] },
        };
        let overrides = codex_mcp_overrides(&[server]);
        assert!(overrides.flags.iter().any(|f| f == "mcp_servers.fs.command=\"npx\""));
        assert!(overrides.flags.iter().any(|f| f.starts_with("mcp_servers.fs.args=")));
    }
}
