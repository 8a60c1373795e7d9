use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use wrapper_events::{AdapterErrorCode, ClassifiedParserError, IngestConfig, LineInput, LineParser};

use crate::error::ErrorCode;
use crate::harness::mcp_config::{self, ClaudeMcpConfig};
use crate::harness::types::{
    HarnessCapabilities, HarnessEvent, HarnessQuery, InstallStatus, Mode, PromptBlock, PromptContent, Thinking,
};
use crate::harness::{immediate_error, Harness, HarnessEventStream};
use crate::model::Usage;

const CLAUDE_BINARY_ENV: &str = "CLAUDE_BINARY";

/// Generalizes `claude_code::commands::print::ClaudePrintRequest::argv` into
/// the full translation table from §4.D, reused here rather than through
/// `claude_code::ClaudeClient` so the invocation can stream through
/// `jsonl-stream` instead of buffering to completion.
#[derive(Default)]
pub struct ClaudeHarness {
    binary_override: Option<PathBuf>,
    slash_command_cache: Mutex<HashMap<String, Vec<String>>>,
}

impl ClaudeHarness {
    fn binary(&self) -> PathBuf {
        self.binary_override.clone().unwrap_or_else(|| {
            env::var_os(CLAUDE_BINARY_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("claude"))
        })
    }

    fn build_argv(query: &HarnessQuery, mcp_config: Option<&ClaudeMcpConfig>) -> Vec<String> {
        let mut args = vec!["--output-format".to_string(), "stream-json".to_string(), "--verbose".to_string()];

        if let Some(system_prompt) = &query.system_prompt {
            args.push("--system-prompt".to_string());
            args.push(system_prompt.clone());
        }
        if let Some(append) = &query.append_system_prompt {
            args.push("--append-system-prompt".to_string());
            args.push(append.clone());
        }

        match query.mode {
            Some(Mode::Yolo) => args.push("--dangerously-skip-permissions".to_string()),
            Some(Mode::ReadOnly) => {
                args.push("--permission-mode".to_string());
                args.push("plan".to_string());
            }
            None => {}
        }

        if let Some(model) = &query.model {
            args.push("--model".to_string());
            args.push(model.clone());
        }

        if let Some(thinking) = query.thinking {
            let (effort, budget) = match thinking {
                Thinking::Low => ("low", 3000),
                Thinking::Med => ("medium", 5000),
                Thinking::High => ("high", 10000),
            };
            args.push("--effort".to_string());
            args.push(effort.to_string());
            args.push("--max-thinking-tokens".to_string());
            args.push(budget.to_string());
        }

        if let Some(resume) = &query.resume_session_id {
            args.push("--resume".to_string());
            args.push(resume.clone());
            if query.fork_session {
                args.push("--fork-session".to_string());
            }
        }

        for dir in &query.additional_directories {
            args.push("--add-dir".to_string());
            args.push(dir.clone());
        }

        if !query.allowed_tools.is_empty() {
            args.push("--allowed-tools".to_string());
            args.push(query.allowed_tools.join(","));
        }
        if !query.disallowed_tools.is_empty() {
            args.push("--disallowed-tools".to_string());
            args.push(query.disallowed_tools.join(","));
        }

        if let Some(config) = mcp_config {
            args.push("--mcp-config".to_string());
            args.push(config.path.display().to_string());
            args.push("--strict-mcp-config".to_string());
        }

        match &query.prompt {
            Some(PromptContent::Text(text)) => {
                args.push("-p".to_string());
                args.push(text.clone());
            }
            Some(PromptContent::Blocks(blocks)) => {
                args.push("-p".to_string());
                args.push(Self::render_content_blocks(blocks));
            }
            None => {}
        }

        args
    }

    /// Claude's `-p` accepts a JSON content-block array in place of plain
    /// text, images inlined as base64 (§4.D "prompt" row).
    fn render_content_blocks(blocks: &[PromptBlock]) -> String {
        let rendered: Vec<Value> = blocks
            .iter()
            .map(|block| match block {
                PromptBlock::Text { text } => serde_json::json!({"type": "text", "text": text}),
                PromptBlock::Image { data_base64, mime_type } => serde_json::json!({
                    "type": "image",
                    "source": {"type": "base64", "media_type": mime_type, "data": data_base64},
                }),
            })
            .collect();
        Value::Array(rendered).to_string()
    }

    fn default_env() -> HashMap<String, String> {
        let mut env = HashMap::new();
        env.insert("DISABLE_TELEMETRY".to_string(), "1".to_string());
        env.insert("DISABLE_ERROR_REPORTING".to_string(), "1".to_string());
        env
    }

    /// When `forceSubagentModel` is set, pins the env vars Claude Code reads
    /// for subagent model defaults to the top-level `model` (§4.D "model" row).
    fn subagent_model_env(query: &HarnessQuery) -> HashMap<String, String> {
        let mut env = HashMap::new();
        if query.force_subagent_model {
            if let Some(model) = &query.model {
                for var in ["ANTHROPIC_DEFAULT_SONNET_MODEL", "ANTHROPIC_DEFAULT_OPUS_MODEL", "ANTHROPIC_DEFAULT_HAIKU_MODEL"] {
                    env.insert(var.to_string(), model.clone());
                }
            }
        }
        env
    }

    /// Evicts a cached `discoverSlashCommands` result, e.g. after a plugin
    /// install changes what's available in `cwd`.
    pub fn invalidate_slash_commands(&self, cwd: &str) {
        self.slash_command_cache.lock().expect("slash command cache poisoned").remove(cwd);
    }

    /// Runs a trivial probe invocation and aborts it as soon as the
    /// `system:init` line arrives, reading `slash_commands`/`skills` off it.
    async fn probe_slash_commands(&self, cwd: &str) -> Vec<String> {
        let env = Self::default_env();
        let mut command = tokio::process::Command::new(self.binary());
        command
            .args(["--output-format", "stream-json", "--verbose", "-p", ""])
            .envs(env)
            .current_dir(cwd)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null());

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(_) => return Vec::new(),
        };
        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill().await;
            return Vec::new();
        };

        let mut lines = BufReader::new(stdout).lines();
        let commands = loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let Ok(value) = serde_json::from_str::<Value>(&line) else { continue };
                    if value.get("type").and_then(Value::as_str) != Some("system")
                        || value.get("subtype").and_then(Value::as_str) != Some("init")
                    {
                        continue;
                    }
                    break extract_slash_commands(&value);
                }
                _ => break Vec::new(),
            }
        };

        let _ = child.start_kill();
        let _ = child.wait().await;
        commands
    }
}

#[async_trait]
impl Harness for ClaudeHarness {
    fn id(&self) -> &'static str {
        "claude-code"
    }

    fn models(&self) -> Vec<String> {
        vec!["claude-opus-4".to_string(), "claude-sonnet-4".to_string()]
    }

    fn capabilities(&self) -> HarnessCapabilities {
        HarnessCapabilities {
            supports_resume: true,
            supports_fork_session: true,
            supports_images: true,
            supports_client_tools: true,
        }
    }

    async fn check_install_status(&self) -> InstallStatus {
        let spec = subprocess_runner::RunSpec::new(self.binary())
            .args(["--version"])
            .timeout(Duration::from_secs(15));
        match subprocess_runner::run(spec).await {
            Ok(output) if output.success => InstallStatus::Installed {
                version: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            },
            _ => InstallStatus::NotInstalled,
        }
    }

    async fn discover_slash_commands(&self, cwd: &str) -> Vec<String> {
        if let Some(cached) = self.slash_command_cache.lock().expect("slash command cache poisoned").get(cwd) {
            return cached.clone();
        }
        let commands = self.probe_slash_commands(cwd).await;
        self.slash_command_cache
            .lock()
            .expect("slash command cache poisoned")
            .insert(cwd.to_string(), commands.clone());
        commands
    }

    fn query(&self, query: HarnessQuery) -> (HarnessEventStream, jsonl_stream::CancelHandle) {
        let mcp_config = match mcp_config::write_claude_config(&query.mcp_servers) {
            Ok(config) => config,
            Err(err) => return immediate_error(err.to_string()),
        };

        let mut env = Self::default_env();
        env.extend(Self::subagent_model_env(&query));
        env.extend(query.env.clone());

        let args = Self::build_argv(&query, mcp_config.as_ref());
        let spec = jsonl_stream::StreamSpec {
            program: self.binary(),
            args,
            env,
            cwd: Some(PathBuf::from(&query.cwd)),
            parser: ClaudeLineParser::default(),
            ingest_config: IngestConfig::default(),
            adapter_name: "claude-code",
            on_exit: Box::new(move |outcome| {
                if let Some(config) = &mcp_config {
                    config.cleanup();
                }
                if outcome.cancelled {
                    return Vec::new();
                }
                if outcome.exit_code == Some(0) {
                    return Vec::new();
                }
                let stderr = String::from_utf8_lossy(&outcome.stderr).trim().to_string();
                vec![HarnessEvent::Error {
                    error: if stderr.is_empty() {
                        "claude exited with a non-zero status".to_string()
                    } else {
                        stderr
                    },
                    code: Some(ErrorCode::ProcessCrashed),
                }]
            }),
        };

        let (stream, cancel) = jsonl_stream::spawn_jsonl_stream(spec);
        let mapped = futures_util::StreamExt::filter_map(stream, |item| async move {
            match item {
                jsonl_stream::StreamItem::RawMessage(event) => Some(event),
                jsonl_stream::StreamItem::Stderr(bytes) => Some(HarnessEvent::Stderr {
                    data: String::from_utf8_lossy(&bytes).into_owned(),
                }),
            }
        });
        (Box::pin(mapped), cancel)
    }
}

#[derive(Default)]
pub struct ClaudeLineParser;

#[derive(Debug, Error)]
pub enum ClaudeParseError {
    #[error("invalid JSON on stdout: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClassifiedParserError for ClaudeParseError {
    fn code(&self) -> AdapterErrorCode {
        AdapterErrorCode::JsonParse
    }

    fn redacted_summary(&self) -> String {
        "claude stdout line was not valid JSON".to_string()
    }

    fn full_details(&self) -> String {
        self.to_string()
    }
}

impl LineParser for ClaudeLineParser {
    type Event = HarnessEvent;
    type Error = ClaudeParseError;

    fn reset(&mut self) {}

    fn parse_line(&mut self, input: LineInput<'_>) -> Result<Option<Self::Event>, Self::Error> {
        let value: Value = serde_json::from_str(input.line)?;
        Ok(Some(classify(value)))
    }
}

fn extract_slash_commands(init_line: &Value) -> Vec<String> {
    let mut names = Vec::new();
    for key in ["slash_commands", "skills"] {
        if let Some(array) = init_line.get(key).and_then(Value::as_array) {
            names.extend(array.iter().filter_map(Value::as_str).map(str::to_string));
        }
    }
    names
}

fn classify(value: Value) -> HarnessEvent {
    let type_field = value.get("type").and_then(Value::as_str).unwrap_or("");
    let subtype_field = value.get("subtype").and_then(Value::as_str).unwrap_or("");

    if type_field == "system" && subtype_field == "init" {
        if let Some(session_id) = value.get("session_id").and_then(Value::as_str) {
            return HarnessEvent::SessionStarted {
                session_id: session_id.to_string(),
            };
        }
    }

    if type_field == "result" {
        if subtype_field == "error" || value.get("is_error").and_then(Value::as_bool) == Some(true) {
            let error = value
                .get("error")
                .or_else(|| value.get("result"))
                .and_then(Value::as_str)
                .unwrap_or("claude reported an error result")
                .to_string();
            return HarnessEvent::Error {
                error,
                code: classify_error_marker(&value),
            };
        }

        let usage = parse_usage(&value);
        return HarnessEvent::Complete { usage: Some(usage) };
    }

    HarnessEvent::Message(value)
}

fn classify_error_marker(value: &Value) -> Option<ErrorCode> {
    let text = value.to_string().to_lowercase();
    if text.contains("not logged in") || text.contains("authentication") {
        Some(ErrorCode::AuthFailed)
    } else if text.contains("rate limit") {
        Some(ErrorCode::RateLimited)
    } else if text.contains("context") && text.contains("too long") {
        Some(ErrorCode::ContextOverflow)
    } else {
        Some(ErrorCode::Unknown)
    }
}

fn parse_usage(value: &Value) -> Usage {
    let usage = value.get("usage");
    Usage {
        input_tokens: usage
            .and_then(|u| u.get("input_tokens"))
            .and_then(Value::as_u64)
            .unwrap_or(0),
        output_tokens: usage
            .and_then(|u| u.get("output_tokens"))
            .and_then(Value::as_u64)
            .unwrap_or(0),
        cache_read_tokens: usage
            .and_then(|u| u.get("cache_read_input_tokens"))
            .and_then(Value::as_u64),
        cache_write_tokens: usage
            .and_then(|u| u.get("cache_creation_input_tokens"))
            .and_then(Value::as_u64),
        cost_usd: value.get("total_cost_usd").and_then(Value::as_f64),
        duration_ms: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_system_init_as_session_started() {
        let value = serde_json::json!({"type": "system", "subtype": "init", "session_id": "abc"});
        match classify(value) {
            HarnessEvent::SessionStarted { session_id } => assert_eq!(session_id, "abc"),
            other => panic!("expected SessionStarted, got {other:?}"),
        }
    }

    #[test]
    fn classifies_result_as_complete_with_usage() {
        let value = serde_json::json!({
            "type": "result",
            "usage": {"input_tokens": 10, "output_tokens": 20},
            "total_cost_usd": 0.5
        });
        match classify(value) {
            HarnessEvent::Complete { usage: Some(usage) } => {
                assert_eq!(usage.input_tokens, 10);
                assert_eq!(usage.output_tokens, 20);
                assert_eq!(usage.cost_usd, Some(0.5));
            }
            other => panic!("expected Complete, got {other:?}"),
        }
    }

    #[test]
    fn unknown_types_pass_through_as_message() {
        let value = serde_json::json!({"type": "assistant", "message": {"content": []}});
        assert!(matches!(classify(value), HarnessEvent::Message(_)));
    }

    #[test]
    fn build_argv_covers_mode_model_thinking() {
        let mut query = HarnessQuery::new("/tmp");
        query.mode = Some(Mode::Yolo);
        query.model = Some("claude-opus-4".to_string());
        query.thinking = Some(Thinking::High);
        query.prompt = Some(PromptContent::Text("hello".to_string()));
        let argv = ClaudeHarness::build_argv(&query, None);
        assert!(argv.contains(&"--dangerously-skip-permissions".to_string()));
        assert!(argv.windows(2).any(|w| w == ["--model", "claude-opus-4"]));
        assert!(argv.windows(2).any(|w| w == ["--effort", "high"]));
        assert!(argv.windows(2).any(|w| w == ["--max-thinking-tokens", "10000"]));
        assert!(argv.windows(2).any(|w| w == ["-p", "hello"]));
    }

    #[test]
    fn build_argv_passes_mcp_config_flags_when_present() {
        let query = HarnessQuery::new("/tmp");
        let config = ClaudeMcpConfig { path: PathBuf::from("/tmp/broker-mcp-config-test.json") };
        let argv = ClaudeHarness::build_argv(&query, Some(&config));
        assert!(argv.windows(2).any(|w| w == ["--mcp-config", "/tmp/broker-mcp-config-test.json"]));
        assert!(argv.contains(&"--strict-mcp-config".to_string()));
    }

    #[test]
    fn force_subagent_model_pins_default_model_env_vars() {
        let mut query = HarnessQuery::new("/tmp");
        query.model = Some("claude-opus-4".to_string());
        query.force_subagent_model = true;
        let env = ClaudeHarness::subagent_model_env(&query);
        assert_eq!(env.get("ANTHROPIC_DEFAULT_SONNET_MODEL").map(String::as_str), Some("claude-opus-4"));
        assert_eq!(env.get("ANTHROPIC_DEFAULT_OPUS_MODEL").map(String::as_str), Some("claude-opus-4"));
        assert_eq!(env.get("ANTHROPIC_DEFAULT_HAIKU_MODEL").map(String::as_str), Some("claude-opus-4"));
    }

    #[test]
    fn subagent_model_env_is_empty_when_flag_unset() {
        let mut query = HarnessQuery::new("/tmp");
        query.model = Some("claude-opus-4".to_string());
        assert!(ClaudeHarness::subagent_model_env(&query).is_empty());
    }

    #[test]
    fn extracts_slash_commands_and_skills_from_init_line() {
        let init = serde_json::json!({
            "type": "system",
            "subtype": "init",
            "slash_commands": ["/review", "/commit"],
            "skills": ["refactor"],
        });
        let names = extract_slash_commands(&init);
        assert_eq!(names, vec!["/review".to_string(), "/commit".to_string(), "refactor".to_string()]);
    }

    #[test]
    fn image_blocks_render_as_anthropic_content_blocks() {
        let mut query = HarnessQuery::new("/tmp");
        query.prompt = Some(PromptContent::Blocks(vec![
            PromptBlock::Text { text: "look at this".to_string() },
            PromptBlock::Image { data_base64: "ZmFrZQ==".to_string(), mime_type: "image/png".to_string() },
        ]));
        let argv = ClaudeHarness::build_argv(&query, None);
        let prompt_arg = argv.last().unwrap();
        let parsed: Value = serde_json::from_str(prompt_arg).unwrap();
        assert_eq!(parsed[0]["type"], "text");
        assert_eq!(parsed[1]["source"]["media_type"], "image/png");
        assert_eq!(parsed[1]["source"]["data"], "ZmFrZQ==");
    }
}
