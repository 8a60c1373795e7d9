use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;
use wrapper_events::{AdapterErrorCode, ClassifiedParserError, IngestConfig, LineInput, LineParser};

use crate::error::ErrorCode;
use crate::harness::mcp_config::{self, CodexMcpOverrides};
use crate::harness::types::{
    HarnessCapabilities, HarnessEvent, HarnessQuery, InstallStatus, Mode, PromptBlock, PromptContent, Thinking,
};
use crate::harness::{immediate_error, Harness, HarnessEventStream};
use crate::model::Usage;

const CODEX_BINARY_ENV: &str = "CODEX_BINARY";

/// Generalizes `codex::exec::invoke_codex_exec`'s argv assembly into the
/// translation table from §4.D.
#[derive(Default)]
pub struct CodexHarness {
    binary_override: Option<PathBuf>,
}

impl CodexHarness {
    fn binary(&self) -> PathBuf {
        self.binary_override.clone().unwrap_or_else(|| {
            env::var_os(CODEX_BINARY_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("codex"))
        })
    }

    /// Writes each image block to a 0600 temp file and returns the paths
    /// alongside the `-i <path>` flags, since codex exec takes image
    /// attachments by path rather than inline (§4.D "Images" row).
    fn write_temp_images(blocks: &[PromptBlock]) -> Result<(Vec<String>, Vec<PathBuf>), std::io::Error> {
        let mut flags = Vec::new();
        let mut paths = Vec::new();
        for block in blocks {
            let PromptBlock::Image { data_base64, mime_type } = block else { continue };
            let ext = match mime_type.as_str() {
                "image/png" => "png",
                "image/jpeg" | "image/jpg" => "jpg",
                "image/webp" => "webp",
                "image/gif" => "gif",
                _ => "bin",
            };
            let path = env::temp_dir().join(format!("broker-codex-image-{}-{}.{ext}", std::process::id(), uuid::Uuid::new_v4()));
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(data_base64)
                .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
            std::fs::write(&path, bytes)?;
            flags.push("-i".to_string());
            flags.push(path.display().to_string());
            paths.push(path);
        }
        Ok((flags, paths))
    }

    fn build_argv(query: &HarnessQuery, mcp_overrides: &CodexMcpOverrides, image_flags: &[String]) -> Vec<String> {
        let mut root_flags = Vec::new();
        let mut sub_flags = vec!["--json".to_string(), "--skip-git-repo-check".to_string()];
        root_flags.extend(mcp_overrides.flags.iter().cloned());

        match query.mode {
            Some(Mode::Yolo) => root_flags.push("--full-auto".to_string()),
            Some(Mode::ReadOnly) => {
                root_flags.push("-a".to_string());
                root_flags.push("on-request".to_string());
                sub_flags.push("--sandbox".to_string());
                sub_flags.push("read-only".to_string());
            }
            None => {}
        }

        if let Some(model) = &query.model {
            root_flags.push("-m".to_string());
            root_flags.push(model.clone());
        }

        if let Some(thinking) = query.thinking {
            let effort = match thinking {
                Thinking::Low => "low",
                Thinking::Med => "medium",
                Thinking::High => "xhigh",
            };
            root_flags.push("-c".to_string());
            root_flags.push(format!("model_reasoning_effort={effort}"));
        }

        for dir in &query.additional_directories {
            sub_flags.push("--add-dir".to_string());
            sub_flags.push(dir.clone());
        }
        sub_flags.extend(image_flags.iter().cloned());

        root_flags.push("-C".to_string());
        root_flags.push(query.cwd.clone());

        if query.fork_session {
            warn!("codex exec --json does not support fork-session; ignoring");
        }

        let mut argv = root_flags;
        let is_resume = query.resume_session_id.is_some();
        if let Some(session_id) = &query.resume_session_id {
            argv.push("exec".to_string());
            argv.push("resume".to_string());
            argv.extend(sub_flags);
            argv.push(session_id.clone());
        } else {
            argv.push("exec".to_string());
            argv.extend(sub_flags);
        }

        let prompt_text = match &query.prompt {
            Some(PromptContent::Text(text)) => text.clone(),
            Some(PromptContent::Blocks(blocks)) => blocks
                .iter()
                .filter_map(|block| match block {
                    PromptBlock::Text { text } => Some(text.clone()),
                    PromptBlock::Image { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
            None => String::new(),
        };

        let wrapped_prompt = match (&query.system_prompt, &query.append_system_prompt) {
            (None, None) => prompt_text,
            (system, append) => {
                let mut instructions = String::new();
                if let Some(s) = system {
                    instructions.push_str(s);
                }
                if let Some(a) = append {
                    if !instructions.is_empty() {
                        instructions.push('\n');
                    }
                    instructions.push_str(a);
                }
                format!("<system-instructions>{instructions}</system-instructions>\n{prompt_text}")
            }
        };

        if !is_resume && !wrapped_prompt.is_empty() {
            argv.push(wrapped_prompt);
        } else if is_resume && !wrapped_prompt.is_empty() {
            // `exec resume` takes the prompt after the session id positional.
            argv.push(wrapped_prompt);
        }

        argv
    }
}

#[async_trait]
impl Harness for CodexHarness {
    fn id(&self) -> &'static str {
        "codex"
    }

    fn models(&self) -> Vec<String> {
        vec!["gpt-5-codex".to_string()]
    }

    fn capabilities(&self) -> HarnessCapabilities {
        HarnessCapabilities {
            supports_resume: true,
            supports_fork_session: false,
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

    async fn discover_slash_commands(&self, _cwd: &str) -> Vec<String> {
        Vec::new()
    }

    fn query(&self, query: HarnessQuery) -> (HarnessEventStream, jsonl_stream::CancelHandle) {
        let (image_flags, image_paths) = match &query.prompt {
            Some(PromptContent::Blocks(blocks)) => match Self::write_temp_images(blocks) {
                Ok(result) => result,
                Err(err) => return immediate_error(format!("failed to stage image attachment: {err}")),
            },
            _ => (Vec::new(), Vec::new()),
        };

        let mcp_overrides = mcp_config::codex_mcp_overrides(&query.mcp_servers);

        let mut env: HashMap<String, String> = query.env.clone();
        env.extend(mcp_overrides.env.clone());

        let args = Self::build_argv(&query, &mcp_overrides, &image_flags);

        let spec = jsonl_stream::StreamSpec {
            program: self.binary(),
            args,
            env,
            cwd: Some(PathBuf::from(&query.cwd)),
            parser: CodexLineParser::default(),
            ingest_config: IngestConfig::default(),
            adapter_name: "codex",
            on_exit: Box::new(move |outcome| {
                for path in &image_paths {
                    let _ = std::fs::remove_file(path);
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
                        "codex exited with a non-zero status".to_string()
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

/// Tracks wall-clock time since the process was spawned so `Usage::duration_ms`
/// (Codex reports no duration field itself) can be filled in at the point the
/// `Complete` event is emitted.
pub struct CodexLineParser {
    start: std::time::Instant,
}

impl Default for CodexLineParser {
    fn default() -> Self {
        Self { start: std::time::Instant::now() }
    }
}

#[derive(Debug, Error)]
pub enum CodexParseError {
    #[error("invalid JSON on stdout: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClassifiedParserError for CodexParseError {
    fn code(&self) -> AdapterErrorCode {
        AdapterErrorCode::JsonParse
    }

    fn redacted_summary(&self) -> String {
        "codex stdout line was not valid JSON".to_string()
    }

    fn full_details(&self) -> String {
        self.to_string()
    }
}

impl LineParser for CodexLineParser {
    type Event = HarnessEvent;
    type Error = CodexParseError;

    fn reset(&mut self) {}

    fn parse_line(&mut self, input: LineInput<'_>) -> Result<Option<Self::Event>, Self::Error> {
        let value: Value = serde_json::from_str(input.line)?;
        Ok(Some(classify(value, self.start.elapsed())))
    }
}

fn classify(value: Value, elapsed: Duration) -> HarnessEvent {
    let msg_type = value
        .get("msg")
        .and_then(|m| m.get("type"))
        .and_then(Value::as_str)
        .or_else(|| value.get("type").and_then(Value::as_str))
        .unwrap_or("");

    match msg_type {
        "session_configured" | "session.created" => {
            if let Some(session_id) = value
                .get("msg")
                .and_then(|m| m.get("session_id"))
                .or_else(|| value.get("session_id"))
                .and_then(Value::as_str)
            {
                return HarnessEvent::SessionStarted {
                    session_id: session_id.to_string(),
                };
            }
        }
        "turn.failed" | "error" => {
            let error = value
                .get("msg")
                .and_then(|m| m.get("message"))
                .or_else(|| value.get("error"))
                .and_then(Value::as_str)
                .unwrap_or("codex reported an error")
                .to_string();
            return HarnessEvent::Error {
                error,
                code: classify_error_marker(&value),
            };
        }
        "task_complete" | "turn.completed" => {
            return HarnessEvent::Complete { usage: parse_usage(&value, elapsed) };
        }
        _ => {}
    }

    HarnessEvent::Message(value)
}

fn classify_error_marker(value: &Value) -> Option<ErrorCode> {
    let text = value.to_string().to_lowercase();
    if text.contains("not logged in") || text.contains("unauthorized") {
        Some(ErrorCode::AuthFailed)
    } else if text.contains("rate limit") || text.contains("429") {
        Some(ErrorCode::RateLimited)
    } else if text.contains("context") && (text.contains("exceed") || text.contains("too long")) {
        Some(ErrorCode::ContextOverflow)
    } else {
        Some(ErrorCode::Unknown)
    }
}

fn parse_usage(value: &Value, elapsed: Duration) -> Option<Usage> {
    let usage = value.get("msg").and_then(|m| m.get("usage")).or_else(|| value.get("usage"))?;
    Some(Usage {
        input_tokens: usage.get("input_tokens").and_then(Value::as_u64).unwrap_or(0),
        output_tokens: usage.get("output_tokens").and_then(Value::as_u64).unwrap_or(0),
        cache_read_tokens: usage.get("cached_input_tokens").and_then(Value::as_u64),
        cache_write_tokens: None,
        cost_usd: None,
        duration_ms: Some(elapsed.as_millis() as u64),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_event_types_pass_through_as_generic_message() {
        let value = serde_json::json!({"msg": {"type": "agent_message_delta", "delta": "hi"}});
        assert!(matches!(classify(value, Duration::ZERO), HarnessEvent::Message(_)));
    }

    #[test]
    fn turn_failed_maps_to_error() {
        let value = serde_json::json!({"msg": {"type": "turn.failed", "message": "boom"}});
        match classify(value, Duration::ZERO) {
            HarnessEvent::Error { error, .. } => assert_eq!(error, "boom"),
            other => panic!("expected Error, got {other:?}"),
        }
    }

    #[test]
    fn task_complete_fills_in_wall_clock_duration() {
        let value = serde_json::json!({"msg": {"type": "task_complete", "usage": {"input_tokens": 10, "output_tokens": 5}}});
        match classify(value, Duration::from_millis(250)) {
            HarnessEvent::Complete { usage: Some(usage) } => assert_eq!(usage.duration_ms, Some(250)),
            other => panic!("expected Complete with usage, got {other:?}"),
        }
    }

    #[test]
    fn build_argv_covers_yolo_model_thinking() {
        let mut query = HarnessQuery::new("/tmp/proj");
        query.mode = Some(Mode::Yolo);
        query.model = Some("gpt-5-codex".to_string());
        query.thinking = Some(Thinking::High);
        query.prompt = Some(PromptContent::Text("hi".to_string()));
        let overrides = CodexMcpOverrides { flags: Vec::new(), env: HashMap::new() };
        let argv = CodexHarness::build_argv(&query, &overrides, &[]);
        assert!(argv.contains(&"--full-auto".to_string()));
        assert!(argv.windows(2).any(|w| w == ["-m", "gpt-5-codex"]));
        assert!(argv.windows(2).any(|w| w == ["-c", "model_reasoning_effort=xhigh"]));
        assert!(argv.windows(2).any(|w| w == ["-C", "/tmp/proj"]));
        assert_eq!(argv.last().map(String::as_str), Some("hi"));
    }

    #[test]
    fn build_argv_splices_in_mcp_overrides_and_image_flags() {
        let query = HarnessQuery::new("/tmp/proj");
        let overrides = CodexMcpOverrides {
            flags: vec!["-c".to_string(), "mcp_servers.fs.command=\"npx\"".to_string()],
            env: HashMap::new(),
        };
        let image_flags = vec!["-i".to_string(), "/tmp/broker-codex-image-1.png".to_string()];
        let argv = CodexHarness::build_argv(&query, &overrides, &image_flags);
        assert!(argv.windows(2).any(|w| w == ["-c", "mcp_servers.fs.command=\"npx\""]));
        assert!(argv.windows(2).any(|w| w == ["-i", "/tmp/broker-codex-image-1.png"]));
    }
}
