use std::collections::HashMap;
use std::env;
use std::sync::{Mutex, OnceLock};

use tracing::{debug, warn};

use crate::error::RunnerError;

const LOGIN_SHELL_DELIMITER: &str = "___SUBPROCESS_RUNNER_ENV___";

/// Process-wide overrides layered on top of `process env` and beneath
/// per-call env, per §4.A: `process env ∪ globalOverrides ∪ perCallEnv`.
///
/// Every override remembers the value it replaced so a later restore (or
/// process shutdown) can put the prior value back, per §9's "global mutable
/// state" design note.
pub struct GlobalEnvOverrides {
    prior: Mutex<HashMap<String, Option<String>>>,
}

static GLOBAL_OVERRIDES: OnceLock<GlobalEnvOverrides> = OnceLock::new();

impl GlobalEnvOverrides {
    fn instance() -> &'static GlobalEnvOverrides {
        GLOBAL_OVERRIDES.get_or_init(|| GlobalEnvOverrides {
            prior: Mutex::new(HashMap::new()),
        })
    }

    /// Applies client-pushed globals, recording the previous value of each
    /// key the first time it is touched so later replacements can restore it.
    pub fn set_globals(overrides: &HashMap<String, String>) {
        let instance = Self::instance();
        let mut prior = instance.prior.lock().expect("global env lock poisoned");
        for (key, value) in overrides {
            prior.entry(key.clone()).or_insert_with(|| env::var(key).ok());
            env::set_var(key, value);
        }
    }

    /// Returns the current set of global overrides as a snapshot for merging
    /// into a per-call environment.
    pub fn snapshot() -> HashMap<String, String> {
        let instance = Self::instance();
        let prior = instance.prior.lock().expect("global env lock poisoned");
        prior
            .keys()
            .filter_map(|key| env::var(key).ok().map(|value| (key.clone(), value)))
            .collect()
    }

    /// Restores every overridden key to its pre-override value. Intended for
    /// orderly shutdown.
    pub fn restore_all() {
        let instance = Self::instance();
        let mut prior = instance.prior.lock().expect("global env lock poisoned");
        for (key, previous) in prior.drain() {
            match previous {
                Some(value) => env::set_var(&key, value),
                None => env::remove_var(&key),
            }
        }
    }
}

/// Spawns the user's login shell once to capture PATH entries it adds beyond
/// what this process inherited, then merges any new entries into the current
/// process env. Mirrors the "login-shell PATH capture performed once at
/// startup" feeder described in §4.A.
pub async fn capture_login_shell_path() -> Result<(), RunnerError> {
    let shell = env::var("SHELL").unwrap_or_else(|_| "/bin/bash".to_string());
    let probe = format!("echo {LOGIN_SHELL_DELIMITER}$PATH{LOGIN_SHELL_DELIMITER}");

    let output = tokio::process::Command::new(&shell)
        .arg("-ilc")
        .arg(probe)
        .output()
        .await
        .map_err(RunnerError::ShellProbe)?;

    if !output.status.success() {
        warn!(shell = %shell, "login shell PATH probe exited non-zero; skipping PATH merge");
        return Ok(());
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let Some(captured) = extract_delimited(&stdout) else {
        debug!("login shell PATH probe produced no delimited output");
        return Ok(());
    };

    let current_path = env::var("PATH").unwrap_or_default();
    let mut entries: Vec<&str> = current_path.split(':').filter(|s| !s.is_empty()).collect();
    let mut appended = false;
    for candidate in captured.split(':').filter(|s| !s.is_empty()) {
        if !entries.contains(&candidate) {
            entries.push(candidate);
            appended = true;
        }
    }

    if appended {
        env::set_var("PATH", entries.join(":"));
    }
    Ok(())
}

fn extract_delimited(haystack: &str) -> Option<&str> {
    let start = haystack.find(LOGIN_SHELL_DELIMITER)? + LOGIN_SHELL_DELIMITER.len();
    let rest = &haystack[start..];
    let end = rest.find(LOGIN_SHELL_DELIMITER)?;
    Some(rest[..end].trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_path_between_delimiters() {
        let haystack = format!("{LOGIN_SHELL_DELIMITER}/usr/bin:/bin{LOGIN_SHELL_DELIMITER}\n");
        assert_eq!(extract_delimited(&haystack), Some("/usr/bin:/bin"));
    }

    #[test]
    fn returns_none_without_delimiters() {
        assert_eq!(extract_delimited("no markers here"), None);
    }
}
