use std::io::Write;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to create temp script: {0}")]
    Create(#[source] std::io::Error),
    #[error("failed to write temp script: {0}")]
    Write(#[source] std::io::Error),
    #[error("failed to set temp script permissions: {0}")]
    Permissions(#[source] std::io::Error),
}

/// Writes `runScript`'s text to a 0700 temp file, prepending a bash
/// preamble when the script has no shebang (§4.H).
pub fn write_temp_script(text: &str) -> Result<PathBuf, ScriptError> {
    let has_shebang = text.starts_with("#!");
    let body = if has_shebang {
        text.to_string()
    } else {
        format!("#!/bin/bash\nset -eu\nset -o pipefail\n{text}")
    };

    let path = std::env::temp_dir().join(format!(
        "process-supervisor-{}-{}.sh",
        std::process::id(),
        uuid::Uuid::new_v4()
    ));

    let mut file = std::fs::File::create(&path).map_err(ScriptError::Create)?;
    file.write_all(body.as_bytes()).map_err(ScriptError::Write)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o700)).map_err(ScriptError::Permissions)?;
    }

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepends_preamble_when_no_shebang() {
        let path = write_temp_script("echo hi").unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("#!/bin/bash\n"));
        assert!(contents.contains("set -eu"));
        assert!(contents.contains("echo hi"));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn keeps_custom_shebang_untouched() {
        let path = write_temp_script("#!/usr/bin/env python3\nprint(1)").unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("#!/usr/bin/env python3\n"));
        std::fs::remove_file(&path).unwrap();
    }
}
