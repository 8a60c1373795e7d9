use std::path::PathBuf;

/// Platform default-shell resolution (§4.G): `SHELL`, else the first of the
/// POSIX fallbacks that exists; `%COMSPEC%` or PowerShell on Windows.
pub fn default_shell() -> String {
    #[cfg(windows)]
    {
        std::env::var("COMSPEC").unwrap_or_else(|_| "powershell.exe".to_string())
    }
    #[cfg(not(windows))]
    {
        if let Ok(shell) = std::env::var("SHELL") {
            if !shell.is_empty() {
                return shell;
            }
        }
        for candidate in ["/bin/bash", "/bin/zsh", "/bin/sh"] {
            if PathBuf::from(candidate).exists() {
                return candidate.to_string();
            }
        }
        "/bin/sh".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_a_posix_shell_when_shell_unset() {
        let shell = default_shell();
        assert!(!shell.is_empty());
    }
}
