use std::path::PathBuf;

/// Mirrors `codex::home::CodexHomeLayout`'s root-relative accessors for the
/// broker's own on-disk state root (§6 "On-disk state").
pub struct StateRoot {
    root: PathBuf,
}

impl StateRoot {
    pub const ENV_VAR: &'static str = "OPENADE_HOME";

    pub fn resolve() -> Self {
        let root = std::env::var_os(Self::ENV_VAR)
            .map(PathBuf::from)
            .or_else(|| dirs_home().map(|home| home.join(".openade")))
            .unwrap_or_else(|| PathBuf::from(".openade"));
        Self { root }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    pub fn device_file(&self) -> PathBuf {
        self.root.join("device.json")
    }

    pub fn yjs_doc(&self, doc_id: &str) -> PathBuf {
        self.root.join("data").join("yjs").join(doc_id)
    }

    pub fn snapshot_patch(&self, id: &str) -> PathBuf {
        self.root.join("data").join("snapshots").join(format!("{id}.patch"))
    }

    pub fn image(&self, id: &str, ext: &str) -> PathBuf {
        self.root.join("data").join("images").join(format!("{id}.{ext}"))
    }

    pub fn worktree(&self, id: &str) -> PathBuf {
        self.root.join("workspaces").join("worktrees").join(id)
    }

    /// Ensures every directory this layout addresses exists, matching
    /// `CodexHomeLayout::ensure_dirs`'s create-on-first-use approach.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [
            self.root.join("data").join("yjs"),
            self.root.join("data").join("snapshots"),
            self.root.join("data").join("images"),
            self.root.join("workspaces").join("worktrees"),
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_env_var_wins_over_home() {
        std::env::set_var(StateRoot::ENV_VAR, "/tmp/openade-test-root");
        let root = StateRoot::resolve();
        assert_eq!(root.root(), &PathBuf::from("/tmp/openade-test-root"));
        assert_eq!(
            root.snapshot_patch("abc"),
            PathBuf::from("/tmp/openade-test-root/data/snapshots/abc.patch")
        );
        std::env::remove_var(StateRoot::ENV_VAR);
    }
}
