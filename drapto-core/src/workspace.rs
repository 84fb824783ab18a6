// ============================================================================
// drapto-core/src/workspace.rs
// ============================================================================
//
// WORKSPACE MANAGER (§4.12)
//
// Allocates per-job scratch directories rooted at `output-dir/work`, with
// guaranteed teardown on success, failure, or signal. Grounded in
// `drapto-core/src/config/directory.rs`'s `DirectoryConfig` for the
// subdirectory layout, generalized from its optional fields to the five
// always-present subdirectories named in §3.
//
// AI-ASSISTANT-INFO: RAII-style workspace with `Drop`-driven cleanup plus an
// explicit signal-handling hook for the orchestrator.

use std::io;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// A job's scratch directory tree: `root/{audio,segments,encoded,temp,logs}`.
/// Dropping a `Workspace` removes the whole tree unless `keep` was set,
/// mirroring `DirectoryConfig::keep_temp_files`.
pub struct Workspace {
    root: PathBuf,
    keep: bool,
}

impl Workspace {
    /// Creates the workspace atomically: the root and every subdirectory are
    /// created before this call returns `Ok`, or nothing is left behind on
    /// error.
    pub fn create(output_dir: &Path, keep: bool) -> Result<Self> {
        let root = output_dir.join("work");
        let workspace = Workspace { root: root.clone(), keep };
        if let Err(err) = workspace.create_tree() {
            let _ = std::fs::remove_dir_all(&root);
            return Err(err.into());
        }
        Ok(workspace)
    }

    fn create_tree(&self) -> io::Result<()> {
        for sub in Self::SUBDIRS {
            std::fs::create_dir_all(self.root.join(sub))?;
        }
        Ok(())
    }

    pub const SUBDIRS: [&'static str; 5] = ["audio", "segments", "encoded", "temp", "logs"];

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.root.join("audio")
    }

    pub fn segments_dir(&self) -> PathBuf {
        self.root.join("segments")
    }

    pub fn encoded_dir(&self) -> PathBuf {
        self.root.join("encoded")
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.root.join("temp")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Tears down the workspace immediately. Idempotent. Called both from
    /// `Drop` and explicitly from the orchestrator's signal handler, since a
    /// signal handler cannot rely on stack unwinding to run destructors.
    pub fn teardown(&self) {
        if self.keep {
            log::info!("keeping workspace at {} (keep_temp_files set)", self.root.display());
            return;
        }
        if let Err(err) = std::fs::remove_dir_all(&self.root) {
            if err.kind() != io::ErrorKind::NotFound {
                log::warn!("failed to remove workspace {}: {err}", self.root.display());
            }
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_builds_all_five_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::create(dir.path(), false).unwrap();
        for sub in Workspace::SUBDIRS {
            assert!(workspace.root().join(sub).is_dir());
        }
    }

    #[test]
    fn drop_removes_workspace_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let root = {
            let workspace = Workspace::create(dir.path(), false).unwrap();
            workspace.root().to_path_buf()
        };
        assert!(!root.exists());
    }

    #[test]
    fn keep_flag_preserves_workspace_after_drop() {
        let dir = tempfile::tempdir().unwrap();
        let root = {
            let workspace = Workspace::create(dir.path(), true).unwrap();
            workspace.root().to_path_buf()
        };
        assert!(root.exists());
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn explicit_teardown_then_drop_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::create(dir.path(), false).unwrap();
        workspace.teardown();
        workspace.teardown();
    }
}
