//! The per-run temporary directory holding fragments and masters.

use crate::error::{NarratorError, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const WORKSPACE_PREFIX: &str = "audiobook_gen_";

/// Scratch space for one document run, removed when dropped.
///
/// Each chapter gets its own `ch_<n>` subdirectory so concurrent chapter
/// workers never write to the same paths.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a workspace under `base`, or the system temp dir.
    pub fn create(base: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKSPACE_PREFIX);
        let dir = match base {
            Some(base) => {
                std::fs::create_dir_all(base).map_err(NarratorError::Workspace)?;
                builder.tempdir_in(base)
            }
            None => builder.tempdir(),
        }
        .map_err(NarratorError::Workspace)?;

        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Create and return the directory for chapter `number`.
    pub fn chapter_dir(&self, number: usize) -> Result<PathBuf> {
        let dir = self.dir.path().join(format!("ch_{}", number));
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Remove the workspace now, reporting any error.
    pub fn close(self) -> Result<()> {
        self.dir.close().map_err(NarratorError::Workspace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_layout_and_cleanup() {
        let base = TempDir::new().unwrap();
        let workspace = Workspace::create(Some(base.path())).unwrap();
        let root = workspace.path().to_path_buf();

        assert!(root.starts_with(base.path()));
        assert!(root.file_name().unwrap().to_string_lossy().starts_with("audiobook_gen_"));

        let ch = workspace.chapter_dir(3).unwrap();
        assert_eq!(ch, root.join("ch_3"));
        std::fs::write(ch.join("chunk_0000.aiff"), b"x").unwrap();

        workspace.close().unwrap();
        assert!(!root.exists());
    }

    #[test]
    fn test_workspace_removed_on_drop() {
        let base = TempDir::new().unwrap();
        let root = {
            let workspace = Workspace::create(Some(base.path())).unwrap();
            workspace.chapter_dir(1).unwrap();
            workspace.path().to_path_buf()
        };
        assert!(!root.exists());
    }

    #[test]
    fn test_workspace_base_created() {
        let base = TempDir::new().unwrap();
        let nested = base.path().join("not").join("yet");
        let workspace = Workspace::create(Some(&nested)).unwrap();
        assert!(workspace.path().starts_with(&nested));
    }
}
