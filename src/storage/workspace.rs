use crate::common::Result;
use crate::core::Quality;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

enum WorkspaceDir {
    /// Removed from disk when dropped.
    Scoped(TempDir),
    /// Left on disk for inspection.
    Retained(PathBuf),
}

/// Per-session working directory holding the temp upload and the
/// per-quality output files.
pub struct SessionWorkspace {
    dir: WorkspaceDir,
}

impl SessionWorkspace {
    pub fn create(root: &Path, session_id: &str, keep_artifacts: bool) -> Result<Self> {
        fs::create_dir_all(root)?;

        let temp = tempfile::Builder::new()
            .prefix(&format!("image-optimizer-{}-", session_id))
            .tempdir_in(root)?;

        let dir = if keep_artifacts {
            WorkspaceDir::Retained(temp.keep())
        } else {
            WorkspaceDir::Scoped(temp)
        };

        let workspace = Self { dir };
        tracing::debug!("Created session workspace: {}", workspace.path().display());
        Ok(workspace)
    }

    pub fn path(&self) -> &Path {
        match &self.dir {
            WorkspaceDir::Scoped(temp) => temp.path(),
            WorkspaceDir::Retained(path) => path,
        }
    }

    pub fn is_retained(&self) -> bool {
        matches!(self.dir, WorkspaceDir::Retained(_))
    }

    /// `temp_<filename>`
    pub fn temp_path(&self, filename: &str) -> PathBuf {
        self.path().join(format!("temp_{}", filename))
    }

    /// `optimized_<quality>_<filename>`
    pub fn output_path(&self, quality: Quality, filename: &str) -> PathBuf {
        self.path().join(output_file_name(quality, filename))
    }
}

pub fn output_file_name(quality: Quality, filename: &str) -> String {
    format!("optimized_{}_{}", quality.percent(), filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoped_workspace_is_removed_on_drop() {
        let root = TempDir::new().unwrap();
        let workspace = SessionWorkspace::create(root.path(), "abc", false).unwrap();
        let path = workspace.path().to_path_buf();
        fs::write(workspace.temp_path("cat.jpg"), b"bytes").unwrap();
        assert!(path.exists());
        assert!(!workspace.is_retained());

        drop(workspace);
        assert!(!path.exists());
    }

    #[test]
    fn retained_workspace_survives_drop() {
        let root = TempDir::new().unwrap();
        let workspace = SessionWorkspace::create(root.path(), "abc", true).unwrap();
        let path = workspace.path().to_path_buf();

        drop(workspace);
        assert!(path.exists());
    }

    #[test]
    fn names_follow_upload_filename() {
        let root = TempDir::new().unwrap();
        let workspace = SessionWorkspace::create(root.path(), "abc", false).unwrap();
        let quality = Quality::new(50).unwrap();

        assert_eq!(
            workspace.temp_path("cat.png").file_name().unwrap(),
            "temp_cat.png"
        );
        assert_eq!(
            workspace.output_path(quality, "cat.png").file_name().unwrap(),
            "optimized_50_cat.png"
        );
    }

    #[test]
    fn same_filename_in_two_sessions_does_not_collide() {
        let root = TempDir::new().unwrap();
        let first = SessionWorkspace::create(root.path(), "one", false).unwrap();
        let second = SessionWorkspace::create(root.path(), "two", false).unwrap();

        fs::write(first.temp_path("cat.jpg"), b"first").unwrap();
        fs::write(second.temp_path("cat.jpg"), b"second").unwrap();

        assert_eq!(fs::read(first.temp_path("cat.jpg")).unwrap(), b"first");
        assert_eq!(fs::read(second.temp_path("cat.jpg")).unwrap(), b"second");
    }
}
