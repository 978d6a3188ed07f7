use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use tempfile::{Builder, TempDir};
use tracing::debug;

/// Top-level scratch area for one suite run. Removed when dropped.
#[derive(Debug)]
pub struct ScratchArea {
    dir: TempDir,
}

impl ScratchArea {
    /// Create a fresh scratch area under `parent`, or the system temp dir.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn create(parent: Option<&Path>) -> Result<Self> {
        let mut builder = Builder::new();
        builder.prefix("toolchain-smoke-");
        let dir = match parent {
            Some(parent) => {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create scratch parent {}", parent.display())
                })?;
                builder.tempdir_in(parent)
            }
            None => builder.tempdir(),
        }
        .context("failed to create scratch area")?;

        make_permissive(dir.path())?;
        debug!(path = %dir.path().display(), "created scratch area");
        Ok(Self { dir })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Create an exclusively-owned workspace for the case called `name`.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn workspace(&self, name: &str) -> Result<ScratchWorkspace> {
        let dir = Builder::new()
            .prefix(&format!("{name}-"))
            .tempdir_in(self.dir.path())
            .with_context(|| format!("failed to create workspace for {name}"))?;
        make_permissive(dir.path())?;
        debug!(case = name, path = %dir.path().display(), "created workspace");
        Ok(ScratchWorkspace { dir })
    }

    /// Remove the scratch area, reporting failures instead of ignoring them.
    ///
    /// # Errors
    /// Returns an error if the directory tree cannot be removed.
    pub fn close(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir
            .close()
            .with_context(|| format!("failed to remove scratch area {}", path.display()))
    }
}

/// Directory owned by a single test case. Removed when dropped, on every exit path.
#[derive(Debug)]
pub struct ScratchWorkspace {
    dir: TempDir,
}

impl ScratchWorkspace {
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `contents` to `name` inside the workspace and return its path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn write_file(&self, name: &str, contents: &str) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        fs::write(&path, contents)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }

    /// # Errors
    /// Returns an error if the directory tree cannot be removed.
    pub fn close(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir
            .close()
            .with_context(|| format!("failed to remove workspace {}", path.display()))
    }
}

// Contained processes may run under a different uid than the host user.
#[cfg(unix)]
fn make_permissive(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o777))
        .with_context(|| format!("failed to set permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn make_permissive(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspaces_are_distinct_and_nested() {
        let area = ScratchArea::create(None).unwrap();
        let a = area.workspace("hello-world").unwrap();
        let b = area.workspace("hello-world").unwrap();

        assert_ne!(a.path(), b.path());
        assert!(a.path().starts_with(area.path()));
        assert!(
            a.path()
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("hello-world-")
        );
    }

    #[test]
    fn workspace_is_removed_on_drop() {
        let area = ScratchArea::create(None).unwrap();
        let ws = area.workspace("case").unwrap();
        let file = ws.write_file("hello.c", "int main(void) { return 0; }\n").unwrap();
        let path = ws.path().to_path_buf();
        assert!(file.exists());

        drop(ws);
        assert!(!path.exists());
    }

    #[test]
    fn closing_area_removes_everything() {
        let parent = tempfile::tempdir().unwrap();
        let area = ScratchArea::create(Some(parent.path())).unwrap();
        let ws = area.workspace("case").unwrap();
        ws.write_file("a.txt", "a").unwrap();
        let root = area.path().to_path_buf();
        assert!(root.starts_with(parent.path()));

        ws.close().unwrap();
        area.close().unwrap();
        assert!(!root.exists());
    }

    #[test]
    fn area_parent_is_created_when_missing() {
        let parent = tempfile::tempdir().unwrap();
        let nested = parent.path().join("a").join("b");
        let area = ScratchArea::create(Some(&nested)).unwrap();
        assert!(area.path().starts_with(&nested));
    }

    #[cfg(unix)]
    #[test]
    fn workspace_is_world_writable() {
        use std::os::unix::fs::PermissionsExt;

        let area = ScratchArea::create(None).unwrap();
        let ws = area.workspace("case").unwrap();
        let mode = fs::metadata(ws.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o777);
    }
}
