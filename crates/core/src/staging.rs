//! Local staging of uploads and downloads.
//!
//! Each request gets its own file under a shared directory. The file lives
//! exactly as long as its [`StagedFile`] handle, so every exit path (success,
//! early error return, dropped response body) removes it.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tempfile::TempPath;
use tokio::fs::{File, OpenOptions};

use crate::document::validate::sanitize_for_path;

#[derive(Debug, Clone)]
pub struct StagingDir {
    root: PathBuf,
}

impl StagingDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<system temp>/fileserver/uploads`.
    pub fn default_location() -> PathBuf {
        std::env::temp_dir().join("fileserver").join("uploads")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reserve a new empty staging file named `<unix-secs>_<random>_<name>`.
    pub async fn stage(&self, name: &str) -> io::Result<StagedFile> {
        tokio::fs::create_dir_all(&self.root).await?;

        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let prefix = format!("{secs}_");
        let suffix = format!("_{}", sanitize_for_path(name));

        let path = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(&suffix)
            .rand_bytes(8)
            .tempfile_in(&self.root)?
            .into_temp_path();

        tracing::debug!(path = %path.display(), "Staged local file");
        Ok(StagedFile { path })
    }
}

/// Handle to one staged file; the file is deleted on drop.
#[derive(Debug)]
pub struct StagedFile {
    path: TempPath,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Open for writing, truncating any previous content.
    pub async fn writer(&self) -> io::Result<File> {
        OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&*self.path)
            .await
    }

    pub async fn reader(&self) -> io::Result<File> {
        File::open(&*self.path).await
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        tracing::debug!(path = %self.path.display(), "Releasing staged file");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn staged_file_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingDir::new(dir.path().join("uploads"));

        let staged = staging.stage("a.txt").await.unwrap();
        let path = staged.path().to_path_buf();
        let mut out = staged.writer().await.unwrap();
        out.write_all(b"hello").await.unwrap();
        out.flush().await.unwrap();
        drop(out);

        assert_eq!(std::fs::metadata(&path).unwrap().len(), 5);
        assert!(path.exists());
        drop(staged);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn same_name_same_second_does_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingDir::new(dir.path());

        let a = staging.stage("report.pdf").await.unwrap();
        let b = staging.stage("report.pdf").await.unwrap();
        assert_ne!(a.path(), b.path());
        assert!(a.file_name().ends_with("_report.pdf"));
    }

    #[tokio::test]
    async fn hostile_names_stay_inside_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingDir::new(dir.path());

        let staged = staging.stage("../../escape.sh").await.unwrap();
        assert_eq!(staged.path().parent(), Some(dir.path()));
    }
}
