//! Scratch file ownership and cleanup.
//!
//! A [`ScratchFile`] is registered on the job state as soon as the executor's
//! deterministic output path is known. The engine reclaims it exactly once at
//! the job boundary, whatever the outcome; `Drop` is the fallback when the job
//! future unwinds before reaching that point.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};

use crate::error::InternalError;

/// Creates the scratch directory if needed.
///
/// # Errors
///
/// Returns [`InternalError::Io`] if the directory cannot be created.
pub async fn ensure_scratch_dir(dir: &Path) -> Result<(), InternalError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| InternalError::Io {
            path: dir.to_path_buf(),
            source,
        })
}

/// Removes `path`, treating an already-missing file as success.
///
/// Returns `true` if a file was actually removed.
///
/// # Errors
///
/// Returns [`InternalError::Io`] for failures other than `NotFound`.
pub async fn remove_scratch_file(path: &Path) -> Result<bool, InternalError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(source) => Err(InternalError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Scratch artifact owned by the running job.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    reclaimed: bool,
}

impl ScratchFile {
    /// Takes ownership of `path`. The file need not exist yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            reclaimed: false,
        }
    }

    /// Path of the owned file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether [`ScratchFile::reclaim`] already ran.
    #[must_use]
    pub fn is_reclaimed(&self) -> bool {
        self.reclaimed
    }

    /// Deletes the artifact and any leftovers sharing its media id
    /// (format fragments such as `<id>.f248.webm`).
    ///
    /// Safe to call more than once; later calls are no-ops.
    ///
    /// # Errors
    ///
    /// Returns [`InternalError::Io`] if the main artifact exists but cannot
    /// be removed. Leftover sweep failures are logged only.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn reclaim(&mut self) -> Result<(), InternalError> {
        if self.reclaimed {
            return Ok(());
        }
        self.reclaimed = true;

        let removed = remove_scratch_file(&self.path).await?;
        debug!(removed, "scratch artifact reclaimed");
        self.sweep_leftovers().await;
        Ok(())
    }

    async fn sweep_leftovers(&self) {
        let (Some(dir), Some(stem)) = (self.path.parent(), self.path.file_stem()) else {
            return;
        };
        let prefix = format!("{}.", stem.to_string_lossy());
        let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
            return;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            if !entry.file_name().to_string_lossy().starts_with(&prefix) {
                continue;
            }
            let leftover = entry.path();
            if let Err(error) = remove_scratch_file(&leftover).await {
                warn!(error = %error, "failed to remove scratch leftover");
            } else {
                debug!(path = %leftover.display(), "removed scratch leftover");
            }
        }
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if self.reclaimed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "scratch artifact removed on drop"),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => warn!(
                path = %self.path.display(),
                error = %err,
                "failed to remove scratch artifact on drop"
            ),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_remove_scratch_file_twice_is_noop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("abc.mp4");
        std::fs::write(&path, b"data").unwrap();

        assert!(remove_scratch_file(&path).await.unwrap());
        assert!(!remove_scratch_file(&path).await.unwrap());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_reclaim_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("abc.mp4");
        std::fs::write(&path, b"data").unwrap();

        let mut scratch = ScratchFile::new(&path);
        scratch.reclaim().await.unwrap();
        scratch.reclaim().await.unwrap();
        assert!(scratch.is_reclaimed());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_reclaim_missing_file_succeeds() {
        let dir = TempDir::new().unwrap();
        let mut scratch = ScratchFile::new(dir.path().join("never-written.webm"));
        assert!(scratch.reclaim().await.is_ok());
    }

    #[tokio::test]
    async fn test_reclaim_sweeps_fragments_with_same_id() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("abc.mp4");
        let fragment = dir.path().join("abc.f248.webm");
        let unrelated = dir.path().join("other.mp4");
        std::fs::write(&fragment, b"frag").unwrap();
        std::fs::write(&unrelated, b"keep").unwrap();

        let mut scratch = ScratchFile::new(&path);
        scratch.reclaim().await.unwrap();

        assert!(!fragment.exists());
        assert!(unrelated.exists());
    }

    #[test]
    fn test_drop_removes_unreclaimed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("abc.mp4");
        std::fs::write(&path, b"data").unwrap();

        drop(ScratchFile::new(&path));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_ensure_scratch_dir_creates_nested_dirs() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("data").join("temp");
        ensure_scratch_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
    }
}
