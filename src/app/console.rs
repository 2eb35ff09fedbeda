//! Terminal reply sink: spinner status line, inline deliveries copied into
//! an output directory, text replies printed to stdout.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use mediagrab_core::{ReplySink, SinkError, StatusHandle};
use tracing::info;

/// Whether an interactive spinner should be drawn.
pub(crate) fn should_use_spinner(stderr_is_terminal: bool, quiet: bool) -> bool {
    let dumb_terminal = std::env::var("TERM")
        .map(|value| value.eq_ignore_ascii_case("dumb"))
        .unwrap_or(false);
    stderr_is_terminal && !quiet && !dumb_terminal
}

/// [`ReplySink`] writing to the local terminal and file system.
#[derive(Debug)]
pub(crate) struct ConsoleSink {
    output_dir: PathBuf,
    use_spinner: bool,
    next_handle: AtomicU64,
    spinners: Mutex<HashMap<StatusHandle, ProgressBar>>,
}

impl ConsoleSink {
    pub(crate) fn new(output_dir: impl Into<PathBuf>, use_spinner: bool) -> Self {
        Self {
            output_dir: output_dir.into(),
            use_spinner,
            next_handle: AtomicU64::new(1),
            spinners: Mutex::new(HashMap::new()),
        }
    }

    fn with_spinners<T>(&self, f: impl FnOnce(&mut HashMap<StatusHandle, ProgressBar>) -> T) -> T {
        let mut spinners = self
            .spinners
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut spinners)
    }

    fn new_spinner(&self, text: &str) -> ProgressBar {
        if !self.use_spinner {
            return ProgressBar::hidden();
        }
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner.set_message(text.to_string());
        spinner
    }
}

#[async_trait]
impl ReplySink for ConsoleSink {
    async fn post_status(&self, text: &str) -> Result<StatusHandle, SinkError> {
        let handle = StatusHandle(format!(
            "status-{}",
            self.next_handle.fetch_add(1, Ordering::Relaxed)
        ));
        let spinner = self.new_spinner(text);
        if !self.use_spinner {
            info!(status = text, "job status");
        }
        self.with_spinners(|spinners| spinners.insert(handle.clone(), spinner));
        Ok(handle)
    }

    async fn edit_status(&self, handle: &StatusHandle, text: &str) -> Result<(), SinkError> {
        let found = self.with_spinners(|spinners| {
            let Some(spinner) = spinners.get(handle) else {
                return false;
            };
            spinner.set_message(text.to_string());
            true
        });
        if !found {
            return Err(SinkError::new(format!("unknown status message {}", handle.0)));
        }
        if !self.use_spinner {
            info!(status = text, "job status");
        }
        Ok(())
    }

    async fn delete_status(&self, handle: &StatusHandle) -> Result<(), SinkError> {
        let spinner = self
            .with_spinners(|spinners| spinners.remove(handle))
            .ok_or_else(|| SinkError::new(format!("unknown status message {}", handle.0)))?;
        spinner.finish_and_clear();
        Ok(())
    }

    async fn send_attachment(&self, path: &Path, filename: &str) -> Result<(), SinkError> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|err| SinkError::new(format!("{}: {err}", self.output_dir.display())))?;
        let target = self.output_dir.join(filename);
        tokio::fs::copy(path, &target)
            .await
            .map_err(|err| SinkError::new(format!("{}: {err}", target.display())))?;
        println!("Saved {}", target.display());
        Ok(())
    }

    async fn send_message(&self, text: &str) -> Result<(), SinkError> {
        println!("{text}");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_should_use_spinner_requires_terminal_and_not_quiet() {
        assert!(!should_use_spinner(false, false));
        assert!(!should_use_spinner(true, true));
    }

    #[tokio::test]
    async fn test_status_lifecycle_without_spinner() {
        let dir = TempDir::new().unwrap();
        let sink = ConsoleSink::new(dir.path(), false);
        let handle = sink.post_status("Processing...").await.unwrap();
        sink.edit_status(&handle, "Downloading...").await.unwrap();
        sink.delete_status(&handle).await.unwrap();
        assert!(sink.delete_status(&handle).await.is_err());
        assert!(sink.edit_status(&handle, "x").await.is_err());
    }

    #[tokio::test]
    async fn test_attachment_is_copied_into_output_dir() {
        let scratch = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let source = scratch.path().join("abc.mp4");
        tokio::fs::write(&source, b"media").await.unwrap();

        let sink = ConsoleSink::new(out.path().join("nested"), false);
        sink.send_attachment(&source, "Clip.mp4").await.unwrap();
        let copied = tokio::fs::read(out.path().join("nested").join("Clip.mp4"))
            .await
            .unwrap();
        assert_eq!(copied, b"media");
        assert!(source.exists());
    }
}
