//! Progress monitor: a read-only observer task running beside the executor.
//!
//! The monitor follows the job phase through a `watch` receiver, samples
//! the scratch directory once per interval while downloading, and keeps one
//! status message up to date. It never touches the job state or the
//! executor's files, and sink failures are only logged.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use indicatif::HumanBytes;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::job::JobPhase;
use crate::sink::{ReplySink, StatusHandle};

/// Size of the largest regular file directly inside `dir`, if any.
///
/// The scratch directory holds partial fragments while a merge is pending,
/// so the largest file is the best lower bound of progress.
pub async fn largest_file_size(dir: &Path) -> Option<u64> {
    let mut entries = tokio::fs::read_dir(dir).await.ok()?;
    let mut largest = None;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let Ok(metadata) = entry.metadata().await else {
            continue;
        };
        if metadata.is_file() {
            largest = largest.max(Some(metadata.len()));
        }
    }
    largest
}

/// Status text for `phase`, with the sampled size while downloading.
#[must_use]
pub fn render_status(phase: JobPhase, sampled: Option<u64>) -> String {
    match (phase, sampled) {
        (JobPhase::Downloading, Some(size)) => format!("Downloading... {}", HumanBytes(size)),
        (JobPhase::Downloading, None) => "Downloading...".to_string(),
        (JobPhase::Uploading, _) => "Uploading...".to_string(),
        _ => "Processing...".to_string(),
    }
}

/// Periodic status reporter for one job.
pub struct ProgressMonitor {
    scratch_dir: PathBuf,
    interval: Duration,
    sink: Arc<dyn ReplySink>,
}

impl ProgressMonitor {
    /// Creates a monitor sampling `scratch_dir` every `interval`.
    #[must_use]
    pub fn new(scratch_dir: impl Into<PathBuf>, interval: Duration, sink: Arc<dyn ReplySink>) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
            interval,
            sink,
        }
    }

    /// Runs the monitor on its own task until the job reaches a terminal
    /// phase or the phase sender is dropped.
    #[must_use]
    pub fn spawn(self, phases: watch::Receiver<JobPhase>) -> JoinHandle<()> {
        tokio::spawn(self.run(phases))
    }

    async fn run(self, mut phases: watch::Receiver<JobPhase>) {
        let mut handle: Option<StatusHandle> = None;
        let mut shown = String::new();

        loop {
            let phase = *phases.borrow_and_update();
            if phase.is_terminal() {
                break;
            }

            let sampled = if phase == JobPhase::Downloading {
                largest_file_size(&self.scratch_dir).await
            } else {
                None
            };
            let text = render_status(phase, sampled);
            if text != shown {
                self.show(&mut handle, &text).await;
                shown = text;
            }

            tokio::select! {
                () = tokio::time::sleep(self.interval) => {}
                changed = phases.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        if let Some(handle) = handle
            && let Err(error) = self.sink.delete_status(&handle).await
        {
            warn!(error = %error, "failed to remove status message");
        }
        debug!("progress monitor stopped");
    }

    async fn show(&self, handle: &mut Option<StatusHandle>, text: &str) {
        match handle {
            Some(existing) => {
                if let Err(error) = self.sink.edit_status(existing, text).await {
                    warn!(error = %error, "failed to update status message");
                }
            }
            None => match self.sink.post_status(text).await {
                Ok(posted) => *handle = Some(posted),
                Err(error) => warn!(error = %error, "failed to post status message"),
            },
        }
    }
}
