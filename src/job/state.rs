//! Per-job mutable state and the job phase machine.
//!
//! ```text
//! Validating -> Resolving -> Downloading -> Uploading -> Done
//!      \____________\______________\____________\______> Failed
//! ```
//!
//! Transitions only move forward. Phase changes are published on a
//! `tokio::sync::watch` channel so observers (the progress monitor) never
//! touch the state itself.

use std::path::{Path, PathBuf};

use tokio::sync::watch;
use tracing::debug;

use crate::error::InternalError;
use crate::scratch::ScratchFile;

/// Lifecycle phase of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    /// Request and trim checks.
    Validating,
    /// Metadata resolution and constraint evaluation.
    Resolving,
    /// Download subprocess running.
    Downloading,
    /// Artifact being delivered.
    Uploading,
    /// Delivered.
    Done,
    /// Terminated with an error.
    Failed,
}

impl JobPhase {
    /// Returns true for `Done` and `Failed`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Stable label for logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::Resolving => "resolving",
            Self::Downloading => "downloading",
            Self::Uploading => "uploading",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    fn successor(self) -> Option<Self> {
        match self {
            Self::Validating => Some(Self::Resolving),
            Self::Resolving => Some(Self::Downloading),
            Self::Downloading => Some(Self::Uploading),
            Self::Uploading => Some(Self::Done),
            Self::Done | Self::Failed => None,
        }
    }

    /// Whether `next` is a legal transition from `self`.
    #[must_use]
    pub fn can_advance_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == Self::Failed || self.successor() == Some(next)
    }
}

/// State exclusively owned by the currently admitted job.
#[derive(Debug)]
pub struct JobState {
    id: u64,
    phase: watch::Sender<JobPhase>,
    scratch: Option<ScratchFile>,
    failure: Option<String>,
}

impl JobState {
    /// Creates the state for job `id` in [`JobPhase::Validating`].
    #[must_use]
    pub fn new(id: u64) -> Self {
        let (phase, _) = watch::channel(JobPhase::Validating);
        Self {
            id,
            phase,
            scratch: None,
            failure: None,
        }
    }

    /// Job identifier.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> JobPhase {
        *self.phase.borrow()
    }

    /// Subscribes to phase changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<JobPhase> {
        self.phase.subscribe()
    }

    /// Moves the job to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`InternalError::InvalidTransition`] for backward moves or
    /// moves out of a terminal phase.
    pub fn advance(&mut self, next: JobPhase) -> Result<(), InternalError> {
        let from = self.phase();
        if !from.can_advance_to(next) {
            return Err(InternalError::InvalidTransition { from, to: next });
        }
        debug!(job_id = self.id, from = from.as_str(), to = next.as_str(), "job phase change");
        self.phase.send_replace(next);
        Ok(())
    }

    /// Marks the job failed with a user-facing reason. No-op once terminal.
    pub fn fail(&mut self, reason: impl Into<String>) {
        if self.phase().is_terminal() {
            return;
        }
        self.failure = Some(reason.into());
        self.phase.send_replace(JobPhase::Failed);
    }

    /// Failure reason, once failed.
    #[must_use]
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Registers the scratch artifact path. Only the first call takes effect.
    pub fn track_scratch(&mut self, path: impl Into<PathBuf>) {
        if self.scratch.is_none() {
            self.scratch = Some(ScratchFile::new(path));
        }
    }

    /// Registered scratch path, if any.
    #[must_use]
    pub fn scratch_path(&self) -> Option<&Path> {
        self.scratch.as_ref().map(ScratchFile::path)
    }

    /// Deletes the registered scratch artifact, if any.
    ///
    /// # Errors
    ///
    /// Propagates [`ScratchFile::reclaim`] failures.
    pub async fn reclaim_scratch(&mut self) -> Result<(), InternalError> {
        match self.scratch.as_mut() {
            Some(scratch) => scratch.reclaim().await,
            None => Ok(()),
        }
    }
}
