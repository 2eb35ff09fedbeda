//! Job data model: the immutable request, the per-job mutable state and the
//! produced artifact.

mod request;
mod state;

pub use request::{JobRequest, JobRequestBuilder, OutputFormat, SUDO_MARKER, TrimSpec};
pub use state::{JobPhase, JobState};

use std::path::PathBuf;

/// What kind of media an artifact carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Video (with or without audio).
    Video,
    /// Audio only.
    Audio,
}

/// A file produced by the download executor, awaiting delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Scratch path the executor wrote.
    pub path: PathBuf,
    /// Size on disk in bytes.
    pub size: u64,
    /// Filename presented to the recipient.
    pub filename: String,
    /// Media kind.
    pub kind: MediaKind,
}
