//! Error taxonomy for media jobs.
//!
//! Every job failure belongs to exactly one class. Each class is its own enum
//! so callers can match on the class first and the detail second, and every
//! variant renders as a single human-readable line suitable for a reply.
//!
//! | Class | Raised by | Operator logging |
//! |-------|-----------|------------------|
//! | [`ValidationError`] | request checks, constraint evaluator, trim planner | no |
//! | [`ExtractionError`] | media resolver, download subprocess | no |
//! | [`ExecutionError`] | subprocess-side policy violations | no |
//! | [`InternalError`] | missing output, scratch I/O, state machine misuse | yes |
//! | [`DeliveryError`] | tier selector, remote host, reply sink | no |
//!
//! [`AdmissionError`] is separate: it fires before a job exists. [`SubmitError`]
//! joins the two for callers of the engine.

use std::path::PathBuf;
use std::time::Duration;

use indicatif::HumanBytes;
use thiserror::Error;

use crate::job::JobPhase;

/// Substrings the extraction tool emits when a format selector matches nothing.
const UNAVAILABLE_FORMAT_MARKERS: [&str; 2] = [
    "requested format not available",
    "requested format is not available",
];

/// Renders a duration limit the way users read it ("1 hour", "90 minutes").
pub(crate) fn describe_limit(limit: Duration) -> String {
    let secs = limit.as_secs();
    match secs {
        3600 => "1 hour".to_string(),
        s if s % 3600 == 0 => format!("{} hours", s / 3600),
        60 => "1 minute".to_string(),
        s if s % 60 == 0 => format!("{} minutes", s / 60),
        s => format!("{s} seconds"),
    }
}

fn mentions_unavailable_format(message: &str) -> bool {
    let lower = message.to_lowercase();
    UNAVAILABLE_FORMAT_MARKERS
        .iter()
        .any(|marker| lower.contains(marker))
}

fn human_size(bytes: &u64) -> String {
    HumanBytes(*bytes).to_string()
}

fn limit_label(limit: &Duration) -> String {
    describe_limit(*limit)
}

/// Pre-flight rejections. Always surfaced verbatim, never retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The request carried no URL once normalised.
    #[error("No URL provided.")]
    MissingUrl,

    /// The URL could not be parsed as an absolute http(s) URL.
    #[error("Invalid URL: {url}")]
    MalformedUrl {
        /// The rejected URL.
        url: String,
    },

    /// The URL targets loopback, link-local or private address space.
    #[error("Error: Invalid URL.")]
    UnsafeTarget {
        /// Host that tripped the check.
        host: String,
    },

    /// Live streams cannot be downloaded.
    #[error("Streams are not supported.")]
    LiveStream,

    /// Neither duration nor size could be determined for an untrimmed job.
    #[error("Failed to extract duration and filesize.")]
    UnknownDurationAndSize,

    /// Reported size is zero or above the remote host cap.
    #[error("The video is too big (> {}).", human_size(.limit))]
    TooBig {
        /// Reported size in bytes.
        size: u64,
        /// Cap in bytes.
        limit: u64,
    },

    /// Reported duration exceeds the maximum job duration.
    #[error("The video is too long (> {}).", limit_label(.limit))]
    TooLong {
        /// Reported duration.
        duration: Duration,
        /// Maximum allowed duration.
        limit: Duration,
    },

    /// One of the trim bounds could not be parsed.
    #[error("Invalid trim selection. Must be of the form `start-end`.")]
    InvalidTrim {
        /// The raw selection as supplied.
        selection: String,
    },

    /// `end <= start`.
    #[error("The trim selection cannot be negative or zero.")]
    EmptyTrim,

    /// `end - start` exceeds the maximum job duration.
    #[error("The trim selection is too long (> {}).", limit_label(.limit))]
    TrimTooLong {
        /// Selected length.
        length: Duration,
        /// Maximum allowed duration.
        limit: Duration,
    },

    /// The trim selection starts at or after the end of the source.
    #[error("The trim selection starts after the end of the media.")]
    TrimBeyondEnd {
        /// Requested start offset.
        start: Duration,
        /// Source duration.
        duration: Duration,
    },

    /// A format override was combined with a trim selection.
    #[error("Format choice is not supported with a trim selection.")]
    FormatWithTrim,
}

/// Resolver or download-tool failures caused by the remote source.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The provider reported an error; the message is already sanitised.
    #[error("{message}")]
    Provider {
        /// Sanitised provider message.
        message: String,
    },

    /// The extraction tool could not be started at all.
    #[error("Failed to run {tool}: {source}")]
    ToolUnavailable {
        /// Tool binary that failed to spawn.
        tool: String,
        /// Underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// The tool answered but its metadata could not be decoded.
    #[error("The extraction tool returned unreadable metadata: {reason}")]
    MalformedMetadata {
        /// Decoder message.
        reason: String,
    },

    /// A multi-entry result contained no entries.
    #[error("No media found at this URL.")]
    NoEntries,
}

/// Policy violations discovered by the download subprocess itself.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// The real stream characteristics exceed the limits.
    #[error("The media exceeds the download limits once fetched: {reason}")]
    StreamNotViable {
        /// What the subprocess reported.
        reason: String,
    },

    /// Only segmented (DASH/HLS) formats exist but a trim was requested.
    #[error("Segmented streams are not supported with a trim selection.")]
    SegmentedStreamWithTrim,
}

/// Engine or environment defects. Logged for operators in addition to the reply.
#[derive(Debug, Error)]
pub enum InternalError {
    /// The subprocess reported success but the expected file is missing.
    #[error("Internal Error: File {} does not exist.", .path.display())]
    MissingOutput {
        /// Deterministic scratch path that should have existed.
        path: PathBuf,
    },

    /// Scratch directory I/O failed.
    #[error("Internal Error: I/O failure on {}: {source}", .path.display())]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The job state machine was asked to move backwards.
    #[error("Internal Error: invalid job transition {from:?} -> {to:?}")]
    InvalidTransition {
        /// Current phase.
        from: JobPhase,
        /// Requested phase.
        to: JobPhase,
    },
}

/// Failures while shipping a produced artifact.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The produced file is larger than the remote host accepts.
    #[error(
        "The file passed the initial filesize guesstimation but is still too big to upload (> {}).",
        human_size(.limit)
    )]
    TooLarge {
        /// Actual artifact size.
        size: u64,
        /// Remote host cap.
        limit: u64,
    },

    /// The remote host rejected the upload.
    #[error("{message}")]
    Host {
        /// Response body returned by the host.
        message: String,
    },

    /// The upload did not complete in time.
    #[error("Upload timed out.")]
    Timeout,

    /// Retention outside the host's supported set.
    #[error("Invalid expiration time.")]
    InvalidRetention {
        /// Requested retention in hours.
        hours: u32,
    },

    /// Transport failure talking to the remote host.
    #[error("Upload failed: {source}")]
    Network {
        /// Underlying HTTP error.
        #[source]
        source: reqwest::Error,
    },

    /// The artifact could not be opened for upload.
    #[error("Could not read {}: {source}", .path.display())]
    Io {
        /// Artifact path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The reply sink refused the attachment.
    #[error("Failed to send the file: {message}")]
    Sink {
        /// Sink-provided reason.
        message: String,
    },
}

impl DeliveryError {
    /// Classifies a reqwest failure, mapping timeouts to [`DeliveryError::Timeout`].
    #[must_use]
    pub fn from_transport(source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout
        } else {
            Self::Network { source }
        }
    }
}

/// Admission control rejections from the job manager.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    /// Another job currently holds the global slot.
    #[error("Another download is already running. Try again later.")]
    Busy,

    /// The requester is still inside their cooldown window.
    #[error("You are on cooldown. Try again in {:.1}s.", .retry_after.as_secs_f64())]
    CooldownActive {
        /// Time until the cooldown lapses.
        retry_after: Duration,
    },
}

/// Any failure that terminates an admitted job.
#[derive(Debug, Error)]
pub enum JobError {
    /// See [`ValidationError`].
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// See [`ExtractionError`].
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    /// See [`ExecutionError`].
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    /// See [`InternalError`].
    #[error(transparent)]
    Internal(#[from] InternalError),
    /// See [`DeliveryError`].
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

impl JobError {
    /// Stable class label used in structured logs.
    #[must_use]
    pub fn class(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Extraction(_) => "extraction",
            Self::Execution(_) => "execution",
            Self::Internal(_) => "internal",
            Self::Delivery(_) => "delivery",
        }
    }

    /// Returns true for engine/environment defects that need operator attention.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }

    /// Rewrites "format not available" provider failures for trimmed jobs.
    ///
    /// Trimmed jobs exclude DASH/HLS formats, so a source offering only
    /// segmented streams surfaces as an unavailable format.
    #[must_use]
    pub fn for_trimmed_job(self, trimmed: bool) -> Self {
        if !trimmed {
            return self;
        }
        match &self {
            Self::Extraction(ExtractionError::Provider { message })
                if mentions_unavailable_format(message) =>
            {
                ExecutionError::SegmentedStreamWithTrim.into()
            }
            _ => self,
        }
    }
}

/// Outcome of submitting a job: rejected at admission, or failed once running.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The job was never admitted.
    #[error(transparent)]
    Rejected(#[from] AdmissionError),
    /// The admitted job failed.
    #[error(transparent)]
    Failed(#[from] JobError),
}

impl SubmitError {
    /// The job error, if the job was admitted.
    #[must_use]
    pub fn job_error(&self) -> Option<&JobError> {
        match self {
            Self::Failed(error) => Some(error),
            Self::Rejected(_) => None,
        }
    }
}
