//! Mediagrab Core Library
//!
//! A single-slot media acquisition job engine: it takes a remote media URL,
//! resolves it through an external extraction tool, optionally trims it,
//! downloads it into a scratch directory while reporting progress, and
//! delivers the result inline or through a temporary file host.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`engine`] - [`MediaJobEngine`], the end-to-end job lifecycle
//! - [`guard`] - admission control (one global job, per-requester cooldown)
//! - [`job`] - requests, job phases and produced artifacts
//! - [`resolver`] - URL to media descriptor, SSRF screening, error sanitation
//! - [`constraints`] - pre-flight duration/size/live checks
//! - [`trim`] - trim parsing and executor parameter planning
//! - [`executor`] - download subprocess and output assertion
//! - [`monitor`] - progress reporting task
//! - [`delivery`] - size tiers and the temporary host client
//! - [`scratch`] - scratch file ownership and cleanup
//! - [`sink`] - reply surface supplied by the caller
//! - [`policy`] - limits and defaults
//! - [`error`] - error taxonomy

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod constraints;
pub mod delivery;
pub mod engine;
pub mod error;
pub mod executor;
pub mod guard;
pub mod job;
pub mod monitor;
pub mod policy;
pub mod resolver;
pub mod scratch;
pub mod sink;
pub mod tool;
pub mod trim;
mod user_agent;

// Re-export commonly used types
pub use constraints::ConstraintEvaluator;
pub use delivery::{
    DeliveredResult, DeliveryTier, DeliveryTierSelector, LitterboxClient, TemporaryHost,
};
pub use engine::MediaJobEngine;
pub use error::{
    AdmissionError, DeliveryError, ExecutionError, ExtractionError, InternalError, JobError,
    SubmitError, ValidationError,
};
pub use executor::{DownloadExecutor, ExecutorParams, MediaFetcher, YtDlpFetcher};
pub use guard::{JobManager, JobPermit};
pub use job::{
    Artifact, JobPhase, JobRequest, JobRequestBuilder, JobState, MediaKind, OutputFormat, TrimSpec,
};
pub use monitor::ProgressMonitor;
pub use policy::EnginePolicy;
pub use resolver::{FormatSelection, MediaDescriptor, MediaResolver, YtDlpResolver};
pub use sink::{ReplySink, SinkError, StatusHandle};
pub use trim::{TrimPlanner, TrimWindow};
