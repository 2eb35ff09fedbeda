//! Download execution: running the fetch subprocess and asserting its output.
//!
//! # Architecture
//!
//! - [`ExecutorParams`] - what the trim planner hands over (format, trim
//!   window, conversion, subprocess-side policy)
//! - [`MediaFetcher`] - async trait for the component that writes the file
//! - [`YtDlpFetcher`] - fetcher driving the extraction tool as a subprocess
//! - [`DownloadExecutor`] - derives the deterministic scratch path, runs the
//!   fetcher and turns the result into an [`Artifact`]

mod naming;
mod ytdlp;

pub use naming::{delivery_filename, transliterate_title};
pub use ytdlp::{YtDlpFetcher, detect_policy_skip};

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument};

use crate::error::{ExtractionError, InternalError, JobError};
use crate::job::{Artifact, MediaKind, OutputFormat};
use crate::resolver::{FormatSelection, MediaDescriptor};
use crate::trim::TrimWindow;

/// Parameters for one download run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorParams {
    /// Format selector and sort order.
    pub selection: FormatSelection,
    /// Cut window, when trimming.
    pub trim: Option<TrimWindow>,
    /// Post-download conversion.
    pub output_format: Option<OutputFormat>,
    /// Kind of the produced artifact.
    pub kind: MediaKind,
    /// Match filter evaluated by the subprocess after resolution.
    pub match_filter: Option<String>,
    /// Byte cap enforced by the subprocess while downloading.
    pub max_filesize: Option<u64>,
}

impl ExecutorParams {
    /// Extension of the file the run leaves behind.
    #[must_use]
    pub fn output_extension<'a>(&self, descriptor: &'a MediaDescriptor) -> &'a str {
        match self.output_format {
            Some(format) => format.extension(),
            None => descriptor.ext.as_str(),
        }
    }
}

/// Writes a media file to a given path.
///
/// # Object Safety
///
/// Uses `async_trait` so the executor can hold an `Arc<dyn MediaFetcher>`.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Downloads `url` according to `params`, leaving the result at `output`.
    ///
    /// Returning `Ok(())` only claims the process succeeded; the executor
    /// checks the file separately.
    async fn fetch(&self, url: &str, params: &ExecutorParams, output: &Path)
    -> Result<(), JobError>;
}

/// Runs fetches into the scratch directory.
#[derive(Clone)]
pub struct DownloadExecutor {
    fetcher: Arc<dyn MediaFetcher>,
    scratch_dir: PathBuf,
}

impl std::fmt::Debug for DownloadExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadExecutor")
            .field("fetcher", &self.fetcher.name())
            .field("scratch_dir", &self.scratch_dir)
            .finish()
    }
}

impl DownloadExecutor {
    /// Creates an executor writing into `scratch_dir`.
    #[must_use]
    pub fn new(fetcher: Arc<dyn MediaFetcher>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Scratch directory the executor writes into.
    #[must_use]
    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Deterministic scratch path `<scratch>/<id>.<ext>` for a run.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::MalformedMetadata`] when the media id could
    /// escape the scratch directory.
    pub fn expected_path(
        &self,
        descriptor: &MediaDescriptor,
        params: &ExecutorParams,
    ) -> Result<PathBuf, ExtractionError> {
        let id = descriptor.id.as_str();
        if id.is_empty()
            || id.contains(['/', '\\', '\0'])
            || id.contains("..")
            || id.starts_with('.')
        {
            return Err(ExtractionError::MalformedMetadata {
                reason: format!("media id {id:?} is not usable as a filename"),
            });
        }
        let ext = params.output_extension(descriptor);
        Ok(self.scratch_dir.join(format!("{id}.{ext}")))
    }

    /// Runs the fetcher and asserts the artifact exists.
    ///
    /// # Errors
    ///
    /// - whatever the fetcher reports (extraction or execution errors)
    /// - [`InternalError::MissingOutput`] if the fetcher succeeded but the
    ///   expected file is absent
    /// - [`InternalError::Io`] if the file cannot be inspected
    #[instrument(skip_all, fields(fetcher = self.fetcher.name(), media_id = %descriptor.id))]
    pub async fn execute(
        &self,
        url: &str,
        descriptor: &MediaDescriptor,
        params: &ExecutorParams,
    ) -> Result<Artifact, JobError> {
        let path = self.expected_path(descriptor, params)?;
        self.fetcher.fetch(url, params, &path).await?;

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Err(InternalError::MissingOutput { path }.into()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(InternalError::MissingOutput { path }.into());
            }
            Err(source) => return Err(InternalError::Io { path, source }.into()),
        };

        let artifact = Artifact {
            filename: delivery_filename(descriptor, params),
            size: metadata.len(),
            kind: params.kind,
            path,
        };
        info!(
            path = %artifact.path.display(),
            size = artifact.size,
            filename = %artifact.filename,
            "artifact produced"
        );
        Ok(artifact)
    }
}
