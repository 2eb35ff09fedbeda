//! Media resolution: turning a URL into a concrete [`MediaDescriptor`].
//!
//! # Architecture
//!
//! - [`MediaResolver`] - async trait the engine resolves through
//! - [`YtDlpResolver`] - resolver backed by the extraction tool's
//!   "resolve without download" JSON mode
//! - [`FormatSelection`] - platform-specific format hints passed along
//! - [`screen_url`] - SSRF screening, applied before any resolution
//! - [`sanitize_provider_message`] - provider error sanitation

mod format;
mod sanitize;
mod ssrf;
mod ytdlp;

pub use format::{
    AUDIO_FORMAT, DEFAULT_FORMAT, FormatSelection, GENERIC_FORMAT_SORT, YOUTUBE_VIDEO_FORMAT,
    is_youtube_url,
};
pub use sanitize::{primary_error_line, sanitize_provider_message, silence_url_embeds};
pub use ssrf::screen_url;
pub use ytdlp::{YtDlpResolver, parse_descriptor};

use std::time::Duration;

use async_trait::async_trait;

use crate::error::JobError;

/// Resolved metadata about a remote media source.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaDescriptor {
    /// Provider media id; names the scratch file.
    pub id: String,
    /// Container extension of the selected format.
    pub ext: String,
    /// Human title.
    pub title: String,
    /// Duration, when the provider reports one.
    pub duration: Option<Duration>,
    /// Exact or approximate size in bytes, when known.
    pub filesize: Option<u64>,
    /// Whether the source is a live stream.
    pub is_live: bool,
    /// Direct stream locators of the selected format(s).
    pub stream_urls: Vec<String>,
}

/// Resolves URLs into descriptors.
///
/// # Object Safety
///
/// Uses `async_trait` so the engine can hold an `Arc<dyn MediaResolver>`.
#[async_trait]
pub trait MediaResolver: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Resolves `url` using the given format hints.
    ///
    /// Implementations must reject internal targets with
    /// [`crate::error::ValidationError::UnsafeTarget`] before contacting
    /// anything, and select only the first entry of multi-entry results.
    async fn resolve(
        &self,
        url: &str,
        options: &FormatSelection,
    ) -> Result<MediaDescriptor, JobError>;
}
