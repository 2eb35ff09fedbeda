//! Typed job requests.
//!
//! The command layer owns flag parsing; it hands the engine a [`JobRequest`]
//! built through [`JobRequestBuilder`], which enforces the structural rules
//! (non-empty URL, format override vs. trim exclusivity) at construction.

use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// URL suffix recognised as the operator's policy bypass marker.
pub const SUDO_MARKER: &str = "#_sudo";

/// Raw trim bounds as supplied by the requester, e.g. `("01:15", "01:27")`.
///
/// Bounds are only split here; the trim planner parses and validates them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrimSpec {
    start: String,
    end: String,
}

impl TrimSpec {
    /// Creates a trim spec from two raw bounds.
    #[must_use]
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Splits a `start-end` selection into its two bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidTrim`] unless the selection has
    /// exactly two `-`-separated parts.
    pub fn parse(selection: &str) -> Result<Self, ValidationError> {
        let parts: Vec<&str> = selection.trim().split('-').collect();
        match parts.as_slice() {
            [start, end] => Ok(Self::new(start.trim(), end.trim())),
            _ => Err(ValidationError::InvalidTrim {
                selection: selection.to_string(),
            }),
        }
    }

    /// Raw start bound.
    #[must_use]
    pub fn start(&self) -> &str {
        &self.start
    }

    /// Raw end bound.
    #[must_use]
    pub fn end(&self) -> &str {
        &self.end
    }
}

impl fmt::Display for TrimSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Output conversion applied after download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Extract audio and convert it to MP3.
    Mp3,
}

impl OutputFormat {
    /// File extension of the converted artifact.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mp3" => Ok(Self::Mp3),
            other => Err(format!("unsupported output format '{other}'")),
        }
    }
}

/// Immutable description of one media job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    url: String,
    requester: String,
    format: Option<String>,
    trim: Option<TrimSpec>,
    output_format: Option<OutputFormat>,
    audio_only: bool,
    bypass_policy: bool,
}

impl JobRequest {
    /// Starts building a request for `url` on behalf of `requester`.
    #[must_use]
    pub fn builder(url: impl Into<String>, requester: impl Into<String>) -> JobRequestBuilder {
        JobRequestBuilder {
            url: url.into(),
            requester: requester.into(),
            format: None,
            trim: None,
            output_format: None,
            audio_only: false,
            bypass_policy: false,
        }
    }

    /// Normalised source URL (angle brackets and bypass marker removed).
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Identity of the requester.
    #[must_use]
    pub fn requester(&self) -> &str {
        &self.requester
    }

    /// Explicit format selector override.
    #[must_use]
    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    /// Requested trim bounds.
    #[must_use]
    pub fn trim(&self) -> Option<&TrimSpec> {
        self.trim.as_ref()
    }

    /// Requested output conversion.
    #[must_use]
    pub fn output_format(&self) -> Option<OutputFormat> {
        self.output_format
    }

    /// Whether only the audio track is wanted.
    #[must_use]
    pub fn audio_only(&self) -> bool {
        self.audio_only
    }

    /// Whether the requester asked to skip policy checks.
    ///
    /// The flag only takes effect for the configured operator identity.
    #[must_use]
    pub fn bypass_policy(&self) -> bool {
        self.bypass_policy
    }
}

/// Builder for [`JobRequest`].
#[derive(Debug, Clone)]
pub struct JobRequestBuilder {
    url: String,
    requester: String,
    format: Option<String>,
    trim: Option<TrimSpec>,
    output_format: Option<OutputFormat>,
    audio_only: bool,
    bypass_policy: bool,
}

impl JobRequestBuilder {
    /// Overrides the format selector.
    #[must_use]
    pub fn format(mut self, format: impl Into<String>) -> Self {
        let format = format.into();
        self.format = (!format.trim().is_empty()).then_some(format);
        self
    }

    /// Requests a trimmed download.
    #[must_use]
    pub fn trim(mut self, trim: TrimSpec) -> Self {
        self.trim = Some(trim);
        self
    }

    /// Requests an output conversion. Conversions imply an audio-only job.
    #[must_use]
    pub fn output_format(mut self, output_format: OutputFormat) -> Self {
        self.output_format = Some(output_format);
        self.audio_only = true;
        self
    }

    /// Requests the audio track only.
    #[must_use]
    pub fn audio_only(mut self, audio_only: bool) -> Self {
        self.audio_only = audio_only;
        self
    }

    /// Requests a policy bypass.
    #[must_use]
    pub fn bypass_policy(mut self, bypass: bool) -> Self {
        self.bypass_policy = bypass;
        self
    }

    /// Validates and freezes the request.
    ///
    /// Surrounding `<`/`>` are stripped and a trailing [`SUDO_MARKER`] is
    /// converted into the explicit bypass flag.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::MissingUrl`] when nothing is left of the URL
    /// - [`ValidationError::FormatWithTrim`] when both a format override and
    ///   a trim selection are present
    pub fn build(self) -> Result<JobRequest, ValidationError> {
        let mut url = self
            .url
            .trim()
            .trim_start_matches('<')
            .trim_end_matches('>')
            .trim()
            .to_string();
        let mut bypass_policy = self.bypass_policy;
        if let Some(stripped) = url.strip_suffix(SUDO_MARKER) {
            url = stripped.to_string();
            bypass_policy = true;
        }
        if url.is_empty() {
            return Err(ValidationError::MissingUrl);
        }
        if self.format.is_some() && self.trim.is_some() {
            return Err(ValidationError::FormatWithTrim);
        }

        Ok(JobRequest {
            url,
            requester: self.requester,
            format: self.format,
            trim: self.trim,
            output_format: self.output_format,
            audio_only: self.audio_only,
            bypass_policy,
        })
    }
}
