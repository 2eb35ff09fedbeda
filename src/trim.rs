//! Trim planning: turning a requested `start-end` selection into executor
//! parameters.
//!
//! Accepted bound formats:
//! - `SS` or `SS.ms`
//! - `MM:SS` or `MM:SS.ms`
//! - `HH:MM:SS` or `HH:MM:SS.ms`
//! - unit form such as `1h2m3s`, `90s`, `2m30.5s`

use std::time::Duration;

use tracing::{debug, instrument};

use crate::error::ValidationError;
use crate::executor::ExecutorParams;
use crate::job::{JobRequest, MediaKind, TrimSpec};
use crate::resolver::{FormatSelection, MediaDescriptor};

/// Parses one trim bound into a duration.
///
/// Returns `None` for empty, negative, non-numeric or out-of-range input.
#[must_use]
pub fn parse_timestamp(input: &str) -> Option<Duration> {
    let value = input.trim();
    if value.is_empty() {
        return None;
    }
    let secs = if value.contains(':') {
        parse_clock(value)?
    } else if value.ends_with(['h', 'm', 's']) {
        parse_units(value)?
    } else {
        parse_seconds(value)?
    };
    Duration::try_from_secs_f64(secs).ok()
}

fn parse_seconds(value: &str) -> Option<f64> {
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    value.parse::<f64>().ok().filter(|secs| secs.is_finite())
}

fn parse_whole(value: &str) -> Option<u64> {
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

#[allow(clippy::cast_precision_loss)]
fn parse_clock(value: &str) -> Option<f64> {
    let parts: Vec<&str> = value.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [m, s] => (0, parse_whole(m)?, parse_seconds(s)?),
        [h, m, s] => {
            let minutes = parse_whole(m)?;
            if minutes >= 60 {
                return None;
            }
            (parse_whole(h)?, minutes, parse_seconds(s)?)
        }
        _ => return None,
    };
    if seconds >= 60.0 {
        return None;
    }
    let whole = hours.checked_mul(3600)?.checked_add(minutes * 60)?;
    Some(whole as f64 + seconds)
}

fn parse_units(value: &str) -> Option<f64> {
    let mut total = 0.0;
    let mut number = String::new();
    let mut last_rank = 0;
    for ch in value.chars() {
        let (rank, scale) = match ch {
            'h' => (1, 3600.0),
            'm' => (2, 60.0),
            's' => (3, 1.0),
            c if c.is_ascii_digit() || c == '.' => {
                number.push(c);
                continue;
            }
            _ => return None,
        };
        if rank <= last_rank {
            return None;
        }
        total += parse_seconds(&number)? * scale;
        number.clear();
        last_rank = rank;
    }
    number.is_empty().then_some(total)
}

/// Formats an offset for the transcode tool (`10`, `10.5`).
fn format_offset(offset: Duration) -> String {
    let secs = offset.as_secs_f64();
    if secs.fract() == 0.0 {
        offset.as_secs().to_string()
    } else {
        let formatted = format!("{secs:.3}");
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }
}

/// A validated trim selection (`end > start`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimWindow {
    start: Duration,
    end: Duration,
}

impl TrimWindow {
    /// Creates a window, enforcing `end > start` and `end - start <= max`.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::EmptyTrim`] when `end <= start`
    /// - [`ValidationError::TrimTooLong`] when the window exceeds `max`
    pub fn new(start: Duration, end: Duration, max: Duration) -> Result<Self, ValidationError> {
        if end <= start {
            return Err(ValidationError::EmptyTrim);
        }
        let length = end - start;
        if length > max {
            return Err(ValidationError::TrimTooLong { length, limit: max });
        }
        Ok(Self { start, end })
    }

    /// Start offset.
    #[must_use]
    pub fn start(&self) -> Duration {
        self.start
    }

    /// End offset.
    #[must_use]
    pub fn end(&self) -> Duration {
        self.end
    }

    /// Selected length.
    #[must_use]
    pub fn length(&self) -> Duration {
        self.end - self.start
    }

    /// Delivery filename suffix, e.g. `_10-40`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn filename_suffix(&self) -> String {
        let start = self.start.as_secs_f64().round() as u64;
        let end = self.end.as_secs_f64().round() as u64;
        format!("_{start}-{end}")
    }

    /// Input-side arguments for the transcode tool, e.g. `-ss 10 -to 40`.
    #[must_use]
    pub fn transcode_input_args(&self) -> Vec<String> {
        vec![
            "-ss".to_string(),
            format_offset(self.start),
            "-to".to_string(),
            format_offset(self.end),
        ]
    }
}

/// Converts trim selections and resolved descriptors into executor parameters.
#[derive(Debug, Clone)]
pub struct TrimPlanner {
    max_duration: Duration,
    size_cap: u64,
}

impl TrimPlanner {
    /// Creates a planner enforcing `max_duration` and passing `size_cap`
    /// down to the download subprocess.
    #[must_use]
    pub fn new(max_duration: Duration, size_cap: u64) -> Self {
        Self {
            max_duration,
            size_cap,
        }
    }

    /// Parses and validates a trim selection.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::InvalidTrim`] if either bound fails to parse
    /// - [`ValidationError::EmptyTrim`] if `end <= start`
    /// - [`ValidationError::TrimTooLong`] if the window exceeds the maximum duration
    pub fn window(&self, spec: &TrimSpec) -> Result<TrimWindow, ValidationError> {
        let invalid = || ValidationError::InvalidTrim {
            selection: spec.to_string(),
        };
        let start = parse_timestamp(spec.start()).ok_or_else(invalid)?;
        let end = parse_timestamp(spec.end()).ok_or_else(invalid)?;
        TrimWindow::new(start, end, self.max_duration)
    }

    /// Format selection for `request`, restricted to non-segmented
    /// protocols when trimming.
    #[must_use]
    pub fn selection(&self, request: &JobRequest, trim: Option<&TrimWindow>) -> FormatSelection {
        let selection = FormatSelection::for_request(request);
        if trim.is_some() {
            selection.without_segmented_protocols()
        } else {
            selection
        }
    }

    /// Produces executor parameters for a resolved descriptor.
    ///
    /// `bypass` drops the subprocess-side policy filters entirely.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::FormatWithTrim`] if the request combines a format
    ///   override with a trim
    /// - [`ValidationError::TrimTooLong`] if the window exceeds the maximum duration
    /// - [`ValidationError::TrimBeyondEnd`] if the window starts past the
    ///   source's known duration
    #[instrument(skip_all, fields(media_id = %descriptor.id, trimmed = trim.is_some(), bypass))]
    pub fn plan(
        &self,
        request: &JobRequest,
        descriptor: &MediaDescriptor,
        trim: Option<&TrimWindow>,
        bypass: bool,
    ) -> Result<ExecutorParams, ValidationError> {
        if let Some(window) = trim {
            if request.format().is_some() {
                return Err(ValidationError::FormatWithTrim);
            }
            if window.length() > self.max_duration {
                return Err(ValidationError::TrimTooLong {
                    length: window.length(),
                    limit: self.max_duration,
                });
            }
            if let Some(duration) = descriptor.duration
                && window.start() >= duration
            {
                return Err(ValidationError::TrimBeyondEnd {
                    start: window.start(),
                    duration,
                });
            }
        }

        let match_filter = match (bypass, trim) {
            (true, _) => None,
            (false, Some(_)) => Some("!is_live".to_string()),
            (false, None) => Some(format!(
                "!is_live & duration <=? {max} & filesize <=? {cap} & filesize_approx <=? {cap}",
                max = self.max_duration.as_secs(),
                cap = self.size_cap,
            )),
        };
        let max_filesize = (!bypass && trim.is_none()).then_some(self.size_cap);

        let params = ExecutorParams {
            selection: self.selection(request, trim),
            trim: trim.copied(),
            output_format: request.output_format(),
            kind: if request.audio_only() {
                MediaKind::Audio
            } else {
                MediaKind::Video
            },
            match_filter,
            max_filesize,
        };
        debug!(format = %params.selection.format, "executor parameters planned");
        Ok(params)
    }
}
