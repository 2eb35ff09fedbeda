//! Resolver backed by the extraction tool's JSON dump mode.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, instrument};

use super::{FormatSelection, MediaDescriptor, MediaResolver, sanitize_provider_message, screen_url};
use crate::error::{ExtractionError, JobError};
use crate::tool::run_tool;

/// Raw subset of the tool's info JSON the engine relies on.
#[derive(Debug, Deserialize)]
struct RawInfo {
    id: Option<String>,
    ext: Option<String>,
    title: Option<String>,
    duration: Option<f64>,
    filesize: Option<f64>,
    filesize_approx: Option<f64>,
    is_live: Option<bool>,
    url: Option<String>,
    #[serde(default)]
    requested_formats: Vec<RawFormat>,
    entries: Option<Vec<RawInfo>>,
}

#[derive(Debug, Deserialize)]
struct RawFormat {
    url: Option<String>,
}

/// Decodes the tool's JSON into a descriptor, taking the first entry of
/// playlists.
///
/// Negative or non-finite durations are treated as unknown; a non-positive
/// size is kept as `0` so the constraint evaluator rejects it.
///
/// # Errors
///
/// - [`ExtractionError::MalformedMetadata`] for undecodable JSON or a missing id
/// - [`ExtractionError::NoEntries`] for an empty playlist
pub fn parse_descriptor(json: &[u8]) -> Result<MediaDescriptor, ExtractionError> {
    let raw: RawInfo =
        serde_json::from_slice(json).map_err(|err| ExtractionError::MalformedMetadata {
            reason: err.to_string(),
        })?;
    descriptor_from_raw(raw)
}

fn descriptor_from_raw(mut raw: RawInfo) -> Result<MediaDescriptor, ExtractionError> {
    if let Some(entries) = raw.entries.take() {
        let first = entries.into_iter().next().ok_or(ExtractionError::NoEntries)?;
        return descriptor_from_raw(first);
    }

    let id = raw
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ExtractionError::MalformedMetadata {
            reason: "missing media id".to_string(),
        })?;
    let ext = raw.ext.unwrap_or_else(|| "mp4".to_string());
    let title = raw.title.unwrap_or_else(|| id.clone());

    let duration = raw
        .duration
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok());

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let filesize = raw
        .filesize
        .or(raw.filesize_approx)
        .filter(|size| size.is_finite())
        .map(|size| if size < 1.0 { 0 } else { size as u64 });

    let mut stream_urls: Vec<String> = raw
        .requested_formats
        .into_iter()
        .filter_map(|format| format.url)
        .collect();
    if stream_urls.is_empty()
        && let Some(url) = raw.url
    {
        stream_urls.push(url);
    }

    Ok(MediaDescriptor {
        id,
        ext,
        title,
        duration,
        filesize,
        is_live: raw.is_live.unwrap_or(false),
        stream_urls,
    })
}

/// Resolves media by running the extraction tool in JSON dump mode.
#[derive(Debug, Clone)]
pub struct YtDlpResolver {
    tool_path: PathBuf,
    socket_timeout: Duration,
}

impl YtDlpResolver {
    /// Creates a resolver invoking `tool_path` with the given socket timeout.
    #[must_use]
    pub fn new(tool_path: impl Into<PathBuf>, socket_timeout: Duration) -> Self {
        Self {
            tool_path: tool_path.into(),
            socket_timeout,
        }
    }

    /// Command-line arguments for resolving `url` without downloading.
    #[must_use]
    pub fn resolve_args(&self, url: &str, options: &FormatSelection) -> Vec<String> {
        let mut args: Vec<String> = [
            "--dump-single-json",
            "--skip-download",
            "--no-warnings",
            "--no-playlist",
            "--playlist-end",
            "1",
            "--socket-timeout",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        args.push(self.socket_timeout.as_secs().max(1).to_string());
        args.push("-f".to_string());
        args.push(options.format.clone());
        if let Some(sort) = &options.sort {
            args.push("-S".to_string());
            args.push(sort.clone());
        }
        args.push("--".to_string());
        args.push(url.to_string());
        args
    }
}

#[async_trait]
impl MediaResolver for YtDlpResolver {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    #[instrument(skip(self, options), fields(resolver = "yt-dlp", format = %options.format))]
    async fn resolve(
        &self,
        url: &str,
        options: &FormatSelection,
    ) -> Result<MediaDescriptor, JobError> {
        screen_url(url)?;

        let output = run_tool(&self.tool_path, &self.resolve_args(url, options)).await?;
        if !output.success() {
            debug!(stderr = %output.stderr, "resolution failed");
            return Err(ExtractionError::Provider {
                message: sanitize_provider_message(&output.stderr),
            }
            .into());
        }

        let descriptor = parse_descriptor(&output.stdout)?;
        info!(
            media_id = %descriptor.id,
            ext = %descriptor.ext,
            duration_secs = ?descriptor.duration.map(|d| d.as_secs()),
            filesize = ?descriptor.filesize,
            is_live = descriptor.is_live,
            "media resolved"
        );
        Ok(descriptor)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    #[test]
    fn test_parse_single_video() {
        let json = br#"{
            "id": "dQw4w9WgXcQ", "ext": "webm", "title": "Never Gonna Give You Up",
            "duration": 212.0, "filesize_approx": 5242880.4, "is_live": false,
            "requested_formats": [{"url": "https://cdn/v"}, {"url": "https://cdn/a"}]
        }"#;
        let descriptor = parse_descriptor(json).unwrap();
        assert_eq!(descriptor.id, "dQw4w9WgXcQ");
        assert_eq!(descriptor.ext, "webm");
        assert_eq!(descriptor.duration, Some(Duration::from_secs(212)));
        assert_eq!(descriptor.filesize, Some(5_242_880));
        assert!(!descriptor.is_live);
        assert_eq!(descriptor.stream_urls.len(), 2);
    }

    #[test]
    fn test_exact_filesize_preferred_over_approx() {
        let json = br#"{"id": "a", "ext": "mp4", "filesize": 100, "filesize_approx": 999}"#;
        assert_eq!(parse_descriptor(json).unwrap().filesize, Some(100));
    }

    #[test]
    fn test_playlist_takes_first_entry() {
        let json = br#"{"id": "PL1", "entries": [
            {"id": "first", "ext": "mp4", "url": "https://cdn/1"},
            {"id": "second", "ext": "mp4"}
        ]}"#;
        let descriptor = parse_descriptor(json).unwrap();
        assert_eq!(descriptor.id, "first");
        assert_eq!(descriptor.title, "first");
        assert_eq!(descriptor.stream_urls, vec!["https://cdn/1".to_string()]);
    }

    #[test]
    fn test_empty_playlist_is_no_entries() {
        let err = parse_descriptor(br#"{"id": "PL1", "entries": []}"#).unwrap_err();
        assert!(matches!(err, ExtractionError::NoEntries));
    }

    #[test]
    fn test_missing_duration_and_size_stay_unknown() {
        let descriptor = parse_descriptor(br#"{"id": "x", "ext": "mp4"}"#).unwrap();
        assert!(descriptor.duration.is_none());
        assert!(descriptor.filesize.is_none());
    }

    #[test]
    fn test_negative_duration_is_unknown_and_zero_size_kept() {
        let descriptor =
            parse_descriptor(br#"{"id": "x", "duration": -1, "filesize": 0}"#).unwrap();
        assert!(descriptor.duration.is_none());
        assert_eq!(descriptor.filesize, Some(0));
    }

    #[test]
    fn test_out_of_range_duration_is_unknown() {
        let descriptor =
            parse_descriptor(br#"{"id":"a","ext":"mp4","duration":1e30,"filesize":10}"#).unwrap();
        assert_eq!(descriptor.duration, None);
        assert_eq!(descriptor.filesize, Some(10));
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(
            parse_descriptor(b"not json"),
            Err(ExtractionError::MalformedMetadata { .. })
        ));
        assert!(matches!(
            parse_descriptor(br#"{"ext": "mp4"}"#),
            Err(ExtractionError::MalformedMetadata { .. })
        ));
    }

    #[test]
    fn test_resolve_args_carry_timeout_format_and_sort() {
        let resolver = YtDlpResolver::new("yt-dlp", Duration::from_secs(5));
        let options = FormatSelection {
            format: "bv*+ba/b".to_string(),
            sort: Some("ext,+vcodec:avc".to_string()),
        };
        let args = resolver.resolve_args("https://vimeo.com/1", &options);
        let joined = args.join(" ");
        assert!(joined.contains("--socket-timeout 5"), "{joined}");
        assert!(joined.contains("-f bv*+ba/b"), "{joined}");
        assert!(joined.contains("-S ext,+vcodec:avc"), "{joined}");
        assert!(joined.contains("--skip-download"), "{joined}");
        assert_eq!(args.last().unwrap(), "https://vimeo.com/1");
    }

    #[tokio::test]
    async fn test_resolve_rejects_internal_targets_before_spawning() {
        let resolver = YtDlpResolver::new("/nonexistent/yt-dlp", Duration::from_secs(5));
        let options = FormatSelection {
            format: "b".to_string(),
            sort: None,
        };
        let err = resolver
            .resolve("http://169.254.169.254/latest", &options)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            JobError::Validation(ValidationError::UnsafeTarget { .. })
        ));
    }
}
