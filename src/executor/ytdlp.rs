//! Fetcher driving the extraction tool in download mode.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use super::{ExecutorParams, MediaFetcher};
use crate::error::{ExecutionError, ExtractionError, JobError};
use crate::job::OutputFormat;
use crate::resolver::sanitize_provider_message;
use crate::tool::run_tool;

/// Output lines the tool prints when its own policy check skips the media.
const POLICY_SKIP_MARKERS: [&str; 2] = ["does not pass filter", "larger than max-filesize"];

/// MP3 bitrate used for audio conversion.
const MP3_QUALITY: &str = "128K";

/// Finds the line reporting a subprocess-side policy skip, if any.
///
/// The tool exits successfully in these cases, so the marker in its output
/// is the only signal.
#[must_use]
pub fn detect_policy_skip(output: &str) -> Option<String> {
    output
        .lines()
        .find(|line| POLICY_SKIP_MARKERS.iter().any(|marker| line.contains(marker)))
        .map(|line| line.trim().to_string())
}

/// Downloads media by running the extraction tool.
#[derive(Debug, Clone)]
pub struct YtDlpFetcher {
    tool_path: PathBuf,
    socket_timeout: Duration,
}

impl YtDlpFetcher {
    /// Creates a fetcher invoking `tool_path`.
    #[must_use]
    pub fn new(tool_path: impl Into<PathBuf>, socket_timeout: Duration) -> Self {
        Self {
            tool_path: tool_path.into(),
            socket_timeout,
        }
    }

    /// Output template for `output`: same directory and stem, extension
    /// chosen by the tool.
    fn output_template(output: &Path) -> String {
        let stem = output
            .file_stem()
            .map(|stem| stem.to_string_lossy().replace('%', "%%"))
            .unwrap_or_default();
        let file = format!("{stem}.%(ext)s");
        match output.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.join(file).display().to_string(),
            _ => file,
        }
    }

    /// Command-line arguments for downloading `url` to `output`.
    #[must_use]
    pub fn download_args(&self, url: &str, params: &ExecutorParams, output: &Path) -> Vec<String> {
        let mut args: Vec<String> = [
            "--no-warnings",
            "--no-playlist",
            "--playlist-end",
            "1",
            "--no-part",
            "--no-progress",
            "--socket-timeout",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        args.push(self.socket_timeout.as_secs().max(1).to_string());

        args.push("-f".to_string());
        args.push(params.selection.format.clone());
        if let Some(sort) = &params.selection.sort {
            args.push("-S".to_string());
            args.push(sort.clone());
        }
        args.push("-o".to_string());
        args.push(Self::output_template(output));

        if let Some(filter) = &params.match_filter {
            args.push("--match-filter".to_string());
            args.push(filter.clone());
        }
        if let Some(cap) = params.max_filesize {
            args.push("--max-filesize".to_string());
            args.push(cap.to_string());
        }

        if let Some(window) = &params.trim {
            args.push("--downloader".to_string());
            args.push("ffmpeg".to_string());
            args.push("--downloader-args".to_string());
            args.push("ffmpeg:-hide_banner -loglevel error".to_string());
            args.push("--downloader-args".to_string());
            args.push(format!("ffmpeg_i:{}", window.transcode_input_args().join(" ")));
        }

        if let Some(OutputFormat::Mp3) = params.output_format {
            args.extend(
                ["-x", "--audio-format", "mp3", "--audio-quality", MP3_QUALITY]
                    .into_iter()
                    .map(String::from),
            );
        }

        args.push("--".to_string());
        args.push(url.to_string());
        args
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    #[instrument(skip(self, params), fields(output = %output.display(), trimmed = params.trim.is_some()))]
    async fn fetch(
        &self,
        url: &str,
        params: &ExecutorParams,
        output: &Path,
    ) -> Result<(), JobError> {
        let run = run_tool(&self.tool_path, &self.download_args(url, params, output)).await?;
        let combined = format!("{}\n{}", run.stdout_lossy(), run.stderr);

        if let Some(reason) = detect_policy_skip(&combined) {
            warn!(reason = %reason, "download skipped by subprocess policy");
            return Err(ExecutionError::StreamNotViable {
                reason: sanitize_provider_message(&reason),
            }
            .into());
        }
        if !run.success() {
            debug!(stderr = %run.stderr, "download failed");
            return Err(ExtractionError::Provider {
                message: sanitize_provider_message(&run.stderr),
            }
            .into());
        }

        info!("download subprocess finished");
        Ok(())
    }
}
