//! Format selection hints handed to the extraction tool.

use url::Url;

use crate::job::JobRequest;

/// Explicit YouTube video ladder (VP9/H.264 at 1080p/720p before falling back).
pub const YOUTUBE_VIDEO_FORMAT: &str = "248+251/247+251/137+140/136+140/bv*+ba/b";

/// Audio-only ladder (Opus, then AAC, then best audio).
pub const AUDIO_FORMAT: &str = "251/140/ba";

/// Tool default: best video plus best audio, else best combined.
pub const DEFAULT_FORMAT: &str = "bv*+ba/b";

/// Sort order for non-YouTube hosts: prefer common containers and AVC video.
pub const GENERIC_FORMAT_SORT: &str = "ext,+vcodec:avc";

/// Format selector plus optional sort order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSelection {
    /// Selector expression (`-f`).
    pub format: String,
    /// Sort expression (`-S`).
    pub sort: Option<String>,
}

impl FormatSelection {
    /// Chooses the selection for `request`.
    ///
    /// Priority: explicit override, audio ladder, YouTube ladder, generic
    /// default with a sort order.
    #[must_use]
    pub fn for_request(request: &JobRequest) -> Self {
        if let Some(format) = request.format() {
            return Self {
                format: format.to_string(),
                sort: None,
            };
        }
        if request.audio_only() {
            return Self {
                format: AUDIO_FORMAT.to_string(),
                sort: None,
            };
        }
        if is_youtube_url(request.url()) {
            return Self {
                format: YOUTUBE_VIDEO_FORMAT.to_string(),
                sort: None,
            };
        }
        Self {
            format: DEFAULT_FORMAT.to_string(),
            sort: Some(GENERIC_FORMAT_SORT.to_string()),
        }
    }

    /// Excludes DASH and HLS protocols, which cannot be cut by a demux-based trim.
    #[must_use]
    pub fn without_segmented_protocols(&self) -> Self {
        Self {
            format: format!("({})[protocol!*=dash][protocol!*=m3u8]", self.format),
            sort: self.sort.clone(),
        }
    }
}

/// Whether `url` points at YouTube.
#[must_use]
pub fn is_youtube_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    host == "youtu.be" || host == "youtube.com" || host.ends_with(".youtube.com")
}
