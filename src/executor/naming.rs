//! Delivery filenames: transliterated, sanitised titles with trim suffixes.

use deunicode::deunicode;

use super::ExecutorParams;
use crate::job::MediaKind;
use crate::resolver::MediaDescriptor;

const MAX_STEM_CHARS: usize = 80;

/// Renders a title in Latin script (`"東京"` becomes `"Dong Jing"`).
#[must_use]
pub fn transliterate_title(title: &str) -> String {
    if title.is_ascii() {
        return title.to_string();
    }
    deunicode(title)
}

fn sanitize_component(value: &str) -> String {
    let mut out = String::new();
    let mut prev_sep = false;
    for ch in value.chars() {
        let mapped = match ch {
            c if c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '(' | ')' | '[' | ']') => c,
            _ => '_',
        };
        if mapped == '_' {
            if !prev_sep {
                out.push('_');
                prev_sep = true;
            }
        } else {
            out.push(mapped);
            prev_sep = false;
        }
    }
    out.trim_matches(|c| c == '_' || c == '.').to_string()
}

/// Filename presented to the recipient.
///
/// The stem is the transliterated title (falling back to the media id),
/// followed by `_{start}-{end}` when trimmed. Converted audio takes the
/// conversion extension; unconverted `webm` audio is named `.ogg`.
#[must_use]
pub fn delivery_filename(descriptor: &MediaDescriptor, params: &ExecutorParams) -> String {
    let mut stem: String = sanitize_component(&transliterate_title(&descriptor.title))
        .chars()
        .take(MAX_STEM_CHARS)
        .collect();
    if stem.is_empty() {
        stem = sanitize_component(&descriptor.id);
    }
    if stem.is_empty() {
        stem = "media".to_string();
    }
    if let Some(window) = &params.trim {
        stem.push_str(&window.filename_suffix());
    }

    let ext = match (params.output_format, params.kind) {
        (Some(format), _) => format.extension(),
        (None, MediaKind::Audio) if descriptor.ext == "webm" => "ogg",
        (None, _) => descriptor.ext.as_str(),
    };
    format!("{stem}.{ext}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::job::OutputFormat;
    use crate::resolver::FormatSelection;
    use crate::trim::TrimWindow;

    fn descriptor(title: &str, ext: &str) -> MediaDescriptor {
        MediaDescriptor {
            id: "abc123".to_string(),
            ext: ext.to_string(),
            title: title.to_string(),
            duration: None,
            filesize: None,
            is_live: false,
            stream_urls: Vec::new(),
        }
    }

    fn params(kind: MediaKind) -> ExecutorParams {
        ExecutorParams {
            selection: FormatSelection {
                format: "b".to_string(),
                sort: None,
            },
            trim: None,
            output_format: None,
            kind,
            match_filter: None,
            max_filesize: None,
        }
    }

    #[test]
    fn test_ascii_title_is_sanitized() {
        let name = delivery_filename(
            &descriptor("Never Gonna: Give/You Up?", "mp4"),
            &params(MediaKind::Video),
        );
        assert_eq!(name, "Never_Gonna_Give_You_Up.mp4");
    }

    #[test]
    fn test_non_latin_title_is_transliterated() {
        let name = delivery_filename(&descriptor("東京", "mp4"), &params(MediaKind::Video));
        assert!(name.is_ascii(), "{name}");
        assert!(name.ends_with(".mp4"));
        assert!(name.len() > ".mp4".len());
    }

    #[test]
    fn test_empty_title_falls_back_to_id() {
        let name = delivery_filename(&descriptor("???", "mp4"), &params(MediaKind::Video));
        assert_eq!(name, "abc123.mp4");
    }

    #[test]
    fn test_trim_suffix_appended() {
        let mut params = params(MediaKind::Video);
        params.trim = Some(
            TrimWindow::new(
                Duration::from_secs(10),
                Duration::from_secs(40),
                Duration::from_secs(3600),
            )
            .unwrap(),
        );
        assert_eq!(
            delivery_filename(&descriptor("Clip", "mp4"), &params),
            "Clip_10-40.mp4"
        );
    }

    #[test]
    fn test_audio_extensions() {
        assert_eq!(
            delivery_filename(&descriptor("Song", "webm"), &params(MediaKind::Audio)),
            "Song.ogg"
        );
        assert_eq!(
            delivery_filename(&descriptor("Song", "m4a"), &params(MediaKind::Audio)),
            "Song.m4a"
        );
        let mut mp3 = params(MediaKind::Audio);
        mp3.output_format = Some(OutputFormat::Mp3);
        assert_eq!(delivery_filename(&descriptor("Song", "webm"), &mp3), "Song.mp3");
    }
}
