//! Provider error message sanitation.
//!
//! The extraction tool's stderr carries verbose diagnostics (bug-report
//! boilerplate, proxy hints, chained causes). Only the first meaningful
//! sentence is surfaced to requesters; the raw text is logged at debug level.

use std::sync::LazyLock;

use regex::Regex;

/// Matches http(s) URLs so they can be wrapped in `<...>` (suppresses link previews).
#[allow(clippy::expect_used)]
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[^\s<>"']+"#).expect("URL regex is valid") // Static pattern, safe to panic
});

/// Prefixes removed from the start of a provider message, in order.
const STRIP_PREFIXES: [&str; 3] = ["ERROR: ", "[generic] ", "None: "];

/// Markers after which everything is dropped.
const TRUNCATE_AT: [&str; 4] = [
    "Set --default-search",
    "(caused by",
    "You might want to use a VPN",
    "; please report this issue",
];

/// Fallback when the tool exited without any diagnostic text.
const UNKNOWN_FAILURE: &str = "The media could not be extracted.";

/// Picks the most relevant line out of raw tool stderr.
///
/// The last `ERROR:` line wins; otherwise the last non-empty line.
#[must_use]
pub fn primary_error_line(stderr: &str) -> Option<&str> {
    let lines = || stderr.lines().map(str::trim).filter(|l| !l.is_empty());
    lines()
        .rfind(|l| l.starts_with("ERROR:"))
        .or_else(|| lines().next_back())
}

/// Wraps every URL in `message` with angle brackets.
#[must_use]
pub fn silence_url_embeds(message: &str) -> String {
    URL_PATTERN
        .replace_all(message, |caps: &regex::Captures<'_>| format!("<{}>", &caps[0]))
        .into_owned()
}

/// Reduces raw tool stderr to a single user-facing line.
#[must_use]
pub fn sanitize_provider_message(stderr: &str) -> String {
    let Some(line) = primary_error_line(stderr) else {
        return UNKNOWN_FAILURE.to_string();
    };

    let silenced = silence_url_embeds(line);
    let mut message = silenced.as_str();
    for prefix in STRIP_PREFIXES {
        message = message.strip_prefix(prefix).unwrap_or(message);
    }
    for marker in TRUNCATE_AT {
        if let Some((head, _)) = message.split_once(marker) {
            message = head;
        }
    }

    let message = message.trim();
    if message.is_empty() {
        UNKNOWN_FAILURE.to_string()
    } else {
        message.to_string()
    }
}
