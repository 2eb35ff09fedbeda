//! User-Agent string for outbound HTTP traffic (temporary host uploads).

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/mediagrab";

/// Default User-Agent for upload requests.
#[must_use]
pub(crate) fn default_upload_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("mediagrab/{version} (+{PROJECT_UA_URL})")
}
