//! SSRF screening for job URLs.
//!
//! Only absolute `http`/`https` URLs whose host is not loopback, link-local,
//! private, shared or unspecified address space are allowed through to the
//! extraction tool.
//!
//! Hostnames are checked literally; names that resolve to internal addresses
//! are not caught here.

use std::net::{Ipv4Addr, Ipv6Addr};

use tracing::warn;
use url::{Host, Url};

use crate::error::ValidationError;

/// Validates `url` and returns it parsed.
///
/// # Errors
///
/// - [`ValidationError::MalformedUrl`] for unparsable or non-http(s) URLs
/// - [`ValidationError::UnsafeTarget`] for internal hosts
pub fn screen_url(url: &str) -> Result<Url, ValidationError> {
    let parsed = Url::parse(url).map_err(|_| ValidationError::MalformedUrl {
        url: url.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ValidationError::MalformedUrl {
            url: url.to_string(),
        });
    }

    let unsafe_host = match parsed.host() {
        None => {
            return Err(ValidationError::MalformedUrl {
                url: url.to_string(),
            });
        }
        Some(Host::Domain(domain)) => is_local_name(domain),
        Some(Host::Ipv4(addr)) => is_internal_v4(addr),
        Some(Host::Ipv6(addr)) => is_internal_v6(addr),
    };

    if unsafe_host {
        let host = parsed.host_str().unwrap_or_default().to_string();
        warn!(host = %host, "rejected internal job target");
        return Err(ValidationError::UnsafeTarget { host });
    }
    Ok(parsed)
}

fn is_local_name(domain: &str) -> bool {
    let domain = domain.trim_end_matches('.').to_ascii_lowercase();
    domain == "localhost" || domain.ends_with(".localhost")
}

fn is_internal_v4(addr: Ipv4Addr) -> bool {
    let [a, b, ..] = addr.octets();
    addr.is_loopback()
        || addr.is_private()
        || addr.is_link_local()
        || addr.is_unspecified()
        || addr.is_broadcast()
        // 100.64.0.0/10 carrier-grade NAT
        || (a == 100 && (64..=127).contains(&b))
}

fn is_internal_v6(addr: Ipv6Addr) -> bool {
    if let Some(mapped) = addr.to_ipv4_mapped() {
        return is_internal_v4(mapped);
    }
    let first = addr.segments()[0];
    addr.is_loopback()
        || addr.is_unspecified()
        // fc00::/7 unique local
        || (first & 0xfe00) == 0xfc00
        // fe80::/10 link local
        || (first & 0xffc0) == 0xfe80
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_public_urls_pass() {
        assert!(screen_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ").is_ok());
        assert!(screen_url("http://93.184.216.34/video.mp4").is_ok());
        assert!(screen_url("https://[2606:4700::1111]/x").is_ok());
    }

    #[test]
    fn test_loopback_and_localhost_rejected() {
        for url in [
            "http://localhost/admin",
            "http://LOCALHOST./admin",
            "http://api.localhost/",
            "http://127.0.0.1:8080/",
            "http://[::1]/",
        ] {
            assert!(
                matches!(
                    screen_url(url),
                    Err(ValidationError::UnsafeTarget { .. })
                ),
                "{url} should be rejected"
            );
        }
    }

    #[test]
    fn test_private_and_link_local_rejected() {
        for url in [
            "http://10.0.0.5/",
            "http://172.16.3.4/",
            "http://192.168.1.1/",
            "http://169.254.169.254/latest/meta-data",
            "http://100.64.0.1/",
            "http://0.0.0.0/",
            "http://[fd00::1]/",
            "http://[fe80::1]/",
            "http://[::ffff:10.0.0.1]/",
        ] {
            assert!(
                matches!(
                    screen_url(url),
                    Err(ValidationError::UnsafeTarget { .. })
                ),
                "{url} should be rejected"
            );
        }
    }

    #[test]
    fn test_non_http_schemes_rejected() {
        assert!(matches!(
            screen_url("file:///etc/passwd"),
            Err(ValidationError::MalformedUrl { .. })
        ));
        assert!(matches!(
            screen_url("ytsearch:never gonna"),
            Err(ValidationError::MalformedUrl { .. })
        ));
    }

    #[test]
    fn test_garbage_rejected_as_malformed() {
        assert!(matches!(
            screen_url("not a url"),
            Err(ValidationError::MalformedUrl { .. })
        ));
    }
}
