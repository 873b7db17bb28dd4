//! Public-reachability check for redirect targets.
//!
//! Rule targets are validated at creation time, but `evaluate_rules`
//! re-checks the destination before returning it: rows inserted outside the
//! validated path must not turn a redirect into an SSRF primitive.

use std::net::IpAddr;
use url::{Host, Url};

/// Reasons a destination URL is considered unsafe.
#[derive(Debug, thiserror::Error)]
pub enum UrlSafetyError {
    #[error("Invalid URL format: {0}")]
    InvalidFormat(String),

    #[error("Only HTTP and HTTPS protocols are allowed")]
    UnsupportedProtocol,

    #[error("Destination resolves to a non-public network: {0}")]
    NonPublicTarget(String),
}

/// Checks that a URL points at a public, routable destination.
///
/// Rejects:
/// - non-HTTP(S) schemes (`javascript:`, `file:`, `data:`, ...)
/// - loopback, private (RFC 1918), link-local, and unspecified IP literals,
///   including their IPv6 counterparts and IPv4-mapped forms
/// - `localhost` and `.localhost` / `.local` / `.internal` hostnames
///
/// Purely syntactic: no DNS resolution is performed, so a public hostname
/// that resolves to a private address is out of scope here (the redirect
/// layer never fetches the destination itself).
pub fn check_public_url(input: &str) -> Result<(), UrlSafetyError> {
    let url = Url::parse(input).map_err(|e| UrlSafetyError::InvalidFormat(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        _ => return Err(UrlSafetyError::UnsupportedProtocol),
    }

    match url.host() {
        Some(Host::Ipv4(addr)) => check_ip(IpAddr::V4(addr))?,
        Some(Host::Ipv6(addr)) => check_ip(IpAddr::V6(addr))?,
        Some(Host::Domain(domain)) => check_domain(domain)?,
        None => return Err(UrlSafetyError::InvalidFormat("missing host".to_string())),
    }

    Ok(())
}

/// Boolean form used on the hot redirect path.
pub fn is_safe_url(input: &str) -> bool {
    check_public_url(input).is_ok()
}

fn check_ip(addr: IpAddr) -> Result<(), UrlSafetyError> {
    let blocked = match addr {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                // Carrier-grade NAT, 100.64.0.0/10.
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xc0) == 64)
        }
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return check_ip(IpAddr::V4(mapped));
            }
            v6.is_loopback()
                || v6.is_unspecified()
                // Unique-local fc00::/7 and link-local fe80::/10.
                || (v6.segments()[0] & 0xfe00) == 0xfc00
                || (v6.segments()[0] & 0xffc0) == 0xfe80
        }
    };

    if blocked {
        Err(UrlSafetyError::NonPublicTarget(addr.to_string()))
    } else {
        Ok(())
    }
}

fn check_domain(domain: &str) -> Result<(), UrlSafetyError> {
    let domain = domain.trim_end_matches('.').to_ascii_lowercase();

    let internal = domain == "localhost"
        || domain.ends_with(".localhost")
        || domain.ends_with(".local")
        || domain.ends_with(".internal");

    if internal {
        return Err(UrlSafetyError::NonPublicTarget(domain));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_hostnames_are_safe() {
        assert!(is_safe_url("https://example.com/path?x=1"));
        assert!(is_safe_url("http://sub.example.org"));
    }

    #[test]
    fn test_public_ip_is_safe() {
        assert!(is_safe_url("http://93.184.216.34/"));
    }

    #[test]
    fn test_rejects_non_http_schemes() {
        assert!(!is_safe_url("javascript:alert(1)"));
        assert!(!is_safe_url("file:///etc/passwd"));
        assert!(!is_safe_url("ftp://example.com/file"));
        assert!(matches!(
            check_public_url("data:text/plain,hi").unwrap_err(),
            UrlSafetyError::UnsupportedProtocol
        ));
    }

    #[test]
    fn test_rejects_loopback_and_localhost() {
        assert!(!is_safe_url("http://127.0.0.1:8080/admin"));
        assert!(!is_safe_url("http://localhost/"));
        assert!(!is_safe_url("http://app.localhost/"));
        assert!(!is_safe_url("http://[::1]/"));
    }

    #[test]
    fn test_rejects_private_ranges() {
        assert!(!is_safe_url("http://10.0.0.5/"));
        assert!(!is_safe_url("http://172.16.1.1/"));
        assert!(!is_safe_url("http://192.168.1.1/"));
        assert!(!is_safe_url("http://100.64.0.1/"));
    }

    #[test]
    fn test_rejects_link_local_and_metadata() {
        // 169.254.169.254 is the classic cloud metadata endpoint.
        assert!(!is_safe_url("http://169.254.169.254/latest/meta-data/"));
        assert!(!is_safe_url("http://[fe80::1]/"));
        assert!(!is_safe_url("http://[fc00::1]/"));
    }

    #[test]
    fn test_rejects_ipv4_mapped_ipv6() {
        assert!(!is_safe_url("http://[::ffff:127.0.0.1]/"));
        assert!(!is_safe_url("http://[::ffff:10.0.0.1]/"));
    }

    #[test]
    fn test_rejects_internal_suffixes() {
        assert!(!is_safe_url("http://printer.local/"));
        assert!(!is_safe_url("http://db.internal/"));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(!is_safe_url("not a url"));
        assert!(!is_safe_url(""));
    }
}
