use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use thiserror::Error;
use url::Url;

/// Why an entry URL may not be fetched by the scraper.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    #[error("URL has no host")]
    MissingHost,
    /// Private, link-local, shared or unspecified address
    #[error("Private IP address not allowed: {0}")]
    PrivateIp(String),
    #[error("Localhost not allowed")]
    Localhost,
}

/// Validates an entry URL before the scraper requests it.
///
/// Entry URLs come from third-party feeds, so a hostile feed could point the
/// scraper at internal services. Rejects:
/// - schemes other than `http`/`https`
/// - `localhost`, `*.localhost` and loopback addresses
/// - private, link-local, CGNAT and unspecified addresses, including
///   IPv4-mapped IPv6 forms
///
/// Hostnames are not resolved; DNS rebinding is out of reach of this check.
///
/// # Examples
///
/// ```
/// use fulltext::util::validate_url;
///
/// assert!(validate_url("https://example.com/posts/1").is_ok());
/// assert!(validate_url("http://localhost/admin").is_err());
/// assert!(validate_url("http://10.0.0.1/").is_err());
/// assert!(validate_url("file:///etc/passwd").is_err());
/// ```
pub fn validate_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str.trim())?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    let host = url.host_str().ok_or(UrlValidationError::MissingHost)?;
    let host_lower = host.to_ascii_lowercase();
    if host_lower == "localhost" || host_lower.ends_with(".localhost") {
        return Err(UrlValidationError::Localhost);
    }

    let bare = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    if let Ok(ip) = bare.parse::<IpAddr>() {
        check_ip(ip)?;
    }

    Ok(url)
}

fn check_ip(ip: IpAddr) -> Result<(), UrlValidationError> {
    let blocked = match ip {
        IpAddr::V4(v4) => {
            if v4.is_loopback() {
                return Err(UrlValidationError::Localhost);
            }
            is_blocked_v4(v4)
        }
        IpAddr::V6(v6) => {
            if v6.is_loopback() {
                return Err(UrlValidationError::Localhost);
            }
            if let Some(v4) = v6.to_ipv4_mapped() {
                return check_ip(IpAddr::V4(v4));
            }
            is_blocked_v6(v6)
        }
    };

    if blocked {
        Err(UrlValidationError::PrivateIp(ip.to_string()))
    } else {
        Ok(())
    }
}

fn is_blocked_v4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    // 100.64.0.0/10 carrier-grade NAT
    let shared = a == 100 && (b & 0xc0) == 64;
    ip.is_private() || ip.is_link_local() || ip.is_unspecified() || shared
}

fn is_blocked_v6(ip: Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    // fc00::/7 unique local, fe80::/10 link-local
    ip.is_unspecified() || (first & 0xfe00) == 0xfc00 || (first & 0xffc0) == 0xfe80
}
