use crate::errors::FetchError;
use crate::ip_classifier::classify;
use crate::security_options::SecurityOptions;
use std::net::IpAddr;
use url::{Host, Url};

const MAX_HOSTNAME_LEN: usize = 253;

const BLOCKED_HOSTNAMES: &[&str] = &[
    "localhost",
    "localhost.localdomain",
    "metadata.google.internal",
];

const BLOCKED_HOSTNAME_SUFFIXES: &[&str] = &[".localhost"];

/// Validates an untrusted absolute URL and returns it normalized.
///
/// Rejects control characters, schemes other than `http`/`https` (only
/// `https` when `https_only`), embedded credentials, hostnames outside the
/// `[a-z0-9._-]` alphabet and IP-literal hosts in private or reserved ranges.
/// Hostnames are not resolved here; the connector validates resolution.
pub fn validate_url(raw: &str, https_only: bool) -> Result<Url, FetchError> {
    // The URL parser silently strips tabs and newlines, so check the raw input.
    if raw.chars().any(|c| c.is_control()) {
        return Err(FetchError::InvalidUrl(
            "URL contains control characters".to_string(),
        ));
    }

    let url = Url::parse(raw.trim()).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

    match url.scheme() {
        "https" => {}
        "http" if !https_only => {}
        "http" => {
            return Err(FetchError::InvalidUrl(
                "only https URLs are allowed".to_string(),
            ))
        }
        other => {
            return Err(FetchError::InvalidUrl(format!(
                "scheme '{}' is not allowed",
                other
            )))
        }
    }

    if !url.username().is_empty() || url.password().is_some() {
        return Err(FetchError::InvalidUrl(
            "URL must not contain credentials".to_string(),
        ));
    }

    match url.host() {
        None => return Err(FetchError::InvalidUrl("URL has no host".to_string())),
        Some(Host::Domain(domain)) => check_hostname(domain)?,
        Some(Host::Ipv4(v4)) => check_literal(&url, IpAddr::V4(v4))?,
        Some(Host::Ipv6(v6)) => check_literal(&url, IpAddr::V6(v6))?,
    }

    Ok(url)
}

/// Validates one redirect hop before the client follows it.
///
/// `previous_len` is the number of URLs already requested in this chain
/// (the original request included), so the first redirect sees `1`.
pub fn check_redirect_hop(
    next: &Url,
    previous_len: usize,
    options: &SecurityOptions,
) -> Result<(), FetchError> {
    if previous_len > options.max_redirects() as usize {
        return Err(FetchError::RedirectLimit {
            max: options.max_redirects(),
        });
    }

    match validate_url(next.as_str(), options.https_only()) {
        Ok(_) => Ok(()),
        Err(blocked @ FetchError::BlockedAddress { .. }) => Err(blocked),
        Err(FetchError::InvalidUrl(reason)) => Err(FetchError::UnsafeRedirect {
            url: next.to_string(),
            reason,
        }),
        Err(other) => Err(FetchError::UnsafeRedirect {
            url: next.to_string(),
            reason: other.to_string(),
        }),
    }
}

fn check_literal(url: &Url, ip: IpAddr) -> Result<(), FetchError> {
    if classify(ip).is_private_or_reserved {
        return Err(FetchError::BlockedAddress {
            host: url.host_str().unwrap_or_default().to_string(),
            address: ip.to_string(),
        });
    }
    Ok(())
}

fn check_hostname(domain: &str) -> Result<(), FetchError> {
    let name = domain.strip_suffix('.').unwrap_or(domain);

    if name.is_empty() || name.len() > MAX_HOSTNAME_LEN {
        return Err(FetchError::InvalidUrl(format!(
            "invalid hostname length: {}",
            domain.len()
        )));
    }

    let valid_chars = name
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'-' | b'.' | b'_'));
    if !valid_chars || name.split('.').any(|label| label.is_empty()) {
        return Err(FetchError::InvalidUrl(format!(
            "hostname '{}' contains disallowed characters",
            domain
        )));
    }

    if BLOCKED_HOSTNAMES.contains(&name)
        || BLOCKED_HOSTNAME_SUFFIXES
            .iter()
            .any(|suffix| name.ends_with(suffix))
    {
        return Err(FetchError::BlockedAddress {
            host: domain.to_string(),
            address: name.to_string(),
        });
    }

    Ok(())
}
