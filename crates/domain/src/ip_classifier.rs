use ipnetwork::{Ipv4Network, Ipv6Network};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::LazyLock;

const BLOCKED_V4_RANGES: &[(Ipv4Addr, u8)] = &[
    (Ipv4Addr::new(0, 0, 0, 0), 8),
    (Ipv4Addr::new(10, 0, 0, 0), 8),
    // carrier-grade NAT (RFC 6598)
    (Ipv4Addr::new(100, 64, 0, 0), 10),
    (Ipv4Addr::new(127, 0, 0, 0), 8),
    (Ipv4Addr::new(169, 254, 0, 0), 16),
    (Ipv4Addr::new(172, 16, 0, 0), 12),
    (Ipv4Addr::new(192, 168, 0, 0), 16),
    // multicast + reserved, first octet >= 224
    (Ipv4Addr::new(224, 0, 0, 0), 3),
];

const BLOCKED_V6_RANGES: &[(Ipv6Addr, u8)] = &[
    (Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 0), 10),
    (Ipv6Addr::new(0xfc00, 0, 0, 0, 0, 0, 0, 0), 7),
    (Ipv6Addr::new(0xff00, 0, 0, 0, 0, 0, 0, 0), 8),
    (Ipv6Addr::new(0x2001, 0x0db8, 0, 0, 0, 0, 0, 0), 32),
    // 6to4 tunnels can embed any IPv4 destination
    (Ipv6Addr::new(0x2002, 0, 0, 0, 0, 0, 0, 0), 16),
];

static BLOCKED_V4: LazyLock<Vec<Ipv4Network>> = LazyLock::new(|| {
    BLOCKED_V4_RANGES
        .iter()
        .filter_map(|(addr, prefix)| Ipv4Network::new(*addr, *prefix).ok())
        .collect()
});

static BLOCKED_V6: LazyLock<Vec<Ipv6Network>> = LazyLock::new(|| {
    BLOCKED_V6_RANGES
        .iter()
        .filter_map(|(addr, prefix)| Ipv6Network::new(*addr, *prefix).ok())
        .collect()
});

/// Outcome of classifying a single resolved address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpClassification {
    pub is_private_or_reserved: bool,
}

impl IpClassification {
    pub fn is_public(&self) -> bool {
        !self.is_private_or_reserved
    }
}

pub fn classify(ip: IpAddr) -> IpClassification {
    let is_private_or_reserved = match ip {
        IpAddr::V4(v4) => is_blocked_v4(v4),
        IpAddr::V6(v6) => is_blocked_v6(v6),
    };
    IpClassification {
        is_private_or_reserved,
    }
}

/// Classifies an IP literal given as text. Input that is not a well-formed
/// IPv4 or IPv6 literal is treated as blocked.
///
/// IPv6 literals that mix `:` and `.` (dotted IPv4 tails such as
/// `::ffff:8.8.8.8` or `64:ff9b::1.2.3.4`) are blocked outright. Hex and
/// colon-grouped IPv4-mapped forms are unwrapped and judged by the embedded
/// IPv4 address.
pub fn is_private_or_reserved(address: &str) -> bool {
    let trimmed = address.trim();
    let bare = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(trimmed);

    if bare.is_empty() {
        return true;
    }

    if bare.contains(':') {
        if bare.contains('.') {
            return true;
        }
        return match bare.parse::<Ipv6Addr>() {
            Ok(v6) => is_blocked_v6(v6),
            Err(_) => true,
        };
    }

    match bare.parse::<Ipv4Addr>() {
        Ok(v4) => is_blocked_v4(v4),
        Err(_) => true,
    }
}

fn is_blocked_v4(ip: Ipv4Addr) -> bool {
    BLOCKED_V4.iter().any(|network| network.contains(ip))
}

fn is_blocked_v6(ip: Ipv6Addr) -> bool {
    if let Some(embedded) = embedded_ipv4(ip) {
        return is_blocked_v4(embedded);
    }

    ip.is_unspecified() || ip.is_loopback() || BLOCKED_V6.iter().any(|network| network.contains(ip))
}

/// IPv4 destination carried in the low 32 bits of an IPv4-mapped
/// (`::ffff:0:0/96`), IPv4-compatible (`::/96`) or NAT64 (`64:ff9b::/96`)
/// address.
fn embedded_ipv4(ip: Ipv6Addr) -> Option<Ipv4Addr> {
    if let Some(mapped) = ip.to_ipv4_mapped() {
        return Some(mapped);
    }

    let segments = ip.segments();
    let low = || {
        let [a, b] = segments[6].to_be_bytes();
        let [c, d] = segments[7].to_be_bytes();
        Ipv4Addr::new(a, b, c, d)
    };

    match segments[..6] {
        // `::` and `::1` keep their IPv6 meaning
        [0, 0, 0, 0, 0, 0] if !ip.is_unspecified() && !ip.is_loopback() => Some(low()),
        [0x64, 0xff9b, 0, 0, 0, 0] => Some(low()),
        _ => None,
    }
}
