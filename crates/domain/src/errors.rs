use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Blocked private or reserved address {address} for host {host}")]
    BlockedAddress { host: String, address: String },

    #[error("Redirect to unsafe URL {url}: {reason}")]
    UnsafeRedirect { url: String, reason: String },

    #[error("Unsupported content format: {0}")]
    UnsupportedFormat(String),

    #[error("Payload of {size} bytes exceeds limit of {limit} bytes")]
    OversizedPayload { size: u64, limit: u64 },

    #[error("Image {width}x{height} exceeds pixel limits")]
    PixelLimitExceeded { width: u32, height: u32 },

    #[error("Malformed content: {0}")]
    MalformedContent(String),

    #[error("Malicious markup rejected: {0}")]
    MaliciousMarkup(String),

    #[error("Fetch timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("Too many in-flight fetches (limit {limit})")]
    TooManyInFlight { limit: usize },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("DNS resolution failed for {host}: {reason}")]
    ResolutionFailed { host: String, reason: String },

    #[error("Exceeded maximum of {max} redirects")]
    RedirectLimit { max: u32 },

    #[error("Upstream {url} returned HTTP {status}")]
    UpstreamStatus { status: u16, url: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FetchError {
    /// Load conditions a caller may retry later. Everything else is a
    /// permanent rejection of this request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::TooManyInFlight { .. })
    }

    pub fn is_security_violation(&self) -> bool {
        matches!(
            self,
            Self::BlockedAddress { .. } | Self::UnsafeRedirect { .. } | Self::MaliciousMarkup(_)
        )
    }
}
