use crate::errors::FetchError;
use crate::security_options::SecurityOptions;
use crate::url_policy::validate_url;
use bytes::Bytes;
use std::fmt;
use url::Url;

pub const MAX_IMAGE_BYTES: u64 = 15 * 1024 * 1024;
pub const MAX_DOCUMENT_BYTES: u64 = 5 * 1024 * 1024;
pub const MAX_IMAGE_DIMENSION: u32 = 8192;
pub const MAX_IMAGE_PIXELS: u64 = 32_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentFormat {
    Jpeg,
    Png,
    Gif,
    WebP,
    Bmp,
    Tiff,
    Svg,
}

impl ContentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::WebP => "webp",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
            Self::Svg => "svg",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::WebP => "image/webp",
            Self::Bmp => "image/bmp",
            Self::Tiff => "image/tiff",
            Self::Svg => "image/svg+xml",
        }
    }

    pub fn is_markup(&self) -> bool {
        matches!(self, Self::Svg)
    }

    /// Raster formats served without further opt-in.
    pub fn is_allowed_raster(&self) -> bool {
        matches!(self, Self::Jpeg | Self::Png | Self::Gif | Self::WebP)
    }

    /// Maps a `Content-Type` header value (parameters ignored) to a format.
    pub fn from_mime_type(content_type: &str) -> Option<Self> {
        let mime = content_type.split(';').next()?.trim().to_ascii_lowercase();
        match mime.as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(Self::Jpeg),
            "image/png" | "image/x-png" => Some(Self::Png),
            "image/gif" => Some(Self::Gif),
            "image/webp" => Some(Self::WebP),
            "image/bmp" | "image/x-ms-bmp" => Some(Self::Bmp),
            "image/tiff" => Some(Self::Tiff),
            "image/svg+xml" => Some(Self::Svg),
            _ => None,
        }
    }
}

impl fmt::Display for ContentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a fetch is expected to return; drives body limits and accepted
/// content types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Document,
    Image,
}

impl ContentKind {
    pub fn max_bytes(&self) -> u64 {
        match self {
            Self::Document => MAX_DOCUMENT_BYTES,
            Self::Image => MAX_IMAGE_BYTES,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Image => "image",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: Url,
    pub kind: ContentKind,
    pub options: SecurityOptions,
}

impl FetchRequest {
    /// Validates `raw_url` against the URL policy before building the request.
    pub fn new(
        raw_url: &str,
        kind: ContentKind,
        options: SecurityOptions,
    ) -> Result<Self, FetchError> {
        let url = validate_url(raw_url, options.https_only())?;
        Ok(Self { url, kind, options })
    }

    /// Deduplication and cache key: kind, the full security policy and the
    /// normalized URL.
    pub fn cache_key(&self) -> String {
        format!(
            "{}:{}:{}",
            self.kind.as_str(),
            self.options.policy_tag(),
            self.url
        )
    }
}

#[derive(Debug, Clone)]
pub struct FetchedResource {
    pub final_url: String,
    pub content_type: Option<String>,
    pub body: Bytes,
}

#[derive(Debug, Clone)]
pub struct ValidatedImage {
    pub format: ContentFormat,
    /// Absent for markup images without a reliable intrinsic size.
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub bytes: Bytes,
    /// Benign issues found while validating (e.g. stripped SVG attributes).
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_type_mapping_ignores_parameters() {
        assert_eq!(
            ContentFormat::from_mime_type("image/PNG; charset=binary"),
            Some(ContentFormat::Png)
        );
        assert_eq!(
            ContentFormat::from_mime_type("image/jpg"),
            Some(ContentFormat::Jpeg)
        );
        assert_eq!(ContentFormat::from_mime_type("text/html"), None);
    }

    #[test]
    fn test_raster_allowlist() {
        assert!(ContentFormat::Png.is_allowed_raster());
        assert!(ContentFormat::WebP.is_allowed_raster());
        assert!(!ContentFormat::Tiff.is_allowed_raster());
        assert!(!ContentFormat::Svg.is_allowed_raster());
    }

    #[test]
    fn test_cache_key_uses_normalized_url() {
        let request = FetchRequest::new(
            "HTTPS://Example.COM/a/../img.png",
            ContentKind::Image,
            SecurityOptions::default(),
        )
        .unwrap();
        assert_eq!(
            request.cache_key(),
            "image:http-r3-t5000:https://example.com/img.png"
        );
    }

    #[test]
    fn test_cache_key_separates_markup_opt_in() {
        let options = SecurityOptions::default();
        let plain =
            FetchRequest::new("https://example.com/logo", ContentKind::Image, options).unwrap();
        let svg = FetchRequest::new(
            "https://example.com/logo",
            ContentKind::Image,
            options.with_markup_format(true),
        )
        .unwrap();
        assert_ne!(plain.cache_key(), svg.cache_key());
    }

    #[test]
    fn test_cache_key_separates_every_policy_field() {
        let url = "https://example.com/logo";
        let key = |options: SecurityOptions| {
            FetchRequest::new(url, ContentKind::Image, options)
                .unwrap()
                .cache_key()
        };

        let lax = key(SecurityOptions::new(false, 5_000, 20, false).unwrap());
        let keys = [
            key(SecurityOptions::new(true, 5_000, 20, false).unwrap()),
            key(SecurityOptions::new(false, 5_000, 0, false).unwrap()),
            key(SecurityOptions::new(false, 1_000, 20, false).unwrap()),
            key(SecurityOptions::new(true, 5_000, 0, false).unwrap()),
        ];
        for strict in &keys {
            assert_ne!(&lax, strict);
        }
    }
}
