use super::markup::sanitize_svg;
use super::raster::{check_pixel_limits, decode_checked, read_dimensions};
use super::sniff::sniff_format;
use bytes::Bytes;
use guarded_fetch_application::ports::ContentValidatorPort;
use guarded_fetch_domain::{
    ContentFormat, FetchError, SecurityOptions, ValidatedImage, MAX_IMAGE_BYTES,
};
use tracing::{debug, warn};

/// Image gate: size, sniffed format against the allowlist, header pixel
/// limits, then a bounded full decode. SVG is sanitized instead of decoded
/// and only when the caller opted in.
pub struct ContentValidator {
    max_bytes: u64,
}

impl ContentValidator {
    pub fn new() -> Self {
        Self {
            max_bytes: MAX_IMAGE_BYTES,
        }
    }

    fn check_declared_type(
        declared_type: Option<&str>,
        sniffed: ContentFormat,
        warnings: &mut Vec<String>,
    ) -> Result<(), FetchError> {
        let Some(declared) = declared_type.and_then(ContentFormat::from_mime_type) else {
            return Ok(());
        };
        if declared == sniffed {
            return Ok(());
        }

        if declared.is_markup() != sniffed.is_markup() {
            warn!(
                declared = %declared,
                sniffed = %sniffed,
                "Content-Type conflicts with image content"
            );
            return Err(FetchError::UnsupportedFormat(format!(
                "declared {} but content is {}",
                declared.mime_type(),
                sniffed.mime_type()
            )));
        }

        let message = format!(
            "declared {} but content is {}",
            declared.mime_type(),
            sniffed.mime_type()
        );
        debug!(declared = %declared, sniffed = %sniffed, "Content-Type mismatch");
        warnings.push(message);
        Ok(())
    }
}

impl Default for ContentValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentValidatorPort for ContentValidator {
    fn validate(
        &self,
        body: &Bytes,
        declared_type: Option<&str>,
        options: &SecurityOptions,
    ) -> Result<ValidatedImage, FetchError> {
        let size = body.len() as u64;
        if size > self.max_bytes {
            return Err(FetchError::OversizedPayload {
                size,
                limit: self.max_bytes,
            });
        }
        if body.is_empty() {
            return Err(FetchError::MalformedContent("empty body".to_string()));
        }

        let sniffed = sniff_format(body).ok_or_else(|| {
            FetchError::UnsupportedFormat("unrecognized image format".to_string())
        })?;

        let mut warnings = Vec::new();
        Self::check_declared_type(declared_type, sniffed, &mut warnings)?;

        if sniffed.is_markup() {
            if !options.allow_markup_format() {
                return Err(FetchError::UnsupportedFormat(
                    "SVG images are not enabled".to_string(),
                ));
            }

            let sanitized = sanitize_svg(body)?;
            // intrinsic size bounds any later rasterization
            if sanitized.width.is_some() || sanitized.height.is_some() {
                let width = sanitized.width.unwrap_or(1).max(1);
                let height = sanitized.height.unwrap_or(1).max(1);
                check_pixel_limits(width, height).inspect_err(|_| {
                    warn!(width, height, "Rejected oversized SVG intrinsic size");
                })?;
            }
            warnings.extend(sanitized.warnings);
            return Ok(ValidatedImage {
                format: ContentFormat::Svg,
                width: sanitized.width,
                height: sanitized.height,
                bytes: sanitized.bytes,
                warnings,
            });
        }

        if !sniffed.is_allowed_raster() {
            return Err(FetchError::UnsupportedFormat(format!(
                "{} images are not allowed",
                sniffed
            )));
        }

        let (width, height) = read_dimensions(body).inspect_err(|e| {
            if let FetchError::PixelLimitExceeded { width, height } = e {
                warn!(width, height, "Rejected oversized image header");
            }
        })?;
        decode_checked(body, (width, height))?;

        debug!(format = %sniffed, width, height, bytes = size, "Image validated");

        Ok(ValidatedImage {
            format: sniffed,
            width: Some(width),
            height: Some(height),
            bytes: body.clone(),
            warnings,
        })
    }
}
