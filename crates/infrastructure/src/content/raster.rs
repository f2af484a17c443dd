use guarded_fetch_domain::{FetchError, MAX_IMAGE_DIMENSION, MAX_IMAGE_PIXELS};
use image::{ImageError, ImageReader, Limits};
use std::io::Cursor;

/// Largest decode buffer: the pixel budget at 16-bit RGBA.
const MAX_DECODE_ALLOC: u64 = MAX_IMAGE_PIXELS * 8;

/// Reads width and height from the image header without decoding pixel
/// data, then applies the pixel limits.
pub fn read_dimensions(bytes: &[u8]) -> Result<(u32, u32), FetchError> {
    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| FetchError::MalformedContent(e.to_string()))?;
    // header parsing only, the checks below run before any allocation
    reader.no_limits();

    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| map_image_error(e, (0, 0)))?;
    check_pixel_limits(width, height)?;
    Ok((width, height))
}

pub fn check_pixel_limits(width: u32, height: u32) -> Result<(), FetchError> {
    if width == 0 || height == 0 {
        return Err(FetchError::MalformedContent(format!(
            "image has an empty dimension: {}x{}",
            width, height
        )));
    }

    let pixels = u64::from(width) * u64::from(height);
    if width > MAX_IMAGE_DIMENSION || height > MAX_IMAGE_DIMENSION || pixels > MAX_IMAGE_PIXELS {
        return Err(FetchError::PixelLimitExceeded { width, height });
    }
    Ok(())
}

/// Fully decodes the image under decoder limits and confirms the decoded
/// size matches the header.
pub fn decode_checked(bytes: &[u8], expected: (u32, u32)) -> Result<(), FetchError> {
    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| FetchError::MalformedContent(e.to_string()))?;

    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_IMAGE_DIMENSION);
    limits.max_image_height = Some(MAX_IMAGE_DIMENSION);
    limits.max_alloc = Some(MAX_DECODE_ALLOC);
    reader.limits(limits);

    let image = reader.decode().map_err(|e| map_image_error(e, expected))?;

    let decoded = (image.width(), image.height());
    if decoded != expected {
        return Err(FetchError::MalformedContent(format!(
            "decoded size {}x{} does not match header {}x{}",
            decoded.0, decoded.1, expected.0, expected.1
        )));
    }
    Ok(())
}

fn map_image_error(error: ImageError, dimensions: (u32, u32)) -> FetchError {
    match error {
        ImageError::Limits(_) => FetchError::PixelLimitExceeded {
            width: dimensions.0,
            height: dimensions.1,
        },
        other => FetchError::MalformedContent(other.to_string()),
    }
}
