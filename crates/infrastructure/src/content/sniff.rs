use guarded_fetch_domain::ContentFormat;
use image::ImageFormat;

const SVG_SNIFF_WINDOW: usize = 1024;

/// Identifies the format from the bytes alone. The image library's
/// signature table is consulted first, then a fixed set of magic numbers,
/// then a textual check for SVG.
pub fn sniff_format(bytes: &[u8]) -> Option<ContentFormat> {
    image::guess_format(bytes)
        .ok()
        .and_then(from_image_format)
        .or_else(|| sniff_magic(bytes))
        .or_else(|| looks_like_svg(bytes).then_some(ContentFormat::Svg))
}

fn from_image_format(format: ImageFormat) -> Option<ContentFormat> {
    match format {
        ImageFormat::Jpeg => Some(ContentFormat::Jpeg),
        ImageFormat::Png => Some(ContentFormat::Png),
        ImageFormat::Gif => Some(ContentFormat::Gif),
        ImageFormat::WebP => Some(ContentFormat::WebP),
        ImageFormat::Bmp => Some(ContentFormat::Bmp),
        ImageFormat::Tiff => Some(ContentFormat::Tiff),
        _ => None,
    }
}

fn sniff_magic(bytes: &[u8]) -> Option<ContentFormat> {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some(ContentFormat::Jpeg),
        [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some(ContentFormat::Png),
        [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some(ContentFormat::Gif),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => {
            Some(ContentFormat::WebP)
        }
        [b'B', b'M', ..] => Some(ContentFormat::Bmp),
        [b'I', b'I', 0x2A, 0x00, ..] | [b'M', b'M', 0x00, 0x2A, ..] => Some(ContentFormat::Tiff),
        _ => None,
    }
}

/// True when the start of the buffer reads like an SVG document: an XML
/// prolog, comment or doctype followed by an `<svg` tag, or the tag itself.
pub fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(SVG_SNIFF_WINDOW)];
    let text = String::from_utf8_lossy(head);
    let text = text.trim_start_matches('\u{feff}').trim_start();
    let lower = text.to_ascii_lowercase();

    let plausible_start = ["<?xml", "<svg", "<!--", "<!doctype"]
        .iter()
        .any(|prefix| lower.starts_with(prefix));

    plausible_start && lower.contains("<svg")
}
