mod markup;
mod raster;
mod sniff;
mod validator;

pub use markup::{sanitize_svg, SanitizedMarkup};
pub use raster::{check_pixel_limits, decode_checked, read_dimensions};
pub use sniff::{looks_like_svg, sniff_format};
pub use validator::ContentValidator;
