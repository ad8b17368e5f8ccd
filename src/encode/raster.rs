//! Single image encoder.

use crate::capture::Bitmap;
use crate::config::ImageEncoding;
use crate::error::{Error, Result};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};

/// JPEG quality (1..=100) for a quality fraction.
pub fn jpeg_quality(fraction: f32) -> u8 {
    (fraction * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Encode a bitmap as a standalone image.
///
/// JPEG output has its alpha flattened onto `background`; PNG keeps alpha.
pub fn encode_bitmap(
    bitmap: &Bitmap,
    encoding: &ImageEncoding,
    background: [u8; 4],
) -> Result<Vec<u8>> {
    if bitmap.is_tainted() {
        return Err(Error::TaintedCanvas);
    }

    let mut out = Vec::new();
    match encoding {
        ImageEncoding::Png => {
            let pixels = bitmap.pixels();
            PngEncoder::new(&mut out).write_image(
                pixels.as_raw(),
                pixels.width(),
                pixels.height(),
                ExtendedColorType::Rgba8,
            )?;
        }
        ImageEncoding::Jpeg { quality } => {
            let rgb = bitmap.to_rgb(background);
            JpegEncoder::new_with_quality(&mut out, jpeg_quality(*quality)).write_image(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                ExtendedColorType::Rgb8,
            )?;
        }
    }

    Ok(out)
}
