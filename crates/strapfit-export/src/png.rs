//! PNG export serializer.
//!
//! The composite is encoded exactly as rendered: full canvas size,
//! 8-bit RGBA, no resampling. Decoding the result yields the same pixels
//! that were shown on screen.
//!
//! This is a pure function with no I/O -- it returns a `Vec<u8>`.

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};

use strapfit_engine::PixelBuffer;

/// Suggested file name for a downloaded preview.
pub const DEFAULT_FILENAME: &str = "watch-strap-preview.png";

/// Errors raised while encoding a composite.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The image has no pixels.
    #[error("cannot export an empty {width}x{height} image")]
    EmptyImage {
        /// Image width.
        width: u32,
        /// Image height.
        height: u32,
    },

    /// The PNG encoder failed.
    #[error("PNG encoding failed: {0}")]
    PngEncode(#[from] image::ImageError),
}

/// Encode a rendered composite as PNG.
///
/// # Errors
///
/// Returns [`ExportError::EmptyImage`] for a zero-sized image and
/// [`ExportError::PngEncode`] if encoding fails.
pub fn to_png(image: &PixelBuffer) -> Result<Vec<u8>, ExportError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(ExportError::EmptyImage { width, height });
    }
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes).write_image(
        image.as_raw(),
        width,
        height,
        ExtendedColorType::Rgba8,
    )?;
    Ok(bytes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn png_signature_and_size() {
        let image = PixelBuffer::from_pixel(12, 7, Rgba([10, 20, 30, 255]));
        let bytes = to_png(&image).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (12, 7));
    }

    #[test]
    fn decoded_pixels_match_exactly() {
        let image = PixelBuffer::from_fn(9, 9, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            Rgba([(x * 28) as u8, (y * 28) as u8, 200, if x == y { 0 } else { 255 }])
        });
        let decoded = image::load_from_memory(&to_png(&image).unwrap())
            .unwrap()
            .to_rgba8();
        assert_eq!(decoded, image);
    }

    #[test]
    fn empty_image_is_rejected() {
        let err = to_png(&PixelBuffer::new(0, 5)).unwrap_err();
        assert!(matches!(err, ExportError::EmptyImage { width: 0, height: 5 }));
    }

    #[test]
    fn default_filename_is_png() {
        assert_eq!(DEFAULT_FILENAME, "watch-strap-preview.png");
    }
}
