//! Raster decode: input bytes → `DynamicImage`, plus resampling.
//!
//! Decoding goes through `ImageReader::with_guessed_format` so the actual
//! byte signature wins over whatever extension the file carries. AVIF
//! *input* is not supported (the `image` crate is built without an AVIF
//! decoder here); AVIF is an encode-only target.

use crate::error::ItemError;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::io::Cursor;
use tracing::debug;

/// Decode an input buffer into an in-memory raster surface.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, ItemError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ItemError::Decode {
            detail: e.to_string(),
        })?;

    let img = reader.decode().map_err(|e| ItemError::Decode {
        detail: e.to_string(),
    })?;

    debug!("Decoded image: {}x{} px", img.width(), img.height());
    Ok(img)
}

/// Resample onto the target size, or pass through when it already matches.
///
/// `resize_exact` because the target may deliberately break the aspect
/// ratio (both dimensions requested); ratio preservation happens earlier,
/// in the dimension resolver.
pub fn resize_to(img: DynamicImage, target: (u32, u32)) -> DynamicImage {
    let (w, h) = target;
    if (img.width(), img.height()) == (w, h) {
        img
    } else {
        img.resize_exact(w, h, FilterType::Lanczos3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([10, 120, 240])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn decode_valid_png() {
        let img = decode_image(&png_bytes(12, 7)).unwrap();
        assert_eq!((img.width(), img.height()), (12, 7));
    }

    #[test]
    fn decode_garbage_fails_with_decode_error() {
        let err = decode_image(b"not an image at all").unwrap_err();
        assert!(matches!(err, ItemError::Decode { .. }));
    }

    #[test]
    fn resize_changes_dimensions_exactly() {
        let img = decode_image(&png_bytes(40, 20)).unwrap();
        let out = resize_to(img, (10, 30));
        assert_eq!((out.width(), out.height()), (10, 30));
    }

    #[test]
    fn resize_to_same_size_is_passthrough() {
        let img = decode_image(&png_bytes(8, 8)).unwrap();
        let out = resize_to(img, (8, 8));
        assert_eq!((out.width(), out.height()), (8, 8));
    }
}
