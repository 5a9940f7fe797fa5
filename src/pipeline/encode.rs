//! Raster encode: `DynamicImage` → encoded bytes per format profile.
//!
//! One backend per format: mozjpeg for JPEG (libjpeg-turbo speed,
//! progressive + optimised coding), the `image` crate for PNG, the `webp`
//! crate for WebP, and `ravif` for AVIF. The (0, 1] quality from the
//! options maps onto each backend's 1–100 scale; PNG ignores it entirely,
//! which is what makes its output deterministic across quality settings.

use crate::format::RasterFormat;
use bytes::Bytes;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// AVIF encoder speed, balancing encode time against compression.
const AVIF_SPEED: u8 = 6;

/// Encode a raster surface at the given quality.
///
/// The error is a backend detail string; callers wrap it into the
/// [`crate::error::ItemError`] variant appropriate to their path.
pub fn encode_raster(
    img: &DynamicImage,
    format: RasterFormat,
    quality: f32,
) -> Result<Bytes, String> {
    let q100 = (quality.clamp(0.01, 1.0) * 100.0).round();
    let out = match format {
        RasterFormat::Jpeg => encode_jpeg(img, q100)?,
        RasterFormat::Png => encode_png(img)?,
        RasterFormat::Webp => encode_webp(img, q100)?,
        RasterFormat::Avif => encode_avif(img, q100)?,
    };
    debug!(
        "Encoded {}x{} as {}: {} bytes",
        img.width(),
        img.height(),
        format,
        out.len()
    );
    Ok(out)
}

fn encode_jpeg(img: &DynamicImage, quality: f32) -> Result<Bytes, String> {
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut comp = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
    comp.set_size(width as usize, height as usize);
    comp.set_quality(quality);
    comp.set_progressive_mode();
    comp.set_optimize_coding(true);

    let mut started = comp
        .start_compress(Vec::new())
        .map_err(|e| e.to_string())?;
    started.write_scanlines(&rgb).map_err(|e| e.to_string())?;
    let jpeg = started.finish().map_err(|e| e.to_string())?;

    Ok(Bytes::from(jpeg))
}

fn encode_png(img: &DynamicImage) -> Result<Bytes, String> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| e.to_string())?;
    Ok(Bytes::from(buf))
}

fn encode_webp(img: &DynamicImage, quality: f32) -> Result<Bytes, String> {
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let encoder = webp::Encoder::from_rgba(&rgba, width, height);
    let webp_data = encoder.encode(quality);

    Ok(Bytes::copy_from_slice(&webp_data))
}

fn encode_avif(img: &DynamicImage, quality: f32) -> Result<Bytes, String> {
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();

    let pixels: Vec<rgb::RGB8> = rgb
        .as_raw()
        .chunks_exact(3)
        .map(|c| rgb::RGB8::new(c[0], c[1], c[2]))
        .collect();
    let buffer = ravif::Img::new(pixels.as_slice(), width as usize, height as usize);

    let encoded = ravif::Encoder::new()
        .with_quality(quality)
        .with_speed(AVIF_SPEED)
        .encode_rgb(buffer)
        .map_err(|e| e.to_string())?;

    Ok(Bytes::copy_from_slice(&encoded.avif_file))
}
