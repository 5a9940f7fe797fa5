//! Image-set-to-PDF assembly via printpdf.
//!
//! Pages are composed strictly sequentially in input order — the page
//! order of the output is the list order of the inputs, full stop. The
//! first image reuses the default A4 first page; every later image gets a
//! page sized to it: full page width, height from the image's own aspect
//! ratio. Images are embedded as JPEG at a fixed internal quality, which
//! keeps even PNG-heavy batches from producing multi-hundred-megabyte
//! documents.

use crate::error::ConvertError;
use crate::format::RasterFormat;
use crate::input::InputFile;
use crate::pipeline::{decode, encode};
use crate::progress::ProgressCallback;
use bytes::Bytes;
use printpdf::{Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, Pt, RawImage, XObjectTransform};
use tracing::{debug, info};

/// Width of every generated page, in millimetres (A4 width).
pub const PAGE_WIDTH_MM: f32 = 210.0;

/// Height of the default first page (A4).
const FIRST_PAGE_HEIGHT_MM: f32 = 297.0;

/// Internal quality for JPEG-embedded pages.
const EMBED_JPEG_QUALITY: f32 = 0.92;

/// Compose an ordered image set into a single PDF document.
///
/// Any constituent failure aborts the whole assembly — the output is one
/// atomic document, not a per-file product.
pub async fn images_to_pdf(
    files: &[InputFile],
    progress: Option<ProgressCallback>,
) -> Result<Bytes, ConvertError> {
    if files.is_empty() {
        return Err(ConvertError::Assembly("no input images".into()));
    }

    let files = files.to_vec();
    tokio::task::spawn_blocking(move || assemble_blocking(&files, progress))
        .await
        .map_err(|e| ConvertError::Internal(format!("assembly task panicked: {e}")))?
}

fn assemble_blocking(
    files: &[InputFile],
    progress: Option<ProgressCallback>,
) -> Result<Bytes, ConvertError> {
    let total = files.len();
    let mut doc = PdfDocument::new("pixelsift");
    let mut pages = Vec::with_capacity(total);
    let mut warnings = Vec::new();

    for (i, file) in files.iter().enumerate() {
        if let Some(cb) = &progress {
            cb.on_item_start(i + 1, total);
        }

        let img = decode::decode_image(&file.bytes).map_err(|e| {
            ConvertError::Assembly(format!("'{}': {e}", file.name))
        })?;
        let (w_px, h_px) = (img.width(), img.height());

        let jpeg = encode::encode_raster(&img, RasterFormat::Jpeg, EMBED_JPEG_QUALITY)
            .map_err(|e| ConvertError::Assembly(format!("'{}': {e}", file.name)))?;

        let raw = RawImage::decode_from_bytes(&jpeg, &mut warnings)
            .map_err(|e| ConvertError::Assembly(format!("'{}': {e}", file.name)))?;
        let image_id = doc.add_image(&raw);

        // Image fills the page width; its height follows its aspect ratio.
        let image_height_mm = PAGE_WIDTH_MM * h_px as f32 / w_px as f32;
        let page_height_mm = if i == 0 {
            FIRST_PAGE_HEIGHT_MM
        } else {
            image_height_mm
        };

        // dpi that maps the image's pixel width onto the full page width.
        let dpi = w_px as f32 * 25.4 / PAGE_WIDTH_MM;
        // Anchor at the top of the page (PDF origin is bottom-left).
        let translate_y: Pt = Mm(page_height_mm - image_height_mm).into();

        let ops = vec![Op::UseXobject {
            id: image_id,
            transform: XObjectTransform {
                translate_x: Some(Pt(0.0)),
                translate_y: Some(translate_y),
                dpi: Some(dpi),
                ..Default::default()
            },
        }];
        pages.push(PdfPage::new(Mm(PAGE_WIDTH_MM), Mm(page_height_mm), ops));

        debug!(
            "Placed '{}' on page {} ({}x{} px → {:.0}x{:.0} mm)",
            file.name,
            i + 1,
            w_px,
            h_px,
            PAGE_WIDTH_MM,
            page_height_mm
        );

        if let Some(cb) = &progress {
            cb.on_item_complete(i + 1, total, file.size());
        }
    }

    let bytes = doc
        .with_pages(pages)
        .save(&PdfSaveOptions::default(), &mut warnings);
    info!("Assembled {} images into a {}-byte PDF", total, bytes.len());

    Ok(Bytes::from(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_input(name: &str, w: u32, h: u32) -> InputFile {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([80, 80, 200])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        InputFile::from_bytes(name, buf)
    }

    #[tokio::test]
    async fn assembles_pdf_with_pdf_magic() {
        let files = vec![png_input("a.png", 32, 32), png_input("b.png", 16, 48)];
        let bytes = images_to_pdf(&files, None).await.unwrap();
        assert_eq!(&bytes[..5], b"%PDF-");
    }

    #[tokio::test]
    async fn empty_input_is_an_assembly_error() {
        let err = images_to_pdf(&[], None).await.unwrap_err();
        assert!(matches!(err, ConvertError::Assembly(_)));
    }

    #[tokio::test]
    async fn corrupt_constituent_aborts_the_whole_assembly() {
        let files = vec![
            png_input("ok.png", 8, 8),
            InputFile::from_bytes("broken.png", &b"garbage"[..]),
        ];
        let err = images_to_pdf(&files, None).await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("broken.png"), "got: {msg}");
    }
}
