//! Streaming conversion API: emit per-item outcomes as they complete.
//!
//! ## Why stream?
//!
//! Large batches (or many-page PDFs) take a while. A streams-based API lets
//! callers display results immediately, wire up progress bars, or write
//! outputs to disk incrementally instead of holding every encoded buffer in
//! memory at once.
//!
//! Unlike the eager [`crate::convert::convert_images`] which returns only
//! after the whole batch finishes, [`convert_stream`] yields one
//! `Result<ConvertedImage, ItemError>` per item. Emission is strictly
//! sequential and in input (or ascending page) order.

use crate::config::ConversionOptions;
use crate::convert::{classify, BatchKind};
use crate::error::{ConvertError, ItemError};
use crate::format::OutputFormat;
use crate::input::InputFile;
use crate::output::ConvertedImage;
use crate::pipeline::{assemble, render};
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of per-item conversion outcomes.
pub type ItemStream = Pin<Box<dyn Stream<Item = Result<ConvertedImage, ItemError>> + Send>>;

/// Convert a batch of files, streaming each result as it is ready.
///
/// The batch is classified exactly as [`crate::convert::convert_images`]
/// does. The PDF-input route yields one item per surviving page; the
/// images-to-PDF route yields a single item for the whole batch; the
/// standard route yields one item per input file.
///
/// # Returns
/// - `Ok(ItemStream)` — a stream of `Result<ConvertedImage, ItemError>`
/// - `Err(ConvertError)` — fatal error (PDF unreadable, assembly failed)
pub async fn convert_stream(
    files: Vec<InputFile>,
    options: ConversionOptions,
) -> Result<ItemStream, ConvertError> {
    info!("Starting streaming conversion of {} files", files.len());

    match classify(&files, &options) {
        BatchKind::PdfInput => pdf_input_stream(&files[0], &options).await,
        BatchKind::ImagesToPdf => images_to_pdf_stream(files, &options).await,
        BatchKind::Standard => Ok(standard_stream(files, options)),
    }
}

/// Standard route: each file converted lazily, one per poll, in order.
fn standard_stream(files: Vec<InputFile>, options: ConversionOptions) -> ItemStream {
    let s = stream::iter(files.into_iter()).then(move |file| {
        let options = options.clone();
        async move { crate::convert::convert_image(&file, &options).await }
    });
    Box::pin(s)
}

/// PDF-input route: pages are rendered up front (pdfium work is one
/// blocking pass over the document), then encoded lazily as the stream is
/// polled.
async fn pdf_input_stream(
    file: &InputFile,
    options: &ConversionOptions,
) -> Result<ItemStream, ConvertError> {
    let target = match (options.width, options.height) {
        (Some(w), Some(h)) => Some((w, h)),
        _ => None,
    };
    let (rendered, render_failures) =
        render::render_pdf_pages(file, &options.pages, target).await?;

    let requested = options.format.as_raster();
    let quality = options.quality;
    let base = crate::convert::pdf_base_name(&file.name);
    let original_size = file.size();

    // Interleave render failures with the surviving pages in page order.
    let mut items: Vec<(usize, Result<image::DynamicImage, ItemError>)> = rendered
        .into_iter()
        .map(|p| (p.page, Ok(p.image)))
        .chain(render_failures.into_iter().map(|e| (page_of(&e), Err(e))))
        .collect();
    items.sort_by_key(|(page, _)| *page);

    let s = stream::iter(items.into_iter()).then(move |(page_num, item)| {
        let base = base.clone();
        async move {
            let img = item?;
            let encoded = tokio::task::spawn_blocking(move || {
                crate::convert::encode_page(&img, requested, quality)
            })
            .await
            .unwrap_or_else(|e| Err(format!("encode task panicked: {e}")))
            .map_err(|detail| ItemError::PageEncode {
                page: page_num,
                detail,
            })?;

            let name = format!(
                "{base}-page{page_num}.{}",
                encoded.format.profile().extension
            );
            Ok(ConvertedImage::new(
                name,
                original_size,
                encoded.data,
                quality,
                Some(encoded.width),
                Some(encoded.height),
                encoded.format.into(),
            ))
        }
    });
    Ok(Box::pin(s))
}

fn page_of(e: &ItemError) -> usize {
    match e {
        ItemError::PageRender { page, .. } | ItemError::PageEncode { page, .. } => *page,
        _ => 0,
    }
}

/// Images-to-PDF route: the assembly runs eagerly (it is one atomic
/// output), and the stream yields its single record.
async fn images_to_pdf_stream(
    files: Vec<InputFile>,
    options: &ConversionOptions,
) -> Result<ItemStream, ConvertError> {
    let data = assemble::images_to_pdf(&files, options.progress.clone()).await?;
    let total_input: u64 = files.iter().map(InputFile::size).sum();

    let record = ConvertedImage::new(
        "converted.pdf",
        total_input,
        data,
        1.0,
        None,
        None,
        OutputFormat::Pdf,
    );
    let items: Vec<Result<ConvertedImage, ItemError>> = vec![Ok(record)];
    Ok(Box::pin(stream::iter(items)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_input(name: &str, w: u32, h: u32) -> InputFile {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([15, 90, 180])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        InputFile::from_bytes(name, buf)
    }

    #[tokio::test]
    async fn standard_stream_yields_in_input_order() {
        let files = vec![
            png_input("first.png", 8, 8),
            InputFile::from_bytes("broken.png", &b"nope"[..]),
            png_input("third.png", 8, 8),
        ];
        let options = ConversionOptions::builder()
            .format(OutputFormat::Jpeg)
            .build()
            .unwrap();

        let mut s = convert_stream(files, options).await.unwrap();
        let first = s.next().await.unwrap().unwrap();
        assert_eq!(first.original_name, "first.png");
        assert!(s.next().await.unwrap().is_err());
        let third = s.next().await.unwrap().unwrap();
        assert_eq!(third.original_name, "third.png");
        assert!(s.next().await.is_none());
    }

    #[tokio::test]
    async fn images_to_pdf_stream_yields_a_single_record() {
        let files = vec![png_input("a.png", 8, 8), png_input("b.png", 8, 8)];
        let options = ConversionOptions::builder()
            .format(OutputFormat::Pdf)
            .build()
            .unwrap();

        let mut s = convert_stream(files, options).await.unwrap();
        let record = s.next().await.unwrap().unwrap();
        assert_eq!(record.original_name, "converted.pdf");
        assert!(s.next().await.is_none());
    }
}
