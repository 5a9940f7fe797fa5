//! Batch orchestration: classify the batch, route it, collect outcomes.
//!
//! One invocation takes one of three routes, decided up front:
//!
//! * a single PDF input → render its pages to images (`PdfInput`);
//! * any input set with a PDF output format → compose one PDF
//!   (`ImagesToPdf`);
//! * anything else → convert each file independently (`Standard`).
//!
//! Per-item failures never abort siblings: the `Standard` and `PdfInput`
//! routes record one error message per failed file or page and keep going.
//! `ImagesToPdf` is the exception — its output is one atomic document, so
//! any constituent failure loses the whole batch with a single aggregate
//! message.

use crate::config::ConversionOptions;
use crate::dimensions;
use crate::error::{ConvertError, ItemError};
use crate::format::{OutputFormat, RasterFormat};
use crate::input::{InputFile, PDF_MIME};
use crate::output::{BatchOutcome, ConvertedImage};
use crate::pipeline::{assemble, decode, encode, render};
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// The route an invocation takes, derived per call and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BatchKind {
    /// One PDF in: extract its pages as images.
    PdfInput,
    /// PDF out: compose the input images into one document.
    ImagesToPdf,
    /// Convert each file independently.
    Standard,
}

pub(crate) fn classify(files: &[InputFile], options: &ConversionOptions) -> BatchKind {
    if files.len() == 1 && files[0].mime == PDF_MIME {
        BatchKind::PdfInput
    } else if options.format == OutputFormat::Pdf {
        BatchKind::ImagesToPdf
    } else {
        BatchKind::Standard
    }
}

/// Convert a single image: decode, resize, re-encode.
///
/// The PDF output format is batch-level (one document from many inputs) and
/// is rejected here; use [`convert_images`] for it.
pub async fn convert_image(
    file: &InputFile,
    options: &ConversionOptions,
) -> Result<ConvertedImage, ItemError> {
    let Some(raster) = options.format.as_raster() else {
        return Err(ItemError::Encode {
            format: "pdf".into(),
            detail: "PDF output is produced per batch; use convert_images".into(),
        });
    };

    let bytes = file.bytes.clone();
    let name = file.name.clone();
    let original_size = file.size();
    let (width, height, quality) = (options.width, options.height, options.quality);

    tokio::task::spawn_blocking(move || {
        let img = decode::decode_image(&bytes)?;
        let target = dimensions::resolve((img.width(), img.height()), width, height);
        let img = decode::resize_to(img, target);

        let data = encode::encode_raster(&img, raster, quality).map_err(|detail| {
            ItemError::Encode {
                format: raster.to_string(),
                detail,
            }
        })?;

        debug!("Converted '{}' → {} ({} bytes)", name, raster, data.len());
        Ok(ConvertedImage::new(
            name,
            original_size,
            data,
            quality,
            Some(target.0),
            Some(target.1),
            raster.into(),
        ))
    })
    .await
    .map_err(|e| ItemError::Encode {
        format: raster.to_string(),
        detail: format!("conversion task panicked: {e}"),
    })?
}

/// Convert a batch of files according to the options.
///
/// Classifies the batch, routes it, and returns every success, failure, and
/// warning in one [`BatchOutcome`]. Per-item failures land in
/// `outcome.errors`, not in `Err`.
pub async fn convert_images(
    files: &[InputFile],
    options: &ConversionOptions,
) -> Result<BatchOutcome, ConvertError> {
    let started = Instant::now();
    let total = files.len();

    if let Some(cb) = &options.progress {
        cb.on_batch_start(total);
    }

    let kind = classify(files, options);
    debug!("Batch of {} classified as {:?}", total, kind);

    let mut outcome = match kind {
        BatchKind::PdfInput => convert_pdf_input(&files[0], options).await,
        BatchKind::ImagesToPdf => convert_to_pdf(files, options).await,
        BatchKind::Standard => convert_standard(files, options).await,
    };

    outcome.stats.total_files = total;
    outcome.stats.converted = outcome.results.len();
    outcome.stats.failed = outcome.errors.len();
    outcome.stats.input_bytes = files.iter().map(InputFile::size).sum();
    outcome.stats.output_bytes = outcome.results.iter().map(|r| r.converted_size).sum();
    outcome.stats.duration_ms = started.elapsed().as_millis() as u64;

    if let Some(cb) = &options.progress {
        cb.on_batch_complete(total, outcome.stats.converted);
    }

    info!(
        "Batch done: {}/{} converted, {} failed, {} warnings in {} ms",
        outcome.stats.converted,
        total,
        outcome.stats.failed,
        outcome.warnings.len(),
        outcome.stats.duration_ms
    );
    Ok(outcome)
}

/// Standard route: every file through the single-image converter,
/// independently. Outcomes are folded in input order and partitioned at the
/// end, so no shared accumulator lives across an await.
async fn convert_standard(files: &[InputFile], options: &ConversionOptions) -> BatchOutcome {
    let total = files.len();
    let progress = options.progress.clone();

    let attempts: Vec<(String, Result<ConvertedImage, ItemError>)> =
        stream::iter(files.iter().enumerate())
            .then(|(i, file)| {
                let progress = progress.clone();
                async move {
                    if let Some(cb) = &progress {
                        cb.on_item_start(i + 1, total);
                    }
                    let result = convert_image(file, options).await;
                    match &result {
                        Ok(r) => {
                            if let Some(cb) = &progress {
                                cb.on_item_complete(i + 1, total, r.converted_size);
                            }
                        }
                        Err(e) => {
                            warn!("Failed to convert {}: {e}", file.name);
                            if let Some(cb) = &progress {
                                cb.on_item_error(i + 1, total, &e.to_string());
                            }
                        }
                    }
                    (file.name.clone(), result)
                }
            })
            .collect()
            .await;

    let mut outcome = BatchOutcome::default();
    for (name, result) in attempts {
        match result {
            Ok(record) => outcome.results.push(record),
            Err(e) => outcome.errors.push(format!("Failed to convert {name}: {e}")),
        }
    }
    outcome
}

/// PDF-input route: render the selected pages, then encode each rendered
/// page independently, with the PNG fallback for encode failures.
async fn convert_pdf_input(file: &InputFile, options: &ConversionOptions) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();
    let progress = options.progress.clone();

    // A render surface is only pinned when both dimensions are requested;
    // otherwise pages keep their natural aspect at the fixed render scale.
    let target = match (options.width, options.height) {
        (Some(w), Some(h)) => Some((w, h)),
        _ => None,
    };

    let (rendered, render_failures) =
        match render::render_pdf_pages(file, &options.pages, target).await {
            Ok(pair) => pair,
            Err(e) => {
                warn!("Failed to convert PDF '{}': {e}", file.name);
                outcome.errors.push("Failed to convert PDF".to_string());
                if let Some(cb) = &progress {
                    cb.on_item_error(1, 1, &e.to_string());
                }
                return outcome;
            }
        };

    let total_pages = rendered.len() + render_failures.len();
    let requested = options.format.as_raster();
    let requested_name = options.format.to_string();
    let quality = options.quality;
    let base = pdf_base_name(&file.name);
    let original_size = file.size();

    for e in &render_failures {
        if let Some(cb) = &progress {
            cb.on_item_error(page_of(e), total_pages, &e.to_string());
        }
    }

    let mut failures: Vec<ItemError> = render_failures;

    for page in rendered {
        let page_num = page.page;
        if let Some(cb) = &progress {
            cb.on_item_start(page_num, total_pages);
        }

        let encoded =
            tokio::task::spawn_blocking(move || encode_page(&page.image, requested, quality))
                .await
                .unwrap_or_else(|e| Err(format!("encode task panicked: {e}")));

        match encoded {
            Ok(page_out) => {
                if page_out.downgraded {
                    outcome.warnings.push(format!(
                        "Format {requested_name} not supported, used PNG for page {page_num}"
                    ));
                }
                if let Some(cb) = &progress {
                    cb.on_item_complete(page_num, total_pages, page_out.data.len() as u64);
                }
                let name = format!(
                    "{base}-page{page_num}.{}",
                    page_out.format.profile().extension
                );
                outcome.results.push(ConvertedImage::new(
                    name,
                    original_size,
                    page_out.data,
                    quality,
                    Some(page_out.width),
                    Some(page_out.height),
                    page_out.format.into(),
                ));
            }
            Err(detail) => {
                let e = ItemError::PageEncode {
                    page: page_num,
                    detail,
                };
                warn!("{e}");
                if let Some(cb) = &progress {
                    cb.on_item_error(page_num, total_pages, &e.to_string());
                }
                failures.push(e);
            }
        }
    }

    failures.sort_by_key(page_of);
    outcome.errors.extend(failures.iter().map(ToString::to_string));
    outcome
}

pub(crate) struct EncodedPage {
    pub(crate) data: Bytes,
    pub(crate) format: RasterFormat,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) downgraded: bool,
}

/// Encode one rendered page, retrying once as PNG when the requested
/// format fails (or was never a raster format at all).
pub(crate) fn encode_page(
    img: &image::DynamicImage,
    requested: Option<RasterFormat>,
    quality: f32,
) -> Result<EncodedPage, String> {
    let (width, height) = (img.width(), img.height());
    let done = |data: Bytes, format: RasterFormat, downgraded: bool| EncodedPage {
        data,
        format,
        width,
        height,
        downgraded,
    };

    let Some(format) = requested else {
        // PDF-to-PDF: pages come back as PNG, flagged as a downgrade.
        let data = encode::encode_raster(img, RasterFormat::Png, quality)?;
        return Ok(done(data, RasterFormat::Png, true));
    };

    match encode::encode_raster(img, format, quality) {
        Ok(data) => Ok(done(data, format, false)),
        Err(first) => match format.fallback() {
            Some(fb) => {
                let data = encode::encode_raster(img, fb, quality).map_err(|_| first)?;
                Ok(done(data, fb, true))
            }
            None => Err(first),
        },
    }
}

fn page_of(e: &ItemError) -> usize {
    match e {
        ItemError::PageRender { page, .. } | ItemError::PageEncode { page, .. } => *page,
        _ => 0,
    }
}

/// `scan.pdf` → `scan`; any other name is kept intact.
pub(crate) fn pdf_base_name(name: &str) -> String {
    name.strip_suffix(".pdf")
        .or_else(|| name.strip_suffix(".PDF"))
        .unwrap_or(name)
        .to_string()
}

/// Images-to-PDF route: one atomic output named `converted.pdf`.
async fn convert_to_pdf(files: &[InputFile], options: &ConversionOptions) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();

    match assemble::images_to_pdf(files, options.progress.clone()).await {
        Ok(data) => {
            let total_input: u64 = files.iter().map(InputFile::size).sum();
            outcome.results.push(ConvertedImage::new(
                "converted.pdf",
                total_input,
                data,
                1.0,
                None,
                None,
                OutputFormat::Pdf,
            ));
        }
        Err(e) => {
            warn!("Failed to convert images to PDF: {e}");
            outcome
                .errors
                .push("Failed to convert images to PDF".to_string());
            if let Some(cb) = &options.progress {
                cb.on_item_error(1, 1, &e.to_string());
            }
        }
    }
    outcome
}

/// Report a PDF's page count without rendering anything.
pub async fn pdf_page_count(file: &InputFile) -> Result<usize, ConvertError> {
    render::pdf_page_count(file).await
}

/// Write a record's bytes to `<dir>/<download_name()>`.
///
/// The write goes to a `.tmp` sibling first and is renamed into place, so a
/// crash mid-write never leaves a truncated file under the final name.
pub async fn write_converted(
    record: &ConvertedImage,
    dir: &Path,
) -> Result<PathBuf, ConvertError> {
    let path = dir.join(record.download_name());
    let tmp = path.with_file_name(format!("{}.tmp", record.download_name()));

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| ConvertError::OutputWriteFailed {
            path: dir.to_path_buf(),
            source,
        })?;
    tokio::fs::write(&tmp, &record.data)
        .await
        .map_err(|source| ConvertError::OutputWriteFailed {
            path: tmp.clone(),
            source,
        })?;
    tokio::fs::rename(&tmp, &path)
        .await
        .map_err(|source| ConvertError::OutputWriteFailed {
            path: path.clone(),
            source,
        })?;

    debug!("Wrote {} ({} bytes)", path.display(), record.converted_size);
    Ok(path)
}
