//! PDF rasterisation: render selected pages to `DynamicImage` via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async
//! contexts. `tokio::task::spawn_blocking` moves the work onto the
//! blocking thread pool so the async driver never stalls on CPU-heavy
//! rendering.
//!
//! ## Page sizing
//!
//! When the caller pins both width and height, each page renders onto a
//! surface of exactly that size. Otherwise the page's natural viewport is
//! scaled by a fixed 2× render scale, which keeps raster output crisp for
//! typical on-screen page sizes without exploding memory on large pages.

use crate::config::PageSelection;
use crate::error::{ConvertError, ItemError};
use crate::input::InputFile;
use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::{debug, info, warn};

/// Magnification applied when no explicit surface size is requested.
pub const RENDER_SCALE: f32 = 2.0;

/// One successfully rasterised page.
pub struct RenderedPage {
    /// 1-based page number.
    pub page: usize,
    pub image: DynamicImage,
}

/// Rasterise the selected pages of a PDF.
///
/// Returns the rendered pages in ascending page order together with
/// per-page render failures; only document-level problems (binding,
/// malformed PDF) are fatal.
pub async fn render_pdf_pages(
    file: &InputFile,
    pages: &PageSelection,
    target: Option<(u32, u32)>,
) -> Result<(Vec<RenderedPage>, Vec<ItemError>), ConvertError> {
    let bytes = file.bytes.clone();
    let name = file.name.clone();
    let selection = pages.clone();

    tokio::task::spawn_blocking(move || render_blocking(&name, &bytes, &selection, target))
        .await
        .map_err(|e| ConvertError::Internal(format!("render task panicked: {e}")))?
}

fn render_blocking(
    name: &str,
    bytes: &[u8],
    selection: &PageSelection,
    target: Option<(u32, u32)>,
) -> Result<(Vec<RenderedPage>, Vec<ItemError>), ConvertError> {
    let pdfium = bind_engine()?;

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| ConvertError::PdfOpen {
            name: name.to_string(),
            detail: format!("{e:?}"),
        })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF '{}' loaded: {} pages", name, total_pages);

    let render_config = match target {
        Some((w, h)) => PdfRenderConfig::new().set_target_size(w as i32, h as i32),
        None => PdfRenderConfig::new().scale_page_by_factor(RENDER_SCALE),
    };

    let indices = selection.to_indices(total_pages);
    let mut rendered = Vec::with_capacity(indices.len());
    let mut failures = Vec::new();

    for idx in indices {
        let page_num = idx + 1;
        let result = pages
            .get(idx as u16)
            .and_then(|page| page.render_with_config(&render_config).map(|b| b.as_image()));

        match result {
            Ok(image) => {
                debug!(
                    "Rendered page {} → {}x{} px",
                    page_num,
                    image.width(),
                    image.height()
                );
                rendered.push(RenderedPage {
                    page: page_num,
                    image,
                });
            }
            Err(e) => {
                warn!("Failed to render page {}: {:?}", page_num, e);
                failures.push(ItemError::PageRender {
                    page: page_num,
                    detail: format!("{e:?}"),
                });
            }
        }
    }

    Ok((rendered, failures))
}

/// Report a PDF's page count without rendering anything.
pub async fn pdf_page_count(file: &InputFile) -> Result<usize, ConvertError> {
    let bytes = file.bytes.clone();
    let name = file.name.clone();

    tokio::task::spawn_blocking(move || {
        let pdfium = bind_engine()?;
        let document =
            pdfium
                .load_pdf_from_byte_slice(&bytes, None)
                .map_err(|e| ConvertError::PdfOpen {
                    name: name.clone(),
                    detail: format!("{e:?}"),
                })?;
        Ok(document.pages().len() as usize)
    })
    .await
    .map_err(|e| ConvertError::Internal(format!("page-count task panicked: {e}")))?
}

/// Bind to the pdfium engine, downloading and caching it on first use.
fn bind_engine() -> Result<Pdfium, ConvertError> {
    pdfium_auto::bind_pdfium_silent()
        .map_err(|e| ConvertError::PdfiumBindingFailed(e.to_string()))
}
