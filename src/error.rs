//! Error types for the pixelsift library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ConvertError`] — **Fatal to one invocation**: the conversion call
//!   cannot proceed at all (invalid options, unreadable input file, broken
//!   PDFium binding, failed PDF assembly). Returned as `Err(ConvertError)`
//!   from the top-level entry points.
//!
//! * [`ItemError`] — **Non-fatal**: a single file or PDF page failed
//!   (corrupt input, unsupported encode target) but its siblings in the
//!   batch are fine. Converted to a human-readable message and collected
//!   in [`crate::output::BatchOutcome::errors`] so callers see partial
//!   success rather than losing the whole batch to one bad file.
//!
//! The separation lets callers decide their own tolerance: abort on the
//! first item failure, log and continue, or collect everything for a
//! post-run report.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pixelsift library.
///
/// Per-item failures use [`ItemError`] and are folded into
/// [`crate::output::BatchOutcome`] rather than propagated here.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// The PDF document could not be opened (corrupt, truncated, or not a PDF).
    #[error("Failed to open PDF '{name}': {detail}")]
    PdfOpen { name: String, detail: String },

    /// Image-set-to-PDF composition failed; the whole batch output is lost.
    #[error("Failed to assemble PDF: {0}")]
    Assembly(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDFium is normally downloaded automatically on first use.\n\
If the auto-download failed, you can:\n\
  • Check your internet connection and try again.\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single batch item (one file or one PDF page).
///
/// The batch continues past every `ItemError`; the orchestrator records a
/// message per failed item instead of aborting sibling conversions.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ItemError {
    /// The source bytes could not be decoded to a raster surface.
    #[error("image decode failed: {detail}")]
    Decode { detail: String },

    /// The encoding backend produced no output for the requested format.
    #[error("encoding to {format} failed: {detail}")]
    Encode { format: String, detail: String },

    /// A single PDF page failed to rasterise.
    #[error("Failed to render page {page}: {detail}")]
    PageRender { page: usize, detail: String },

    /// A single PDF page rendered fine but could not be encoded,
    /// even after the PNG fallback.
    #[error("Failed to convert page {page} (unsupported format): {detail}")]
    PageEncode { page: usize, detail: String },
}
