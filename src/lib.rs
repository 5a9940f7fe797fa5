//! # pixelsift
//!
//! Convert images and PDFs between formats, in batches, without losing the
//! whole batch to one bad file.
//!
//! ## Why this crate?
//!
//! Converting a folder of mixed assets is never one operation: a lone PDF
//! wants its pages extracted as images, a set of photos with a PDF target
//! wants a single composed document, and everything else is an independent
//! per-file re-encode. This crate makes that routing decision once per
//! batch and isolates every per-item failure, so a corrupt file costs you
//! one error message rather than the run.
//!
//! ## Pipeline Overview
//!
//! ```text
//! files + options
//!  │
//!  ├─ classify   one PDF in → PdfInput · PDF out → ImagesToPdf · else Standard
//!  │
//!  ├─ Standard       decode → resize (Lanczos3) → encode (mozjpeg/png/webp/ravif)
//!  ├─ PdfInput       render pages via pdfium → encode each (PNG fallback)
//!  └─ ImagesToPdf    decode → JPEG-embed → compose one PDF via printpdf
//!  │
//!  └─ BatchOutcome   results + errors + warnings + stats
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pixelsift::{convert_images, ConversionOptions, InputFile, OutputFormat};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let files = vec![
//!         InputFile::from_path("photo.png").await?,
//!         InputFile::from_path("scan.tiff").await?,
//!     ];
//!     let options = ConversionOptions::builder()
//!         .format(OutputFormat::Webp)
//!         .quality(0.8)
//!         .build()?;
//!
//!     let outcome = convert_images(&files, &options).await?;
//!     for record in &outcome.results {
//!         println!("{} → {} ({} bytes)",
//!             record.original_name, record.download_name(), record.converted_size);
//!     }
//!     for error in &outcome.errors {
//!         eprintln!("{error}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pixelsift` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! pixelsift = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod dimensions;
pub mod error;
pub mod format;
pub mod input;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionOptions, ConversionOptionsBuilder, PageSelection};
pub use convert::{convert_image, convert_images, pdf_page_count, write_converted};
pub use error::{ConvertError, ItemError};
pub use format::{FormatProfile, OutputFormat, RasterFormat};
pub use input::InputFile;
pub use output::{BatchOutcome, BatchStats, ConvertedImage};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::{convert_stream, ItemStream};
