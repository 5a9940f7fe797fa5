//! Pipeline stages for image and PDF conversion.
//!
//! Each submodule implements exactly one transformation step. Keeping
//! stages separate makes each independently testable and lets us swap an
//! encoding backend without touching the orchestration.
//!
//! ## Data Flow
//!
//! ```text
//! standard:       decode ──▶ resize ──▶ encode
//! pdf input:      render (pdfium) ──▶ encode (per page, PNG fallback)
//! images-to-pdf:  decode ──▶ jpeg ──▶ assemble (printpdf)
//! ```
//!
//! 1. [`decode`]   — bytes → `DynamicImage`, plus Lanczos3 resampling
//! 2. [`encode`]   — `DynamicImage` → encoded bytes per [`crate::format`]
//! 3. [`render`]   — rasterise selected PDF pages; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 4. [`assemble`] — compose an ordered image set into one PDF document

pub mod assemble;
pub mod decode;
pub mod encode;
pub mod render;
