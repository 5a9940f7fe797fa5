//! Output records and batch aggregates.
//!
//! A [`ConvertedImage`] is created once by a converter on a successful
//! encode and never mutated. Its encoded bytes live in a [`Bytes`] buffer
//! owned by the record, so the storage is released automatically when the
//! record is dropped from the owning collection — there is no manual
//! "release the reference" discipline for callers to get wrong.

use crate::format::OutputFormat;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// One successful conversion result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertedImage {
    /// Unique record identifier (UUID v4).
    pub id: String,
    /// Name of the source file (for PDF pages, `<base>-page<N>.<ext>`).
    pub original_name: String,
    /// Source size in bytes.
    pub original_size: u64,
    /// Encoded output size in bytes.
    pub converted_size: u64,
    /// The encoded output. Skipped in serialised summaries; freed on drop.
    #[serde(skip)]
    pub data: Bytes,
    /// Creation time, Unix epoch milliseconds.
    pub timestamp: u64,
    /// Quality the encode ran at.
    pub quality: f32,
    /// Output width in pixels, when the output is a raster image.
    pub width: Option<u32>,
    /// Output height in pixels.
    pub height: Option<u32>,
    /// The output format actually used (PNG after a fallback downgrade).
    pub format: OutputFormat,
}

impl ConvertedImage {
    pub(crate) fn new(
        original_name: impl Into<String>,
        original_size: u64,
        data: Bytes,
        quality: f32,
        width: Option<u32>,
        height: Option<u32>,
        format: OutputFormat,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            original_name: original_name.into(),
            original_size,
            converted_size: data.len() as u64,
            data,
            timestamp: epoch_millis(),
            quality,
            width,
            height,
            format,
        }
    }

    /// Derive an export filename: the original name with its extension
    /// replaced by the output format's (`photo.png` → `photo.jpg`).
    ///
    /// Path separators are stripped so a hostile original name cannot
    /// escape the output directory; a name with no usable stem falls back
    /// to `converted`.
    pub fn download_name(&self) -> String {
        let base = self
            .original_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.original_name);
        let stem = match base.rsplit_once('.') {
            Some((stem, _ext)) if !stem.is_empty() => stem,
            Some(_) => "converted",
            None if !base.is_empty() => base,
            None => "converted",
        };
        format!("{stem}.{}", self.format.extension())
    }
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Aggregate counters for one batch invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchStats {
    /// Files passed to the invocation.
    pub total_files: usize,
    /// Result records produced.
    pub converted: usize,
    /// Error-list entries produced.
    pub failed: usize,
    /// Sum of input sizes in bytes.
    pub input_bytes: u64,
    /// Sum of output sizes in bytes.
    pub output_bytes: u64,
    /// Wall-clock duration of the invocation.
    pub duration_ms: u64,
}

/// The result of one batch invocation: successes, failures, and warnings,
/// all surfaced — nothing is silently swallowed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// Fully-successful conversions, in input (or ascending page) order.
    pub results: Vec<ConvertedImage>,
    /// One human-readable message per input (or page) that produced no
    /// result.
    pub errors: Vec<String>,
    /// Non-fatal notices, e.g. the PNG format-downgrade warning.
    pub warnings: Vec<String>,
    /// Aggregate counters.
    pub stats: BatchStats,
}
