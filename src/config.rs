//! Conversion options, built via a validating builder.
//!
//! All conversion behaviour is controlled through [`ConversionOptions`],
//! built via its [`ConversionOptionsBuilder`]. Keeping every knob in one
//! struct makes it trivial to share options across calls and diff two runs
//! to understand why their outputs differ.

use crate::error::ConvertError;
use crate::format::OutputFormat;
use crate::progress::ProgressCallback;
use std::fmt;

/// Options for one conversion invocation.
///
/// Built via [`ConversionOptions::builder()`] or using
/// [`ConversionOptions::default()`].
///
/// # Example
/// ```rust
/// use pixelsift::{ConversionOptions, OutputFormat};
///
/// let options = ConversionOptions::builder()
///     .format(OutputFormat::Webp)
///     .quality(0.8)
///     .width(1200)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionOptions {
    /// Encode quality in (0, 1]. Default: 0.9.
    ///
    /// Ignored by lossless formats (PNG) and by the images-to-PDF
    /// assembler, which embeds pages at its own fixed internal quality.
    pub quality: f32,

    /// Target output format. Default: JPEG.
    pub format: OutputFormat,

    /// Target width in pixels. When only one of width/height is set, the
    /// other is derived from the source aspect ratio.
    pub width: Option<u32>,

    /// Target height in pixels.
    pub height: Option<u32>,

    /// Page selection for the PDF-input path. Default: all pages.
    /// Ignored outside that path.
    pub pages: PageSelection,

    /// Optional per-item progress observer.
    pub progress: Option<ProgressCallback>,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            quality: 0.9,
            format: OutputFormat::Jpeg,
            width: None,
            height: None,
            pages: PageSelection::default(),
            progress: None,
        }
    }
}

impl fmt::Debug for ConversionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionOptions")
            .field("quality", &self.quality)
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pages", &self.pages)
            .field(
                "progress",
                &self.progress.as_ref().map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionOptions {
    /// Create a new builder for `ConversionOptions`.
    pub fn builder() -> ConversionOptionsBuilder {
        ConversionOptionsBuilder {
            options: Self::default(),
        }
    }
}

/// Builder for [`ConversionOptions`].
#[derive(Debug)]
pub struct ConversionOptionsBuilder {
    options: ConversionOptions,
}

impl ConversionOptionsBuilder {
    /// Encode quality in (0, 1]. Out-of-range values are clamped.
    pub fn quality(mut self, q: f32) -> Self {
        self.options.quality = if q.is_finite() { q.clamp(0.01, 1.0) } else { 0.9 };
        self
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.options.format = format;
        self
    }

    pub fn width(mut self, px: u32) -> Self {
        self.options.width = Some(px);
        self
    }

    pub fn height(mut self, px: u32) -> Self {
        self.options.height = Some(px);
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.options.pages = selection;
        self
    }

    pub fn progress(mut self, cb: ProgressCallback) -> Self {
        self.options.progress = Some(cb);
        self
    }

    /// Build the options, validating constraints.
    pub fn build(self) -> Result<ConversionOptions, ConvertError> {
        let o = &self.options;
        if o.quality <= 0.0 || o.quality > 1.0 {
            return Err(ConvertError::InvalidOptions(format!(
                "quality must be in (0, 1], got {}",
                o.quality
            )));
        }
        if o.width == Some(0) {
            return Err(ConvertError::InvalidOptions("width must be positive".into()));
        }
        if o.height == Some(0) {
            return Err(ConvertError::InvalidOptions(
                "height must be positive".into(),
            ));
        }
        Ok(self.options)
    }
}

/// Specifies which pages of a PDF input to convert.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub enum PageSelection {
    /// Convert all pages (default).
    #[default]
    All,
    /// Convert a single page (1-indexed).
    Single(usize),
    /// Convert a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Convert specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed
    /// page numbers. Out-of-range entries are dropped.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}
