//! The format lookup table: one place for every format-specific fact.
//!
//! Each raster format owns a const [`FormatProfile`] (MIME identifier, file
//! extension, lossless flag, default quality) consulted everywhere
//! format-specific behaviour is needed — the converters never branch on
//! format names themselves. Identifiers outside the closed set fail fast at
//! parse time; the only sanctioned escape hatch is the explicit PNG
//! fallback the PDF-page path uses for encode failures
//! (see [`RasterFormat::fallback`]).

use crate::error::ConvertError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical output format of a conversion, including the PDF target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    Webp,
    Avif,
    Pdf,
}

impl OutputFormat {
    /// Parse a user-supplied format name. `jpg` is accepted as an alias.
    pub fn parse(s: &str) -> Result<Self, ConvertError> {
        match s.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::Webp),
            "avif" => Ok(OutputFormat::Avif),
            "pdf" => Ok(OutputFormat::Pdf),
            other => Err(ConvertError::InvalidOptions(format!(
                "unknown output format '{other}' (expected jpeg, png, webp, avif, or pdf)"
            ))),
        }
    }

    /// The raster subset of this format, or `None` for PDF.
    pub fn as_raster(self) -> Option<RasterFormat> {
        match self {
            OutputFormat::Jpeg => Some(RasterFormat::Jpeg),
            OutputFormat::Png => Some(RasterFormat::Png),
            OutputFormat::Webp => Some(RasterFormat::Webp),
            OutputFormat::Avif => Some(RasterFormat::Avif),
            OutputFormat::Pdf => None,
        }
    }

    /// File extension used in download names (`jpeg → jpg`).
    pub fn extension(self) -> &'static str {
        match self.as_raster() {
            Some(r) => r.profile().extension,
            None => "pdf",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
            OutputFormat::Avif => "avif",
            OutputFormat::Pdf => "pdf",
        };
        f.write_str(s)
    }
}

/// The closed set of raster encode targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterFormat {
    Jpeg,
    Png,
    Webp,
    Avif,
}

/// Encoding parameters for one raster format.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormatProfile {
    /// MIME identifier (`image/jpeg`, …).
    pub mime: &'static str,
    /// File extension without the dot.
    pub extension: &'static str,
    /// Lossless formats ignore the quality parameter entirely.
    pub lossless: bool,
    /// Quality used when the caller does not specify one, in (0, 1].
    pub default_quality: f32,
}

const JPEG_PROFILE: FormatProfile = FormatProfile {
    mime: "image/jpeg",
    extension: "jpg",
    lossless: false,
    default_quality: 0.9,
};

const PNG_PROFILE: FormatProfile = FormatProfile {
    mime: "image/png",
    extension: "png",
    lossless: true,
    default_quality: 1.0,
};

const WEBP_PROFILE: FormatProfile = FormatProfile {
    mime: "image/webp",
    extension: "webp",
    lossless: false,
    default_quality: 0.9,
};

const AVIF_PROFILE: FormatProfile = FormatProfile {
    mime: "image/avif",
    extension: "avif",
    lossless: false,
    default_quality: 0.9,
};

impl RasterFormat {
    /// The const profile for this format.
    pub const fn profile(self) -> &'static FormatProfile {
        match self {
            RasterFormat::Jpeg => &JPEG_PROFILE,
            RasterFormat::Png => &PNG_PROFILE,
            RasterFormat::Webp => &WEBP_PROFILE,
            RasterFormat::Avif => &AVIF_PROFILE,
        }
    }

    /// The format a failed encode may be retried as.
    ///
    /// Policy, not accident: every lossy format downgrades to PNG once;
    /// PNG itself has nowhere to fall back to.
    pub fn fallback(self) -> Option<RasterFormat> {
        match self {
            RasterFormat::Png => None,
            _ => Some(RasterFormat::Png),
        }
    }
}

impl From<RasterFormat> for OutputFormat {
    fn from(r: RasterFormat) -> Self {
        match r {
            RasterFormat::Jpeg => OutputFormat::Jpeg,
            RasterFormat::Png => OutputFormat::Png,
            RasterFormat::Webp => OutputFormat::Webp,
            RasterFormat::Avif => OutputFormat::Avif,
        }
    }
}

impl fmt::Display for RasterFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        OutputFormat::from(*self).fmt(f)
    }
}
