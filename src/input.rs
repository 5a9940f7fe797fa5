//! Input files: a name, a MIME type, and owned bytes.
//!
//! The conversion pipeline works entirely on in-memory buffers, so an
//! [`InputFile`] is just `(name, mime, Bytes)`. The MIME type drives batch
//! classification (one PDF in → the page-extraction path), so construction
//! guesses it from the file extension and double-checks with a `%PDF`
//! magic-byte sniff — a PDF renamed to `.png` is still routed correctly.

use crate::error::ConvertError;
use bytes::Bytes;
use std::path::Path;
use tracing::debug;

/// MIME type of PDF inputs; the orchestrator keys its classification on it.
pub const PDF_MIME: &str = "application/pdf";

/// An in-memory input file.
#[derive(Debug, Clone)]
pub struct InputFile {
    /// Display name, usually the original filename.
    pub name: String,
    /// MIME type, guessed from the extension unless overridden.
    pub mime: String,
    /// The raw file contents.
    pub bytes: Bytes,
}

impl InputFile {
    /// Create an input from a name and a byte buffer.
    ///
    /// The MIME type is guessed from the name's extension; a `%PDF` magic
    /// prefix overrides the guess.
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let name = name.into();
        let bytes = bytes.into();
        let mime = if bytes.starts_with(b"%PDF") {
            PDF_MIME.to_string()
        } else {
            guess_mime(&name).to_string()
        };
        Self { name, mime, bytes }
    }

    /// Create an input with an explicit MIME type, bypassing the guess.
    pub fn with_mime(
        name: impl Into<String>,
        mime: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }

    /// Read an input file from disk.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ConvertError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConvertError::FileNotFound {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::PermissionDenied => ConvertError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => ConvertError::Internal(format!("read {}: {e}", path.display())),
        })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        debug!("Loaded input: {} ({} bytes)", name, bytes.len());
        Ok(Self::from_bytes(name, bytes))
    }

    /// Byte length of the file.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Whether this file will take the PDF-input path.
    pub fn is_pdf(&self) -> bool {
        self.mime == PDF_MIME
    }
}

/// Guess a MIME type from a filename extension.
fn guess_mime(name: &str) -> &'static str {
    let ext = name.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "pdf" => PDF_MIME,
        _ => "application/octet-stream",
    }
}
