//! Progress-callback trait for per-item conversion events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::ConversionOptionsBuilder::progress`] to receive
//! real-time events as the pipeline processes each batch item. An "item"
//! is a file in the standard and images-to-PDF paths, and a page in the
//! PDF-input path.
//!
//! # Why callbacks instead of channels?
//!
//! The callback is the least-invasive integration point: callers can
//! forward events to a channel, a database record, or a terminal progress
//! bar without the library knowing how the host application communicates.
//! The trait is `Send + Sync` so it may be invoked from blocking worker
//! threads (`spawn_blocking`) as well as the async driver.

use std::sync::Arc;

/// Called by the conversion pipeline as it processes each batch item.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. `item` is 1-based.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before any item is processed.
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// Called just before an item's conversion begins.
    fn on_item_start(&self, item: usize, total: usize) {
        let _ = (item, total);
    }

    /// Called when an item converts successfully; `bytes` is the encoded
    /// output size.
    fn on_item_complete(&self, item: usize, total: usize, bytes: u64) {
        let _ = (item, total, bytes);
    }

    /// Called when an item fails permanently (after any fallback retry).
    fn on_item_error(&self, item: usize, total: usize, error: &str) {
        let _ = (item, total, error);
    }

    /// Called once after every item has been attempted.
    fn on_batch_complete(&self, total: usize, succeeded: usize) {
        let _ = (total, succeeded);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in
/// [`crate::config::ConversionOptions`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
