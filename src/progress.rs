//! Progress-callback trait for pipeline events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to observe
//! the pipeline as it renders, annotates and submits a document.
//!
//! # Example
//!
//! ```rust
//! use edgequake_troubleshoot::{ExtractionConfig, ExtractionProgressCallback};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl ExtractionProgressCallback for Printer {
//!     fn on_page_annotated(&self, page: u32, blocks: usize, total_pages: usize) {
//!         eprintln!("page {page}: {blocks} blocks ({total_pages} pages)");
//!     }
//! }
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(Arc::new(Printer) as Arc<dyn ExtractionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the extraction pipeline at each stage boundary.
///
/// All methods have default no-op implementations. With `concurrency > 1`,
/// `on_page_annotated` may be called from several threads and out of page
/// order, so implementations must be `Send + Sync`.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once after rasterisation with the number of rendered pages.
    fn on_render_complete(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called after a page has been OCR-annotated and both views encoded.
    ///
    /// # Arguments
    /// * `page`        — 1-indexed page number
    /// * `blocks`      — block-level regions drawn on the annotated view
    /// * `total_pages` — rendered pages in this request
    fn on_page_annotated(&self, page: u32, blocks: usize, total_pages: usize) {
        let _ = (page, blocks, total_pages);
    }

    /// Called just before the extraction request is sent.
    fn on_extraction_start(&self, payload_entries: usize) {
        let _ = payload_entries;
    }

    /// Called when the extraction request has finished, successfully or not.
    fn on_extraction_complete(&self, success: bool) {
        let _ = success;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;
