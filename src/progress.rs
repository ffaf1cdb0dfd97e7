//! Progress-callback trait for per-page annotation events.
//!
//! Inject an [`Arc<dyn AnnotateProgressCallback>`] via
//! [`crate::config::AnnotateConfigBuilder::progress_callback`] to receive
//! events as the pipeline works through each page.
//!
//! # Example
//!
//! ```rust
//! use ocr_translate_pdf::{AnnotateProgressCallback, AnnotateConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct BlockCounter {
//!     blocks: AtomicUsize,
//! }
//!
//! impl AnnotateProgressCallback for BlockCounter {
//!     fn on_page_complete(&self, page_num: usize, total_pages: usize, blocks: usize) {
//!         self.blocks.fetch_add(blocks, Ordering::SeqCst);
//!         eprintln!("Page {}/{}: {} blocks", page_num, total_pages, blocks);
//!     }
//! }
//!
//! let counter = Arc::new(BlockCounter { blocks: AtomicUsize::new(0) });
//!
//! let config = AnnotateConfig::builder()
//!     .progress_callback(counter as Arc<dyn AnnotateProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the annotation pipeline as it processes each page.
///
/// Implementations must be `Send + Sync`: with `concurrency > 1` the page
/// events may arrive from different tasks. All methods default to no-ops.
pub trait AnnotateProgressCallback: Send + Sync {
    /// Called once after rasterisation, before any page is OCR'd.
    fn on_run_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called before OCR starts on a page (1-indexed).
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page has been annotated.
    ///
    /// `blocks` is the number of text blocks found on the page.
    fn on_page_complete(&self, page_num: usize, total_pages: usize, blocks: usize) {
        let _ = (page_num, total_pages, blocks);
    }

    /// Called when a block's translation failed.
    ///
    /// `block` is the 0-indexed position of the block on its page.
    fn on_block_error(&self, page_num: usize, block: usize, error: &str) {
        let _ = (page_num, block, error);
    }

    /// Called once after the output document has been assembled.
    fn on_run_complete(&self, total_pages: usize, failed_blocks: usize) {
        let _ = (total_pages, failed_blocks);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AnnotateProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AnnotateConfig`].
pub type ProgressCallback = Arc<dyn AnnotateProgressCallback>;
