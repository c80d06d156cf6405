//! Progress-callback trait for segmentation run events.
//!
//! Inject an [`Arc<dyn SegmentationProgressCallback>`] via
//! [`crate::config::SegmentationConfigBuilder::progress_callback`] to receive
//! events as the engine walks the page stream and emits documents.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers can
//! forward events to a Tokio broadcast channel, a WebSocket, a database record,
//! or a terminal progress bar — without the library knowing anything about how
//! the host application communicates. The trait is `Send + Sync` so the same
//! callback can be shared across concurrent runs over independent PDFs.
//!
//! # Example
//!
//! ```rust
//! use scansplit::{SegmentationProgressCallback, SegmentationConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     emitted: Arc<AtomicUsize>,
//! }
//!
//! impl SegmentationProgressCallback for CountingCallback {
//!     fn on_document_emitted(&self, file_name: &str, first_page: usize, last_page: usize) {
//!         self.emitted.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("wrote {file_name} (pages {first_page}-{last_page})");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     emitted: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = SegmentationConfig::builder()
//!     .progress_callback(counter as Arc<dyn SegmentationProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the engine as a run progresses.
///
/// Implementations must be `Send + Sync` (one callback may serve several
/// concurrent runs launched by [`crate::segment_many`]). All methods have
/// default no-op implementations so callers only override what they care
/// about.
///
/// Within a single run events arrive strictly in order — the engine is
/// sequential — but two runs sharing a callback interleave freely, so shared
/// mutable state still needs synchronisation.
pub trait SegmentationProgressCallback: Send + Sync {
    /// Called once before any page is rendered.
    fn on_run_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called after the blank filter stage has scanned every page.
    ///
    /// # Arguments
    /// * `blank` — pages flagged blank
    /// * `total` — total pages in the document
    fn on_blank_scan_complete(&self, blank: usize, total: usize) {
        let _ = (blank, total);
    }

    /// Called when a document has been classified and written.
    ///
    /// # Arguments
    /// * `file_name`  — output file name
    /// * `first_page` / `last_page` — 0-indexed inclusive page span
    fn on_document_emitted(&self, file_name: &str, first_page: usize, last_page: usize) {
        let _ = (file_name, first_page, last_page);
    }

    /// Called when a document was classified but its PDF could not be
    /// materialised (copy or write failure). The run continues.
    fn on_document_failed(&self, file_name: &str, error: &str) {
        let _ = (file_name, error);
    }

    /// Called once after finalization and the accounting check.
    ///
    /// # Arguments
    /// * `emitted` — documents written successfully
    /// * `failed`  — documents whose artifact write failed
    fn on_run_complete(&self, emitted: usize, failed: usize) {
        let _ = (emitted, failed);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl SegmentationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::SegmentationConfig`].
pub type ProgressCallback = Arc<dyn SegmentationProgressCallback>;
