//! # scansplit
//!
//! Split scanned multi-document PDFs into per-document files — expenditure
//! invoices (видаткова накладна, "ВН"), multi-page waybills
//! (товарно-транспортна накладна, "ТТН"), and residual pages — with exact
//! page accounting.
//!
//! ## Why this crate?
//!
//! Batch scanners produce one long PDF per tray: invoices, the waybills that
//! accompany them, separator sheets, and whatever else was in the stack, all
//! concatenated. Filing software wants one file per document with a name it
//! can index. scansplit reads each page's text layer, classifies it with the
//! vocabulary the source documents actually print, resolves multi-page
//! waybill spans in both directions, and writes one PDF per document — and
//! then proves that every input page went exactly one place.
//!
//! ## Pipeline Overview
//!
//! ```text
//! scanned bundle (PDF)
//!  │
//!  ├─ 1. Filter     rasterise via pdfium, drop visually blank pages
//!  ├─ 2. Classify   forward pass: exact titles, then keyword thresholds
//!  │                ├─ invoice  → register number→date, emit single page
//!  │                ├─ waybill  → resolve span forward (box marker closes it)
//!  │                └─ unknown  → pending queue
//!  ├─ 3. Reconcile  one rescue pass: stray tails search backward for their
//!  │                title sheet; misread invoices get a second parse
//!  ├─ 4. Finalize   every page still pending → singleton Other_N.pdf
//!  └─ 5. Account    blank + consumed + pending == total, or the report says why not
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scansplit::{segment, SegmentationConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SegmentationConfig::builder()
//!         .output_dir("out")
//!         .build()?;
//!     let output = segment("scans/batch_0312.pdf", &config).await?;
//!     for doc in output.written() {
//!         println!("{}", doc.file_name);
//!     }
//!     eprintln!(
//!         "{} documents, {} blank pages, accounting ok: {}",
//!         output.stats.documents_emitted,
//!         output.stats.blank_pages,
//!         output.stats.integrity_ok
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `scansplit` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! scansplit = { version = "0.4", default-features = false }
//! ```
//!
//! ## Runtime requirement
//!
//! scansplit binds a pdfium shared library at runtime (system path, or the
//! directory named by `PDFIUM_DYNAMIC_LIB_PATH`). Everything else — the
//! classifier, span resolution, accounting — is pure Rust and runs against
//! any [`pipeline::source::PageSource`] implementation.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod engine;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod segment;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{SegmentationConfig, SegmentationConfigBuilder};
pub use engine::SegmentationEngine;
pub use error::{DocumentError, SegmentError, SourceError};
pub use output::{Document, DocumentRecord, PdfInfo, RunStats, SegmentationOutput};
pub use progress::{NoopProgressCallback, ProgressCallback, SegmentationProgressCallback};
pub use segment::{inspect, segment, segment_from_bytes, segment_many, segment_sync};
pub use stream::{segment_stream, RunStream};
