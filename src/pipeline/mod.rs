//! Pipeline stages for page-stream segmentation.
//!
//! Each submodule implements exactly one concern of the engine.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. a fake page source in tests) without touching
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ source ──▶ blank ──▶ classify ──▶ span/reconcile ──▶ writer
//! (path)   (pdfium)  (pixels)  (regex+date)  (waybill runs)    (one PDF
//!                                                               per doc)
//! ```
//!
//! 1. [`input`]     — validate the user-supplied path before pdfium sees it
//! 2. [`source`]    — the narrow PDF collaborator: page count, text, pixels,
//!    page-range copies; pdfium-backed in production, scripted in tests
//! 3. [`blank`]     — brightness-coverage blank detection on rendered pages
//! 4. [`date`]      — Ukrainian long-form and numeric date parsing
//! 5. [`classify`]  — signal tables, exact-title rules, field extraction
//! 6. [`state`]     — the page ledger (exactly-once ownership) and the
//!    invoice number → date registry
//! 7. [`span`]      — forward and bounded-backward waybill span resolution
//! 8. [`reconcile`] — the single second pass over pending pages
//! 9. [`writer`]    — document file naming and atomic artifact writes

pub mod blank;
pub mod classify;
pub mod date;
pub mod input;
pub mod reconcile;
pub mod source;
pub mod span;
pub mod state;
pub mod writer;
