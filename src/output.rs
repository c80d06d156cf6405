//! Output types: the partition a run produces plus its accounting summary.
//!
//! Everything here is `serde`-serializable so the CLI's `--json` mode and any
//! host application can persist a run verbatim. Page indices are 0-based and
//! inclusive throughout; output *file names* are the only place the
//! 1-based/human view leaks in (and only via dates and sequence numbers).

use crate::error::DocumentError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::PathBuf;

/// One classified document carved out of the page stream.
///
/// The variants mirror what the engine can recognise: single-page
/// expenditure invoices, contiguous multi-page waybills, and residual
/// singleton pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Document {
    /// A single-page invoice with its extracted number and parsed date.
    Invoice {
        number: String,
        date: Option<NaiveDate>,
        page: usize,
    },
    /// A waybill spanning a contiguous inclusive page range. The date, when
    /// present, belongs to the invoice the waybill references — looked up in
    /// the registry at emission time.
    Waybill {
        number: String,
        referenced_invoice_date: Option<NaiveDate>,
        first_page: usize,
        last_page: usize,
    },
    /// A residual page emitted as its own document, numbered in page order
    /// starting at 1.
    Other { sequence: u32, page: usize },
}

impl Document {
    /// The inclusive page span this document owns.
    pub fn pages(&self) -> RangeInclusive<usize> {
        match *self {
            Document::Invoice { page, .. } | Document::Other { page, .. } => page..=page,
            Document::Waybill {
                first_page,
                last_page,
                ..
            } => first_page..=last_page,
        }
    }

    /// Number of pages this document owns.
    pub fn page_count(&self) -> usize {
        let span = self.pages();
        span.end() - span.start() + 1
    }

    /// True for the `Other` variant.
    pub fn is_other(&self) -> bool {
        matches!(self, Document::Other { .. })
    }
}

/// A [`Document`] together with the outcome of materialising it on disk.
///
/// `path` is `Some` on a successful write; `error` carries the copy/write
/// failure otherwise. Exactly one of the two is populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub document: Document,
    /// Output file name (without directory), e.g. `ВН 100 2024 03 15.pdf`.
    pub file_name: String,
    /// Full path of the written artifact, when the write succeeded.
    pub path: Option<PathBuf>,
    /// Copy or write failure for this document, when it did not.
    pub error: Option<DocumentError>,
}

impl DocumentRecord {
    /// True when the document's PDF landed on disk.
    pub fn is_written(&self) -> bool {
        self.error.is_none()
    }
}

/// Accounting summary for one run.
///
/// The engine's core guarantee is `blank_pages + consumed + unresolved_pages
/// == total_pages`, where consumed is the sum of all emitted documents' span
/// sizes. `integrity_ok` reports whether that held, together with the
/// ownership checks (no page in two documents, no page lost);
/// `integrity_detail` explains a failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStats {
    /// Total pages in the input PDF.
    pub total_pages: usize,
    /// Pages filtered as blank and not claimed by any document. A blank page
    /// swallowed inside a waybill span counts toward that waybill instead.
    pub blank_pages: usize,
    /// Documents whose PDF was written successfully.
    pub documents_emitted: usize,
    /// Documents classified but whose copy/write failed.
    pub documents_failed: usize,
    /// Emitted invoices (written or failed).
    pub invoices: usize,
    /// Emitted waybills (written or failed).
    pub waybills: usize,
    /// Emitted residual singletons (written or failed).
    pub others: usize,
    /// Non-blank pages left unowned at the end of the run. Zero unless the
    /// accounting is broken — finalization sweeps every pending page.
    pub unresolved_pages: usize,
    /// Result of the end-of-run accounting check.
    pub integrity_ok: bool,
    /// Human-readable explanation when `integrity_ok` is false.
    pub integrity_detail: Option<String>,
    /// Wall-clock time of the blank filter stage.
    pub filter_duration_ms: u64,
    /// Wall-clock time of classification, reconciliation, and emission.
    pub classify_duration_ms: u64,
    /// Wall-clock time of the whole run.
    pub total_duration_ms: u64,
}

/// Complete result of one segmentation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentationOutput {
    /// Every document the run emitted, in emission order.
    pub documents: Vec<DocumentRecord>,
    /// The accounting summary.
    pub stats: RunStats,
}

impl SegmentationOutput {
    /// Records of documents that were written successfully.
    pub fn written(&self) -> impl Iterator<Item = &DocumentRecord> {
        self.documents.iter().filter(|r| r.is_written())
    }

    /// Records of documents whose artifact failed to materialise.
    pub fn failed(&self) -> impl Iterator<Item = &DocumentRecord> {
        self.documents.iter().filter(|r| !r.is_written())
    }
}

/// Lightweight document facts returned by [`crate::inspect`] without running
/// segmentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfInfo {
    pub page_count: usize,
    /// PDF specification version as reported by pdfium, e.g. "Pdf17".
    pub pdf_version: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub encrypted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn waybill() -> Document {
        Document::Waybill {
            number: "456".into(),
            referenced_invoice_date: NaiveDate::from_ymd_opt(2024, 3, 15),
            first_page: 3,
            last_page: 4,
        }
    }

    #[test]
    fn span_arithmetic() {
        assert_eq!(waybill().pages(), 3..=4);
        assert_eq!(waybill().page_count(), 2);
        let inv = Document::Invoice {
            number: "100".into(),
            date: None,
            page: 7,
        };
        assert_eq!(inv.pages(), 7..=7);
        assert_eq!(inv.page_count(), 1);
    }

    #[test]
    fn record_written_flag_tracks_error() {
        let mut rec = DocumentRecord {
            document: waybill(),
            file_name: "ТТН 456 2024 03 15.pdf".into(),
            path: Some(PathBuf::from("out/ТТН 456 2024 03 15.pdf")),
            error: None,
        };
        assert!(rec.is_written());
        rec.path = None;
        rec.error = Some(DocumentError::WriteFailed {
            file_name: rec.file_name.clone(),
            detail: "denied".into(),
        });
        assert!(!rec.is_written());
    }

    #[test]
    fn document_serialises_with_kind_tag() {
        let json = serde_json::to_value(waybill()).unwrap();
        assert_eq!(json["kind"], "waybill");
        assert_eq!(json["first_page"], 3);
        assert_eq!(json["referenced_invoice_date"], "2024-03-15");
    }

    #[test]
    fn output_iterators_partition_records() {
        let ok = DocumentRecord {
            document: Document::Other { sequence: 1, page: 0 },
            file_name: "Other_1.pdf".into(),
            path: Some(PathBuf::from("Other_1.pdf")),
            error: None,
        };
        let bad = DocumentRecord {
            document: Document::Other { sequence: 2, page: 1 },
            file_name: "Other_2.pdf".into(),
            path: None,
            error: Some(DocumentError::CopyFailed {
                file_name: "Other_2.pdf".into(),
                detail: "boom".into(),
            }),
        };
        let out = SegmentationOutput {
            documents: vec![ok, bad],
            stats: RunStats {
                total_pages: 2,
                blank_pages: 0,
                documents_emitted: 1,
                documents_failed: 1,
                invoices: 0,
                waybills: 0,
                others: 2,
                unresolved_pages: 0,
                integrity_ok: true,
                integrity_detail: None,
                filter_duration_ms: 0,
                classify_duration_ms: 0,
                total_duration_ms: 0,
            },
        };
        assert_eq!(out.written().count(), 1);
        assert_eq!(out.failed().count(), 1);
    }
}
