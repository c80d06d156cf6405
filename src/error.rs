//! Error types for the scansplit library.
//!
//! Three distinct error types reflect three distinct failure modes:
//!
//! * [`SegmentError`] — **Fatal**: the run cannot proceed at all (bad input
//!   file, wrong password, unusable output directory). Returned as
//!   `Err(SegmentError)` from the top-level `segment*` functions.
//!
//! * [`DocumentError`] — **Non-fatal**: one emitted document could not be
//!   materialised (page copy glitch, disk write refused) but the partition
//!   itself is sound. Stored inside [`crate::output::DocumentRecord`] so
//!   callers can inspect partial success rather than losing the whole run to
//!   one bad artifact.
//!
//! * [`SourceError`] — a failure inside the PDF collaborator
//!   ([`crate::pipeline::source::PageSource`]). Render and text failures are
//!   recovered by the engine (the page is kept accounted and classified with
//!   empty signals); copy failures surface as [`DocumentError::CopyFailed`].
//!
//! Failed date parses and empty text extractions are deliberately *not*
//! errors: the engine routes such pages to the "Other" pool and the run
//! summary records them, which is the behavior the accounting invariant
//! depends on.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the scansplit library.
///
/// Document-level failures use [`DocumentError`] and are stored in
/// [`crate::output::DocumentRecord`] rather than propagated here.
#[derive(Debug, Error)]
pub enum SegmentError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The output directory could not be created or is not writable.
    #[error("Cannot use output directory '{path}': {source}\nCheck the path and its permissions.")]
    OutputDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
scansplit needs a pdfium shared library at runtime.\n\
  • Install libpdfium and make it visible to the dynamic linker, or\n\
  • Set PDFIUM_DYNAMIC_LIB_PATH=/path/to/dir containing libpdfium.\n"
    )]
    PdfiumBinding(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single emitted document.
///
/// Stored in [`crate::output::DocumentRecord`] when materialising the
/// document's PDF fails. The pages stay assigned to the document — the
/// partition is decided by classification, not by IO — and the run continues.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum DocumentError {
    /// The collaborator failed to copy the document's page range.
    #[error("'{file_name}': page copy failed: {detail}")]
    CopyFailed { file_name: String, detail: String },

    /// The document PDF could not be written to disk.
    #[error("'{file_name}': write failed: {detail}")]
    WriteFailed { file_name: String, detail: String },
}

/// A failure reported by the PDF collaborator for one operation.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// Rasterisation failed for a page.
    #[error("page {page}: render failed: {detail}")]
    Render { page: usize, detail: String },

    /// Text extraction failed for a page.
    #[error("page {page}: text extraction failed: {detail}")]
    Text { page: usize, detail: String },

    /// Copying a page range into a new document failed.
    #[error("pages {first}-{last}: copy failed: {detail}")]
    Copy {
        first: usize,
        last: usize,
        detail: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_a_pdf_display_shows_magic() {
        let e = SegmentError::NotAPdf {
            path: PathBuf::from("scan.pdf"),
            magic: *b"PK\x03\x04",
        };
        let msg = e.to_string();
        assert!(msg.contains("scan.pdf"), "got: {msg}");
        assert!(msg.contains("80"), "magic bytes shown: {msg}");
    }

    #[test]
    fn password_required_display_hints_flag() {
        let e = SegmentError::PasswordRequired {
            path: PathBuf::from("locked.pdf"),
        };
        assert!(e.to_string().contains("--password"));
    }

    #[test]
    fn write_failed_display() {
        let e = DocumentError::WriteFailed {
            file_name: "ВН 100 2024 03 15.pdf".into(),
            detail: "No space left on device".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("ВН 100"));
        assert!(msg.contains("No space left"));
    }

    #[test]
    fn source_error_carries_page_context() {
        let e = SourceError::Text {
            page: 7,
            detail: "bad stream".into(),
        };
        assert!(e.to_string().contains("page 7"));
    }

    #[test]
    fn document_error_round_trips_through_json() {
        let e = DocumentError::CopyFailed {
            file_name: "Other_3.pdf".into(),
            detail: "range rejected".into(),
        };
        let json = serde_json::to_string(&e).unwrap();
        let back: DocumentError = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, DocumentError::CopyFailed { .. }));
    }
}
