//! Artifact writing: output naming and atomic per-document PDF writes.
//!
//! ## Why temp + rename?
//!
//! Output directories of this tool get watched by downstream import jobs. A
//! rename is atomic on the same filesystem, so a consumer never observes a
//! half-written PDF under a final name — either the file is absent or it is
//! complete.

use crate::error::{DocumentError, SegmentError};
use chrono::{Datelike, NaiveDate};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Invoice output name: `<tag> <number> <yyyy> <mm> <dd>.pdf`.
pub fn invoice_file_name(tag: &str, number: &str, date: NaiveDate) -> String {
    format!(
        "{tag} {number} {:04} {:02} {:02}.pdf",
        date.year(),
        date.month(),
        date.day()
    )
}

/// Waybill output name, stamped with the referenced invoice's date when the
/// registry lookup hit: `<tag> <number> <yyyy> <mm> <dd>.pdf`, else
/// `<tag> <number>.pdf`.
pub fn waybill_file_name(tag: &str, number: &str, date: Option<NaiveDate>) -> String {
    match date {
        Some(d) => format!(
            "{tag} {number} {:04} {:02} {:02}.pdf",
            d.year(),
            d.month(),
            d.day()
        ),
        None => format!("{tag} {number}.pdf"),
    }
}

/// Residual singleton output name: `Other_<sequence>.pdf`, 1-based.
pub fn other_file_name(sequence: u32) -> String {
    format!("Other_{sequence}.pdf")
}

/// Writes document PDFs into the run's output directory.
#[derive(Debug)]
pub struct ArtifactWriter {
    dir: PathBuf,
}

impl ArtifactWriter {
    /// Create the output directory (and parents) up front; an unusable
    /// directory fails the run before any page is touched.
    pub fn new(dir: &Path) -> Result<Self, SegmentError> {
        std::fs::create_dir_all(dir).map_err(|e| SegmentError::OutputDirFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` under `file_name`, via `<file_name>.tmp` + rename.
    pub fn write(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, DocumentError> {
        let final_path = self.dir.join(file_name);
        let tmp_path = self.dir.join(format!("{file_name}.tmp"));
        let write_err = |e: std::io::Error| DocumentError::WriteFailed {
            file_name: file_name.to_string(),
            detail: e.to_string(),
        };

        std::fs::write(&tmp_path, bytes).map_err(write_err)?;
        if let Err(e) = std::fs::rename(&tmp_path, &final_path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(write_err(e));
        }

        debug!(file = %final_path.display(), bytes = bytes.len(), "wrote document");
        Ok(final_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoice_name_is_zero_padded() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(
            invoice_file_name("ВН", "100", date),
            "ВН 100 2024 03 05.pdf"
        );
    }

    #[test]
    fn waybill_name_with_and_without_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(
            waybill_file_name("ТТН", "456", Some(date)),
            "ТТН 456 2024 03 15.pdf"
        );
        assert_eq!(waybill_file_name("ТТН", "9", None), "ТТН 9.pdf");
    }

    #[test]
    fn other_name_uses_sequence() {
        assert_eq!(other_file_name(1), "Other_1.pdf");
        assert_eq!(other_file_name(12), "Other_12.pdf");
    }

    #[test]
    fn writer_creates_nested_directories() {
        let root = tempfile::tempdir().unwrap();
        let out = root.path().join("a").join("b");
        let writer = ArtifactWriter::new(&out).unwrap();
        assert!(writer.dir().is_dir());
    }

    #[test]
    fn writer_rejects_file_in_the_way() {
        let root = tempfile::tempdir().unwrap();
        let blocked = root.path().join("occupied");
        std::fs::write(&blocked, b"i am a file").unwrap();
        let err = ArtifactWriter::new(&blocked).unwrap_err();
        assert!(matches!(err, SegmentError::OutputDirFailed { .. }));
    }

    #[test]
    fn write_lands_bytes_without_tmp_residue() {
        let root = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(root.path()).unwrap();
        let path = writer.write("Other_1.pdf", b"%PDF-1.7 fake").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.7 fake");
        let leftovers: Vec<_> = std::fs::read_dir(root.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .filter(|n| n.ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "tmp residue: {leftovers:?}");
    }

    #[test]
    fn write_failure_is_a_document_error() {
        let root = tempfile::tempdir().unwrap();
        let out = root.path().join("gone");
        let writer = ArtifactWriter::new(&out).unwrap();
        std::fs::remove_dir(&out).unwrap();
        let err = writer.write("ВН 1 2024 01 01.pdf", b"x").unwrap_err();
        assert!(matches!(err, DocumentError::WriteFailed { .. }));
    }
}
