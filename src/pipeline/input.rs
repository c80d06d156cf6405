//! Input resolution: normalise user input to a local file pdfium can open.
//!
//! ## Why a temp file for byte buffers?
//!
//! pdfium requires a file-system path — it cannot stream from a byte buffer.
//! Spilling the buffer to a `NamedTempFile` gives us a path pdfium can open
//! while ensuring cleanup happens automatically when `ResolvedInput` is
//! dropped, even if the process panics. We validate the PDF magic bytes
//! (`%PDF`) before returning so callers get a meaningful error rather than a
//! pdfium crash.

use crate::error::SegmentError;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// The resolved input — either a caller-owned path or a spilled buffer.
#[derive(Debug)]
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input arrived as bytes; spilled to a temp file kept alive until the
    /// run completes.
    Buffered { path: PathBuf, _temp: NamedTempFile },
}

impl ResolvedInput {
    /// Path to the PDF file regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Buffered { path, .. } => path,
        }
    }
}

/// Resolve a local file path, validating existence and PDF magic bytes.
pub fn resolve_path(path: &Path) -> Result<ResolvedInput, SegmentError> {
    let path = path.to_path_buf();

    if !path.exists() {
        return Err(SegmentError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            use std::io::Read;
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(SegmentError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(SegmentError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(SegmentError::FileNotFound { path });
        }
    }

    debug!("resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

/// Spill an in-memory PDF to a temp file, validating the magic bytes.
pub fn resolve_bytes(bytes: &[u8]) -> Result<ResolvedInput, SegmentError> {
    let mut temp = NamedTempFile::new()
        .map_err(|e| SegmentError::Internal(format!("failed to create temp file: {e}")))?;
    temp.write_all(bytes)
        .map_err(|e| SegmentError::Internal(format!("failed to spill PDF buffer: {e}")))?;
    temp.flush()
        .map_err(|e| SegmentError::Internal(format!("failed to spill PDF buffer: {e}")))?;

    let path = temp.path().to_path_buf();
    if bytes.len() >= 4 && &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        return Err(SegmentError::NotAPdf { path, magic });
    }

    debug!("spilled {} byte PDF buffer to {}", bytes.len(), path.display());
    Ok(ResolvedInput::Buffered { path, _temp: temp })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_not_found() {
        let err = resolve_path(Path::new("/no/such/file.pdf")).unwrap_err();
        assert!(matches!(err, SegmentError::FileNotFound { .. }));
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive.pdf");
        std::fs::write(&path, b"PK\x03\x04rest-of-a-zip").unwrap();
        let err = resolve_path(&path).unwrap_err();
        assert!(matches!(err, SegmentError::NotAPdf { magic, .. } if &magic == b"PK\x03\x04"));
    }

    #[test]
    fn pdf_magic_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ok.pdf");
        std::fs::write(&path, b"%PDF-1.7\n...").unwrap();
        let resolved = resolve_path(&path).unwrap();
        assert_eq!(resolved.path(), path);
    }

    #[test]
    fn buffer_spills_to_a_readable_temp_file() {
        let resolved = resolve_bytes(b"%PDF-1.4\nhello").unwrap();
        let on_disk = std::fs::read(resolved.path()).unwrap();
        assert_eq!(on_disk, b"%PDF-1.4\nhello");
    }

    #[test]
    fn buffer_with_wrong_magic_is_rejected() {
        let err = resolve_bytes(b"GIF89a....").unwrap_err();
        assert!(matches!(err, SegmentError::NotAPdf { .. }));
    }

    #[test]
    fn temp_file_is_cleaned_up_on_drop() {
        let path = {
            let resolved = resolve_bytes(b"%PDF-1.4\n").unwrap();
            resolved.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}
