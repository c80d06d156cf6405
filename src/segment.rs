//! Eager (whole-run) segmentation entry points.
//!
//! ## Why eager vs. streaming?
//!
//! This module provides the simpler API: run a document to completion, then
//! return the full [`SegmentationOutput`]. Use [`crate::stream::segment_stream`]
//! instead when segmenting a batch and you want each input's result as soon
//! as it lands rather than after the slowest one.
//!
//! All pdfium work is blocking, so each run executes under
//! [`tokio::task::spawn_blocking`]; the engine itself stays strictly
//! sequential per document.

use crate::config::SegmentationConfig;
use crate::engine::SegmentationEngine;
use crate::error::SegmentError;
use crate::output::{PdfInfo, SegmentationOutput};
use crate::pipeline::input::{self, ResolvedInput};
use crate::pipeline::source::{self, PdfiumSource};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use tracing::info;

/// Segment one scanned PDF into per-document files.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `path` — Local path to the scanned bundle
/// * `config` — Segmentation configuration
///
/// # Returns
/// `Ok(SegmentationOutput)` whenever the run completes, even if individual
/// documents failed to materialise (check `output.stats.documents_failed`)
/// or the page accounting broke (`output.stats.integrity_ok`).
///
/// # Errors
/// `Err(SegmentError)` only for fatal conditions:
/// - file missing, unreadable, or not a PDF
/// - pdfium missing, document corrupt, password wrong or required
/// - output directory cannot be created
///
/// # Example
/// ```rust,no_run
/// use scansplit::{segment, SegmentationConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = SegmentationConfig::builder().output_dir("out").build()?;
/// let output = segment("scans/batch_0312.pdf", &config).await?;
/// println!("{} documents", output.stats.documents_emitted);
/// # Ok(())
/// # }
/// ```
pub async fn segment(
    path: impl AsRef<Path>,
    config: &SegmentationConfig,
) -> Result<SegmentationOutput, SegmentError> {
    let path = path.as_ref();
    info!("Starting segmentation: {}", path.display());
    let resolved = input::resolve_path(path)?;
    run_resolved(resolved, config.clone()).await
}

/// Segment PDF bytes held in memory.
///
/// pdfium wants a path, so the bytes spill to a managed
/// [`tempfile::NamedTempFile`] that lives exactly as long as the run. This is
/// the API to use when scans arrive from a database or an upload rather than
/// a file on disk.
pub async fn segment_from_bytes(
    bytes: &[u8],
    config: &SegmentationConfig,
) -> Result<SegmentationOutput, SegmentError> {
    let resolved = input::resolve_bytes(bytes)?;
    run_resolved(resolved, config.clone()).await
}

/// Synchronous wrapper around [`segment`].
///
/// Creates a temporary tokio runtime internally.
pub fn segment_sync(
    path: impl AsRef<Path>,
    config: &SegmentationConfig,
) -> Result<SegmentationOutput, SegmentError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| SegmentError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(segment(path, config))
}

/// Segment several independent PDFs, at most `config.concurrency` at a time.
///
/// Each input gets its own engine and its own sequential run; only the runs
/// themselves overlap. Results carry the input path as the key and arrive in
/// completion order.
///
/// All runs share `config.output_dir` verbatim — point each batch at its own
/// directory (the CLI derives one per input from the file stem) when `Other_N`
/// names could collide.
pub async fn segment_many(
    paths: &[PathBuf],
    config: &SegmentationConfig,
) -> Vec<(String, Result<SegmentationOutput, SegmentError>)> {
    let concurrency = config.concurrency.max(1);
    stream::iter(paths.iter().cloned().map(|path| {
        let config = config.clone();
        async move {
            let key = path.display().to_string();
            let result = segment(&path, &config).await;
            (key, result)
        }
    }))
    .buffer_unordered(concurrency)
    .collect()
    .await
}

/// Read page count and document metadata without running segmentation.
///
/// Only `config.password` is consulted.
pub async fn inspect(
    path: impl AsRef<Path>,
    config: &SegmentationConfig,
) -> Result<PdfInfo, SegmentError> {
    let resolved = input::resolve_path(path.as_ref())?;
    let password = config.password.clone();
    tokio::task::spawn_blocking(move || {
        source::inspect_blocking(resolved.path(), password.as_deref())
    })
    .await
    .map_err(|e| SegmentError::Internal(format!("inspect task failed: {e}")))?
}

/// Run the blocking half of a segmentation: bind pdfium, open the document,
/// drive the engine. `resolved` moves into the task so a backing temp file
/// outlives the run.
async fn run_resolved(
    resolved: ResolvedInput,
    config: SegmentationConfig,
) -> Result<SegmentationOutput, SegmentError> {
    tokio::task::spawn_blocking(move || {
        let password = config.password.clone();
        let pdfium = source::bind_pdfium()?;
        let source = PdfiumSource::open(
            &pdfium,
            resolved.path(),
            password.as_deref(),
            config.render_width,
        )?;
        SegmentationEngine::new(config).run(&source)
    })
    .await
    .map_err(|e| SegmentError::Internal(format!("segmentation task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SegmentationConfig {
        SegmentationConfig::default()
    }

    #[tokio::test]
    async fn missing_file_is_fatal() {
        let err = segment("/no/such/bundle.pdf", &config()).await.unwrap_err();
        assert!(matches!(err, SegmentError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn non_pdf_bytes_are_rejected_before_pdfium() {
        let err = segment_from_bytes(b"PK\x03\x04 not a pdf", &config())
            .await
            .unwrap_err();
        assert!(matches!(err, SegmentError::NotAPdf { .. }));
    }

    #[test]
    fn sync_wrapper_propagates_resolution_errors() {
        let err = segment_sync("/no/such/bundle.pdf", &config()).unwrap_err();
        assert!(matches!(err, SegmentError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn many_keeps_one_result_per_input() {
        let paths = vec![
            PathBuf::from("/no/such/a.pdf"),
            PathBuf::from("/no/such/b.pdf"),
        ];
        let results = segment_many(&paths, &config()).await;
        assert_eq!(results.len(), 2);
        let mut keys: Vec<&str> = results.iter().map(|(k, _)| k.as_str()).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["/no/such/a.pdf", "/no/such/b.pdf"]);
        assert!(results.iter().all(|(_, r)| r.is_err()));
    }

    #[tokio::test]
    async fn inspect_checks_the_file_first() {
        let err = inspect("/no/such/bundle.pdf", &config()).await.unwrap_err();
        assert!(matches!(err, SegmentError::FileNotFound { .. }));
    }
}
