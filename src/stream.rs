//! Streaming batch API: yield each input's run result as it completes.
//!
//! ## Why stream?
//!
//! A nightly scan batch is dozens of bundles, and a thousand-page bundle can
//! take minutes to render. [`segment_stream`] starts up to
//! `config.concurrency` runs and hands each result over the moment its run
//! finishes, so a caller can file reports (or retry failures) while the slow
//! bundles are still rendering. The eager [`crate::segment_many`] is the same
//! fan-out collected into a `Vec`.
//!
//! Results arrive in completion order, not input order — key on the returned
//! path string if order matters.

use crate::config::SegmentationConfig;
use crate::error::SegmentError;
use crate::output::SegmentationOutput;
use crate::segment::segment;
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::pin::Pin;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of per-input run results, keyed by input path.
pub type RunStream =
    Pin<Box<dyn Stream<Item = (String, Result<SegmentationOutput, SegmentError>)> + Send>>;

/// Segment a batch of independent PDFs, streaming results as runs complete.
///
/// Each input gets its own engine and its own strictly sequential run; only
/// whole runs overlap. All runs share `config.output_dir` — give each batch
/// its own directory when `Other_N` names could collide.
///
/// # Example
/// ```rust,no_run
/// use scansplit::{segment_stream, SegmentationConfig};
/// use futures::StreamExt;
/// use std::path::PathBuf;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = SegmentationConfig::builder().output_dir("out").build()?;
/// let paths = vec![PathBuf::from("a.pdf"), PathBuf::from("b.pdf")];
/// let mut runs = segment_stream(&paths, &config);
/// while let Some((input, result)) = runs.next().await {
///     match result {
///         Ok(out) => println!("{input}: {} documents", out.stats.documents_emitted),
///         Err(e) => eprintln!("{input}: {e}"),
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub fn segment_stream(paths: &[PathBuf], config: &SegmentationConfig) -> RunStream {
    info!("Starting streaming batch: {} inputs", paths.len());
    let concurrency = config.concurrency.max(1);
    let config = config.clone();
    let s = stream::iter(paths.to_vec().into_iter().map(move |path| {
        let config = config.clone();
        async move {
            let key = path.display().to_string();
            let result = segment(&path, &config).await;
            (key, result)
        }
    }))
    .buffer_unordered(concurrency);
    Box::pin(s)
}
