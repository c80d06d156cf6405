//! Configuration types for page-stream segmentation.
//!
//! All engine behaviour is controlled through [`SegmentationConfig`], built
//! via its [`SegmentationConfigBuilder`]. Keeping every knob in one struct
//! makes it trivial to share configs across runs, log them, and diff two runs
//! to understand why their partitions differ.
//!
//! # Design choice: builder over constructor
//! A dozen-field constructor is unreadable and breaks on every new field.
//! The builder pattern lets callers set only what they care about and rely on
//! well-documented defaults for the rest.

use crate::error::SegmentError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;

/// Configuration for a segmentation run.
///
/// Built via [`SegmentationConfig::builder()`] or using
/// [`SegmentationConfig::default()`].
///
/// # Example
/// ```rust
/// use scansplit::SegmentationConfig;
///
/// let config = SegmentationConfig::builder()
///     .output_dir("out")
///     .blank_coverage(0.985)
///     .backward_window(30)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct SegmentationConfig {
    /// Directory that receives the per-document PDF files. Default: `.`.
    ///
    /// Created with `create_dir_all` at run start; an unusable directory is a
    /// fatal [`SegmentError::OutputDirFailed`] before any page is touched.
    pub output_dir: PathBuf,

    /// Brightness level (0–255) at or above which a channel sample counts as
    /// white. Default: 250.
    ///
    /// Scanner sensors rarely return a perfect 255 for paper; 250 absorbs the
    /// usual sensor noise while still seeing pale toner as content.
    pub white_level: u8,

    /// Fraction of white samples a page must *exceed* to be filtered as
    /// blank. Default: 0.99. Must lie in `(0, 1]`.
    ///
    /// Strictly-greater comparison: a page at exactly the threshold is kept.
    /// Separator sheets scanned with an edge shadow land around 0.95, real
    /// blanks above 0.995, so 0.99 splits the two populations cleanly.
    pub blank_coverage: f64,

    /// Distinct invoice signal patterns a page must match to be an invoice
    /// candidate. Default: 4 (of 6 patterns).
    pub invoice_signal_threshold: usize,

    /// Distinct waybill tail signal patterns a page must match to count as a
    /// waybill tail. Default: 5 (of 9 patterns).
    pub waybill_signal_threshold: usize,

    /// How many pages before a waybill tail the backward title search may
    /// cover. Default: 50.
    ///
    /// The floor index `tail - window` is exclusive, so at most `window - 1`
    /// predecessors are examined. Waybills in these scan bundles run a handful
    /// of sheets; 50 is generous without letting a stray tail page claim a
    /// title from a completely different part of the stream.
    pub backward_window: usize,

    /// Target pixel width when rasterising pages for the blank filter.
    /// Default: 800, clamped to ≥ 100.
    ///
    /// Blank detection is a coverage ratio, not OCR — it is stable from a few
    /// hundred pixels up, and smaller renders keep the filter stage cheap.
    pub render_width: u32,

    /// Filename tag for emitted invoices. Default: `ВН`.
    pub invoice_tag: String,

    /// Filename tag for emitted waybills. Default: `ТТН`.
    pub waybill_tag: String,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Number of PDFs processed concurrently by the multi-input entry points
    /// ([`crate::segment_many`], [`crate::segment_stream`]). Default: 4.
    ///
    /// A single run is strictly sequential by design — page accounting
    /// depends on stream order — so this knob only fans out *independent*
    /// inputs. Rendering is CPU-bound; match it to your cores.
    pub concurrency: usize,

    /// Optional progress callback invoked at run milestones.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            white_level: 250,
            blank_coverage: 0.99,
            invoice_signal_threshold: 4,
            waybill_signal_threshold: 5,
            backward_window: 50,
            render_width: 800,
            invoice_tag: "ВН".to_string(),
            waybill_tag: "ТТН".to_string(),
            password: None,
            concurrency: 4,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for SegmentationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentationConfig")
            .field("output_dir", &self.output_dir)
            .field("white_level", &self.white_level)
            .field("blank_coverage", &self.blank_coverage)
            .field("invoice_signal_threshold", &self.invoice_signal_threshold)
            .field("waybill_signal_threshold", &self.waybill_signal_threshold)
            .field("backward_window", &self.backward_window)
            .field("render_width", &self.render_width)
            .field("invoice_tag", &self.invoice_tag)
            .field("waybill_tag", &self.waybill_tag)
            .field("concurrency", &self.concurrency)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn callback>"),
            )
            .finish()
    }
}

impl SegmentationConfig {
    /// Create a new builder for `SegmentationConfig`.
    pub fn builder() -> SegmentationConfigBuilder {
        SegmentationConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`SegmentationConfig`].
#[derive(Debug)]
pub struct SegmentationConfigBuilder {
    config: SegmentationConfig,
}

impl SegmentationConfigBuilder {
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn white_level(mut self, level: u8) -> Self {
        self.config.white_level = level;
        self
    }

    pub fn blank_coverage(mut self, coverage: f64) -> Self {
        self.config.blank_coverage = coverage;
        self
    }

    pub fn invoice_signal_threshold(mut self, n: usize) -> Self {
        self.config.invoice_signal_threshold = n.max(1);
        self
    }

    pub fn waybill_signal_threshold(mut self, n: usize) -> Self {
        self.config.waybill_signal_threshold = n.max(1);
        self
    }

    pub fn backward_window(mut self, pages: usize) -> Self {
        self.config.backward_window = pages.max(2);
        self
    }

    pub fn render_width(mut self, px: u32) -> Self {
        self.config.render_width = px.max(100);
        self
    }

    pub fn invoice_tag(mut self, tag: impl Into<String>) -> Self {
        self.config.invoice_tag = tag.into();
        self
    }

    pub fn waybill_tag(mut self, tag: impl Into<String>) -> Self {
        self.config.waybill_tag = tag.into();
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SegmentationConfig, SegmentError> {
        let c = &self.config;
        if !(c.blank_coverage > 0.0 && c.blank_coverage <= 1.0) {
            return Err(SegmentError::InvalidConfig(format!(
                "blank coverage must lie in (0, 1], got {}",
                c.blank_coverage
            )));
        }
        if c.white_level == 0 {
            return Err(SegmentError::InvalidConfig(
                "white level must be ≥ 1 (0 would call every page blank)".into(),
            ));
        }
        for (name, tag) in [("invoice", &c.invoice_tag), ("waybill", &c.waybill_tag)] {
            if tag.is_empty() {
                return Err(SegmentError::InvalidConfig(format!(
                    "{name} tag must not be empty"
                )));
            }
            if tag.contains('/') || tag.contains('\\') {
                return Err(SegmentError::InvalidConfig(format!(
                    "{name} tag must not contain path separators, got '{tag}'"
                )));
            }
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_the_documented_values() {
        let c = SegmentationConfig::default();
        assert_eq!(c.white_level, 250);
        assert_eq!(c.blank_coverage, 0.99);
        assert_eq!(c.invoice_signal_threshold, 4);
        assert_eq!(c.waybill_signal_threshold, 5);
        assert_eq!(c.backward_window, 50);
        assert_eq!(c.invoice_tag, "ВН");
        assert_eq!(c.waybill_tag, "ТТН");
    }

    #[test]
    fn builder_clamps_low_values() {
        let c = SegmentationConfig::builder()
            .render_width(10)
            .backward_window(0)
            .concurrency(0)
            .invoice_signal_threshold(0)
            .build()
            .unwrap();
        assert_eq!(c.render_width, 100);
        assert_eq!(c.backward_window, 2);
        assert_eq!(c.concurrency, 1);
        assert_eq!(c.invoice_signal_threshold, 1);
    }

    #[test]
    fn build_rejects_bad_coverage() {
        let err = SegmentationConfig::builder()
            .blank_coverage(1.5)
            .build()
            .unwrap_err();
        assert!(matches!(err, SegmentError::InvalidConfig(_)));
    }

    #[test]
    fn build_rejects_tag_with_separator() {
        let err = SegmentationConfig::builder()
            .waybill_tag("a/b")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("path separators"));
    }

    #[test]
    fn debug_does_not_require_callback_debug() {
        let c = SegmentationConfig::builder()
            .progress_callback(std::sync::Arc::new(
                crate::progress::NoopProgressCallback,
            ))
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(dbg.contains("<dyn callback>"));
    }
}
