//! Blank-page detection on rendered pixels.
//!
//! Scanner bundles pad documents with empty carrier sheets; the engine drops
//! them before classification so they neither become "Other" documents nor
//! break waybill span arithmetic. A page is blank when more than
//! `blank_coverage` of its 8-bit channel samples sit at or above
//! `white_level`.
//!
//! ## Why a sample ratio instead of OCR or object counts?
//! Scanned "blank" pages are never byte-empty — they carry sensor noise,
//! edge shadows, and punch-hole artifacts. A brightness-coverage ratio over
//! the rasterised page is robust to all of those and needs no text layer,
//! which scans rarely have anyway.

use image::DynamicImage;

/// Decide whether a rendered page is visually blank.
///
/// The image is flattened to 8-bit RGB first so an opaque alpha channel
/// cannot inflate the white ratio. Comparison is strict: a page at exactly
/// `coverage` is kept. An image with no samples is not blank — a zero-area
/// render says nothing about the paper.
pub fn is_blank(image: &DynamicImage, white_level: u8, coverage: f64) -> bool {
    let rgb = image.to_rgb8();
    let samples = rgb.as_raw();
    if samples.is_empty() {
        return false;
    }
    let white = samples.iter().filter(|&&s| s >= white_level).count();
    white as f64 / samples.len() as f64 > coverage
}
