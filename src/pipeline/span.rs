//! Waybill span resolution: forward growth from a title page, backward
//! rescue from an orphaned tail page.
//!
//! ## Forward
//!
//! A waybill starts at its title sheet and extends over every following page
//! that still reads as waybill material. Two things close the span: the
//! packing box marker `короб <number>` quoting the waybill's own number
//! (that page is the last sheet, included), or the first page that belongs
//! to something else (the span ends just before it). Blank pages never get
//! a vote — interior and trailing blanks are swallowed into the span.
//!
//! ## Backward
//!
//! A tail sheet with no preceding open waybill means the title page was
//! misread — usually because it quotes the invoice it accompanies and the
//! invoice rule claimed it first. The rescue walks backwards from the tail
//! looking for a page carrying the waybill title. The walk gives up at the
//! window floor (exclusive) and hard-stops at the first page another
//! document owns: a page, once owned, is a boundary no scan may cross.

use crate::config::SegmentationConfig;
use crate::pipeline::classify::{classify, has_waybill_title, is_run_end};
use crate::pipeline::source::{cached_text, PageSource};
use crate::pipeline::state::{PageLedger, TextCache};
use tracing::debug;

/// Resolve the inclusive end page of the waybill starting at `start` with
/// the given document `number`.
///
/// Returns `start` itself when no following page extends the run.
pub fn resolve_forward(
    source: &dyn PageSource,
    cache: &mut TextCache,
    ledger: &PageLedger,
    config: &SegmentationConfig,
    start: usize,
    number: &str,
) -> usize {
    let total = ledger.total_pages();
    for j in (start + 1)..total {
        if ledger.is_blank(j) {
            continue;
        }
        let text = cached_text(cache, source, j);
        if is_run_end(text, number) {
            debug!(start, end = j, number, "waybill span closed by box marker");
            return j;
        }
        let class = classify(
            text,
            config.invoice_signal_threshold,
            config.waybill_signal_threshold,
        );
        if !class.is_waybill() {
            debug!(start, end = j - 1, number, next_class = ?class, "waybill span closed");
            return j - 1;
        }
    }
    debug!(start, end = total - 1, number, "waybill span ran to end of stream");
    total - 1
}

/// Find the title page of the waybill whose tail sheet sits at `tail`.
///
/// Walks backwards over at most `window - 1` predecessors (the floor index
/// `tail - window` is exclusive, and index 0 is never a candidate). Blank
/// pages are stepped over; the first page already owned by a document ends
/// the search empty-handed.
pub fn resolve_backward(
    source: &dyn PageSource,
    cache: &mut TextCache,
    ledger: &PageLedger,
    tail: usize,
    window: usize,
) -> Option<usize> {
    let floor = tail.saturating_sub(window);
    for i in ((floor + 1)..tail).rev() {
        if ledger.is_assigned(i) {
            debug!(tail, blocked_at = i, "backward title search hit an owned page");
            return None;
        }
        if ledger.is_blank(i) {
            continue;
        }
        if has_waybill_title(cached_text(cache, source, i)) {
            debug!(tail, title = i, "backward title search succeeded");
            return Some(i);
        }
    }
    None
}
