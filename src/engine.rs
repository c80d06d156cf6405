//! The segmentation engine: five sequential stages over one page stream.
//!
//! 1. **Filter** — render every page and flag blanks.
//! 2. **Forward pass** — classify non-blank pages in order; emit invoices
//!    and waybill spans, defer everything unrecognised to the pending queue.
//! 3. **Reconciliation** — one rescue pass over the pending queue
//!    ([`crate::pipeline::reconcile`]).
//! 4. **Finalization** — every page still pending becomes a singleton
//!    `Other` document.
//! 5. **Accounting** — prove `blank + consumed + pending == total`, with
//!    ownership cross-checks; failures are reported, never thrown.
//!
//! ## Why is the engine synchronous?
//!
//! Page order is the algorithm: spans grow forward, rescues scan backward,
//! and the ledger's exactly-once guarantee depends on a total visit order.
//! The engine therefore runs strictly sequentially against a
//! [`PageSource`]; the async entry points wrap a whole run in
//! `spawn_blocking`, and the only sanctioned parallelism is across
//! independent PDFs ([`crate::segment_many`]).

use crate::config::SegmentationConfig;
use crate::error::{DocumentError, SegmentError, SourceError};
use crate::output::{Document, DocumentRecord, RunStats, SegmentationOutput};
use crate::pipeline::blank::is_blank;
use crate::pipeline::classify::{
    classify, extract_invoice, extract_waybill_number, referenced_invoice, PageClass,
};
use crate::pipeline::date::parse_date;
use crate::pipeline::reconcile::reconcile_pending;
use crate::pipeline::source::{cached_text, PageSource};
use crate::pipeline::span::resolve_forward;
use crate::pipeline::state::{InvoiceRegistry, PageLedger, TextCache};
use crate::pipeline::writer::{
    invoice_file_name, other_file_name, waybill_file_name, ArtifactWriter,
};
use chrono::NaiveDate;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Drives one segmentation run over a [`PageSource`].
///
/// Construct with a validated [`SegmentationConfig`]; a single engine value
/// can run many documents, each run with fresh state.
pub struct SegmentationEngine {
    config: SegmentationConfig,
}

impl SegmentationEngine {
    pub fn new(config: SegmentationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    /// Run all five stages and produce the partition report.
    ///
    /// Fatal errors are limited to the output directory; per-document copy
    /// and write failures are recorded on their records and the run
    /// continues.
    pub fn run(&self, source: &dyn PageSource) -> Result<SegmentationOutput, SegmentError> {
        let total_start = Instant::now();
        let total = source.page_count();
        info!(total_pages = total, "segmentation run started");
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_run_start(total);
        }

        let writer = ArtifactWriter::new(&self.config.output_dir)?;

        // ── Stage 1: blank filter ────────────────────────────────────────
        let filter_start = Instant::now();
        let mut ledger = PageLedger::new(total);
        for page in 0..total {
            match source.render_page(page) {
                Ok(image) => {
                    if is_blank(&image, self.config.white_level, self.config.blank_coverage) {
                        debug!(page, "page flagged blank");
                        ledger.mark_blank(page);
                    }
                }
                Err(err) => {
                    // An unrenderable page gets the benefit of the doubt:
                    // it stays in the classification stream.
                    warn!(page, error = %err, "render failed; keeping page as content");
                }
            }
        }
        let blank_total = ledger.blank_total();
        let filter_duration_ms = filter_start.elapsed().as_millis() as u64;
        info!(blank = blank_total, total, "blank filter complete");
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_blank_scan_complete(blank_total, total);
        }

        // ── Stages 2–4: classify, reconcile, finalize ────────────────────
        let classify_start = Instant::now();
        let mut run = EngineRun {
            source,
            config: &self.config,
            writer,
            cache: TextCache::new(total),
            ledger,
            registry: InvoiceRegistry::new(),
            documents: Vec::new(),
        };
        run.forward_pass();
        reconcile_pending(&mut run);
        run.finalize_pending();
        let classify_duration_ms = classify_start.elapsed().as_millis() as u64;

        // ── Stage 5: accounting ──────────────────────────────────────────
        Ok(run.finish(filter_duration_ms, classify_duration_ms, total_start))
    }
}

/// Mutable state of one in-flight run, shared with the reconciliation pass.
pub(crate) struct EngineRun<'a> {
    pub(crate) source: &'a dyn PageSource,
    pub(crate) config: &'a SegmentationConfig,
    pub(crate) writer: ArtifactWriter,
    pub(crate) cache: TextCache,
    pub(crate) ledger: PageLedger,
    pub(crate) registry: InvoiceRegistry,
    pub(crate) documents: Vec<DocumentRecord>,
}

impl EngineRun<'_> {
    /// Stage 2: walk the non-blank stream in order, emitting what the exact
    /// rules and thresholds recognise and deferring the rest.
    fn forward_pass(&mut self) {
        let non_blank = self.ledger.non_blank_pages();
        let mut cursor = 0;
        while cursor < non_blank.len() {
            let page = non_blank[cursor];
            if self.ledger.is_assigned(page) {
                cursor += 1;
                continue;
            }

            let class = classify(
                cached_text(&mut self.cache, self.source, page),
                self.config.invoice_signal_threshold,
                self.config.waybill_signal_threshold,
            );
            match class {
                PageClass::Invoice | PageClass::InvoiceCandidate => {
                    let parsed = extract_invoice(cached_text(&mut self.cache, self.source, page))
                        .and_then(|f| parse_date(&f.raw_date).map(|date| (f.number, date)));
                    match parsed {
                        Some((number, date)) => self.emit_invoice(page, number, date),
                        None => {
                            // Not consumed as an invoice; the reconciliation
                            // pass gets a second look.
                            debug!(page, ?class, "invoice fields unreadable; page deferred");
                            self.ledger.mark_pending(page);
                        }
                    }
                    cursor += 1;
                }
                PageClass::WaybillStart => {
                    match extract_waybill_number(cached_text(&mut self.cache, self.source, page)) {
                        Some(number) => {
                            let end = resolve_forward(
                                self.source,
                                &mut self.cache,
                                &self.ledger,
                                self.config,
                                page,
                                &number,
                            );
                            self.emit_waybill(page, end, number);
                            while cursor < non_blank.len() && non_blank[cursor] <= end {
                                cursor += 1;
                            }
                        }
                        None => {
                            debug!(page, "waybill title without a readable number; page deferred");
                            self.ledger.mark_pending(page);
                            cursor += 1;
                        }
                    }
                }
                PageClass::WaybillTail | PageClass::Other => {
                    self.ledger.mark_pending(page);
                    cursor += 1;
                }
            }
        }
    }

    /// Stage 4: sweep the pending queue into singleton `Other` documents,
    /// ascending page order, sequence numbers from 1.
    fn finalize_pending(&mut self) {
        let mut sequence: u32 = 0;
        for page in self.ledger.pending_snapshot() {
            sequence += 1;
            let file_name = other_file_name(sequence);
            self.emit(Document::Other { sequence, page }, file_name);
        }
    }

    /// Emit a single-page invoice. The registry entry is written at
    /// classification time, so a later write failure does not unregister it.
    pub(crate) fn emit_invoice(&mut self, page: usize, number: String, date: NaiveDate) {
        self.registry.insert(number.clone(), date);
        let file_name = invoice_file_name(&self.config.invoice_tag, &number, date);
        let document = Document::Invoice {
            number,
            date: Some(date),
            page,
        };
        self.emit(document, file_name);
    }

    /// Emit a waybill over `[first, last]`. The date comes from the invoice
    /// the start page references, when that invoice was registered.
    pub(crate) fn emit_waybill(&mut self, first: usize, last: usize, number: String) {
        let referenced = referenced_invoice(cached_text(&mut self.cache, self.source, first));
        let date = referenced.as_deref().and_then(|n| self.registry.get(n));
        let file_name = waybill_file_name(&self.config.waybill_tag, &number, date);
        let document = Document::Waybill {
            number,
            referenced_invoice_date: date,
            first_page: first,
            last_page: last,
        };
        self.emit(document, file_name);
    }

    /// Assign the document's span, materialise its PDF, record the outcome.
    fn emit(&mut self, document: Document, file_name: String) {
        let doc_id = self.documents.len();
        let span = document.pages();
        let (first, last) = (*span.start(), *span.end());
        self.ledger.assign_span(first, last, doc_id);

        let result = self
            .source
            .copy_pages(first..=last)
            .map_err(|e| DocumentError::CopyFailed {
                file_name: file_name.clone(),
                detail: match e {
                    SourceError::Copy { detail, .. } => detail,
                    other => other.to_string(),
                },
            })
            .and_then(|bytes| self.writer.write(&file_name, &bytes));

        let record = match result {
            Ok(path) => {
                info!(file = %file_name, first, last, "document written");
                if let Some(ref cb) = self.config.progress_callback {
                    cb.on_document_emitted(&file_name, first, last);
                }
                DocumentRecord {
                    document,
                    file_name,
                    path: Some(path),
                    error: None,
                }
            }
            Err(err) => {
                error!(file = %file_name, error = %err, "document could not be materialised");
                if let Some(ref cb) = self.config.progress_callback {
                    cb.on_document_failed(&file_name, &err.to_string());
                }
                DocumentRecord {
                    document,
                    file_name,
                    path: None,
                    error: Some(err),
                }
            }
        };
        self.documents.push(record);
    }

    /// Stage 5: final partition, invariant checks, stats assembly.
    fn finish(
        self,
        filter_duration_ms: u64,
        classify_duration_ms: u64,
        total_start: Instant,
    ) -> SegmentationOutput {
        let total = self.ledger.total_pages();
        let acct = self.ledger.accounting();
        let consumed: usize = self.documents.iter().map(|r| r.document.page_count()).sum();

        let mut problems = Vec::new();
        if !acct.violations.is_empty() {
            problems.push(format!(
                "{} page(s) claimed by more than one document",
                acct.violations.len()
            ));
        }
        if acct.unvisited_non_blank > 0 {
            problems.push(format!(
                "{} non-blank page(s) never visited",
                acct.unvisited_non_blank
            ));
        }
        if consumed != acct.assigned {
            problems.push(format!(
                "document spans cover {consumed} page(s) but {} are owned",
                acct.assigned
            ));
        }
        let balance = acct.blank_unassigned + consumed + acct.pending;
        if balance != total {
            problems.push(format!(
                "{} blank + {} consumed + {} pending != {} total",
                acct.blank_unassigned, consumed, acct.pending, total
            ));
        }
        let integrity_ok = problems.is_empty();
        if !integrity_ok {
            for problem in &problems {
                error!(%problem, "page accounting violated");
            }
        }

        let emitted = self.documents.iter().filter(|r| r.is_written()).count();
        let failed = self.documents.len() - emitted;
        let count_kind = |pred: fn(&Document) -> bool| {
            self.documents.iter().filter(|r| pred(&r.document)).count()
        };

        let stats = RunStats {
            total_pages: total,
            blank_pages: acct.blank_unassigned,
            documents_emitted: emitted,
            documents_failed: failed,
            invoices: count_kind(|d| matches!(d, Document::Invoice { .. })),
            waybills: count_kind(|d| matches!(d, Document::Waybill { .. })),
            others: count_kind(|d| matches!(d, Document::Other { .. })),
            unresolved_pages: acct.pending + acct.unvisited_non_blank,
            integrity_ok,
            integrity_detail: if integrity_ok {
                None
            } else {
                Some(problems.join("; "))
            },
            filter_duration_ms,
            classify_duration_ms,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };

        info!(
            documents = self.documents.len(),
            emitted,
            failed,
            integrity_ok,
            total_ms = stats.total_duration_ms,
            "segmentation run complete"
        );
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_run_complete(emitted, failed);
        }

        SegmentationOutput {
            documents: self.documents,
            stats,
        }
    }
}
