//! Reconciliation: one rescue pass over pages the forward pass left pending.
//!
//! The forward pass defers a page whenever its evidence is incomplete at
//! visit time: a waybill title sheet that also quotes an invoice line (and so
//! classifies under the invoice rule, whose extraction then fails), a tail
//! sheet whose title was consumed elsewhere, an invoice body whose date line
//! was misread. After the stream has been walked once, the registry and the
//! ownership map hold strictly more information, so one deferred look can
//! resolve pages the declared rule order could not.
//!
//! The pass works on the raw signal rules, not on [`classify`]'s rule order:
//! a title sheet quoting its invoice classifies `Invoice` forever, so asking
//! the classifier again would just repeat the forward pass's answer.
//!
//! [`classify`]: crate::pipeline::classify::classify

use crate::engine::EngineRun;
use crate::pipeline::classify::{
    extract_invoice, extract_waybill_number, invoice_signal_hits, waybill_signal_hits,
};
use crate::pipeline::date::parse_date;
use crate::pipeline::source::cached_text;
use crate::pipeline::span::resolve_backward;
use tracing::{debug, info, warn};

/// Rescue pass over a snapshot of the pending queue, ascending page order.
///
/// A page a rescue emits (or swallows mid-span) is skipped when its own turn
/// comes. Pages no rule resolves simply stay pending; finalization turns them
/// into `Other` singletons. The pass never runs twice.
pub(crate) fn reconcile_pending(run: &mut EngineRun<'_>) {
    let snapshot = run.ledger.pending_snapshot();
    if snapshot.is_empty() {
        return;
    }
    debug!(pending = snapshot.len(), "reconciliation pass started");

    for page in snapshot {
        if !run.ledger.is_pending(page) {
            continue;
        }

        // Stray tail: cargo-table evidence with a reachable title sheet
        // behind it. The backward scan refuses to cross owned pages, so a
        // rescue can never re-partition an emitted document.
        let tail_hits = waybill_signal_hits(cached_text(&mut run.cache, run.source, page));
        if tail_hits >= run.config.waybill_signal_threshold {
            if let Some(start) = resolve_backward(
                run.source,
                &mut run.cache,
                &run.ledger,
                page,
                run.config.backward_window,
            ) {
                match extract_waybill_number(cached_text(&mut run.cache, run.source, start)) {
                    Some(number) => {
                        info!(start, tail = page, number = %number, "stray tail reassembled into a waybill");
                        run.emit_waybill(start, page, number);
                        continue;
                    }
                    None => {
                        warn!(
                            start,
                            tail = page,
                            "rescued title sheet has no readable waybill number"
                        );
                    }
                }
            }
        }

        // Misread invoice: candidate-strength vocabulary whose fields parse
        // on a second look.
        let invoice_hits = invoice_signal_hits(cached_text(&mut run.cache, run.source, page));
        if invoice_hits >= run.config.invoice_signal_threshold {
            let parsed = extract_invoice(cached_text(&mut run.cache, run.source, page))
                .and_then(|f| parse_date(&f.raw_date).map(|date| (f.number, date)));
            if let Some((number, date)) = parsed {
                info!(page, number = %number, "invoice recovered during reconciliation");
                run.emit_invoice(page, number, date);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::SegmentationConfig;
    use crate::engine::SegmentationEngine;
    use crate::output::{Document, SegmentationOutput};
    use crate::pipeline::source::fake::ScriptedSource;

    const INVOICE_FULL: &str = "Видаткова накладна № 100 від 15 березня 2024\n\
                                Постачальник: ТОВ Ромашка";
    /// Title sheet quoting its invoice: classifies under the invoice rule,
    /// extraction fails (no `від` clause), page lands in the pending queue.
    const TITLE_WITH_REF: &str = "Товарно-транспортна накладна № 456\n\
                                  супровідні документи: видаткова накладна № 100";
    const TAIL_FIVE: &str = "вантаж: цегла\nвага брутто 540\nавтомобіль DAF\n\
                             причіп НЕФАЗ 8560\nгабарити нестандартні";
    const NOISE: &str = "сторінка без ознак";

    fn run(source: &ScriptedSource) -> (SegmentationOutput, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = SegmentationConfig::builder()
            .output_dir(dir.path())
            .build()
            .unwrap();
        let output = SegmentationEngine::new(config).run(source).unwrap();
        (output, dir)
    }

    #[test]
    fn stray_tail_reassembles_dated_waybill() {
        let source = ScriptedSource::from_texts(&[INVOICE_FULL, TITLE_WITH_REF, TAIL_FIVE]);
        let (output, _dir) = run(&source);

        assert_eq!(output.stats.invoices, 1);
        assert_eq!(output.stats.waybills, 1);
        assert_eq!(output.stats.others, 0);

        let waybill = &output.documents[1];
        assert_eq!(waybill.file_name, "ТТН 456 2024 03 15.pdf");
        assert_eq!(
            waybill.document,
            Document::Waybill {
                number: "456".into(),
                referenced_invoice_date: chrono::NaiveDate::from_ymd_opt(2024, 3, 15),
                first_page: 1,
                last_page: 2,
            }
        );
        assert!(output.stats.integrity_ok, "{:?}", output.stats.integrity_detail);
    }

    #[test]
    fn rescue_never_crosses_a_consumed_page() {
        let source = ScriptedSource::from_texts(&[NOISE, INVOICE_FULL, TAIL_FIVE]);
        let (output, _dir) = run(&source);

        // The tail's backward scan hits the owned invoice page and gives up;
        // both unowned pages finalize as Other in page order.
        assert_eq!(output.stats.invoices, 1);
        assert_eq!(output.stats.waybills, 0);
        assert_eq!(output.stats.others, 2);
        let names: Vec<&str> = output
            .documents
            .iter()
            .map(|r| r.file_name.as_str())
            .collect();
        assert_eq!(
            names,
            ["ВН 100 2024 03 15.pdf", "Other_1.pdf", "Other_2.pdf"]
        );
        assert!(output.stats.integrity_ok);
    }

    #[test]
    fn title_without_number_defeats_the_rescue() {
        let source =
            ScriptedSource::from_texts(&[NOISE, "товарно-транспортна накладна", TAIL_FIVE]);
        let (output, _dir) = run(&source);

        assert_eq!(output.stats.waybills, 0);
        assert_eq!(output.stats.others, 3);
        assert!(output.stats.integrity_ok);
    }

    #[test]
    fn rescued_span_swallows_interior_pending_page() {
        let source =
            ScriptedSource::from_texts(&[INVOICE_FULL, TITLE_WITH_REF, NOISE, TAIL_FIVE]);
        let (output, _dir) = run(&source);

        // The noise page sits between the rescued title and its tail; the
        // emitted span claims it, so it never becomes an Other singleton.
        assert_eq!(output.stats.others, 0);
        assert_eq!(output.stats.waybills, 1);
        assert!(matches!(
            output.documents[1].document,
            Document::Waybill {
                first_page: 1,
                last_page: 3,
                ..
            }
        ));
        assert!(output.stats.integrity_ok, "{:?}", output.stats.integrity_detail);
    }
}
