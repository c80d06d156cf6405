//! Page classification: signal tables, exact-title rules, field extraction.
//!
//! Two layers of evidence decide what a page is:
//!
//! * **Exact-structure rules** — regexes anchored on the printed document
//!   titles (`видаткова накладна № …`, `товарно-транспортна накладна`).
//!   These fire on title sheets and are decisive on their own.
//! * **Signal tables** — stemmed keyword patterns counted at most once each
//!   per page. Continuation and tail sheets have no titles, but a waybill's
//!   cargo table is saturated with weights and dimensions, and an invoice
//!   body with supplier/buyer/contract terms. Crossing a threshold of
//!   *distinct* patterns is the candidate evidence.
//!
//! Rule order is fixed and deliberate: invoice exact, waybill title, invoice
//! candidate, waybill tail — the first match wins. Both keyword sets firing
//! at once therefore resolves to the invoice candidate, by declared order
//! rather than by any scoring.

use once_cell::sync::Lazy;
use regex::Regex;

// ── Signal tables ────────────────────────────────────────────────────────

/// Invoice vocabulary: the document word itself plus procurement terms
/// (supplier, buyer, contract, agreement, order), stemmed to cover case
/// endings.
const INVOICE_SIGNALS: [&str; 6] = [
    r"(?i)\bвидаткова\b",
    r"(?i)\bпост(а|ачальник)\w*",
    r"(?i)\bпокуп(ець|ця)\w*",
    r"(?i)\bдоговір\w*",
    r"(?i)\bугод[ауі]\w*",
    r"(?i)\bзамовлення\w*",
];

/// Waybill tail vocabulary: cargo, dimensions, weight, vehicle, trailer,
/// arrival, length, width, height — the transport table that closes a
/// waybill.
const WAYBILL_SIGNALS: [&str; 9] = [
    r"(?i)\bвантаж\w*",
    r"(?i)\bгабарит\w*",
    r"(?i)\bваг[аіу]",
    r"(?i)\bавтомобіл\w*",
    r"(?i)\bпричіп\w*",
    r"(?i)\bприбутт\w*",
    r"(?i)\bдовжин\w*",
    r"(?i)\bширин\w*",
    r"(?i)\bвисот\w*",
];

static INVOICE_SIGNAL_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    INVOICE_SIGNALS
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
});

static WAYBILL_SIGNAL_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    WAYBILL_SIGNALS
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
});

// ── Exact-structure rules ────────────────────────────────────────────────

/// Invoice title with a number — enough to classify, not to emit.
static RE_INVOICE_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)видаткова\s+накладна\s+№?\s*\d+").unwrap());

/// Full invoice line: number plus the raw date text up to end of line.
static RE_INVOICE_FULL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)видаткова\s+накладна\s+№?\s*(\d+)\s+від\s+([^\n]+)").unwrap());

/// Invoice reference as quoted inside a waybill's accompanying-documents box.
static RE_INVOICE_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)видаткова\s+накладна\s+№?\s*(\d+)").unwrap());

/// Waybill document title.
static RE_WAYBILL_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)товарно-транспортна\s+накладна").unwrap());

/// First digit run after the waybill title, across line breaks.
static RE_WAYBILL_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)товарно-транспортна\s+накладна.*?№?\s*(\d+)").unwrap());

// ── Classification ───────────────────────────────────────────────────────

/// What a page's text claims it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageClass {
    /// Invoice title with number present.
    Invoice,
    /// Waybill title present — a potential span start.
    WaybillStart,
    /// Invoice signal threshold crossed without an exact title.
    InvoiceCandidate,
    /// Waybill tail signal threshold crossed without a title.
    WaybillTail,
    /// Nothing recognised.
    Other,
}

impl PageClass {
    /// Whether the class belongs to the waybill document type; forward span
    /// scans continue over these pages.
    pub fn is_waybill(self) -> bool {
        matches!(self, PageClass::WaybillStart | PageClass::WaybillTail)
    }
}

/// Whether the page carries the waybill document title, regardless of what
/// else it quotes. A waybill title sheet that also quotes the invoice it
/// accompanies classifies as [`PageClass::Invoice`] under the declared rule
/// order, so backward rescue scans must ask for the title directly.
pub fn has_waybill_title(text: &str) -> bool {
    RE_WAYBILL_TITLE.is_match(text)
}

/// Count distinct invoice signal patterns present in `text`.
pub fn invoice_signal_hits(text: &str) -> usize {
    INVOICE_SIGNAL_RES.iter().filter(|re| re.is_match(text)).count()
}

/// Count distinct waybill tail signal patterns present in `text`.
pub fn waybill_signal_hits(text: &str) -> usize {
    WAYBILL_SIGNAL_RES.iter().filter(|re| re.is_match(text)).count()
}

/// Classify a page's extracted text. Empty text short-circuits to
/// [`PageClass::Other`].
pub fn classify(text: &str, invoice_threshold: usize, waybill_threshold: usize) -> PageClass {
    if text.is_empty() {
        return PageClass::Other;
    }
    if RE_INVOICE_TITLE.is_match(text) {
        return PageClass::Invoice;
    }
    if has_waybill_title(text) {
        return PageClass::WaybillStart;
    }
    if invoice_signal_hits(text) >= invoice_threshold {
        return PageClass::InvoiceCandidate;
    }
    if waybill_signal_hits(text) >= waybill_threshold {
        return PageClass::WaybillTail;
    }
    PageClass::Other
}

// ── Field extraction ─────────────────────────────────────────────────────

/// Fields pulled from a full invoice line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceFields {
    pub number: String,
    /// Raw text after `від`, up to the end of the line; date parsing is the
    /// caller's job so its failure can be handled as a routing decision.
    pub raw_date: String,
}

/// Extract the invoice number and raw date substring, if the page carries a
/// complete `№ <number> від <date>` line.
pub fn extract_invoice(text: &str) -> Option<InvoiceFields> {
    let caps = RE_INVOICE_FULL.captures(text)?;
    Some(InvoiceFields {
        number: caps[1].to_string(),
        raw_date: caps[2].to_string(),
    })
}

/// Extract the waybill's own number: the first digit run after the title.
pub fn extract_waybill_number(text: &str) -> Option<String> {
    RE_WAYBILL_NUMBER
        .captures(text)
        .map(|caps| caps[1].to_string())
}

/// The invoice number a waybill references, when it quotes one.
pub fn referenced_invoice(text: &str) -> Option<String> {
    RE_INVOICE_REF.captures(text).map(|caps| caps[1].to_string())
}

/// Whether `text` carries the box marker that closes the span of the waybill
/// with this `number` (`короб <number>`, whole-number match).
pub fn is_run_end(text: &str, number: &str) -> bool {
    let pattern = format!(r"(?i)короб\s+{}\b", regex::escape(number));
    Regex::new(&pattern)
        .expect("escaped number forms a valid pattern")
        .is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const INVOICE_PAGE: &str = "Видаткова накладна № 100 від 15 березня 2024\n\
                                Постачальник: ТОВ Ромашка\nПокупець: ПП Бджілка";
    const WAYBILL_START: &str =
        "ТОВАРНО-ТРАНСПОРТНА НАКЛАДНА\n№ 456\nвидаткова накладна № 100";
    const WAYBILL_TAIL: &str = "вантаж місць 12\nвага брутто 540 кг\nгабарити:\n\
                                довжина 120 см, ширина 80 см";

    #[test]
    fn exact_invoice_wins() {
        assert_eq!(classify(INVOICE_PAGE, 4, 5), PageClass::Invoice);
    }

    #[test]
    fn waybill_title_beats_invoice_keywords() {
        // Keywords alone cannot shadow a printed waybill title, even over
        // the candidate threshold; only the exact invoice rule outranks it.
        let text = "товарно-транспортна накладна\n\
                    постачальник покупець договір замовлення";
        assert!(invoice_signal_hits(text) >= 4);
        assert_eq!(classify(text, 4, 5), PageClass::WaybillStart);
    }

    #[test]
    fn invoice_reference_with_number_is_exact_invoice() {
        // A bare reference line satisfies the exact rule; the engine's
        // extraction guard is what routes such pages onward.
        assert_eq!(classify(WAYBILL_START, 4, 5), PageClass::Invoice);
        // The title is still detectable for backward rescue scans.
        assert!(has_waybill_title(WAYBILL_START));
    }

    #[test]
    fn tail_sheet_classifies_as_waybill_tail() {
        assert_eq!(waybill_signal_hits(WAYBILL_TAIL), 5);
        assert_eq!(classify(WAYBILL_TAIL, 4, 5), PageClass::WaybillTail);
    }

    #[test]
    fn four_tail_signals_are_not_enough() {
        let text = "вантаж 12 місць, вага 540, довжина 120, ширина 80";
        assert_eq!(waybill_signal_hits(text), 4);
        assert_eq!(classify(text, 4, 5), PageClass::Other);
    }

    #[test]
    fn three_invoice_signals_are_not_enough() {
        let text = "постачальник ТОВ, покупець ПП, договір 17";
        assert_eq!(invoice_signal_hits(text), 3);
        assert_eq!(classify(text, 4, 5), PageClass::Other);
    }

    #[test]
    fn four_invoice_signals_make_a_candidate() {
        let text = "постачальник ТОВ, покупець ПП, договір 17, замовлення 3";
        assert_eq!(invoice_signal_hits(text), 4);
        assert_eq!(classify(text, 4, 5), PageClass::InvoiceCandidate);
    }

    #[test]
    fn invoice_candidate_outranks_waybill_tail() {
        // Both keyword sets over threshold, no titles: declared order wins.
        let text = "постачальник покупець договір замовлення\n\
                    вантаж вага габарити довжина ширина висота";
        assert!(invoice_signal_hits(text) >= 4);
        assert!(waybill_signal_hits(text) >= 5);
        assert_eq!(classify(text, 4, 5), PageClass::InvoiceCandidate);
    }

    #[test]
    fn repeated_keyword_counts_once() {
        let text = "вантаж вантажу вантажем вантажні";
        assert_eq!(waybill_signal_hits(text), 1);
    }

    #[test]
    fn empty_text_is_other() {
        assert_eq!(classify("", 4, 5), PageClass::Other);
    }

    #[test]
    fn extract_invoice_pulls_number_and_raw_date() {
        let fields = extract_invoice(INVOICE_PAGE).unwrap();
        assert_eq!(fields.number, "100");
        assert_eq!(fields.raw_date, "15 березня 2024");
    }

    #[test]
    fn extract_invoice_needs_the_vid_clause() {
        assert_eq!(extract_invoice("видаткова накладна № 100"), None);
    }

    #[test]
    fn extract_invoice_raw_date_stops_at_newline() {
        let fields =
            extract_invoice("видаткова накладна № 7 від 1 січня 2024 р.\nдалі текст").unwrap();
        assert_eq!(fields.raw_date, "1 січня 2024 р.");
    }

    #[test]
    fn waybill_number_found_across_lines() {
        assert_eq!(extract_waybill_number(WAYBILL_START).as_deref(), Some("456"));
    }

    #[test]
    fn waybill_number_takes_first_digit_run() {
        // The lazy scan grabs the first digits after the title, wherever
        // they sit.
        let text = "товарно-транспортна накладна\nформа затверджена № 948";
        assert_eq!(extract_waybill_number(text).as_deref(), Some("948"));
    }

    #[test]
    fn waybill_number_absent_when_no_digits() {
        assert_eq!(extract_waybill_number("товарно-транспортна накладна"), None);
    }

    #[test]
    fn referenced_invoice_reads_the_quoted_number() {
        assert_eq!(referenced_invoice(WAYBILL_START).as_deref(), Some("100"));
        assert_eq!(referenced_invoice(WAYBILL_TAIL), None);
    }

    #[test]
    fn run_end_marker_matches_own_number_only() {
        assert!(is_run_end("пакування: короб 456", "456"));
        assert!(is_run_end("КОРОБ 456", "456"));
        // 4567 must not close waybill 456's span.
        assert!(!is_run_end("короб 4567", "456"));
        assert!(!is_run_end("короб 123", "456"));
    }

    #[test]
    fn waybill_classes_extend_runs() {
        assert!(PageClass::WaybillStart.is_waybill());
        assert!(PageClass::WaybillTail.is_waybill());
        assert!(!PageClass::Invoice.is_waybill());
        assert!(!PageClass::InvoiceCandidate.is_waybill());
        assert!(!PageClass::Other.is_waybill());
    }
}
