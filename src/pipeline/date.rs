//! Date parsing for the formats the scanned documents actually use.
//!
//! Invoice lines read `видаткова накладна № 100 від 15 березня 2024 р.` —
//! a day, a genitive Ukrainian month name, and a four-digit year. Operators
//! occasionally stamp numeric dates instead, so `dd.mm.yyyy` and
//! `dd/mm/yyyy` are accepted as fallbacks.
//!
//! The long form is searched anywhere in the input (invoice lines carry
//! trailing decorations like `р.`); the numeric forms must match the whole
//! string, mirroring strict `strptime`-style parsing. A parse failure is a
//! classification signal, not an error: the caller routes the page to the
//! "Other" pool.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

/// Genitive month names as they appear after the day number.
const MONTHS: [(&str, u32); 12] = [
    ("січня", 1),
    ("лютого", 2),
    ("березня", 3),
    ("квітня", 4),
    ("травня", 5),
    ("червня", 6),
    ("липня", 7),
    ("серпня", 8),
    ("вересня", 9),
    ("жовтня", 10),
    ("листопада", 11),
    ("грудня", 12),
];

/// Day, Cyrillic month word, four-digit year.
static RE_LONG_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d{1,2})\s+([а-яіїє]+)\s+(\d{4})").unwrap());

/// Numeric fallbacks, tried in order against the whole string.
const NUMERIC_FORMATS: [&str; 2] = ["%d.%m.%Y", "%d/%m/%Y"];

/// Parse a date out of free text.
///
/// Tries the Ukrainian long form first (first occurrence anywhere in the
/// text); an unknown month word or an impossible day falls through to the
/// numeric formats rather than failing outright.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    if let Some(caps) = RE_LONG_DATE.captures(text) {
        if let Some(date) = long_form(&caps) {
            return Some(date);
        }
    }
    NUMERIC_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

fn long_form(caps: &regex::Captures<'_>) -> Option<NaiveDate> {
    let day: u32 = caps[1].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;
    let month_word = caps[2].to_lowercase();
    let month = MONTHS
        .iter()
        .find(|(name, _)| *name == month_word)
        .map(|&(_, m)| m)?;
    NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn long_form_parses() {
        assert_eq!(parse_date("15 березня 2024"), Some(d(2024, 3, 15)));
    }

    #[test]
    fn long_form_is_case_insensitive() {
        assert_eq!(parse_date("15 БЕРЕЗНЯ 2024"), Some(d(2024, 3, 15)));
    }

    #[test]
    fn long_form_found_inside_longer_text() {
        let text = "видаткова накладна № 100 від 7 липня 2023 р. платник ТОВ";
        assert_eq!(parse_date(text), Some(d(2023, 7, 7)));
    }

    #[test]
    fn every_month_name_resolves() {
        for (name, month) in MONTHS {
            let text = format!("1 {name} 2024");
            assert_eq!(parse_date(&text), Some(d(2024, month, 1)), "month {name}");
        }
    }

    #[test]
    fn dotted_numeric_parses() {
        assert_eq!(parse_date("15.03.2024"), Some(d(2024, 3, 15)));
    }

    #[test]
    fn slashed_numeric_parses() {
        assert_eq!(parse_date("15/03/2024"), Some(d(2024, 3, 15)));
    }

    #[test]
    fn single_digit_day_numeric_parses() {
        assert_eq!(parse_date("5.03.2024"), Some(d(2024, 3, 5)));
    }

    #[test]
    fn numeric_with_trailing_junk_fails() {
        // Numeric formats are whole-string; the long form is the only
        // embedded-match path.
        assert_eq!(parse_date("15.03.2024 "), None);
        assert_eq!(parse_date("q 15.03.2024"), None);
    }

    #[test]
    fn impossible_day_falls_through_to_none() {
        assert_eq!(parse_date("32 березня 2024"), None);
    }

    #[test]
    fn impossible_numeric_month_is_none() {
        assert_eq!(parse_date("15.13.2024"), None);
    }

    #[test]
    fn unknown_month_word_is_none() {
        assert_eq!(parse_date("15 балабол 2024"), None);
    }

    #[test]
    fn bad_long_form_still_tries_numeric() {
        // The regex matches "32 березня 2024" first, the day is impossible,
        // and nothing numeric matches the whole string → None, no panic.
        assert_eq!(parse_date("32 березня 2024 видано"), None);
    }

    #[test]
    fn empty_and_garbage_are_none() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("накладна без дати"), None);
    }
}
