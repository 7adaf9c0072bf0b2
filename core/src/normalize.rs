//! Field normalizers for identifiers, amounts, dates and intervals.
//!
//! None of these functions fail. A malformed field degrades to 0 or None
//! so one bad cell never blocks the rest of the file.

use chrono::{Datelike, NaiveDate};

/// Strip leading zeros from a numeric identifier. "0000" becomes "0".
/// Identifiers containing non-digits are only trimmed.
pub fn normalize_id(raw: &str) -> String {
    let s = raw.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return s.to_string();
    }
    let stripped = s.trim_start_matches('0');
    if stripped.is_empty() {
        "0".to_string()
    } else {
        stripped.to_string()
    }
}

/// Parse an amount, ignoring thousands separators and whitespace.
pub fn parse_amount(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// None for a blank cell, otherwise parse_amount.
pub fn optional_amount(raw: &str) -> Option<f64> {
    if raw.trim().is_empty() {
        None
    } else {
        Some(parse_amount(raw))
    }
}

/// Parse DD/MM/YYYY. Sentinels and malformed input are None.
pub fn parse_date(raw: &str, sentinels: &[String]) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() || sentinels.iter().any(|x| x.eq_ignore_ascii_case(s)) {
        return None;
    }
    let mut parts = s.split('/');
    let (d, m, y) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() || y.len() != 4 {
        return None;
    }
    NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?)
}

/// Whole calendar months from `from` to `to`, ignoring day-of-month.
pub fn month_diff(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Option<i32> {
    let (from, to) = (from?, to?);
    let index = |d: NaiveDate| d.year() * 12 + d.month() as i32;
    Some(index(to) - index(from))
}

/// Days from `reference` until `date`. Negative once the date has passed.
pub fn days_until(date: Option<NaiveDate>, reference: NaiveDate) -> Option<i64> {
    date.map(|d| (d - reference).num_days())
}

pub fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// Upper-cased `text` contains `keyword`. Keywords of three letters or
/// fewer must match a whole word so "CC" does not hit "ACCOUNT".
pub fn contains_keyword(text_upper: &str, keyword: &str) -> bool {
    if keyword.len() > 3 {
        return text_upper.contains(keyword);
    }
    text_upper
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|word| word == keyword)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;

    fn sentinels() -> Vec<String> {
        PipelineConfig::default().date_sentinels
    }

    #[test]
    fn normalize_id_strips_leading_zeros() {
        assert_eq!(normalize_id("000123"), "123");
        assert_eq!(normalize_id("0000"), "0");
        assert_eq!(normalize_id(""), "");
        assert_eq!(normalize_id("  0042 "), "42");
        assert_eq!(normalize_id("SB-01"), "SB-01");
    }

    #[test]
    fn normalize_id_is_idempotent() {
        for raw in ["000123", "0000", "", "7", "0a12", "10200"] {
            let once = normalize_id(raw);
            assert_eq!(normalize_id(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn parse_amount_never_fails() {
        assert_eq!(parse_amount("1,23,456.50"), 123456.5);
        assert_eq!(parse_amount(" -2 500 "), -2500.0);
        assert_eq!(parse_amount(""), 0.0);
        assert_eq!(parse_amount("abc"), 0.0);
        assert_eq!(parse_amount("NaN"), 0.0);
        assert_eq!(optional_amount("  "), None);
        assert_eq!(optional_amount("x"), Some(0.0));
    }

    #[test]
    fn parse_date_accepts_only_dd_mm_yyyy() {
        let s = sentinels();
        assert_eq!(
            parse_date("31/03/2024", &s),
            NaiveDate::from_ymd_opt(2024, 3, 31)
        );
        assert_eq!(
            parse_date("31/03/2024", &s).map(|d| d.to_string()),
            Some("2024-03-31".to_string())
        );
        assert_eq!(parse_date("00/00/0000", &s), None);
        assert_eq!(parse_date("31-03-2024", &s), None);
        assert_eq!(parse_date("31/02/2024", &s), None);
        assert_eq!(parse_date("31/03/24", &s), None);
        assert_eq!(parse_date("NA", &s), None);
    }

    #[test]
    fn month_diff_ignores_day_of_month() {
        let a = NaiveDate::from_ymd_opt(2024, 1, 31);
        let b = NaiveDate::from_ymd_opt(2024, 2, 1);
        assert_eq!(month_diff(a, b), Some(1));
        assert_eq!(month_diff(b, a), Some(-1));
        assert_eq!(month_diff(None, b), None);
        let c = NaiveDate::from_ymd_opt(2029, 2, 1);
        assert_eq!(month_diff(b, c), Some(60));
    }

    #[test]
    fn short_keywords_match_whole_words() {
        assert!(contains_keyword("CC LIMIT ACCOUNT", "CC"));
        assert!(!contains_keyword("ACCOUNT", "CC"));
        assert!(contains_keyword("HOUSING LOAN", "HOUSING"));
    }
}
