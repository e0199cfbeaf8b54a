//! Locale normalisation: Colombian numbers, currency, dates and periods.
//!
//! Colombian reports write `1.235.000,50` for 1 235 000.50, but the layout
//! engine also hands back cells like `1235000,50`, `1.235.000` or `12,5`,
//! and nothing in the document says which convention a cell follows. The
//! rules below disambiguate by looking at which separators are present and
//! how many digits trail the last one.
//!
//! Every normaliser comes in two forms:
//!
//! * `parse_*` returns `Result<Option<T>, FieldError>`: `Ok(None)` for blank
//!   or "not reported" markers, `Err` for text that looks like a value but
//!   cannot be read. [`crate::pipeline::record`] uses these so it can record
//!   a [`crate::error::Diagnostic`].
//! * `normalize_*` collapses both failure modes to `None`, logging the error.
//!
//! None of these functions panic on malformed input.

use crate::error::FieldError;
use crate::model::YearMonth;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

// ── Patterns ─────────────────────────────────────────────────────────────

static RE_DATE_DMY_SLASH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})").unwrap());
static RE_DATE_DMY_DASH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})-(\d{1,2})-(\d{4})").unwrap());
static RE_DATE_YMD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})").unwrap());

static RE_PLAIN_DECIMAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+(?:\.\d+)?$").unwrap());

static RE_TAG_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\[\d+\]\s*$").unwrap());

static RE_SUMMARY_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+,\d{2}").unwrap());
static RE_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// Tried in order by [`line_numeric`]; the first pattern with a usable match wins.
static RE_LINE_NUMBERS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\b\d{1,3}(?:\.\d{3})+,\d{2}\b", // 1.184,29
        r"\b\d{4,},\d{2}\b",              // 1193,00
        r"\b\d+,\d{2}\b",                 // 193,00
        r"\b\d{1,3}(?:\.\d{3})+\b",       // 1.184
        r"\b\d{4,}\b",                    // 1193
        r"\d+",
    ]
    .iter()
    .filter_map(|pat| Regex::new(pat).ok())
    .collect()
});

// ── Shared helpers ───────────────────────────────────────────────────────

/// Markers the reports use for "nothing here".
fn is_blank(s: &str) -> bool {
    matches!(s, "" | "--" | "N/A")
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Which separator conventions apply to a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NumberStyle {
    /// Salaries: a lone separator with ≤2 trailing digits is decimal,
    /// anything else is thousands grouping.
    Currency,
    /// Weeks and licences: a lone comma with ≤3 trailing digits is decimal;
    /// a lone dot is decimal unless more than 3 digits follow it.
    Generic,
}

/// Rewrite `cleaned` (no whitespace, no currency symbol) into a plain
/// `123.45` form according to `style`.
fn canonical_number(cleaned: &str, style: NumberStyle) -> String {
    let has_comma = cleaned.contains(',');
    let has_dot = cleaned.contains('.');

    match (has_dot, has_comma) {
        // Dot groups thousands, comma marks decimals: 1.235.000,50
        (true, true) => match cleaned.split_once(',') {
            Some((int, frac)) if !frac.contains(',') => {
                format!("{}.{}", int.replace('.', ""), frac)
            }
            _ => cleaned.to_string(),
        },
        (false, true) => {
            let max_decimals = match style {
                NumberStyle::Currency => 2,
                NumberStyle::Generic => 3,
            };
            let parts: Vec<&str> = cleaned.split(',').collect();
            if parts.len() == 2 && parts[1].len() <= max_decimals {
                format!("{}.{}", parts[0], parts[1])
            } else {
                cleaned.replace(',', "")
            }
        }
        (true, false) => {
            let parts: Vec<&str> = cleaned.split('.').collect();
            match style {
                NumberStyle::Currency => {
                    if parts.len() == 2 && parts[1].len() <= 2 {
                        cleaned.to_string()
                    } else {
                        cleaned.replace('.', "")
                    }
                }
                NumberStyle::Generic => {
                    if parts.len() == 2 && parts[1].len() > 3 {
                        parts.concat()
                    } else {
                        cleaned.to_string()
                    }
                }
            }
        }
        (false, false) => cleaned.to_string(),
    }
}

fn parse_plain(candidate: &str, raw: &str) -> Result<f64, FieldError> {
    if !RE_PLAIN_DECIMAL.is_match(candidate) {
        return Err(FieldError::Number(raw.to_string()));
    }
    candidate
        .parse::<f64>()
        .map_err(|_| FieldError::Number(raw.to_string()))
}

fn logged<T>(kind: &str, raw: &str, result: Result<Option<T>, FieldError>) -> Option<T> {
    match result {
        Ok(v) => v,
        Err(e) => {
            warn!("Could not parse {}: {:?} ({})", kind, raw, e);
            None
        }
    }
}

// ── Dates ────────────────────────────────────────────────────────────────

/// Parse `DD/MM/YYYY`, `DD-MM-YYYY` or `YYYY-MM-DD`.
///
/// The first pattern whose components form a real calendar date wins.
pub fn parse_date(raw: &str) -> Result<Option<NaiveDate>, FieldError> {
    let s = raw.trim();
    if is_blank(s) {
        return Ok(None);
    }

    let attempts: [(&Regex, bool); 3] = [
        (&RE_DATE_DMY_SLASH, false),
        (&RE_DATE_DMY_DASH, false),
        (&RE_DATE_YMD, true),
    ];

    for (re, year_first) in attempts {
        let Some(caps) = re.captures(s) else {
            continue;
        };
        let (y, m, d) = if year_first {
            (&caps[1], &caps[2], &caps[3])
        } else {
            (&caps[3], &caps[2], &caps[1])
        };
        let (Ok(y), Ok(m), Ok(d)) = (y.parse::<i32>(), m.parse::<u32>(), d.parse::<u32>()) else {
            continue;
        };
        if let Some(date) = NaiveDate::from_ymd_opt(y, m, d) {
            return Ok(Some(date));
        }
    }

    Err(FieldError::Date(raw.to_string()))
}

pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    logged("date", raw, parse_date(raw))
}

// ── Periods ──────────────────────────────────────────────────────────────

/// Parse a 6-digit `YYYYMM` period; the month must be `01..=12`.
pub fn parse_period(raw: &str) -> Result<Option<YearMonth>, FieldError> {
    let s = raw.trim();
    if is_blank(s) {
        return Ok(None);
    }
    YearMonth::parse_compact(s)
        .map(Some)
        .ok_or_else(|| FieldError::Period(raw.to_string()))
}

pub fn normalize_period(raw: &str) -> Option<YearMonth> {
    logged("period", raw, parse_period(raw))
}

// ── Currency ─────────────────────────────────────────────────────────────

/// Parse a salary such as `$ 1.235.000,50`, rounded to 2 places.
///
/// A literal `0` is reported as `None`: the reports print 0 where nothing
/// was reported, so the two cannot be told apart.
pub fn parse_currency(raw: &str) -> Result<Option<f64>, FieldError> {
    let s = raw.trim();
    if is_blank(s) || s == "0" {
        return Ok(None);
    }
    let cleaned: String = s.chars().filter(|c| *c != '$' && !c.is_whitespace()).collect();
    if cleaned.is_empty() || cleaned == "0" {
        return Ok(None);
    }
    let candidate = canonical_number(&cleaned, NumberStyle::Currency);
    parse_plain(&candidate, raw).map(|v| Some(round2(v)))
}

pub fn normalize_currency(raw: &str) -> Option<f64> {
    logged("salary", raw, parse_currency(raw))
}

// ── Generic numbers (weeks, licences) ────────────────────────────────────

/// Parse a week or licence count such as `51,43` or `1.234,56`.
pub fn parse_numeric(raw: &str) -> Result<Option<f64>, FieldError> {
    let s = raw.trim();
    if is_blank(s) || s == "0" {
        return Ok(None);
    }
    let cleaned: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    let candidate = canonical_number(&cleaned, NumberStyle::Generic);
    parse_plain(&candidate, raw).map(Some)
}

pub fn normalize_numeric(raw: &str) -> Option<f64> {
    logged("numeric value", raw, parse_numeric(raw))
}

// ── IBC (income base) ────────────────────────────────────────────────────

/// Parse an income base such as `$ 471.800`.
///
/// Dots are always thousands separators here; a comma, if one appears,
/// marks decimals.
pub fn parse_ibc(raw: &str) -> Result<Option<f64>, FieldError> {
    let s = raw.trim();
    if is_blank(s) || s == "0" {
        return Ok(None);
    }
    let cleaned: String = s
        .chars()
        .filter(|c| *c != '$' && *c != '.' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() || cleaned == "0" {
        return Ok(None);
    }
    let candidate = match cleaned.split_once(',') {
        Some((int, frac)) if !frac.contains(',') => format!("{int}.{frac}"),
        Some(_) => cleaned.replace(',', ""),
        None => cleaned,
    };
    parse_plain(&candidate, raw).map(|v| Some(round2(v)))
}

pub fn normalize_ibc(raw: &str) -> Option<f64> {
    logged("IBC value", raw, parse_ibc(raw))
}

// ── Day counts ───────────────────────────────────────────────────────────

/// Parse a reported/contributed day count in `1..=31`.
pub fn parse_days(raw: &str) -> Result<Option<u8>, FieldError> {
    let s = raw.trim();
    if is_blank(s) || s == "0" {
        return Ok(None);
    }
    match s.parse::<u8>() {
        Ok(d) if (1..=31).contains(&d) => Ok(Some(d)),
        _ => Err(FieldError::Days(raw.to_string())),
    }
}

pub fn normalize_days(raw: &str) -> Option<u8> {
    logged("days value", raw, parse_days(raw))
}

/// Whether `s` is a bare integer in `1..=31` (content sniffing for day columns).
pub fn looks_like_days(s: &str) -> bool {
    let s = s.trim();
    !s.is_empty()
        && s.bytes().all(|b| b.is_ascii_digit())
        && s.parse::<u32>().is_ok_and(|d| (1..=31).contains(&d))
}

// ── Free-text summary lines ──────────────────────────────────────────────

/// Read a value from a summary line such as `[26] TOTAL SEMANAS 1193,00`.
///
/// Summary lines never group thousands, so a comma is always the decimal
/// separator. The last match on the line is taken; bare 1–2 digit matches
/// and values below 0.01 are skipped so that a field tag like `[26]` is
/// never mistaken for the value.
pub fn summary_numeric(line: &str) -> Option<f64> {
    if RE_TAG_ONLY.is_match(line) {
        return None;
    }

    for re in [&*RE_SUMMARY_COMMA, &*RE_DIGITS] {
        let Some(m) = re.find_iter(line).last() else {
            continue;
        };
        let value_str = m.as_str();
        if value_str.len() <= 2 && value_str.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        let Ok(value) = value_str.replace(',', ".").parse::<f64>() else {
            continue;
        };
        if value < 0.01 {
            continue;
        }
        return Some(value);
    }
    None
}

/// Read a value from a summary line using the full Colombian rules
/// (`1.184,29`, `1193,00`, `1.184`, `1193`).
pub fn line_numeric(line: &str) -> Option<f64> {
    if RE_TAG_ONLY.is_match(line) {
        return None;
    }

    for re in RE_LINE_NUMBERS.iter() {
        let Some(m) = re.find_iter(line).last() else {
            continue;
        };
        let value_str = m.as_str();
        if value_str.len() <= 2 && value_str.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        let candidate = match (value_str.contains('.'), value_str.contains(',')) {
            (_, true) => canonical_number(value_str, NumberStyle::Currency),
            (true, false) => value_str.replace('.', ""),
            (false, false) => value_str.to_string(),
        };
        let Ok(value) = candidate.parse::<f64>() else {
            continue;
        };
        if value < 0.01 {
            continue;
        }
        return Some(value);
    }
    None
}
