//! Data types flowing in and out of the extraction pipeline.
//!
//! Input side: [`RawPage`] as produced by the external layout engine, made of
//! [`RawTable`]s of [`Cell`]s plus the page text.
//!
//! Output side: the typed records of the two recognised schemas, the
//! [`SummaryAggregate`] mined from free text, the derived [`GapReport`], and
//! [`ExtractionOutput`] bundling everything returned by one run.

use crate::error::Diagnostic;
use crate::pipeline::clean::{clean_lines, fold};
use crate::pipeline::stitch::StitchState;
use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

// ── Input ────────────────────────────────────────────────────────────────

/// One table cell, cleaned once at ingestion.
///
/// Deserialises from `null` or a string. Multi-line cell text is joined by a
/// single space; [`Cell::is_multiline`] remembers that it was split.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub struct Cell {
    text: String,
    folded: String,
    multiline: bool,
    present: bool,
}

impl Cell {
    /// Build a cell from raw layout-engine text.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let lines = clean_lines(raw.as_ref());
        let text = lines.join(" ");
        Self {
            folded: fold(&text),
            multiline: lines.len() > 1,
            text,
            present: true,
        }
    }

    /// A cell the layout engine reported as missing (`null`).
    pub fn absent() -> Self {
        Self::default()
    }

    /// Cleaned text; empty for absent cells.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Lowercase, accent-free form used for label comparisons.
    pub fn folded(&self) -> &str {
        &self.folded
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn is_absent(&self) -> bool {
        !self.present
    }

    /// Whether the raw text spanned more than one non-empty line.
    pub fn is_multiline(&self) -> bool {
        self.multiline
    }

    /// Cleaned text, or `None` when empty.
    pub fn non_empty(&self) -> Option<&str> {
        if self.text.is_empty() {
            None
        } else {
            Some(&self.text)
        }
    }
}

impl From<Option<String>> for Cell {
    fn from(raw: Option<String>) -> Self {
        match raw {
            Some(s) => Cell::new(s),
            None => Cell::absent(),
        }
    }
}

impl From<Cell> for Option<String> {
    fn from(cell: Cell) -> Self {
        cell.present.then_some(cell.text)
    }
}

impl From<&str> for Cell {
    fn from(raw: &str) -> Self {
        Cell::new(raw)
    }
}

/// One row of a raw table.
pub type RawRow = Vec<Cell>;

/// A grid of cells; the first row is the header candidate.
pub type RawTable = Vec<RawRow>;

/// Build a row from plain strings (empty strings become empty cells).
pub fn row<S: AsRef<str>>(texts: &[S]) -> RawRow {
    texts.iter().map(|t| Cell::new(t.as_ref())).collect()
}

/// One page as reduced by the layout engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPage {
    /// Tables in document order.
    #[serde(default)]
    pub raw_tables: Vec<RawTable>,
    /// Full extracted page text, newline-delimited.
    #[serde(default)]
    pub raw_text: String,
}

impl RawPage {
    pub fn new(raw_tables: Vec<RawTable>, raw_text: impl Into<String>) -> Self {
        Self {
            raw_tables,
            raw_text: raw_text.into(),
        }
    }

    /// A page with text only (cover pages, legal notes, summary pages).
    pub fn text_only(raw_text: impl Into<String>) -> Self {
        Self::new(Vec::new(), raw_text)
    }
}

// ── Periods ──────────────────────────────────────────────────────────────

/// A calendar month, rendered canonically as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// `None` unless `month` is in `1..=12`.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// First day of the month, `None` outside chrono's year range.
    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// The month containing `date`.
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The following calendar month.
    pub fn succ(self) -> Option<Self> {
        self.first_day()?
            .checked_add_months(Months::new(1))
            .map(Self::of)
    }

    /// Parse the canonical `YYYY-MM` form.
    pub fn parse_dashed(s: &str) -> Option<Self> {
        let (y, m) = s.trim().split_once('-')?;
        if y.len() != 4 || m.len() != 2 {
            return None;
        }
        if !y.bytes().chain(m.bytes()).all(|b| b.is_ascii_digit()) {
            return None;
        }
        Self::new(y.parse().ok()?, m.parse().ok()?)
    }

    /// Parse the compact `YYYYMM` form used in payment tables.
    pub fn parse_compact(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.len() != 6 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Self::new(s[..4].parse().ok()?, s[4..].parse().ok()?)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl From<YearMonth> for String {
    fn from(ym: YearMonth) -> Self {
        ym.to_string()
    }
}

impl TryFrom<String> for YearMonth {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        YearMonth::parse_dashed(&s).ok_or_else(|| format!("invalid period '{s}', expected YYYY-MM"))
    }
}

// ── Output records ───────────────────────────────────────────────────────

/// One row of the contribution-weeks table.
///
/// All nine fields are always present in serialised output, `null` when the
/// source cell was missing or failed to normalise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContributionWeekRecord {
    pub contributor_id: Option<String>,
    pub contributor_name: Option<String>,
    pub period_from: Option<NaiveDate>,
    pub period_to: Option<NaiveDate>,
    pub last_salary: Option<f64>,
    pub weeks: Option<f64>,
    pub deduction_weeks: Option<f64>,
    pub simultaneous_weeks: Option<f64>,
    pub net_weeks: Option<f64>,
}

/// One row of the post-1995 payment-detail table.
///
/// Only emitted when both identifier and name are non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub contributor_id: String,
    pub contributor_name: String,
    pub period: Option<YearMonth>,
    pub reported_income_base: Option<f64>,
    pub reported_days: Option<u8>,
    pub contributed_days: Option<u8>,
}

/// Scalar totals mined from free text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryAggregate {
    pub weeks_total_report: Option<f64>,
    pub weeks_high_risk: Option<f64>,
}

impl SummaryAggregate {
    /// Fold a later page's findings in: every non-null value replaces the
    /// current one, nulls leave it untouched.
    pub fn merge(&mut self, later: SummaryAggregate) {
        if later.weeks_total_report.is_some() {
            self.weeks_total_report = later.weeks_total_report;
        }
        if later.weeks_high_risk.is_some() {
            self.weeks_high_risk = later.weeks_high_risk;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.weeks_total_report.is_none() && self.weeks_high_risk.is_none()
    }
}

/// Months missing between the earliest and latest observed payment period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapReport {
    pub missing_periods: Vec<YearMonth>,
    pub start_period: YearMonth,
    pub end_period: YearMonth,
    pub missing_count: usize,
}

// ── Run output ───────────────────────────────────────────────────────────

/// Counters and final stitcher states for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Pages supplied by the source.
    pub total_pages: usize,
    /// Pages actually scanned after page selection.
    pub scanned_pages: usize,
    pub weeks_state: StitchState,
    pub payments_state: StitchState,
    /// 1-indexed page on which the weeks table was found to end, if it did.
    pub weeks_end_page: Option<usize>,
    /// 1-indexed page on which the payments stitcher stopped, if it did.
    pub payments_end_page: Option<usize>,
    pub duration_ms: u64,
}

/// Everything one extraction run produces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionOutput {
    #[serde(rename = "weeks_data")]
    pub weeks: Vec<ContributionWeekRecord>,
    #[serde(rename = "summary_values")]
    pub summary: SummaryAggregate,
    #[serde(rename = "payments_data")]
    pub payments: Vec<PaymentRecord>,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
    #[serde(default)]
    pub stats: ExtractionStats,
}
