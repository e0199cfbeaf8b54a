//! # colpensiones-extract
//!
//! Extract contribution-week and payment tables, plus the reported totals,
//! from Colpensiones pension reports ("historia laboral").
//!
//! A layout engine outside this crate reduces each report page to raw table
//! grids and page text. This crate recognises which grids belong to the two
//! known tables, drops reprinted headers and total rows, normalises Colombian
//! numbers and dates, stitches each table across pages, and mines the
//! labelled totals out of the free text.
//!
//! ## Pipeline Overview
//!
//! ```text
//! pages (JSON / in memory)
//!  │
//!  ├─ 1. Source    load RawPages, cleaning every cell once
//!  ├─ 2. Match     accept tables by column count + header labels
//!  ├─ 3. Classify  data / reprinted header / total / empty
//!  ├─ 4. Build     typed records, locale-aware field parsing
//!  ├─ 5. Stitch    per-schema state machine across pages
//!  ├─ 6. Mine      [26] total weeks and [11] high-risk weeks from text
//!  └─ 7. Output    weeks_data + summary_values + payments_data
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use colpensiones_extract::{extract_file, ExtractionConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let output = extract_file("report.pages.json", &ExtractionConfig::default())?;
//!     println!("{} weeks rows, {} payments", output.weeks.len(), output.payments.len());
//!     if let Ok(gaps) = output.gap_report() {
//!         eprintln!("{} months without payment", gaps.missing_count);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `colpensiones-extract` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! colpensiones-extract = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod gaps;
pub mod model;
pub mod pipeline;
pub mod progress;
pub mod source;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder, PageSelection};
pub use error::{Diagnostic, ExtractError, FieldError};
pub use extract::{
    analyze_gaps, extract, extract_file, extract_from_source, extract_to_file, write_json,
    ExtractionSession, PageReport,
};
pub use model::{
    Cell, ContributionWeekRecord, ExtractionOutput, ExtractionStats, GapReport, PaymentRecord,
    RawPage, RawRow, RawTable, SummaryAggregate, YearMonth,
};
pub use pipeline::classify::RowClassification;
pub use pipeline::schema::SchemaKind;
pub use pipeline::stitch::StitchState;
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use source::{JsonPageSource, PageSource};
