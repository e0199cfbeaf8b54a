//! Pipeline stages for report extraction.
//!
//! Each submodule implements one step. The stages are pure functions of the
//! page data except [`stitch`], whose state lives in a per-run
//! [`stitch::TableStitcher`].
//!
//! ## Data Flow
//!
//! ```text
//! clean ──▶ schema ──▶ classify ──▶ record ──▶ stitch
//! (cells)   (match)    (rows)       (fields)   (pages)
//!
//! clean ──▶ summary                         (page text)
//! ```
//!
//! 1. [`clean`]    : cell and label text cleanup, applied once at ingestion
//! 2. [`normalize`]: Colombian numbers, currency, dates and periods
//! 3. [`schema`]   : the two table descriptors and header matching
//! 4. [`classify`] : data / header-repeat / summary / empty rows
//! 5. [`record`]   : typed records from data rows, with diagnostics
//! 6. [`stitch`]   : Seeking → Accumulating → Done, one per schema
//! 7. [`summary`]  : labelled totals from the page text

pub mod classify;
pub mod clean;
pub mod normalize;
pub mod record;
pub mod schema;
pub mod stitch;
pub mod summary;
