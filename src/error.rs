//! Error types for the colpensiones-extract library.
//!
//! Three distinct types reflect three distinct failure modes:
//!
//! * [`ExtractError`]: **fatal**, the extraction cannot proceed at all
//!   (page source unreadable, malformed page document, invalid configuration).
//!   Returned as `Err(ExtractError)` from the top-level `extract*` functions.
//!
//! * [`FieldError`]: a single cell failed locale normalisation. Returned by
//!   the `parse_*` functions in [`crate::pipeline::normalize`]; the pipeline
//!   always recovers it as a null field.
//!
//! * [`Diagnostic`]: **non-fatal**, the record of a recovered field or row
//!   failure. Stored inside [`crate::model::ExtractionOutput`] so callers can
//!   inspect what was nulled or dropped without losing the rest of the document.

use crate::pipeline::schema::SchemaKind;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the colpensiones-extract library.
///
/// Field- and row-level failures use [`Diagnostic`] and are stored in
/// [`crate::model::ExtractionOutput`] rather than propagated here.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Source errors ─────────────────────────────────────────────────────
    /// Page document was not found at the given path.
    #[error("Page document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The layout engine could not produce pages for the document.
    #[error("Failed to read pages from '{origin}': {detail}")]
    SourceRead { origin: String, detail: String },

    // ── Gap analysis errors ───────────────────────────────────────────────
    /// Gap analysis needs at least one period.
    #[error("Gap analysis needs at least one period")]
    NoPeriods,

    /// A period could not be parsed in the format chosen for the call.
    #[error("Invalid period '{raw}': expected {expected}")]
    InvalidPeriod { raw: String, expected: &'static str },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output JSON file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A single raw value that could not be normalised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("unrecognised date {0:?}")]
    Date(String),

    #[error("unrecognised period {0:?} (expected YYYYMM)")]
    Period(String),

    #[error("unrecognised number {0:?}")]
    Number(String),

    #[error("day count {0:?} is not an integer in 1..=31")]
    Days(String),
}

impl FieldError {
    /// The raw text that failed to parse.
    pub fn raw(&self) -> &str {
        match self {
            FieldError::Date(s)
            | FieldError::Period(s)
            | FieldError::Number(s)
            | FieldError::Days(s) => s,
        }
    }
}

/// A recovered, non-fatal problem met while building records.
///
/// Pages are 1-indexed.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A field failed normalisation and was emitted as null.
    #[error("Page {page}: {schema} field '{field}' could not be parsed from {raw:?}")]
    ParseFailure {
        page: usize,
        schema: SchemaKind,
        field: String,
        raw: String,
    },

    /// A row had the wrong number of cells for its schema and was dropped.
    #[error("Page {page}: {schema} row has {found} cells, expected {expected}")]
    StructuralMismatch {
        page: usize,
        schema: SchemaKind,
        expected: usize,
        found: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_read_display() {
        let e = ExtractError::SourceRead {
            origin: "report.json".into(),
            detail: "expected value at line 1".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("report.json"), "got: {msg}");
        assert!(msg.contains("line 1"), "got: {msg}");
    }

    #[test]
    fn invalid_period_display() {
        let e = ExtractError::InvalidPeriod {
            raw: "2020-13".into(),
            expected: "YYYY-MM",
        };
        assert!(e.to_string().contains("2020-13"));
        assert!(e.to_string().contains("YYYY-MM"));
    }

    #[test]
    fn field_error_keeps_raw_text() {
        assert_eq!(FieldError::Period("199713".into()).raw(), "199713");
        assert_eq!(FieldError::Days("45".into()).raw(), "45");
    }

    #[test]
    fn structural_mismatch_display() {
        let d = Diagnostic::StructuralMismatch {
            page: 3,
            schema: SchemaKind::Weeks,
            expected: 9,
            found: 8,
        };
        let msg = d.to_string();
        assert!(msg.contains("Page 3"), "got: {msg}");
        assert!(msg.contains("8 cells"), "got: {msg}");
    }

    #[test]
    fn diagnostic_serialises_with_kind_tag() {
        let d = Diagnostic::ParseFailure {
            page: 1,
            schema: SchemaKind::Payments,
            field: "period".into(),
            raw: "199713".into(),
        };
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["kind"], "parse_failure");
        assert_eq!(json["schema"], "payments");
        assert_eq!(json["raw"], "199713");
    }
}
