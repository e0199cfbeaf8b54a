//! Row classification for accepted tables.
//!
//! Rules are evaluated in order and the first match wins:
//!
//! 1. no non-empty cell → [`RowClassification::Empty`]
//! 2. first cell mentions a total → [`RowClassification::Summary`]
//! 3. reprinted header labels → [`RowClassification::HeaderRepeat`]
//!    (payments only: sparse header-continuation rows → `Summary`)
//! 4. first cell shorter than 2 characters → `Empty`
//! 5. everything else is data, confirmed or not
//!
//! Unconfirmed identifiers are kept: an odd-looking row passed through is
//! easier to filter downstream than a legitimate row silently dropped here.

use crate::model::Cell;
use crate::pipeline::schema::{SchemaDescriptor, SchemaKind};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

const SUMMARY_MARKERS: [&str; 5] = ["total", "suma", "resumen", "subtotal", "gran total"];

/// Numbered payments header tags `[34]` .. `[46]`.
static RE_PAYMENTS_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(?:3[4-9]|4[0-6])\]").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowClassification {
    Data,
    HeaderRepeat,
    Summary,
    Empty,
    /// Could not confirm an identifier shape. Treated as data.
    Indeterminate,
}

impl RowClassification {
    pub fn is_data(self) -> bool {
        matches!(self, RowClassification::Data | RowClassification::Indeterminate)
    }
}

/// Classify one row of a table accepted for `schema`.
pub fn classify(row: &[Cell], schema: &SchemaDescriptor) -> RowClassification {
    if row.iter().all(Cell::is_empty) {
        return RowClassification::Empty;
    }

    let first = row.first().map(Cell::folded).unwrap_or_default();

    if SUMMARY_MARKERS.iter().any(|m| first.contains(m)) {
        return RowClassification::Summary;
    }

    let payments = schema.kind == SchemaKind::Payments;

    if schema.is_header_fragment(first) {
        return RowClassification::HeaderRepeat;
    }

    if payments
        && row.iter().skip(1).any(|cell| {
            cell.is_multiline()
                && RE_PAYMENTS_TAG.is_match(cell.folded())
                && schema.is_header_fragment(cell.folded())
        })
    {
        return RowClassification::HeaderRepeat;
    }

    let leading_header_cells = row
        .iter()
        .take(3)
        .filter(|cell| schema.is_header_fragment(cell.folded()))
        .count();
    if leading_header_cells >= 2 {
        return RowClassification::HeaderRepeat;
    }

    if payments {
        if first.is_empty()
            && row
                .get(1)
                .is_some_and(|second| schema.is_header_fragment(second.folded()))
        {
            return RowClassification::HeaderRepeat;
        }

        let empty_cells = row.iter().filter(|cell| cell.is_empty()).count();
        let any_header = row.iter().any(|cell| schema.is_header_fragment(cell.folded()));
        if empty_cells >= 3 && any_header {
            return RowClassification::Summary;
        }
    }

    if first.chars().count() < 2 {
        return RowClassification::Empty;
    }

    if looks_like_identifier(first) {
        RowClassification::Data
    } else {
        RowClassification::Indeterminate
    }
}

/// Numeric with at least 6 digits, or alphanumeric once spaces, dashes and
/// dots are removed.
fn looks_like_identifier(first: &str) -> bool {
    if first.len() >= 6 && first.bytes().all(|b| b.is_ascii_digit()) {
        return true;
    }
    let compact: String = first
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.'))
        .collect();
    !compact.is_empty() && compact.chars().all(char::is_alphanumeric)
}
