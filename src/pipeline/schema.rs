//! Schema descriptors and header matching.
//!
//! The two report tables are told apart by column count (9 vs 13) and then
//! confirmed by counting how many expected header labels appear in the
//! table's first row. Matching is symmetric partial containment on the
//! accent-folded text, so `"[5] Último salario"`, `"ULTIMO SALARIO"` and
//! `"salario"` all match the expected label `"Último salario"`.

use crate::error::FieldError;
use crate::model::{Cell, RawTable, YearMonth};
use crate::pipeline::clean::fold;
use crate::pipeline::normalize;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// The two table schemas this crate recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaKind {
    /// The 9-column contribution-weeks table.
    Weeks,
    /// The 13-column post-1995 payment-detail table.
    Payments,
}

impl SchemaKind {
    pub fn descriptor(self) -> &'static SchemaDescriptor {
        match self {
            SchemaKind::Weeks => &WEEKS,
            SchemaKind::Payments => &PAYMENTS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SchemaKind::Weeks => "weeks",
            SchemaKind::Payments => "payments",
        }
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Field extraction ─────────────────────────────────────────────────────

/// Output fields of both record types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    ContributorId,
    ContributorName,
    PeriodFrom,
    PeriodTo,
    LastSalary,
    Weeks,
    DeductionWeeks,
    SimultaneousWeeks,
    NetWeeks,
    Period,
    ReportedIncomeBase,
    ReportedDays,
    ContributedDays,
}

impl Field {
    /// Serialised field name, as used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Field::ContributorId => "contributor_id",
            Field::ContributorName => "contributor_name",
            Field::PeriodFrom => "period_from",
            Field::PeriodTo => "period_to",
            Field::LastSalary => "last_salary",
            Field::Weeks => "weeks",
            Field::DeductionWeeks => "deduction_weeks",
            Field::SimultaneousWeeks => "simultaneous_weeks",
            Field::NetWeeks => "net_weeks",
            Field::Period => "period",
            Field::ReportedIncomeBase => "reported_income_base",
            Field::ReportedDays => "reported_days",
            Field::ContributedDays => "contributed_days",
        }
    }
}

/// Which normaliser turns a cell into a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cleaner {
    Text,
    Date,
    Currency,
    Numeric,
    Period,
    Ibc,
    Days,
}

/// A normalised cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Date(NaiveDate),
    Amount(f64),
    Period(YearMonth),
    Days(u8),
}

impl Cleaner {
    pub fn apply(self, cell: &Cell) -> Result<Option<FieldValue>, FieldError> {
        let raw = cell.text();
        Ok(match self {
            Cleaner::Text => cell.non_empty().map(|s| FieldValue::Text(s.to_string())),
            Cleaner::Date => normalize::parse_date(raw)?.map(FieldValue::Date),
            Cleaner::Currency => normalize::parse_currency(raw)?.map(FieldValue::Amount),
            Cleaner::Numeric => normalize::parse_numeric(raw)?.map(FieldValue::Amount),
            Cleaner::Period => normalize::parse_period(raw)?.map(FieldValue::Period),
            Cleaner::Ibc => normalize::parse_ibc(raw)?.map(FieldValue::Amount),
            Cleaner::Days => normalize::parse_days(raw)?.map(FieldValue::Days),
        })
    }
}

/// Source column and normaliser for one output field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldExtractor {
    pub field: Field,
    pub column: usize,
    pub cleaner: Cleaner,
}

const fn extractor(field: Field, column: usize, cleaner: Cleaner) -> FieldExtractor {
    FieldExtractor {
        field,
        column,
        cleaner,
    }
}

// ── Descriptors ──────────────────────────────────────────────────────────

/// How a stitcher decides that its table has ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Page text (folded) contains one of these phrases.
    EndText(&'static [&'static str]),
    /// Page text (folded) contains none of these phrases.
    MissingContinuation(&'static [&'static str]),
}

/// Static description of one table schema.
#[derive(Debug)]
pub struct SchemaDescriptor {
    pub kind: SchemaKind,
    /// Header labels as printed in the report.
    pub expected_headers: &'static [&'static str],
    pub expected_column_count: usize,
    /// Default number of expected headers that must be found.
    pub match_threshold: usize,
    /// Folded label fragments that mark a reprinted header row.
    pub header_fragments: &'static [&'static str],
    pub field_extractors: &'static [FieldExtractor],
    pub termination: Termination,
}

pub static WEEKS: SchemaDescriptor = SchemaDescriptor {
    kind: SchemaKind::Weeks,
    expected_headers: &[
        "Identificación aportante",
        "Nombre o razón Social",
        "Desde",
        "Hasta",
        "Último salario",
        "Semanas",
        "Licencias (Lic.)",
        "Simultáneos (Sim.)",
        "Total",
    ],
    expected_column_count: 9,
    match_threshold: 6,
    header_fragments: &["[1] identificacion", "identificacion aportante", "identificacion"],
    field_extractors: &[
        extractor(Field::ContributorId, 0, Cleaner::Text),
        extractor(Field::ContributorName, 1, Cleaner::Text),
        extractor(Field::PeriodFrom, 2, Cleaner::Date),
        extractor(Field::PeriodTo, 3, Cleaner::Date),
        extractor(Field::LastSalary, 4, Cleaner::Currency),
        extractor(Field::Weeks, 5, Cleaner::Numeric),
        extractor(Field::DeductionWeeks, 6, Cleaner::Numeric),
        extractor(Field::SimultaneousWeeks, 7, Cleaner::Numeric),
        extractor(Field::NetWeeks, 8, Cleaner::Numeric),
    ],
    termination: Termination::EndText(&[
        "total semanas cotizadas",
        "total de semanas cotizadas",
        "total semanas",
        "resumen de semanas",
        "total general",
    ]),
};

pub static PAYMENTS: SchemaDescriptor = SchemaDescriptor {
    kind: SchemaKind::Payments,
    expected_headers: &[
        "Identificación Aportante",
        "Nombre o Razón Social",
        "RA",
        "Período",
        "Fecha De Pago",
        "Referencia de Pago",
        "IBC Reportado",
        "Cotización Pagada",
        "Cotización Mora Sin Intereses",
        "Nov.",
        "Días Rep.",
        "Días Cot.",
        "Observación",
    ],
    expected_column_count: 13,
    match_threshold: 8,
    header_fragments: &[
        "[34] identificacion",
        "[35] nombre",
        "[36] ra",
        "[37] periodo",
        "[38] fecha",
        "[39] referencia",
        "[40] ibc",
        "[41] cotizacion",
        "[42] mora",
        "[43] nov",
        "[44] dias rep",
        "[45] dias cot",
        "[46] observacion",
        "identificacion aportante",
        "identificacion empleador",
        "nombre o razon",
        "periodo",
        "fecha de pago",
        "ibc reportado",
        "dias rep",
        "dias cot",
    ],
    field_extractors: &[
        extractor(Field::ContributorId, 0, Cleaner::Text),
        extractor(Field::ContributorName, 1, Cleaner::Text),
        extractor(Field::Period, 3, Cleaner::Period),
        extractor(Field::ReportedIncomeBase, 6, Cleaner::Ibc),
        extractor(Field::ReportedDays, 10, Cleaner::Days),
        extractor(Field::ContributedDays, 11, Cleaner::Days),
    ],
    termination: Termination::MissingContinuation(&[
        "detalle de pagos",
        "pagos efectuados",
        "a partir de 1995",
        "ibc reportado",
    ]),
};

impl SchemaDescriptor {
    /// Whether folded `text` contains one of this schema's header fragments.
    pub fn is_header_fragment(&self, folded: &str) -> bool {
        self.header_fragments.iter().any(|frag| folded.contains(frag))
    }

    /// Number of expected headers matched by `header_row`.
    ///
    /// Each expected label counts once, at its first matching cell. Empty
    /// header cells never match.
    pub fn header_score(&self, header_row: &[Cell]) -> usize {
        self.expected_headers
            .iter()
            .filter(|expected| {
                let expected = fold(expected);
                header_row.iter().any(|cell| {
                    let actual = cell.folded();
                    !actual.is_empty() && (expected.contains(actual) || actual.contains(&expected))
                })
            })
            .count()
    }

    /// Whether `table` belongs to this schema.
    pub fn matches(&self, table: &RawTable, threshold: usize) -> bool {
        if table.len() < 2 {
            return false;
        }
        let header = &table[0];
        if header.len() != self.expected_column_count {
            return false;
        }
        let score = self.header_score(header);
        let accepted = score >= threshold;
        if accepted {
            debug!(
                "{} table accepted with {}/{} header matches",
                self.kind,
                score,
                self.expected_headers.len()
            );
        }
        accepted
    }
}
