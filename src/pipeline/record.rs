//! Typed record construction from classified data rows.
//!
//! Weeks rows are mapped strictly by position. Payments rows go through an
//! ordered list of attempts: the 13-column positional layout first, then a
//! content-sniffing pass that only fills fields still missing. Field-level
//! failures become nulls plus a [`Diagnostic`]; a row is never dropped for a
//! bad field, only for the wrong shape or a missing identity.

use crate::error::Diagnostic;
use crate::model::{Cell, ContributionWeekRecord, PaymentRecord, YearMonth};
use crate::pipeline::normalize;
use crate::pipeline::schema::{Field, FieldValue, SchemaDescriptor, SchemaKind, PAYMENTS, WEEKS};
use tracing::{debug, warn};

/// Per-row context: the 1-indexed page and the run's diagnostic sink.
pub struct RowContext<'a> {
    pub page: usize,
    pub diagnostics: &'a mut Vec<Diagnostic>,
}

impl RowContext<'_> {
    fn parse_failure(&mut self, schema: SchemaKind, field: Field, raw: &str) {
        warn!(
            "Page {}: {} field '{}' could not be parsed from {:?}",
            self.page,
            schema,
            field.name(),
            raw
        );
        self.diagnostics.push(Diagnostic::ParseFailure {
            page: self.page,
            schema,
            field: field.name().to_string(),
            raw: raw.to_string(),
        });
    }

    fn structural_mismatch(&mut self, schema: SchemaKind, expected: usize, found: usize) {
        warn!(
            "Page {}: dropping {} row with {} cells (expected {})",
            self.page, schema, found, expected
        );
        self.diagnostics.push(Diagnostic::StructuralMismatch {
            page: self.page,
            schema,
            expected,
            found,
        });
    }
}

/// A record type that one of the table schemas produces.
pub trait SchemaRecord: Sized {
    fn descriptor() -> &'static SchemaDescriptor;

    /// Build a record from a row already classified as data.
    fn from_row(row: &[Cell], ctx: &mut RowContext<'_>) -> Option<Self>;
}

// ── Weeks ────────────────────────────────────────────────────────────────

impl SchemaRecord for ContributionWeekRecord {
    fn descriptor() -> &'static SchemaDescriptor {
        &WEEKS
    }

    fn from_row(row: &[Cell], ctx: &mut RowContext<'_>) -> Option<Self> {
        let schema = &WEEKS;
        if row.len() != schema.expected_column_count {
            ctx.structural_mismatch(schema.kind, schema.expected_column_count, row.len());
            return None;
        }

        let mut record = ContributionWeekRecord::default();
        for x in schema.field_extractors {
            let cell = &row[x.column];
            match x.cleaner.apply(cell) {
                Ok(Some(value)) => assign_week(&mut record, x.field, value),
                Ok(None) => {}
                Err(e) => ctx.parse_failure(schema.kind, x.field, e.raw()),
            }
        }
        Some(record)
    }
}

fn assign_week(record: &mut ContributionWeekRecord, field: Field, value: FieldValue) {
    match (field, value) {
        (Field::ContributorId, FieldValue::Text(s)) => record.contributor_id = Some(s),
        (Field::ContributorName, FieldValue::Text(s)) => record.contributor_name = Some(s),
        (Field::PeriodFrom, FieldValue::Date(d)) => record.period_from = Some(d),
        (Field::PeriodTo, FieldValue::Date(d)) => record.period_to = Some(d),
        (Field::LastSalary, FieldValue::Amount(v)) => record.last_salary = Some(v),
        (Field::Weeks, FieldValue::Amount(v)) => record.weeks = Some(v),
        (Field::DeductionWeeks, FieldValue::Amount(v)) => record.deduction_weeks = Some(v),
        (Field::SimultaneousWeeks, FieldValue::Amount(v)) => record.simultaneous_weeks = Some(v),
        (Field::NetWeeks, FieldValue::Amount(v)) => record.net_weeks = Some(v),
        (field, value) => debug!("Ignoring {:?} for weeks field {:?}", value, field),
    }
}

// ── Payments ─────────────────────────────────────────────────────────────

/// Fields of a payment row gathered by one attempt.
#[derive(Debug, Clone, Default, PartialEq)]
struct PaymentFields {
    contributor_id: Option<String>,
    contributor_name: Option<String>,
    period: Option<YearMonth>,
    reported_income_base: Option<f64>,
    reported_days: Option<u8>,
    contributed_days: Option<u8>,
    /// Fields whose source cell failed to normalise, with the raw text.
    failures: Vec<(Field, String)>,
}

impl PaymentFields {
    fn is_complete(&self) -> bool {
        self.period.is_some()
            && self.reported_income_base.is_some()
            && self.reported_days.is_some()
            && self.contributed_days.is_some()
    }

    /// Fill fields still missing from a later attempt.
    fn fill_from(&mut self, later: PaymentFields) {
        self.period = self.period.or(later.period);
        self.reported_income_base = self.reported_income_base.or(later.reported_income_base);
        self.reported_days = self.reported_days.or(later.reported_days);
        self.contributed_days = self.contributed_days.or(later.contributed_days);
        self.failures.extend(later.failures);
    }

    fn is_set(&self, field: Field) -> bool {
        match field {
            Field::ContributorId => self.contributor_id.is_some(),
            Field::ContributorName => self.contributor_name.is_some(),
            Field::Period => self.period.is_some(),
            Field::ReportedIncomeBase => self.reported_income_base.is_some(),
            Field::ReportedDays => self.reported_days.is_some(),
            Field::ContributedDays => self.contributed_days.is_some(),
            _ => false,
        }
    }
}

/// Known 13-column layout: period at 3, IBC at 6, days at 10 and 11.
fn positional_attempt(row: &[Cell]) -> PaymentFields {
    let mut fields = PaymentFields::default();
    if row.len() < PAYMENTS.expected_column_count {
        return fields;
    }
    for x in PAYMENTS.field_extractors {
        let cell = &row[x.column];
        match x.cleaner.apply(cell) {
            Ok(Some(value)) => match (x.field, value) {
                (Field::ContributorId, FieldValue::Text(s)) => fields.contributor_id = Some(s),
                (Field::ContributorName, FieldValue::Text(s)) => fields.contributor_name = Some(s),
                (Field::Period, FieldValue::Period(p)) => fields.period = Some(p),
                (Field::ReportedIncomeBase, FieldValue::Amount(v)) => {
                    fields.reported_income_base = Some(v)
                }
                (Field::ReportedDays, FieldValue::Days(d)) => fields.reported_days = Some(d),
                (Field::ContributedDays, FieldValue::Days(d)) => fields.contributed_days = Some(d),
                (field, value) => debug!("Ignoring {:?} for payments field {:?}", value, field),
            },
            Ok(None) => {}
            Err(e) => fields.failures.push((x.field, e.raw().to_string())),
        }
    }
    fields
}

/// Scan every cell for content shaped like a period, an IBC or day counts.
fn sniffing_attempt(row: &[Cell]) -> PaymentFields {
    let mut fields = PaymentFields::default();

    // The first cell of the right shape owns the field, even when it is blank or invalid.
    fields.period = row
        .iter()
        .map(Cell::text)
        .find(|s| s.len() == 6 && s.bytes().all(|b| b.is_ascii_digit()))
        .and_then(normalize::normalize_period);

    fields.reported_income_base = row
        .iter()
        .map(Cell::text)
        .find(|s| s.contains('$') || (s.contains('.') && s.contains(',')))
        .and_then(normalize::normalize_ibc);

    let mut days = row
        .iter()
        .map(Cell::text)
        .filter(|s| normalize::looks_like_days(s))
        .filter_map(normalize::normalize_days);
    fields.reported_days = days.next();
    fields.contributed_days = days.next();

    fields
}

impl SchemaRecord for PaymentRecord {
    fn descriptor() -> &'static SchemaDescriptor {
        &PAYMENTS
    }

    fn from_row(row: &[Cell], ctx: &mut RowContext<'_>) -> Option<Self> {
        let schema = &PAYMENTS;
        if row.len() < 3 {
            ctx.structural_mismatch(schema.kind, schema.expected_column_count, row.len());
            return None;
        }

        let mut fields = positional_attempt(row);
        fields.contributor_id = fields
            .contributor_id
            .or_else(|| row[0].non_empty().map(str::to_string));
        fields.contributor_name = fields
            .contributor_name
            .or_else(|| row[1].non_empty().map(str::to_string));

        if !fields.is_complete() {
            fields.fill_from(sniffing_attempt(row));
        }

        let (Some(contributor_id), Some(contributor_name)) =
            (fields.contributor_id.take(), fields.contributor_name.take())
        else {
            debug!("Page {}: payments row without identifier or name", ctx.page);
            return None;
        };

        for (field, raw) in &fields.failures {
            if !fields.is_set(*field) {
                ctx.parse_failure(schema.kind, *field, raw);
            }
        }

        Some(PaymentRecord {
            contributor_id,
            contributor_name,
            period: fields.period,
            reported_income_base: fields.reported_income_base,
            reported_days: fields.reported_days,
            contributed_days: fields.contributed_days,
        })
    }
}
