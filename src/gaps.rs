//! Gap analysis over payment periods.

use crate::error::ExtractError;
use crate::model::{GapReport, PaymentRecord, YearMonth};
use std::collections::BTreeSet;

/// Months missing between the earliest and latest of `periods`.
///
/// Periods are all `YYYY-MM` if any of them contains a dash, otherwise all
/// `YYYYMM`. Fails on an empty input or any period that does not parse in
/// the chosen format.
pub fn analyze_gaps<S: AsRef<str>>(periods: &[S]) -> Result<GapReport, ExtractError> {
    if periods.is_empty() {
        return Err(ExtractError::NoPeriods);
    }

    let dashed = periods.iter().any(|p| p.as_ref().contains('-'));
    let (parse, expected): (fn(&str) -> Option<YearMonth>, &'static str) = if dashed {
        (YearMonth::parse_dashed, "YYYY-MM")
    } else {
        (YearMonth::parse_compact, "YYYYMM")
    };

    let parsed = periods
        .iter()
        .map(|p| {
            let raw = p.as_ref();
            parse(raw).ok_or_else(|| ExtractError::InvalidPeriod {
                raw: raw.to_string(),
                expected,
            })
        })
        .collect::<Result<BTreeSet<_>, _>>()?;

    gap_report(&parsed)
}

fn gap_report(present: &BTreeSet<YearMonth>) -> Result<GapReport, ExtractError> {
    let (Some(&start), Some(&end)) = (present.first(), present.last()) else {
        return Err(ExtractError::NoPeriods);
    };

    let missing: Vec<YearMonth> = std::iter::successors(Some(start), |m| m.succ())
        .take_while(|m| *m < end)
        .filter(|m| !present.contains(m))
        .collect();

    Ok(GapReport {
        missing_count: missing.len(),
        missing_periods: missing,
        start_period: start,
        end_period: end,
    })
}

impl GapReport {
    /// Gap analysis over the periods of `payments`, ignoring null periods.
    pub fn from_payments(payments: &[PaymentRecord]) -> Result<GapReport, ExtractError> {
        let present: BTreeSet<YearMonth> = payments.iter().filter_map(|p| p.period).collect();
        gap_report(&present)
    }
}
