//! Labelled totals mined from page text.
//!
//! Two labels are recognised:
//!
//! * `[26] TOTAL SEMANAS`: total weeks in the report. The value sits on the
//!   same line or within the next few non-empty lines and must exceed a
//!   floor, which screens out stray day counts and tags.
//! * `[11] SEMANAS COTIZADAS CON TARIFA DE ALTO RIESGO`: high-risk weeks,
//!   with a narrower window and no floor.
//!
//! A line mentioning `total semanas` without the tag sets the total from the
//! same line only, and only when no tagged total was found on that page.

use crate::config::ExtractionConfig;
use crate::model::SummaryAggregate;
use crate::pipeline::clean::{clean_lines, fold};
use crate::pipeline::normalize::{line_numeric, summary_numeric};
use tracing::debug;

const TOTAL_TAG: &str = "[26]";
const TOTAL_LABEL: &str = "total semanas";
const HIGH_RISK_TAG: &str = "[11]";
const HIGH_RISK_LABEL: &str = "semanas cotizadas con tarifa de alto riesgo";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryMiner {
    total_lookahead: usize,
    high_risk_lookahead: usize,
    min_total: f64,
}

impl Default for SummaryMiner {
    fn default() -> Self {
        Self {
            total_lookahead: 4,
            high_risk_lookahead: 2,
            min_total: 100.0,
        }
    }
}

impl SummaryMiner {
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            total_lookahead: config.total_weeks_lookahead,
            high_risk_lookahead: config.high_risk_lookahead,
            min_total: config.min_total_weeks,
        }
    }

    /// Mine one page's text. Fields not found on the page stay `None`.
    pub fn mine(&self, text: &str) -> SummaryAggregate {
        let lines = clean_lines(text);
        let mut found = SummaryAggregate::default();

        for (i, line) in lines.iter().enumerate() {
            let folded = fold(line);

            if folded.contains(TOTAL_TAG) && folded.contains(TOTAL_LABEL) {
                let floor = self.min_total;
                if let Some(v) = scan(&lines, i, self.total_lookahead, summary_numeric, |v| {
                    v != 26.0 && v > floor
                }) {
                    debug!("Total weeks {} near line {:?}", v, line);
                    found.weeks_total_report = Some(v);
                }
            } else if folded.contains(TOTAL_LABEL) && found.weeks_total_report.is_none() {
                if let Some(v) = summary_numeric(line).filter(|v| *v > self.min_total) {
                    debug!("Total weeks {} on unmarked line {:?}", v, line);
                    found.weeks_total_report = Some(v);
                }
            }

            if folded.contains(HIGH_RISK_TAG) && folded.contains(HIGH_RISK_LABEL) {
                if let Some(v) = scan(&lines, i, self.high_risk_lookahead, line_numeric, |v| v != 11.0) {
                    debug!("High-risk weeks {} near line {:?}", v, line);
                    found.weeks_high_risk = Some(v);
                }
            }
        }

        found
    }
}

/// Look for an accepted value on `lines[at]`, then on up to `lookahead`
/// following lines.
fn scan(
    lines: &[String],
    at: usize,
    lookahead: usize,
    parse: fn(&str) -> Option<f64>,
    accept: impl Fn(f64) -> bool,
) -> Option<f64> {
    lines
        .iter()
        .skip(at)
        .take(lookahead + 1)
        .filter_map(|line| parse(line))
        .find(|v| accept(*v))
}
