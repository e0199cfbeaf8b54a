//! Multi-page table stitching.
//!
//! One [`TableStitcher`] follows one schema through the document:
//!
//! ```text
//!   Seeking ──first matching table──▶ Accumulating ──end detected──▶ Done
//! ```
//!
//! The header row of the first accepted table is skipped. From then on the
//! first row of every continuation table is classified like any other row,
//! so a reprinted header is caught as [`RowClassification::HeaderRepeat`].
//!
//! End detection only runs on pages where no table matched, so a page that
//! carries both the last rows and the closing totals is still consumed.

use crate::error::Diagnostic;
use crate::model::RawPage;
use crate::pipeline::classify::{classify, RowClassification};
use crate::pipeline::clean::fold;
use crate::pipeline::record::{RowContext, SchemaRecord};
use crate::pipeline::schema::{SchemaDescriptor, SchemaKind, Termination};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StitchState {
    /// No matching table confirmed yet.
    #[default]
    Seeking,
    /// At least one matching table has been consumed.
    Accumulating,
    /// Terminal; no further pages are scanned for this schema.
    Done,
}

/// What one page contributed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageOutcome {
    pub tables_matched: usize,
    pub records_added: usize,
    /// The stitcher moved to [`StitchState::Done`] on this page.
    pub ended: bool,
}

/// Accumulates one schema's records across pages.
#[derive(Debug)]
pub struct TableStitcher<R> {
    descriptor: &'static SchemaDescriptor,
    threshold: usize,
    early_stop: bool,
    state: StitchState,
    header_consumed: bool,
    history: Vec<StitchState>,
    end_page: Option<usize>,
    records: Vec<R>,
}

impl<R: SchemaRecord> TableStitcher<R> {
    /// `threshold` is the header match count; `early_stop` enables
    /// termination for schemas without closing text.
    pub fn new(threshold: usize, early_stop: bool) -> Self {
        Self {
            descriptor: R::descriptor(),
            threshold,
            early_stop,
            state: StitchState::Seeking,
            header_consumed: false,
            history: vec![StitchState::Seeking],
            end_page: None,
            records: Vec::new(),
        }
    }

    pub fn schema(&self) -> SchemaKind {
        self.descriptor.kind
    }

    pub fn state(&self) -> StitchState {
        self.state
    }

    /// Every state entered so far, starting with `Seeking`.
    pub fn history(&self) -> &[StitchState] {
        &self.history
    }

    pub fn header_consumed(&self) -> bool {
        self.header_consumed
    }

    /// 1-indexed page on which the stitcher reached `Done`.
    pub fn end_page(&self) -> Option<usize> {
        self.end_page
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn into_records(self) -> Vec<R> {
        self.records
    }

    /// Consume one page. `page_no` is 1-indexed.
    pub fn process_page(
        &mut self,
        page_no: usize,
        page: &RawPage,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> PageOutcome {
        let mut outcome = PageOutcome::default();
        if self.state == StitchState::Done {
            return outcome;
        }

        let descriptor = self.descriptor;
        let matching: Vec<_> = page
            .raw_tables
            .iter()
            .filter(|table| descriptor.matches(table, self.threshold))
            .collect();

        if matching.is_empty() {
            if self.state == StitchState::Accumulating && self.ends_on(&page.raw_text) {
                info!("{} table ends on page {}", descriptor.kind, page_no);
                self.transition(StitchState::Done);
                self.end_page = Some(page_no);
                outcome.ended = true;
            }
            return outcome;
        }

        if self.state == StitchState::Seeking {
            info!("{} table found on page {}", descriptor.kind, page_no);
            self.transition(StitchState::Accumulating);
        }

        let mut ctx = RowContext {
            page: page_no,
            diagnostics,
        };

        for table in matching {
            outcome.tables_matched += 1;
            for (i, row) in table.iter().enumerate() {
                if i == 0 && !self.header_consumed {
                    self.header_consumed = true;
                    continue;
                }
                let class = classify(row, descriptor);
                if !class.is_data() {
                    if class != RowClassification::Empty {
                        debug!("Page {}: skipping {:?} row", page_no, class);
                    }
                    continue;
                }
                if let Some(record) = R::from_row(row, &mut ctx) {
                    self.records.push(record);
                    outcome.records_added += 1;
                }
            }
        }

        debug!(
            "Page {}: {} {} records from {} table(s)",
            page_no, outcome.records_added, descriptor.kind, outcome.tables_matched
        );
        outcome
    }

    fn ends_on(&self, text: &str) -> bool {
        let text = fold(text);
        match self.descriptor.termination {
            Termination::EndText(phrases) => phrases.iter().any(|p| text.contains(p)),
            Termination::MissingContinuation(phrases) => {
                self.early_stop && !phrases.iter().any(|p| text.contains(p))
            }
        }
    }

    fn transition(&mut self, next: StitchState) {
        self.state = next;
        self.history.push(next);
    }
}
