//! Extraction entry points and the per-run session.
//!
//! [`ExtractionSession`] owns everything one run mutates: both stitchers,
//! the summary aggregate and the diagnostics. Nothing is shared between
//! runs, so reports can be extracted concurrently on separate threads with
//! no locking.
//!
//! The `extract*` functions are thin wrappers that load pages, walk the
//! selected ones through a session and return the [`ExtractionOutput`].

use crate::config::ExtractionConfig;
use crate::error::{Diagnostic, ExtractError};
use crate::gaps;
use crate::model::{
    ContributionWeekRecord, ExtractionOutput, ExtractionStats, GapReport, PaymentRecord, RawPage,
    SummaryAggregate,
};
use crate::pipeline::stitch::TableStitcher;
use crate::pipeline::summary::SummaryMiner;
use crate::source::{JsonPageSource, PageSource};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Records one page contributed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageReport {
    pub weeks_added: usize,
    pub payments_added: usize,
}

/// One extraction run over one report.
pub struct ExtractionSession {
    config: ExtractionConfig,
    weeks: TableStitcher<ContributionWeekRecord>,
    payments: TableStitcher<PaymentRecord>,
    miner: SummaryMiner,
    summary: SummaryAggregate,
    diagnostics: Vec<Diagnostic>,
    total_pages: usize,
    scanned_pages: usize,
    started: Instant,
}

impl ExtractionSession {
    /// Start a run over a report of `total_pages` pages.
    pub fn new(config: &ExtractionConfig, total_pages: usize) -> Self {
        Self {
            weeks: TableStitcher::new(config.weeks_match_threshold, false),
            payments: TableStitcher::new(config.payments_match_threshold, config.payments_early_stop),
            miner: SummaryMiner::from_config(config),
            config: config.clone(),
            summary: SummaryAggregate::default(),
            diagnostics: Vec::new(),
            total_pages,
            scanned_pages: 0,
            started: Instant::now(),
        }
    }

    /// Scan one page. `page_num` is 1-indexed and pages must arrive in
    /// document order.
    pub fn process_page(&mut self, page_num: usize, page: &RawPage) -> PageReport {
        let cb = self.config.progress_callback.clone();
        if let Some(ref cb) = cb {
            cb.on_page_start(page_num, self.total_pages);
        }
        self.scanned_pages += 1;

        let weeks = self.weeks.process_page(page_num, page, &mut self.diagnostics);
        let payments = self.payments.process_page(page_num, page, &mut self.diagnostics);

        let found = self.miner.mine(&page.raw_text);
        if !found.is_empty() {
            debug!("Page {}: summary values {:?}", page_num, found);
        }
        self.summary.merge(found);

        if let Some(ref cb) = cb {
            if weeks.ended {
                cb.on_table_end(self.weeks.schema(), page_num);
            }
            if payments.ended {
                cb.on_table_end(self.payments.schema(), page_num);
            }
            cb.on_page_complete(
                page_num,
                self.total_pages,
                weeks.records_added,
                payments.records_added,
            );
        }

        PageReport {
            weeks_added: weeks.records_added,
            payments_added: payments.records_added,
        }
    }

    pub fn weeks(&self) -> &TableStitcher<ContributionWeekRecord> {
        &self.weeks
    }

    pub fn payments(&self) -> &TableStitcher<PaymentRecord> {
        &self.payments
    }

    pub fn summary(&self) -> &SummaryAggregate {
        &self.summary
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Close the run and collect its output.
    pub fn finish(self) -> ExtractionOutput {
        let stats = ExtractionStats {
            total_pages: self.total_pages,
            scanned_pages: self.scanned_pages,
            weeks_state: self.weeks.state(),
            payments_state: self.payments.state(),
            weeks_end_page: self.weeks.end_page(),
            payments_end_page: self.payments.end_page(),
            duration_ms: self.started.elapsed().as_millis() as u64,
        };

        let output = ExtractionOutput {
            weeks: self.weeks.into_records(),
            summary: self.summary,
            payments: self.payments.into_records(),
            diagnostics: self.diagnostics,
            stats,
        };

        info!(
            "Extraction complete: {} weeks records, {} payment records, {} diagnostics, {}ms",
            output.weeks.len(),
            output.payments.len(),
            output.diagnostics.len(),
            output.stats.duration_ms
        );

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_extraction_complete(output.weeks.len(), output.payments.len());
        }

        output
    }
}

impl ExtractionOutput {
    /// Gap analysis over the extracted payment periods.
    pub fn gap_report(&self) -> Result<GapReport, ExtractError> {
        GapReport::from_payments(&self.payments)
    }
}

// ── Entry points ─────────────────────────────────────────────────────────

/// Extract both tables and the summary totals from already-loaded pages.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(ExtractionOutput)` even when nothing matched: an unrelated document
/// yields empty record lists and null totals.
///
/// # Example
/// ```rust
/// use colpensiones_extract::{extract, ExtractionConfig, RawPage};
///
/// let pages = vec![RawPage::text_only("[26] TOTAL SEMANAS\n1193,00")];
/// let output = extract(&pages, &ExtractionConfig::default()).unwrap();
/// assert_eq!(output.summary.weeks_total_report, Some(1193.0));
/// assert!(output.weeks.is_empty());
/// ```
pub fn extract(pages: &[RawPage], config: &ExtractionConfig) -> Result<ExtractionOutput, ExtractError> {
    let indices = config.pages.to_indices(pages.len());
    info!(
        "Starting extraction: {} of {} pages selected",
        indices.len(),
        pages.len()
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_start(indices.len());
    }

    let mut session = ExtractionSession::new(config, pages.len());
    for idx in indices {
        session.process_page(idx + 1, &pages[idx]);
    }
    Ok(session.finish())
}

/// Load pages from `source` and extract them.
///
/// # Errors
/// Any failure of the source is fatal and returned as is.
pub fn extract_from_source<S: PageSource + ?Sized>(
    source: &S,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    let pages = source.load()?;
    debug!("Source {} produced {} pages", source.origin(), pages.len());
    extract(&pages, config)
}

/// Extract from a JSON page document on disk.
pub fn extract_file(
    path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    extract_from_source(&JsonPageSource::new(path), config)
}

/// Extract from a JSON page document and write the JSON result to `output_path`.
///
/// Uses atomic write (temp file in the target directory + rename) to prevent
/// partial files.
pub fn extract_to_file(
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionStats, ExtractError> {
    let output = extract_file(input_path, config)?;
    write_json(output_path.as_ref(), &output, true)?;
    Ok(output.stats)
}

/// Serialise `value` as JSON and write it atomically to `path`, creating
/// parent directories as needed.
pub fn write_json<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
    pretty: bool,
) -> Result<(), ExtractError> {
    let json = if pretty {
        serde_json::to_vec_pretty(value)
    } else {
        serde_json::to_vec(value)
    }
    .map_err(|e| ExtractError::Internal(format!("Failed to serialise output: {}", e)))?;
    write_atomic(path, &json)
}

/// Write `bytes` to `path` via a temp file in the same directory.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ExtractError> {
    let write_err = |source: std::io::Error| ExtractError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    info!("Wrote {}", path.display());
    Ok(())
}

/// Gap analysis over arbitrary period strings; see [`gaps::analyze_gaps`].
pub fn analyze_gaps<S: AsRef<str>>(periods: &[S]) -> Result<GapReport, ExtractError> {
    gaps::analyze_gaps(periods)
}
