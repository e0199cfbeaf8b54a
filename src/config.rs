//! Configuration types for report extraction.
//!
//! Every knob lives in [`ExtractionConfig`], built via its
//! [`ExtractionConfigBuilder`]. The defaults reproduce the behaviour tuned
//! against real Colpensiones reports; callers normally only touch page
//! selection and the progress callback.

use crate::error::ExtractError;
use crate::progress::ProgressCallback;
use crate::pipeline::schema::{PAYMENTS, WEEKS};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Configuration for one extraction run.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use colpensiones_extract::{ExtractionConfig, PageSelection};
///
/// let config = ExtractionConfig::builder()
///     .pages(PageSelection::Range(2, 10))
///     .weeks_match_threshold(7)
///     .build()
///     .unwrap();
/// assert_eq!(config.weeks_match_threshold, 7);
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Page selection. Default: all pages.
    pub pages: PageSelection,

    /// Expected weeks headers that must be found in a 9-column table's first
    /// row. Range: 1–9. Default: 6.
    pub weeks_match_threshold: usize,

    /// Expected payments headers that must be found in a 13-column table's
    /// first row. Range: 1–13. Default: 8.
    ///
    /// Lowering this admits tables whose header row the layout engine split
    /// badly, at the risk of accepting unrelated 13-column grids.
    pub payments_match_threshold: usize,

    /// Non-empty lines scanned below the `[26] TOTAL SEMANAS` label. Default: 4.
    pub total_weeks_lookahead: usize,

    /// Non-empty lines scanned below the `[11]` high-risk label. Default: 2.
    pub high_risk_lookahead: usize,

    /// Values at or below this are never taken as the total weeks. Default: 100.
    pub min_total_weeks: f64,

    /// Stop the payments stitcher at the first page with neither a payments
    /// table nor continuation text. Default: true.
    ///
    /// The payments table has no closing phrase, so without this the
    /// stitcher stays open until the last page and may pick up unrelated
    /// 13-column tables from annexes.
    pub payments_early_stop: bool,

    /// Per-page progress events. Default: none.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            pages: PageSelection::default(),
            weeks_match_threshold: WEEKS.match_threshold,
            payments_match_threshold: PAYMENTS.match_threshold,
            total_weeks_lookahead: 4,
            high_risk_lookahead: 2,
            min_total_weeks: 100.0,
            payments_early_stop: true,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("pages", &self.pages)
            .field("weeks_match_threshold", &self.weeks_match_threshold)
            .field("payments_match_threshold", &self.payments_match_threshold)
            .field("total_weeks_lookahead", &self.total_weeks_lookahead)
            .field("high_risk_lookahead", &self.high_risk_lookahead)
            .field("min_total_weeks", &self.min_total_weeks)
            .field("payments_early_stop", &self.payments_early_stop)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ExtractionProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn weeks_match_threshold(mut self, n: usize) -> Self {
        self.config.weeks_match_threshold = n;
        self
    }

    pub fn payments_match_threshold(mut self, n: usize) -> Self {
        self.config.payments_match_threshold = n;
        self
    }

    pub fn total_weeks_lookahead(mut self, lines: usize) -> Self {
        self.config.total_weeks_lookahead = lines;
        self
    }

    pub fn high_risk_lookahead(mut self, lines: usize) -> Self {
        self.config.high_risk_lookahead = lines;
        self
    }

    pub fn min_total_weeks(mut self, floor: f64) -> Self {
        self.config.min_total_weeks = floor;
        self
    }

    pub fn payments_early_stop(mut self, v: bool) -> Self {
        self.config.payments_early_stop = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        let weeks_max = WEEKS.expected_headers.len();
        if c.weeks_match_threshold == 0 || c.weeks_match_threshold > weeks_max {
            return Err(ExtractError::InvalidConfig(format!(
                "weeks match threshold must be 1–{}, got {}",
                weeks_max, c.weeks_match_threshold
            )));
        }
        let payments_max = PAYMENTS.expected_headers.len();
        if c.payments_match_threshold == 0 || c.payments_match_threshold > payments_max {
            return Err(ExtractError::InvalidConfig(format!(
                "payments match threshold must be 1–{}, got {}",
                payments_max, c.payments_match_threshold
            )));
        }
        if !c.min_total_weeks.is_finite() || c.min_total_weeks < 0.0 {
            return Err(ExtractError::InvalidConfig(format!(
                "minimum total weeks must be a finite non-negative number, got {}",
                c.min_total_weeks
            )));
        }
        if let PageSelection::Range(start, end) = c.pages {
            if start == 0 || start > end {
                return Err(ExtractError::InvalidConfig(format!(
                    "page range must be 1-indexed and ascending, got {}-{}",
                    start, end
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Page selection ───────────────────────────────────────────────────────

/// Specifies which pages of the report to scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Scan all pages (default).
    #[default]
    All,
    /// Scan a single page (1-indexed).
    Single(usize),
    /// Scan a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Scan specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    ///
    /// Stitching depends on document order, so a `Set` is always scanned in
    /// ascending order whatever order it was given in.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ExtractionConfig::default();
        assert_eq!(c.pages, PageSelection::All);
        assert_eq!(c.weeks_match_threshold, 6);
        assert_eq!(c.payments_match_threshold, 8);
        assert_eq!(c.total_weeks_lookahead, 4);
        assert_eq!(c.high_risk_lookahead, 2);
        assert_eq!(c.min_total_weeks, 100.0);
        assert!(c.payments_early_stop);
        assert!(c.progress_callback.is_none());
    }

    #[test]
    fn builder_rejects_out_of_range_thresholds() {
        assert!(ExtractionConfig::builder().weeks_match_threshold(0).build().is_err());
        assert!(ExtractionConfig::builder().weeks_match_threshold(10).build().is_err());
        assert!(ExtractionConfig::builder().payments_match_threshold(14).build().is_err());
        assert!(ExtractionConfig::builder().payments_match_threshold(13).build().is_ok());
    }

    #[test]
    fn builder_rejects_bad_range_and_floor() {
        let err = ExtractionConfig::builder()
            .pages(PageSelection::Range(5, 2))
            .build()
            .unwrap_err();
        assert!(matches!(err, ExtractError::InvalidConfig(_)));
        assert!(ExtractionConfig::builder().min_total_weeks(f64::NAN).build().is_err());
    }

    #[test]
    fn debug_hides_callback() {
        let cb: ProgressCallback = std::sync::Arc::new(crate::progress::NoopProgressCallback);
        let c = ExtractionConfig::builder().progress_callback(cb).build().unwrap();
        assert!(format!("{c:?}").contains("<dyn ExtractionProgressCallback>"));
    }

    #[test]
    fn page_selection_indices() {
        assert_eq!(PageSelection::All.to_indices(3), vec![0, 1, 2]);
        assert_eq!(PageSelection::Single(2).to_indices(3), vec![1]);
        assert!(PageSelection::Single(9).to_indices(3).is_empty());
        assert_eq!(PageSelection::Range(2, 10).to_indices(4), vec![1, 2, 3]);
        assert_eq!(PageSelection::Set(vec![3, 1, 3, 0]).to_indices(4), vec![0, 2]);
    }
}
