//! Progress-callback trait for per-page extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the session walks the report.
//!
//! # Example
//!
//! ```rust
//! use colpensiones_extract::{ExtractionConfig, ExtractionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     weeks: AtomicUsize,
//! }
//!
//! impl ExtractionProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, _page: usize, _total: usize, weeks_added: usize, _payments_added: usize) {
//!         self.weeks.fetch_add(weeks_added, Ordering::SeqCst);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { weeks: AtomicUsize::new(0) });
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ExtractionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::pipeline::schema::SchemaKind;
use std::sync::Arc;

/// Called by the extraction session as it processes each page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync` so that a
/// config can be shared between threads extracting different reports.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once before the first page.
    ///
    /// # Arguments
    /// * `total_pages`: number of pages that will be scanned
    fn on_extraction_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called before a page is scanned.
    ///
    /// # Arguments
    /// * `page_num`   : 1-indexed page number
    /// * `total_pages`: total pages in the report
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called after a page has been scanned.
    ///
    /// # Arguments
    /// * `page_num`      : 1-indexed page number
    /// * `total_pages`   : total pages in the report
    /// * `weeks_added`   : contribution-week records taken from this page
    /// * `payments_added`: payment records taken from this page
    fn on_page_complete(
        &self,
        page_num: usize,
        total_pages: usize,
        weeks_added: usize,
        payments_added: usize,
    ) {
        let _ = (page_num, total_pages, weeks_added, payments_added);
    }

    /// Called when a schema's table is found to have ended.
    fn on_table_end(&self, schema: SchemaKind, page_num: usize) {
        let _ = (schema, page_num);
    }

    /// Called once after the last page.
    fn on_extraction_complete(&self, weeks: usize, payments: usize) {
        let _ = (weeks, payments);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        started_total: AtomicUsize,
        pages: AtomicUsize,
        weeks: AtomicUsize,
        ended: Mutex<Vec<(SchemaKind, usize)>>,
    }

    impl ExtractionProgressCallback for TrackingCallback {
        fn on_extraction_start(&self, total_pages: usize) {
            self.started_total.store(total_pages, Ordering::SeqCst);
        }

        fn on_page_complete(&self, _page: usize, _total: usize, weeks_added: usize, _p: usize) {
            self.pages.fetch_add(1, Ordering::SeqCst);
            self.weeks.fetch_add(weeks_added, Ordering::SeqCst);
        }

        fn on_table_end(&self, schema: SchemaKind, page_num: usize) {
            self.ended.lock().unwrap().push((schema, page_num));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_extraction_start(5);
        cb.on_page_start(1, 5);
        cb.on_page_complete(1, 5, 3, 0);
        cb.on_table_end(SchemaKind::Weeks, 2);
        cb.on_extraction_complete(3, 0);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_extraction_start(3);
        tracker.on_page_complete(1, 3, 4, 0);
        tracker.on_page_complete(2, 3, 2, 0);
        tracker.on_table_end(SchemaKind::Weeks, 3);

        assert_eq!(tracker.started_total.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.pages.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.weeks.load(Ordering::SeqCst), 6);
        assert_eq!(*tracker.ended.lock().unwrap(), vec![(SchemaKind::Weeks, 3)]);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_extraction_start(10);
        cb.on_page_start(1, 10);
    }
}
