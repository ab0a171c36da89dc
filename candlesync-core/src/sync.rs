//! Sync scheduling: window computation and per-partition orchestration.
//!
//! A backfill covers `[today - lookback, today]`; an incremental sync only
//! the last few weeks. Minute series are fetched in one windowed request and
//! sliced into daily partitions by the store. Daily and weekly series are
//! fetched one calendar year at a time, newest year first, so every year
//! lands on disk independently and an interrupted multi-year job resumes at
//! a year boundary. Completed partitions are never rolled back.

use crate::cancel::CancelToken;
use crate::clock::Clock;
use crate::domain::{FetchRequest, Granularity};
use crate::fetch::{FetchError, HistoryFetcher};
use crate::store::{PartitionOutcome, PartitionStore};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Window depth and pacing options for sync jobs.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Historical depth of a full backfill, in years of 365 days.
    pub lookback_years: u32,
    /// Refresh depth of an incremental sync, in days.
    pub incremental_days: u32,
    /// Pause between successive partition-year fetches. Applied on success
    /// too — this spreads load under the aggregate quota, unlike the
    /// per-page retry backoff.
    pub year_pause: Duration,
    /// Settle pause between symbols in a batch.
    pub symbol_pause: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            lookback_years: 2,
            incremental_days: 30,
            year_pause: Duration::from_millis(600),
            symbol_pause: Duration::from_millis(500),
        }
    }
}

/// Structured outcome of one backfill job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    pub symbol: String,
    pub granularity: Granularity,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub rows_fetched: usize,
    pub pages: u32,
    pub retries: u32,
    pub partitions: Vec<PartitionOutcome>,
}

impl SyncReport {
    pub fn all_persisted(&self) -> bool {
        self.partitions.iter().all(|p| p.succeeded())
    }

    pub fn failed_partitions(&self) -> usize {
        self.partitions.iter().filter(|p| !p.succeeded()).count()
    }
}

/// Summary of a multi-symbol sync batch.
#[derive(Debug)]
pub struct BatchSummary {
    pub total: usize,
    /// Reports for jobs whose fetch completed (partitions may still have
    /// individual failures — check the outcomes).
    pub reports: Vec<SyncReport>,
    /// Jobs that failed outright, with the error.
    pub errors: Vec<(String, FetchError)>,
}

impl BatchSummary {
    pub fn succeeded(&self) -> usize {
        self.reports.iter().filter(|r| r.all_persisted()).count()
    }

    pub fn failed(&self) -> usize {
        self.total - self.succeeded()
    }

    pub fn all_succeeded(&self) -> bool {
        self.errors.is_empty() && self.reports.iter().all(|r| r.all_persisted())
    }
}

/// Progress callback for multi-symbol sync batches.
pub trait SyncProgress: Send {
    /// Called when a symbol's sync starts.
    fn on_start(&self, symbol: &str, index: usize, total: usize);

    /// Called when a symbol's sync completes.
    fn on_complete(
        &self,
        symbol: &str,
        index: usize,
        total: usize,
        result: &Result<SyncReport, FetchError>,
    );

    /// Called when the entire batch is done.
    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize);
}

/// Simple progress reporter that prints to stdout.
pub struct StdoutProgress;

impl SyncProgress for StdoutProgress {
    fn on_start(&self, symbol: &str, index: usize, total: usize) {
        println!("[{}/{}] Syncing {symbol}...", index + 1, total);
    }

    fn on_complete(
        &self,
        symbol: &str,
        _index: usize,
        _total: usize,
        result: &Result<SyncReport, FetchError>,
    ) {
        match result {
            Ok(report) => {
                let failed = report.failed_partitions();
                if failed == 0 {
                    println!(
                        "  OK: {symbol} ({} rows, {} partitions)",
                        report.rows_fetched,
                        report.partitions.len()
                    );
                } else {
                    println!(
                        "  PARTIAL: {symbol} ({} rows, {failed}/{} partitions failed)",
                        report.rows_fetched,
                        report.partitions.len()
                    );
                }
            }
            Err(e) => println!("  FAIL: {symbol}: {e}"),
        }
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        println!("\nSync complete: {succeeded}/{total} succeeded, {failed} failed");
    }
}

/// Progress reporter that ignores everything.
pub struct NullProgress;

impl SyncProgress for NullProgress {
    fn on_start(&self, _symbol: &str, _index: usize, _total: usize) {}

    fn on_complete(
        &self,
        _symbol: &str,
        _index: usize,
        _total: usize,
        _result: &Result<SyncReport, FetchError>,
    ) {
    }

    fn on_batch_complete(&self, _succeeded: usize, _failed: usize, _total: usize) {}
}

/// Drives fetch and store per partition window.
pub struct SyncScheduler {
    fetcher: HistoryFetcher,
    store: PartitionStore,
    options: SyncOptions,
    clock: Arc<dyn Clock>,
    cancel: CancelToken,
}

impl SyncScheduler {
    pub fn new(
        fetcher: HistoryFetcher,
        store: PartitionStore,
        options: SyncOptions,
        clock: Arc<dyn Clock>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            fetcher,
            store,
            options,
            clock,
            cancel,
        }
    }

    pub fn store(&self) -> &PartitionStore {
        &self.store
    }

    /// Sync window ending today: the full lookback when `force_full`,
    /// otherwise the incremental refresh depth.
    pub fn window(&self, force_full: bool) -> (NaiveDate, NaiveDate) {
        let end = self.clock.today();
        let days = if force_full {
            365 * self.options.lookback_years as i64
        } else {
            self.options.incremental_days as i64
        };
        (end - chrono::Duration::days(days), end)
    }

    /// Sync one symbol over the standard window.
    ///
    /// On a fetch error, partitions already written in earlier iterations
    /// stay on disk; only the report for them is lost.
    pub fn backfill(
        &self,
        symbol: &str,
        granularity: Granularity,
        force_full: bool,
    ) -> Result<SyncReport, FetchError> {
        let (start, end) = self.window(force_full);
        self.backfill_window(symbol, granularity, start, end)
    }

    /// Sync one symbol over an explicit window.
    pub fn backfill_window(
        &self,
        symbol: &str,
        granularity: Granularity,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<SyncReport, FetchError> {
        let mut report = SyncReport {
            symbol: symbol.to_string(),
            granularity,
            start,
            end,
            rows_fetched: 0,
            pages: 0,
            retries: 0,
            partitions: Vec::new(),
        };

        if granularity.day_partitioned() {
            // Minute data: one windowed request; the store slices per day.
            let outcome = self
                .fetcher
                .fetch(&FetchRequest::new(symbol, start, end, granularity))?;
            report.rows_fetched = outcome.candles.len();
            report.pages = outcome.pages;
            report.retries = outcome.retries;
            report.partitions = self
                .store
                .write_partitions(symbol, &outcome.candles, granularity);
        } else {
            let mut first = true;
            for (year_start, year_end) in year_windows(start, end) {
                if self.cancel.is_cancelled() {
                    return Err(FetchError::Cancelled);
                }
                if !first {
                    self.clock.sleep(self.options.year_pause);
                }
                first = false;

                let outcome = self.fetcher.fetch(&FetchRequest::new(
                    symbol,
                    year_start,
                    year_end,
                    granularity,
                ))?;
                report.rows_fetched += outcome.candles.len();
                report.pages += outcome.pages;
                report.retries += outcome.retries;
                report.partitions.extend(self.store.write_partitions(
                    symbol,
                    &outcome.candles,
                    granularity,
                ));
            }
        }

        Ok(report)
    }

    /// Sync a batch of symbols with per-symbol error isolation.
    ///
    /// A cancelled job stops the batch; any other failure moves on to the
    /// next symbol.
    pub fn backfill_many(
        &self,
        symbols: &[String],
        granularity: Granularity,
        force_full: bool,
        progress: &dyn SyncProgress,
    ) -> BatchSummary {
        let total = symbols.len();
        let mut reports = Vec::new();
        let mut errors = Vec::new();

        for (index, symbol) in symbols.iter().enumerate() {
            if index > 0 {
                self.clock.sleep(self.options.symbol_pause);
            }
            progress.on_start(symbol, index, total);
            let result = self.backfill(symbol, granularity, force_full);
            progress.on_complete(symbol, index, total, &result);
            match result {
                Ok(report) => reports.push(report),
                Err(e) => {
                    let cancelled = e.is_cancelled();
                    errors.push((symbol.clone(), e));
                    if cancelled {
                        break;
                    }
                }
            }
        }

        let summary = BatchSummary {
            total,
            reports,
            errors,
        };
        progress.on_batch_complete(summary.succeeded(), summary.failed(), total);
        summary
    }
}

/// Calendar-year sub-windows of `[start, end]`, newest year first, clamped
/// to the overall window at both ends.
fn year_windows(start: NaiveDate, end: NaiveDate) -> Vec<(NaiveDate, NaiveDate)> {
    if start > end {
        return Vec::new();
    }
    let mut windows = Vec::new();
    for year in (start.year()..=end.year()).rev() {
        let year_start = NaiveDate::from_ymd_opt(year, 1, 1).unwrap();
        let year_end = NaiveDate::from_ymd_opt(year, 12, 31).unwrap();
        windows.push((year_start.max(start), year_end.min(end)));
    }
    windows
}
