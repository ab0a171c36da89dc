//! History source trait, page type and structured error taxonomy.
//!
//! The HistorySource trait abstracts over candle sources (gateway HTTP
//! bridge, deterministic simulation, scripted test doubles) so the fetcher
//! and scheduler never know which one they are driving.

use crate::domain::{Candle, FetchRequest, PageCursor};
use std::time::Duration;
use thiserror::Error;

/// Structured error types for history retrieval.
///
/// The transient/fatal split drives the retry loop: transient errors are
/// retried with the same cursor, everything else aborts the job at once.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("rate limited by gateway: {0}")]
    RateLimited(String),

    #[error("gateway unavailable: {0}")]
    Unavailable(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("granularity not supported by source: {0}")]
    UnsupportedGranularity(String),

    #[error("response format changed: {0}")]
    Protocol(String),
}

impl SourceError {
    /// True if retrying the identical request later can reasonably succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SourceError::RateLimited(_) | SourceError::Unavailable(_)
        )
    }

    /// True for an explicit "too frequent" rejection, which additionally
    /// penalizes the request throttle.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, SourceError::RateLimited(_))
    }
}

/// One page of a paginated history response.
///
/// `next` is the continuation cursor: `Some` means more pages follow (even if
/// this page carried no rows — sparse stretches of the trading calendar do
/// that), `None` means the sequence is exhausted.
#[derive(Debug, Clone)]
pub struct CandlePage {
    pub candles: Vec<Candle>,
    pub next: Option<PageCursor>,
}

impl CandlePage {
    /// Terminal page with no continuation.
    pub fn last(candles: Vec<Candle>) -> Self {
        Self {
            candles,
            next: None,
        }
    }
}

/// Trait for paginated candle sources.
///
/// Implementations fetch one page per call and mint the continuation cursor;
/// they hold no per-job state. Throttling and retry sit above this trait —
/// sources don't pace or re-issue requests themselves.
pub trait HistorySource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Fetch one page of candles for `request`.
    ///
    /// `cursor` is `None` for the first page, otherwise the token returned
    /// verbatim from the previous confirmed page. `max_count` caps the rows
    /// per page.
    fn request_history(
        &self,
        request: &FetchRequest,
        cursor: Option<&PageCursor>,
        max_count: usize,
    ) -> Result<CandlePage, SourceError>;
}

/// Per-page progress callbacks for a single fetch job.
pub trait FetchObserver: Send + Sync {
    /// Called after each confirmed page, with the rows it carried.
    fn on_page(&self, symbol: &str, page: u32, rows: usize);

    /// Called before the fetcher sleeps ahead of retrying a failed page.
    fn on_retry(&self, symbol: &str, retry: u32, delay: Duration, error: &SourceError);
}

/// Simple fetch reporter that prints to stdout.
pub struct StdoutFetchObserver;

impl FetchObserver for StdoutFetchObserver {
    fn on_page(&self, symbol: &str, page: u32, rows: usize) {
        println!("  {symbol}: page {page} ({rows} rows)");
    }

    fn on_retry(&self, symbol: &str, retry: u32, delay: Duration, error: &SourceError) {
        println!("  {symbol}: retry {retry} in {delay:?} after: {error}");
    }
}

/// Observer that ignores everything.
pub struct NullFetchObserver;

impl FetchObserver for NullFetchObserver {
    fn on_page(&self, _symbol: &str, _page: u32, _rows: usize) {}

    fn on_retry(&self, _symbol: &str, _retry: u32, _delay: Duration, _error: &SourceError) {}
}
