//! Paginated history retrieval with cursor-preserving retry.
//!
//! One [`HistoryFetcher::fetch`] call drives the full page loop for a single
//! request: throttle, request, append, advance the cursor. A failed page is
//! re-requested with the *same* cursor after a backoff delay, so pagination
//! never advances past the last confirmed page and retries can neither skip
//! nor duplicate rows. The retry budget is bounded; exhausting it surfaces a
//! [`FetchError::Stalled`] instead of looping forever.

use crate::cancel::CancelToken;
use crate::clock::Clock;
use crate::domain::{Candle, FetchRequest, PageCursor};
use crate::retry::RetryPolicy;
use crate::source::{CandlePage, FetchObserver, HistorySource, SourceError};
use crate::throttle::RequestThrottle;
use std::sync::Arc;
use thiserror::Error;

/// Rows requested per page. The gateway caps pages at this size anyway.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Errors from the retrieval pipeline.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("page request stalled after {attempts} attempts: {last}")]
    Stalled { attempts: u32, last: SourceError },

    #[error("{0}")]
    Source(#[from] SourceError),

    #[error("fetch cancelled")]
    Cancelled,
}

impl FetchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

/// Everything one fetch produced: the accumulated rows plus loop counters
/// for reporting.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub candles: Vec<Candle>,
    pub pages: u32,
    pub retries: u32,
}

/// Drives the paginated retrieval loop for one request at a time.
///
/// Holds no per-job state — every `fetch` starts from a fresh first-page
/// cursor, so one fetcher serves any number of sequential jobs.
pub struct HistoryFetcher {
    source: Arc<dyn HistorySource>,
    throttle: RequestThrottle,
    policy: RetryPolicy,
    clock: Arc<dyn Clock>,
    observer: Arc<dyn FetchObserver>,
    cancel: CancelToken,
    page_size: usize,
}

impl HistoryFetcher {
    pub fn new(
        source: Arc<dyn HistorySource>,
        throttle: RequestThrottle,
        policy: RetryPolicy,
        clock: Arc<dyn Clock>,
        observer: Arc<dyn FetchObserver>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            source,
            throttle,
            policy,
            clock,
            observer,
            cancel,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Retrieve the complete candle series for `request`, page by page.
    ///
    /// An empty series is a valid outcome (nothing traded in the window).
    pub fn fetch(&self, request: &FetchRequest) -> Result<FetchOutcome, FetchError> {
        let mut candles: Vec<Candle> = Vec::new();
        let mut pages = 0u32;
        let mut retries = 0u32;
        let mut cursor: Option<PageCursor> = None;

        loop {
            let page = self.fetch_page(request, cursor.as_ref(), &mut retries)?;
            pages += 1;
            let rows = page.candles.len();
            candles.extend(page.candles);
            self.observer.on_page(&request.symbol, pages, rows);
            match page.next {
                // A page may carry zero rows and still continue (sparse
                // stretches of the trading calendar).
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(FetchOutcome {
            candles,
            pages,
            retries,
        })
    }

    /// Fetch a single page, retrying transient failures with the same cursor.
    ///
    /// `cursor` stays bound to the page under attempt for the whole loop;
    /// pagination advances only in the caller, on a confirmed response. A
    /// cursor minted alongside a failure never exists, so there is nothing
    /// to mistakenly advance to.
    fn fetch_page(
        &self,
        request: &FetchRequest,
        cursor: Option<&PageCursor>,
        retries: &mut u32,
    ) -> Result<CandlePage, FetchError> {
        let mut attempt = 1u32;
        loop {
            if self.cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }
            self.throttle.wait_turn();
            match self.source.request_history(request, cursor, self.page_size) {
                Ok(page) => return Ok(page),
                Err(err) if err.is_transient() => {
                    if err.is_rate_limit() {
                        self.throttle.penalize();
                    }
                    if attempt >= self.policy.max_attempts {
                        return Err(FetchError::Stalled {
                            attempts: attempt,
                            last: err,
                        });
                    }
                    let delay = self.policy.delay_for(attempt);
                    self.observer.on_retry(&request.symbol, attempt, delay, &err);
                    self.clock.sleep(delay);
                    *retries += 1;
                    attempt += 1;
                }
                Err(err) => return Err(FetchError::Source(err)),
            }
        }
    }
}
