//! Realtime evaluation session.
//!
//! One session owns a quote feed, an order router and one strategy per
//! symbol. Construction unlocks the trading account and subscribes the
//! symbols; an unlock failure is fatal — a session that cannot trade must
//! not come up at all. Each `poll_once` evaluates every symbol against its
//! latest candle window; outside trading hours the whole tick is skipped.
//! Sell intents are routed before buy intents so freed capital is usable
//! within the same tick.

use crate::feed::{FeedError, QuoteFeed};
use crate::orders::{OrderAck, OrderError, OrderRouter};
use crate::strategy::Strategy;
use std::collections::BTreeMap;
use thiserror::Error;

/// Candle window depth handed to strategies each tick.
pub const DEFAULT_WINDOW_DEPTH: usize = 100;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("account unlock failed: {0}")]
    Unlock(OrderError),

    #[error("feed error: {0}")]
    Feed(#[from] FeedError),
}

/// Outcome of one evaluation tick.
#[derive(Debug, Default)]
pub struct TickReport {
    /// False when the tick was skipped outside trading hours.
    pub market_open: bool,
    /// Symbols whose strategy ran this tick.
    pub evaluated: usize,
    pub orders: Vec<OrderAck>,
    /// Per-symbol failures (feed or routing), isolated from the rest of
    /// the tick.
    pub errors: Vec<(String, String)>,
}

impl TickReport {
    pub fn clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Live trading loop over one strategy per symbol.
pub struct LiveSession {
    feed: Box<dyn QuoteFeed>,
    router: Box<dyn OrderRouter>,
    strategies: BTreeMap<String, Box<dyn Strategy>>,
    depth: usize,
}

impl LiveSession {
    /// Unlock the account and subscribe every symbol.
    ///
    /// Fails fast on a locked account or a rejected subscription; no partial
    /// session is ever returned.
    pub fn new(
        mut feed: Box<dyn QuoteFeed>,
        mut router: Box<dyn OrderRouter>,
        strategies: BTreeMap<String, Box<dyn Strategy>>,
    ) -> Result<Self, SessionError> {
        router.unlock().map_err(SessionError::Unlock)?;
        let symbols: Vec<String> = strategies.keys().cloned().collect();
        feed.subscribe(&symbols)?;
        Ok(Self {
            feed,
            router,
            strategies,
            depth: DEFAULT_WINDOW_DEPTH,
        })
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth.max(1);
        self
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.strategies.keys().map(|s| s.as_str()).collect()
    }

    /// Evaluate every symbol once against its latest candle window.
    ///
    /// A failed market-state probe fails the tick; everything past that
    /// point is isolated per symbol.
    pub fn poll_once(&mut self) -> Result<TickReport, SessionError> {
        let mut report = TickReport::default();

        if !self.feed.market_open()? {
            return Ok(report);
        }
        report.market_open = true;

        for (symbol, strategy) in self.strategies.iter_mut() {
            let candles = match self.feed.latest(symbol, self.depth) {
                Ok(candles) => candles,
                Err(e) => {
                    report.errors.push((symbol.clone(), e.to_string()));
                    continue;
                }
            };
            let signal = strategy.evaluate(symbol, &candles);
            report.evaluated += 1;

            // Sell before buy.
            if signal.sell {
                record(&mut report, symbol, self.router.place_sell(symbol));
            }
            if signal.buy {
                record(&mut report, symbol, self.router.place_buy(symbol));
            }
        }

        Ok(report)
    }
}

fn record(report: &mut TickReport, symbol: &str, placed: Result<OrderAck, OrderError>) {
    match placed {
        Ok(ack) => report.orders.push(ack),
        Err(e) => report.errors.push((symbol.to_string(), e.to_string())),
    }
}
