//! Quote feed seam — realtime candle windows and market session state.

use candlesync_core::domain::Candle;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("subscription rejected: {0}")]
    Subscription(String),

    #[error("quote feed unavailable: {0}")]
    Unavailable(String),

    #[error("no quotes for symbol '{symbol}'")]
    NoQuotes { symbol: String },
}

/// Realtime quote source for a session.
///
/// The feed owns the gateway's subscription quota; `subscribe` is called once
/// during session construction, before the first poll.
pub trait QuoteFeed: Send {
    /// Register interest in a set of symbols.
    fn subscribe(&mut self, symbols: &[String]) -> Result<(), FeedError>;

    /// Latest `depth` candles for one subscribed symbol, oldest first.
    fn latest(&self, symbol: &str, depth: usize) -> Result<Vec<Candle>, FeedError>;

    /// True while every subscribed market is in a trading session.
    fn market_open(&self) -> Result<bool, FeedError>;
}
