//! CandleSync Live — realtime layer on top of the sync engine.
//!
//! This crate builds on `candlesync-core` to provide:
//! - Strategy, quote-feed and order-router seams for live evaluation
//! - A session loop with sell-before-buy routing and per-symbol isolation
//! - Parallel universe enrichment over the rayon pool

pub mod enrich;
pub mod feed;
pub mod orders;
pub mod session;
pub mod strategy;

pub use enrich::{
    enrich_universe, map_batch, BatchOutcome, EnrichError, Fundamentals, FundamentalsSource,
};
pub use feed::{FeedError, QuoteFeed};
pub use orders::{OrderAck, OrderError, OrderRouter, OrderSide};
pub use session::{LiveSession, SessionError, TickReport, DEFAULT_WINDOW_DEPTH};
pub use strategy::{HoldStrategy, Signal, Strategy};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}

    #[test]
    fn session_types_are_send() {
        assert_send::<Signal>();
        assert_send::<OrderAck>();
        assert_send::<TickReport>();
        assert_send::<Fundamentals>();
        assert_send::<LiveSession>();
    }
}
