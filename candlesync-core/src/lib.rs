//! CandleSync Core — history sync engine for the local market-data gateway.
//!
//! This crate contains the full sync pipeline:
//! - Domain types (candles, granularities, fetch requests, page cursors)
//! - Injectable clock and cooperative cancellation
//! - Request throttle honoring the gateway's aggregate quota
//! - Paginated fetcher with cursor-preserving bounded retry
//! - Calendar-partitioned parquet store with merge-on-write
//! - Sync scheduler (full backfill and incremental refresh)
//! - Gateway HTTP adapter and a deterministic simulated source

pub mod cancel;
pub mod clock;
pub mod config;
pub mod domain;
pub mod fetch;
pub mod gateway;
pub mod partition;
pub mod retry;
pub mod sim;
pub mod source;
pub mod store;
pub mod sync;
pub mod throttle;
