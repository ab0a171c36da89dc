//! Parallel universe enrichment.
//!
//! Fans per-symbol lookups out over the rayon pool with per-symbol failure
//! isolation: one bad symbol never poisons the batch, and the outcome keeps
//! successes and failures side by side.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum EnrichError {
    #[error("unknown symbol '{0}'")]
    UnknownSymbol(String),

    #[error("fundamentals source unavailable: {0}")]
    Unavailable(String),
}

/// Point-in-time fundamentals for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    pub symbol: String,
    pub market_cap: f64,
    pub pe_ratio: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub week52_high: f64,
    pub week52_low: f64,
}

/// Per-symbol fundamentals lookup. `Sync` because lookups fan out across
/// the rayon pool.
pub trait FundamentalsSource: Send + Sync {
    fn fundamentals(&self, symbol: &str) -> Result<Fundamentals, EnrichError>;
}

/// Outcome of a fan-out over many symbols.
#[derive(Debug)]
pub struct BatchOutcome<T> {
    pub results: BTreeMap<String, T>,
    pub failures: Vec<(String, EnrichError)>,
}

impl<T> BatchOutcome<T> {
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Run `lookup` for every symbol on the rayon pool.
///
/// Failures are isolated per symbol; the batch always completes.
pub fn map_batch<T, F>(symbols: &[String], lookup: F) -> BatchOutcome<T>
where
    T: Send,
    F: Fn(&str) -> Result<T, EnrichError> + Send + Sync,
{
    let outcomes: Vec<(String, Result<T, EnrichError>)> = symbols
        .par_iter()
        .map(|symbol| (symbol.clone(), lookup(symbol)))
        .collect();

    let mut results = BTreeMap::new();
    let mut failures = Vec::new();
    for (symbol, outcome) in outcomes {
        match outcome {
            Ok(value) => {
                results.insert(symbol, value);
            }
            Err(e) => failures.push((symbol, e)),
        }
    }

    BatchOutcome { results, failures }
}

/// Fetch fundamentals for a whole universe in parallel.
pub fn enrich_universe(
    source: &dyn FundamentalsSource,
    symbols: &[String],
) -> BatchOutcome<Fundamentals> {
    map_batch(symbols, |symbol| source.fundamentals(symbol))
}
