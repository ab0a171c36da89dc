//! Calendar partitioning and merge rules for candle series.
//!
//! Minute series partition into one file per trading day; daily and weekly
//! series into one file per calendar year. Re-syncing a window merges with
//! whatever a partition already holds, de-duplicated by timestamp with the
//! fresh rows winning, so writes are idempotent and never shrink a file's
//! coverage.

use crate::domain::{Candle, Granularity};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Calendar period one partition file covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PeriodKey {
    /// One trading day (minute granularity).
    Day(NaiveDate),
    /// One calendar year (daily and weekly granularity).
    Year(i32),
}

impl PeriodKey {
    /// Period the candle belongs to at the given granularity.
    pub fn for_candle(candle: &Candle, granularity: Granularity) -> Self {
        Self::for_date(candle.ts.date(), granularity)
    }

    /// Period containing `date` at the given granularity.
    pub fn for_date(date: NaiveDate, granularity: Granularity) -> Self {
        if granularity.day_partitioned() {
            PeriodKey::Day(date)
        } else {
            PeriodKey::Year(date.year())
        }
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodKey::Day(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            PeriodKey::Year(year) => write!(f, "{year}"),
        }
    }
}

/// File stem for one partition: `{symbol}_{period}_{tag}`.
pub fn file_stem(symbol: &str, key: &PeriodKey, granularity: Granularity) -> String {
    format!("{symbol}_{key}_{}", granularity.tag())
}

/// Split an accumulated series into calendar partitions, preserving input
/// order within each partition.
pub fn slice_partitions(
    candles: &[Candle],
    granularity: Granularity,
) -> BTreeMap<PeriodKey, Vec<Candle>> {
    let mut partitions: BTreeMap<PeriodKey, Vec<Candle>> = BTreeMap::new();
    for candle in candles {
        partitions
            .entry(PeriodKey::for_candle(candle, granularity))
            .or_default()
            .push(candle.clone());
    }
    partitions
}

/// Merge existing and incoming rows for one partition.
///
/// De-duplicates by timestamp with incoming rows winning; output is sorted
/// by timestamp regardless of input order.
pub fn merge_candles(existing: Vec<Candle>, incoming: Vec<Candle>) -> Vec<Candle> {
    let mut by_ts: BTreeMap<NaiveDateTime, Candle> = BTreeMap::new();
    for candle in existing {
        by_ts.insert(candle.ts, candle);
    }
    for candle in incoming {
        by_ts.insert(candle.ts, candle);
    }
    by_ts.into_values().collect()
}
