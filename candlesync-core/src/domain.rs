//! Core value types: candles, granularities, fetch requests, page cursors.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Time-bucket size of a candle series.
///
/// The granularity decides the calendar partition scheme: minute series are
/// stored one file per trading day, daily and weekly series one file per
/// calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Granularity {
    Min1,
    Day,
    Week,
}

impl Granularity {
    /// Short tag used in partition file names.
    pub fn tag(&self) -> &'static str {
        match self {
            Granularity::Min1 => "1M",
            Granularity::Day => "1D",
            Granularity::Week => "1W",
        }
    }

    /// True if partitions for this granularity span one day rather than one year.
    pub fn day_partitioned(&self) -> bool {
        matches!(self, Granularity::Min1)
    }

    pub fn all() -> [Granularity; 3] {
        [Granularity::Min1, Granularity::Day, Granularity::Week]
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "1M" | "MIN" | "MINUTE" => Ok(Granularity::Min1),
            "1D" | "DAY" | "DAILY" => Ok(Granularity::Day),
            "1W" | "WEEK" | "WEEKLY" => Ok(Granularity::Week),
            other => Err(format!("unknown granularity '{other}' (expected 1M, 1D or 1W)")),
        }
    }
}

/// Price adjustment mode requested from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Adjustment {
    /// Raw prices as traded.
    None,
    /// Forward-adjusted (splits/dividends folded into history).
    #[default]
    Forward,
    /// Backward-adjusted.
    Backward,
}

impl Adjustment {
    /// Wire parameter value understood by the gateway.
    pub fn as_param(&self) -> &'static str {
        match self {
            Adjustment::None => "none",
            Adjustment::Forward => "forward",
            Adjustment::Backward => "backward",
        }
    }
}

/// One OHLCV observation for a fixed time bucket.
///
/// Symbol and granularity are carried by the surrounding request or partition
/// path, not repeated per row; within one partition a candle is identified by
/// its timestamp alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub ts: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub turnover: f64,
}

impl Candle {
    /// Basic OHLC sanity check: high is the ceiling, low the floor, prices positive.
    pub fn is_sane(&self) -> bool {
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }

    /// Calendar date of the bucket this candle belongs to.
    pub fn date(&self) -> NaiveDate {
        self.ts.date()
    }
}

/// One immutable historical-retrieval job: a symbol, a date window, a
/// granularity and an adjustment mode.
///
/// The window is inclusive on both ends; a window with no trading activity is
/// a valid request that yields an empty result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub granularity: Granularity,
    pub adjustment: Adjustment,
}

impl FetchRequest {
    pub fn new(
        symbol: impl Into<String>,
        start: NaiveDate,
        end: NaiveDate,
        granularity: Granularity,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            start,
            end,
            granularity,
            adjustment: Adjustment::default(),
        }
    }
}

/// Opaque continuation token for paginated retrieval.
///
/// The source mints these; the fetcher threads them back verbatim. `None` in
/// a request position means "first page"; `None` in a response position means
/// "exhausted". A cursor is never inspected, only compared and echoed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageCursor(String);

impl PageCursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_candle() -> Candle {
        Candle {
            ts: NaiveDate::from_ymd_opt(2026, 1, 5)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap(),
            open: 100.0,
            high: 105.0,
            low: 98.0,
            close: 103.0,
            volume: 50_000,
            turnover: 5_150_000.0,
        }
    }

    #[test]
    fn granularity_tags_roundtrip() {
        for g in Granularity::all() {
            assert_eq!(g.tag().parse::<Granularity>().unwrap(), g);
        }
        assert!("5M".parse::<Granularity>().is_err());
    }

    #[test]
    fn granularity_partition_span() {
        assert!(Granularity::Min1.day_partitioned());
        assert!(!Granularity::Day.day_partitioned());
        assert!(!Granularity::Week.day_partitioned());
    }

    #[test]
    fn candle_is_sane() {
        assert!(sample_candle().is_sane());
    }

    #[test]
    fn candle_detects_inverted_high_low() {
        let mut candle = sample_candle();
        candle.high = 97.0; // below low
        assert!(!candle.is_sane());
    }

    #[test]
    fn candle_serialization_roundtrip() {
        let candle = sample_candle();
        let json = serde_json::to_string(&candle).unwrap();
        let deser: Candle = serde_json::from_str(&json).unwrap();
        assert_eq!(candle, deser);
    }

    #[test]
    fn cursor_is_echoed_verbatim() {
        let cursor = PageCursor::new("abc123==");
        assert_eq!(cursor.as_str(), "abc123==");
        assert_eq!(cursor, PageCursor::new(String::from("abc123==")));
    }
}
