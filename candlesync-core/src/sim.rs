//! Deterministic simulated history source.
//!
//! Generates a seeded random walk per symbol and serves it through the real
//! pagination contract, so the whole sync pipeline runs without a gateway
//! (tests, benches, `backfill --simulated`). Weekends are skipped; minute
//! series carry 390 one-minute bars per trading day starting 09:30.

use crate::domain::{Candle, FetchRequest, Granularity, PageCursor};
use crate::source::{CandlePage, HistorySource, SourceError};
use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const MINUTES_PER_DAY: u32 = 390;

/// Simulated candle source. Stateless: the series for a request is a pure
/// function of (symbol, window, granularity).
#[derive(Debug, Default)]
pub struct SimulatedHistory;

impl SimulatedHistory {
    /// Full deterministic series for a request window.
    fn series(request: &FetchRequest) -> Vec<Candle> {
        // Deterministic seed from symbol name
        let seed: [u8; 32] = *blake3::hash(request.symbol.as_bytes()).as_bytes();
        let mut rng = StdRng::from_seed(seed);

        let mut candles = Vec::new();
        let mut price = 100.0_f64;
        let mut current = request.start;

        while current <= request.end {
            let weekday = current.weekday();
            if weekday == Weekday::Sat || weekday == Weekday::Sun {
                current += chrono::Duration::days(1);
                continue;
            }

            match request.granularity {
                Granularity::Day => {
                    candles.push(step(&mut rng, &mut price, midnight(current), 0.03, 500_000));
                }
                Granularity::Week => {
                    if weekday == Weekday::Mon {
                        candles.push(step(&mut rng, &mut price, midnight(current), 0.06, 2_000_000));
                    }
                }
                Granularity::Min1 => {
                    let open_bell = current.and_hms_opt(9, 30, 0).unwrap();
                    for minute in 0..MINUTES_PER_DAY {
                        let ts = open_bell + chrono::Duration::minutes(minute as i64);
                        candles.push(step(&mut rng, &mut price, ts, 0.002, 1_000));
                    }
                }
            }

            current += chrono::Duration::days(1);
        }

        candles
    }
}

fn midnight(date: NaiveDate) -> chrono::NaiveDateTime {
    date.and_hms_opt(0, 0, 0).unwrap()
}

/// Advance the walk by one candle.
fn step(
    rng: &mut StdRng,
    price: &mut f64,
    ts: chrono::NaiveDateTime,
    spread: f64,
    base_volume: u64,
) -> Candle {
    let step_return: f64 = rng.gen_range(-spread..spread);
    let open = *price;
    let close = open * (1.0 + step_return);
    let high = open.max(close) * (1.0 + rng.gen_range(0.0..spread / 3.0));
    let low = open.min(close) * (1.0 - rng.gen_range(0.0..spread / 3.0));
    let volume = rng.gen_range(base_volume..base_volume * 10);
    *price = close;

    Candle {
        ts,
        open,
        high,
        low,
        close,
        volume,
        turnover: close * volume as f64,
    }
}

impl HistorySource for SimulatedHistory {
    fn name(&self) -> &str {
        "simulated"
    }

    fn request_history(
        &self,
        request: &FetchRequest,
        cursor: Option<&PageCursor>,
        max_count: usize,
    ) -> Result<CandlePage, SourceError> {
        let series = Self::series(request);
        let offset = match cursor {
            None => 0,
            Some(c) => c
                .as_str()
                .parse::<usize>()
                .map_err(|_| SourceError::InvalidRequest(format!("unknown cursor '{c}'")))?,
        };

        let offset = offset.min(series.len());
        let end = offset.saturating_add(max_count.max(1)).min(series.len());
        let next = if end < series.len() {
            Some(PageCursor::new(end.to_string()))
        } else {
            None
        };

        Ok(CandlePage {
            candles: series[offset..end].to_vec(),
            next,
        })
    }
}
