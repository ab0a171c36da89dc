//! Property tests for partitioning and merge invariants.
//!
//! Uses proptest to verify:
//! 1. Merge union — no timestamp from either side is lost, none invented
//! 2. Merge bias — on a collision the incoming row replaces the stored one
//! 3. Merge idempotence — re-applying the same batch is a no-op
//! 4. Merge ordering — output is strictly ascending by timestamp
//! 5. Partition membership — every row lands in the period its date implies
//! 6. Slicing completeness — partitions reassemble to the input

use candlesync_core::domain::{Candle, Granularity};
use candlesync_core::partition::{merge_candles, slice_partitions, PeriodKey};
use chrono::{NaiveDate, NaiveDateTime};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_ts() -> impl Strategy<Value = NaiveDateTime> {
    (0i64..730, 0u32..24, 0u32..60).prop_map(|(day, hour, minute)| {
        (NaiveDate::from_ymd_opt(2025, 1, 1).unwrap() + chrono::Duration::days(day))
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    })
}

fn arb_candle() -> impl Strategy<Value = Candle> {
    (arb_ts(), 10.0..500.0_f64, 1u64..1_000_000).prop_map(|(ts, close, volume)| {
        let open = close * 0.99;
        Candle {
            ts,
            open,
            high: close * 1.01,
            low: open * 0.99,
            close,
            volume,
            turnover: close * volume as f64,
        }
    })
}

fn arb_candles() -> impl Strategy<Value = Vec<Candle>> {
    prop::collection::vec(arb_candle(), 0..60)
}

// ── Merge invariants ─────────────────────────────────────────────────

proptest! {
    /// Merging covers exactly the union of both sides' timestamps.
    #[test]
    fn merge_covers_the_union_of_timestamps(a in arb_candles(), b in arb_candles()) {
        let merged = merge_candles(a.clone(), b.clone());
        let expected: BTreeSet<NaiveDateTime> =
            a.iter().chain(b.iter()).map(|c| c.ts).collect();
        let got: BTreeSet<NaiveDateTime> = merged.iter().map(|c| c.ts).collect();
        prop_assert_eq!(merged.len(), expected.len());
        prop_assert_eq!(got, expected);
    }

    /// On a timestamp collision the incoming row replaces the stored one.
    #[test]
    fn incoming_rows_win_collisions(a in arb_candles(), b in arb_candles()) {
        let merged = merge_candles(a, b.clone());
        let mut last_incoming: BTreeMap<NaiveDateTime, Candle> = BTreeMap::new();
        for candle in &b {
            last_incoming.insert(candle.ts, candle.clone());
        }
        for candle in &merged {
            if let Some(expected) = last_incoming.get(&candle.ts) {
                prop_assert_eq!(candle, expected);
            }
        }
    }

    /// Re-applying the same incoming batch changes nothing.
    #[test]
    fn merge_is_idempotent(a in arb_candles(), b in arb_candles()) {
        let once = merge_candles(a, b.clone());
        let twice = merge_candles(once.clone(), b);
        prop_assert_eq!(once, twice);
    }

    /// Merge output is strictly ascending — sorted with no duplicates.
    #[test]
    fn merge_output_is_strictly_sorted(a in arb_candles(), b in arb_candles()) {
        let merged = merge_candles(a, b);
        for window in merged.windows(2) {
            prop_assert!(window[0].ts < window[1].ts);
        }
    }
}

// ── Slicing invariants ───────────────────────────────────────────────

proptest! {
    /// Every row lands in the partition its calendar date implies.
    #[test]
    fn slices_respect_partition_boundaries(
        candles in arb_candles(),
        minute in prop::bool::ANY,
    ) {
        let granularity = if minute { Granularity::Min1 } else { Granularity::Day };
        let partitions = slice_partitions(&candles, granularity);
        for (key, rows) in &partitions {
            prop_assert!(!rows.is_empty(), "empty partition for {key}");
            for row in rows {
                prop_assert_eq!(PeriodKey::for_candle(row, granularity), *key);
            }
        }
    }

    /// Slicing redistributes rows without losing or inventing any.
    #[test]
    fn slices_reassemble_to_the_input(
        candles in arb_candles(),
        minute in prop::bool::ANY,
    ) {
        let granularity = if minute { Granularity::Min1 } else { Granularity::Day };
        let partitions = slice_partitions(&candles, granularity);

        let total: usize = partitions.values().map(|rows| rows.len()).sum();
        prop_assert_eq!(total, candles.len());

        let mut reassembled: Vec<Candle> = partitions.into_values().flatten().collect();
        let mut input = candles;
        reassembled.sort_by_key(|c| c.ts);
        input.sort_by_key(|c| c.ts);
        prop_assert_eq!(reassembled, input);
    }
}
