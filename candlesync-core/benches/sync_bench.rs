//! Criterion benchmarks for sync hot paths.
//!
//! Benchmarks:
//! 1. Partition merge (incremental refresh, full rewrite, disjoint union)
//! 2. Calendar slicing (minute and daily series)
//! 3. Paginated fetch over the simulated source

use candlesync_core::cancel::CancelToken;
use candlesync_core::clock::ManualClock;
use candlesync_core::domain::{Candle, FetchRequest, Granularity};
use candlesync_core::fetch::HistoryFetcher;
use candlesync_core::partition::{merge_candles, slice_partitions};
use candlesync_core::retry::RetryPolicy;
use candlesync_core::sim::SimulatedHistory;
use candlesync_core::source::NullFetchObserver;
use candlesync_core::throttle::{RequestThrottle, ThrottleConfig};
use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

// ── Helpers ──────────────────────────────────────────────────────────

fn make_daily(days: usize) -> Vec<Candle> {
    let base = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
    (0..days)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0;
            Candle {
                ts: (base + chrono::Duration::days(i as i64))
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
                open: close - 0.3,
                high: close + 1.5,
                low: close - 1.5,
                close,
                volume: 1_000_000 + (i as u64 % 500_000),
                turnover: close * 1_000_000.0,
            }
        })
        .collect()
}

fn make_minutes(days: usize) -> Vec<Candle> {
    let base = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
    let mut candles = Vec::with_capacity(days * 390);
    for day in 0..days {
        let open_bell = (base + chrono::Duration::days(day as i64))
            .and_hms_opt(9, 30, 0)
            .unwrap();
        for minute in 0..390i64 {
            let i = day * 390 + minute as usize;
            let close = 100.0 + (i as f64 * 0.1).sin() * 5.0;
            candles.push(Candle {
                ts: open_bell + chrono::Duration::minutes(minute),
                open: close - 0.2,
                high: close + 0.5,
                low: close - 0.5,
                close,
                volume: 10_000 + (i as u64 % 5_000),
                turnover: close * 10_000.0,
            });
        }
    }
    candles
}

// ── 1. Partition Merge ───────────────────────────────────────────────

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("partition_merge");

    // The common nightly case: a year file refreshed with the last month.
    let year = make_daily(252);
    let refresh = year[230..].to_vec();
    group.bench_function("incremental_into_year", |b| {
        b.iter(|| merge_candles(black_box(year.clone()), black_box(refresh.clone())));
    });

    // Full minute-day rewrite: every incoming row collides.
    let minute_day = make_minutes(1);
    group.bench_function("minute_day_rewrite", |b| {
        b.iter(|| merge_candles(black_box(minute_day.clone()), black_box(minute_day.clone())));
    });

    // Disjoint union at increasing sizes.
    for &days in &[252usize, 1_260, 2_520] {
        let all = make_daily(days * 2);
        let (left, right) = all.split_at(days);
        let left = left.to_vec();
        let right = right.to_vec();
        group.bench_with_input(BenchmarkId::new("disjoint_union", days), &days, |b, _| {
            b.iter(|| merge_candles(black_box(left.clone()), black_box(right.clone())));
        });
    }

    group.finish();
}

// ── 2. Calendar Slicing ──────────────────────────────────────────────

fn bench_slicing(c: &mut Criterion) {
    let mut group = c.benchmark_group("calendar_slicing");

    for &days in &[5usize, 21] {
        let minutes = make_minutes(days);
        group.bench_with_input(BenchmarkId::new("minute_days", days), &days, |b, _| {
            b.iter(|| slice_partitions(black_box(&minutes), Granularity::Min1));
        });
    }

    let daily = make_daily(2_520);
    group.bench_function("daily_10_years", |b| {
        b.iter(|| slice_partitions(black_box(&daily), Granularity::Day));
    });

    group.finish();
}

// ── 3. Simulated Fetch ───────────────────────────────────────────────

fn bench_simulated_fetch(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulated_fetch");

    let clock = Arc::new(ManualClock::new(
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
    ));
    let fetcher = HistoryFetcher::new(
        Arc::new(SimulatedHistory),
        RequestThrottle::new(ThrottleConfig::default(), clock.clone()),
        RetryPolicy::no_retry(),
        clock,
        Arc::new(NullFetchObserver),
        CancelToken::new(),
    );

    let daily_year = FetchRequest::new(
        "BENCH.001",
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
        Granularity::Day,
    );
    group.bench_function("daily_year_one_page", |b| {
        b.iter(|| black_box(fetcher.fetch(black_box(&daily_year)).unwrap()));
    });

    // ~1950 minute rows at page size 1000: the paginated path.
    let minute_week = FetchRequest::new(
        "BENCH.001",
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
        NaiveDate::from_ymd_opt(2025, 6, 6).unwrap(),
        Granularity::Min1,
    );
    group.bench_function("minute_week_paged", |b| {
        b.iter(|| black_box(fetcher.fetch(black_box(&minute_week)).unwrap()));
    });

    group.finish();
}

criterion_group!(benches, bench_merge, bench_slicing, bench_simulated_fetch);
criterion_main!(benches);
