//! Partitioned Parquet store for candle series.
//!
//! Layout: `{root}/{symbol}/{symbol}_{period}_{tag}.parquet`
//! where `period` is a calendar day for minute data (`SYM_2026-01-05_1M`)
//! and a calendar year for daily/weekly data (`SYM_2026_1D`).
//!
//! Features:
//! - Merge-before-write: a partition is read, unioned with the fresh rows
//!   (fresh winning on timestamp collisions) and rewritten, so re-syncing a
//!   window is idempotent and never shrinks coverage
//! - Atomic writes (write to .tmp, rename into place)
//! - Per-partition failure isolation: one bad write is reported in its
//!   outcome without aborting sibling partitions
//! - Integrity validation on load (schema check, row count > 0)
//! - Quarantine for corrupt files ({filename}.quarantined)

use crate::domain::{Candle, Granularity};
use crate::partition::{file_stem, merge_candles, slice_partitions, PeriodKey};
use chrono::DateTime;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Structured error types for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(String),

    #[error("parquet error: {0}")]
    Parquet(String),

    #[error("schema validation failed: {0}")]
    Validation(String),

    #[error("no stored data for symbol '{symbol}'")]
    NoData { symbol: String },
}

/// Result of one partition write, serializable for reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionOutcome {
    pub key: PeriodKey,
    pub path: PathBuf,
    /// Rows in the partition after the merge (0 when the write failed).
    pub rows: usize,
    pub error: Option<String>,
}

impl PartitionOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// On-disk status of one partition file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionStatus {
    pub file: String,
    /// None when the file could not be read as Parquet.
    pub rows: Option<usize>,
    pub bytes: u64,
}

/// The partitioned candle store.
pub struct PartitionStore {
    root: PathBuf,
}

impl PartitionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one symbol's partitions: `{root}/{symbol}/`
    pub fn symbol_dir(&self, symbol: &str) -> PathBuf {
        self.root.join(symbol)
    }

    /// Path of one partition file.
    pub fn partition_path(
        &self,
        symbol: &str,
        key: &PeriodKey,
        granularity: Granularity,
    ) -> PathBuf {
        self.symbol_dir(symbol)
            .join(format!("{}.parquet", file_stem(symbol, key, granularity)))
    }

    /// Split `candles` into calendar partitions and persist each one,
    /// merge-before-write.
    ///
    /// Every partition gets an outcome; failures are isolated per partition
    /// and never abort siblings. An empty series yields no outcomes.
    pub fn write_partitions(
        &self,
        symbol: &str,
        candles: &[Candle],
        granularity: Granularity,
    ) -> Vec<PartitionOutcome> {
        let partitions = slice_partitions(candles, granularity);
        let mut outcomes = Vec::with_capacity(partitions.len());
        for (key, rows) in partitions {
            let path = self.partition_path(symbol, &key, granularity);
            let outcome = match self.write_one(symbol, &path, rows) {
                Ok(total) => PartitionOutcome {
                    key,
                    path,
                    rows: total,
                    error: None,
                },
                Err(e) => PartitionOutcome {
                    key,
                    path,
                    rows: 0,
                    error: Some(e.to_string()),
                },
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Merge one partition's fresh rows with whatever the file already holds
    /// and rewrite it atomically. Returns the merged row count.
    fn write_one(
        &self,
        symbol: &str,
        path: &Path,
        incoming: Vec<Candle>,
    ) -> Result<usize, StoreError> {
        let dir = self.symbol_dir(symbol);
        fs::create_dir_all(&dir).map_err(|e| StoreError::Io(format!("create dir: {e}")))?;

        let existing = if path.exists() {
            match load_and_validate_parquet(path) {
                Ok(rows) => rows,
                Err(e) => {
                    // Corrupt partition: quarantine it and rebuild from the
                    // fresh rows rather than failing the write.
                    quarantine(path, &e);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let merged = merge_candles(existing, incoming);
        let df = candles_to_dataframe(&merged)?;
        let tmp_path = path.with_extension("parquet.tmp");

        write_parquet(&df, &tmp_path)?;

        fs::rename(&tmp_path, path).map_err(|e| {
            // Clean up temp file on rename failure
            let _ = fs::remove_file(&tmp_path);
            StoreError::Io(format!("atomic rename failed: {e}"))
        })?;

        Ok(merged.len())
    }

    /// Load one partition, sorted by timestamp.
    pub fn load_partition(
        &self,
        symbol: &str,
        key: &PeriodKey,
        granularity: Granularity,
    ) -> Result<Vec<Candle>, StoreError> {
        let path = self.partition_path(symbol, key, granularity);
        if !path.exists() {
            return Err(StoreError::NoData {
                symbol: symbol.to_string(),
            });
        }
        let mut rows = load_and_validate_parquet(&path)?;
        rows.sort_by_key(|c| c.ts);
        Ok(rows)
    }

    /// Load every stored partition of one granularity for a symbol, sorted
    /// by timestamp ascending. Corrupt files are quarantined and skipped.
    pub fn load_series(
        &self,
        symbol: &str,
        granularity: Granularity,
    ) -> Result<Vec<Candle>, StoreError> {
        let dir = self.symbol_dir(symbol);
        if !dir.exists() {
            return Err(StoreError::NoData {
                symbol: symbol.to_string(),
            });
        }

        let suffix = format!("_{}.parquet", granularity.tag());
        let mut candles = Vec::new();
        for path in parquet_files(&dir)? {
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name,
                None => continue,
            };
            if !name.ends_with(&suffix) {
                continue;
            }
            match load_and_validate_parquet(&path) {
                Ok(rows) => candles.extend(rows),
                Err(e) => quarantine(&path, &e),
            }
        }

        if candles.is_empty() {
            return Err(StoreError::NoData {
                symbol: symbol.to_string(),
            });
        }

        candles.sort_by_key(|c| c.ts);
        Ok(candles)
    }

    /// Symbols with at least one partition directory under the root.
    pub fn symbols(&self) -> Result<Vec<String>, StoreError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let entries =
            fs::read_dir(&self.root).map_err(|e| StoreError::Io(format!("read dir: {e}")))?;
        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::Io(format!("dir entry: {e}")))?;
            if entry.path().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    symbols.push(name.to_string());
                }
            }
        }
        symbols.sort();
        Ok(symbols)
    }

    /// Per-partition status for a symbol, sorted by file name.
    pub fn status(&self, symbol: &str) -> Result<Vec<PartitionStatus>, StoreError> {
        let dir = self.symbol_dir(symbol);
        if !dir.exists() {
            return Err(StoreError::NoData {
                symbol: symbol.to_string(),
            });
        }

        let mut statuses = Vec::new();
        for path in parquet_files(&dir)? {
            let file = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };
            let bytes = fs::metadata(&path)
                .map_err(|e| StoreError::Io(format!("metadata: {e}")))?
                .len();
            let rows = load_and_validate_parquet(&path).ok().map(|rows| rows.len());
            statuses.push(PartitionStatus { file, rows, bytes });
        }
        statuses.sort_by(|a, b| a.file.cmp(&b.file));
        Ok(statuses)
    }
}

/// All `.parquet` files directly under `dir`.
fn parquet_files(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let entries = fs::read_dir(dir).map_err(|e| StoreError::Io(format!("read dir: {e}")))?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::Io(format!("dir entry: {e}")))?;
        let path = entry.path();
        // Skip non-parquet files (.tmp, .quarantined, etc)
        if path.extension().and_then(|e| e.to_str()) == Some("parquet") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn quarantine(path: &Path, error: &StoreError) {
    let target = path.with_extension("parquet.quarantined");
    eprintln!(
        "WARNING: quarantining corrupt partition {}: {error}",
        path.display()
    );
    let _ = fs::rename(path, &target);
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

/// Convert candles to a Polars DataFrame.
fn candles_to_dataframe(candles: &[Candle]) -> Result<DataFrame, StoreError> {
    let ts: Vec<i64> = candles
        .iter()
        .map(|c| c.ts.and_utc().timestamp_millis())
        .collect();
    let opens: Vec<f64> = candles.iter().map(|c| c.open).collect();
    let highs: Vec<f64> = candles.iter().map(|c| c.high).collect();
    let lows: Vec<f64> = candles.iter().map(|c| c.low).collect();
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let volumes: Vec<u64> = candles.iter().map(|c| c.volume).collect();
    let turnovers: Vec<f64> = candles.iter().map(|c| c.turnover).collect();

    DataFrame::new(vec![
        Column::new("ts".into(), ts)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .map_err(|e| StoreError::Parquet(format!("ts cast: {e}")))?,
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
        Column::new("volume".into(), volumes),
        Column::new("turnover".into(), turnovers),
    ])
    .map_err(|e| StoreError::Parquet(format!("dataframe creation: {e}")))
}

/// Write a DataFrame to a Parquet file.
fn write_parquet(df: &DataFrame, path: &Path) -> Result<(), StoreError> {
    let file =
        fs::File::create(path).map_err(|e| StoreError::Parquet(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(&mut df.clone())
        .map_err(|e| StoreError::Parquet(format!("write parquet: {e}")))?;
    Ok(())
}

/// Load a Parquet file and validate its integrity.
fn load_and_validate_parquet(path: &Path) -> Result<Vec<Candle>, StoreError> {
    let file = fs::File::open(path).map_err(|e| StoreError::Parquet(format!("open: {e}")))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| StoreError::Parquet(format!("read: {e}")))?;

    // Validate: must have rows
    if df.height() == 0 {
        return Err(StoreError::Validation("empty parquet file".into()));
    }

    // Validate: must have expected columns
    let expected_cols = ["ts", "open", "high", "low", "close", "volume", "turnover"];
    for col_name in &expected_cols {
        if df.column(col_name).is_err() {
            return Err(StoreError::Validation(format!(
                "missing column '{col_name}'"
            )));
        }
    }

    dataframe_to_candles(&df)
}

/// Convert a DataFrame back to candles.
fn dataframe_to_candles(df: &DataFrame) -> Result<Vec<Candle>, StoreError> {
    let map_err = |e: PolarsError| StoreError::Parquet(format!("column read: {e}"));

    let ts = df.column("ts").map_err(map_err)?;
    let opens = df.column("open").map_err(map_err)?;
    let highs = df.column("high").map_err(map_err)?;
    let lows = df.column("low").map_err(map_err)?;
    let closes = df.column("close").map_err(map_err)?;
    let volumes = df.column("volume").map_err(map_err)?;
    let turnovers = df.column("turnover").map_err(map_err)?;

    let n = df.height();
    let mut candles = Vec::with_capacity(n);

    let ts_ca = ts
        .datetime()
        .map_err(|e| StoreError::Parquet(format!("ts column type: {e}")))?;
    let open_ca = opens
        .f64()
        .map_err(|e| StoreError::Parquet(format!("open column type: {e}")))?;
    let high_ca = highs
        .f64()
        .map_err(|e| StoreError::Parquet(format!("high column type: {e}")))?;
    let low_ca = lows
        .f64()
        .map_err(|e| StoreError::Parquet(format!("low column type: {e}")))?;
    let close_ca = closes
        .f64()
        .map_err(|e| StoreError::Parquet(format!("close column type: {e}")))?;
    let vol_ca = volumes
        .u64()
        .map_err(|e| StoreError::Parquet(format!("volume column type: {e}")))?;
    let turn_ca = turnovers
        .f64()
        .map_err(|e| StoreError::Parquet(format!("turnover column type: {e}")))?;

    for i in 0..n {
        let ms = ts_ca
            .get(i)
            .ok_or_else(|| StoreError::Parquet(format!("null ts at row {i}")))?;
        let ts = DateTime::from_timestamp_millis(ms)
            .ok_or_else(|| StoreError::Parquet(format!("ts out of range at row {i}")))?
            .naive_utc();

        candles.push(Candle {
            ts,
            open: open_ca.get(i).unwrap_or(f64::NAN),
            high: high_ca.get(i).unwrap_or(f64::NAN),
            low: low_ca.get(i).unwrap_or(f64::NAN),
            close: close_ca.get(i).unwrap_or(f64::NAN),
            volume: vol_ca.get(i).unwrap_or(0),
            turnover: turn_ca.get(i).unwrap_or(f64::NAN),
        });
    }

    Ok(candles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::env;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_store_dir() -> PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = env::temp_dir().join(format!("candlesync_test_{}_{id}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn daily(year: i32, month: u32, day: u32, close: f64) -> Candle {
        Candle {
            ts: NaiveDate::from_ymd_opt(year, month, day)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            open: close - 1.0,
            high: close + 1.0,
            low: close - 2.0,
            close,
            volume: 1_000,
            turnover: close * 1_000.0,
        }
    }

    fn minute(day: u32, hour: u32, min: u32) -> Candle {
        Candle {
            ts: NaiveDate::from_ymd_opt(2026, 1, day)
                .unwrap()
                .and_hms_opt(hour, min, 0)
                .unwrap(),
            open: 10.0,
            high: 11.0,
            low: 9.0,
            close: 10.5,
            volume: 100,
            turnover: 1_050.0,
        }
    }

    #[test]
    fn write_and_load_roundtrip() {
        let dir = temp_store_dir();
        let store = PartitionStore::new(&dir);

        let candles = vec![daily(2025, 12, 30, 10.0), daily(2026, 1, 5, 11.0)];
        let outcomes = store.write_partitions("SYM.001", &candles, Granularity::Day);
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.succeeded()));
        assert!(store
            .partition_path("SYM.001", &PeriodKey::Year(2025), Granularity::Day)
            .exists());
        assert!(store
            .partition_path("SYM.001", &PeriodKey::Year(2026), Granularity::Day)
            .exists());

        let loaded = store.load_series("SYM.001", Granularity::Day).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].close, 10.0);
        assert_eq!(loaded[1].ts, candles[1].ts);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn rewriting_the_same_rows_is_idempotent() {
        let dir = temp_store_dir();
        let store = PartitionStore::new(&dir);

        let candles: Vec<Candle> = (1..=15).map(|d| daily(2026, 1, d, d as f64)).collect();
        store.write_partitions("SYM.001", &candles, Granularity::Day);
        store.write_partitions("SYM.001", &candles, Granularity::Day);

        let loaded = store
            .load_partition("SYM.001", &PeriodKey::Year(2026), Granularity::Day)
            .unwrap();
        assert_eq!(loaded.len(), 15);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn overlapping_windows_merge_to_the_union() {
        let dir = temp_store_dir();
        let store = PartitionStore::new(&dir);

        let first: Vec<Candle> = (1..=15).map(|d| daily(2026, 1, d, d as f64)).collect();
        let second: Vec<Candle> = (10..=31).map(|d| daily(2026, 1, d, 100.0 + d as f64)).collect();
        store.write_partitions("SYM.001", &first, Granularity::Day);
        store.write_partitions("SYM.001", &second, Granularity::Day);

        let loaded = store
            .load_partition("SYM.001", &PeriodKey::Year(2026), Granularity::Day)
            .unwrap();
        assert_eq!(loaded.len(), 31);
        // Fresh rows win on the overlap.
        assert_eq!(loaded[9].close, 110.0);
        // Rows outside the second window survive.
        assert_eq!(loaded[0].close, 1.0);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn minute_candles_partition_per_day() {
        let dir = temp_store_dir();
        let store = PartitionStore::new(&dir);

        let candles = vec![minute(5, 9, 30), minute(5, 9, 31), minute(6, 9, 30)];
        let outcomes = store.write_partitions("SYM.001", &candles, Granularity::Min1);
        assert_eq!(outcomes.len(), 2);

        let jan5 = PeriodKey::Day(NaiveDate::from_ymd_opt(2026, 1, 5).unwrap());
        let loaded = store
            .load_partition("SYM.001", &jan5, Granularity::Min1)
            .unwrap();
        assert_eq!(loaded.len(), 2);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn empty_series_writes_nothing() {
        let dir = temp_store_dir();
        let store = PartitionStore::new(&dir);
        assert!(store
            .write_partitions("SYM.001", &[], Granularity::Day)
            .is_empty());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn load_missing_symbol_errors() {
        let dir = temp_store_dir();
        let store = PartitionStore::new(&dir);
        assert!(matches!(
            store.load_series("NOPE", Granularity::Day),
            Err(StoreError::NoData { .. })
        ));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn unwritable_root_isolates_failures_per_partition() {
        let dir = temp_store_dir();
        // Root is a file, so creating symbol dirs must fail.
        let blocker = dir.join("blocked");
        fs::write(&blocker, b"x").unwrap();
        let store = PartitionStore::new(&blocker);

        let candles = vec![daily(2025, 6, 2, 10.0), daily(2026, 1, 5, 11.0)];
        let outcomes = store.write_partitions("SYM.001", &candles, Granularity::Day);
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| !o.succeeded()));
        assert!(outcomes.iter().all(|o| o.error.is_some()));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn corrupt_partition_is_quarantined_on_load() {
        let dir = temp_store_dir();
        let store = PartitionStore::new(&dir);

        store.write_partitions("SYM.001", &[daily(2026, 1, 5, 10.0)], Granularity::Day);
        let bad = store.partition_path("SYM.001", &PeriodKey::Year(2024), Granularity::Day);
        fs::write(&bad, b"not parquet").unwrap();

        let loaded = store.load_series("SYM.001", Granularity::Day).unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(!bad.exists());
        assert!(bad.with_extension("parquet.quarantined").exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn corrupt_partition_is_rebuilt_on_write() {
        let dir = temp_store_dir();
        let store = PartitionStore::new(&dir);

        let path = store.partition_path("SYM.001", &PeriodKey::Year(2026), Granularity::Day);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"garbage").unwrap();

        let outcomes =
            store.write_partitions("SYM.001", &[daily(2026, 1, 5, 10.0)], Granularity::Day);
        assert!(outcomes[0].succeeded());
        assert_eq!(outcomes[0].rows, 1);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn status_reports_rows_and_files() {
        let dir = temp_store_dir();
        let store = PartitionStore::new(&dir);

        let candles: Vec<Candle> = (1..=5).map(|d| daily(2026, 1, d, d as f64)).collect();
        store.write_partitions("SYM.001", &candles, Granularity::Day);

        let statuses = store.status("SYM.001").unwrap();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].file, "SYM.001_2026_1D.parquet");
        assert_eq!(statuses[0].rows, Some(5));
        assert!(statuses[0].bytes > 0);

        assert_eq!(store.symbols().unwrap(), vec!["SYM.001".to_string()]);

        let _ = fs::remove_dir_all(&dir);
    }
}
