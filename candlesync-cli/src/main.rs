//! CandleSync CLI — backfill, inspect, and export commands for the candle store.
//!
//! Commands:
//! - `backfill` — sync candle history from the gateway into the Parquet store
//! - `status` — report store size, symbol count, and partition inventory
//! - `export` — dump a stored series as CSV, optionally date-filtered
//! - `config init` / `config show` — manage the TOML config file

use anyhow::{anyhow, bail, Result};
use candlesync_core::cancel::CancelToken;
use candlesync_core::clock::{Clock, SystemClock};
use candlesync_core::config::SyncConfig;
use candlesync_core::domain::Granularity;
use candlesync_core::fetch::HistoryFetcher;
use candlesync_core::gateway::GatewayClient;
use candlesync_core::sim::SimulatedHistory;
use candlesync_core::source::{
    FetchObserver, HistorySource, NullFetchObserver, StdoutFetchObserver,
};
use candlesync_core::store::PartitionStore;
use candlesync_core::sync::{StdoutProgress, SyncScheduler};
use candlesync_core::throttle::RequestThrottle;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "candlesync",
    about = "CandleSync CLI — historical candle sync for a local market-data gateway"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Backfill candle history into the partition store.
    Backfill {
        /// Symbols to sync (e.g., HK.00700 HK.09988).
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Candle granularity: 1M, 1D, or 1W.
        #[arg(long, default_value = "1D")]
        granularity: String,

        /// Force a full-depth backfill even when local coverage exists.
        #[arg(long, default_value_t = false)]
        full: bool,

        /// Use the deterministic simulated source instead of the gateway.
        #[arg(long, default_value_t = false)]
        simulated: bool,

        /// Path to a TOML config file. Defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Partition store directory. Overrides the config value.
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Write the per-symbol sync reports to this path as JSON.
        #[arg(long)]
        report: Option<PathBuf>,

        /// Print per-page fetch progress.
        #[arg(long, default_value_t = false)]
        verbose: bool,
    },
    /// Report store size, symbol count, and partition inventory.
    Status {
        /// Partition store directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },
    /// Export a stored series as CSV.
    Export {
        /// Symbol to export (e.g., HK.00700).
        symbol: String,

        /// Candle granularity: 1M, 1D, or 1W.
        #[arg(long, default_value = "1D")]
        granularity: String,

        /// Partition store directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Keep only rows on or after this date (YYYY-MM-DD).
        #[arg(long)]
        start: Option<String>,

        /// Keep only rows on or before this date (YYYY-MM-DD).
        #[arg(long)]
        end: Option<String>,

        /// Output CSV path. Defaults to {SYMBOL}_{GRANULARITY}.csv.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Config file commands.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a default config file.
    Init {
        /// Destination path.
        #[arg(long, default_value = "candlesync.toml")]
        path: PathBuf,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Print the resolved config with defaults filled in.
    Show {
        /// Path to the config file.
        #[arg(long, default_value = "candlesync.toml")]
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Backfill {
            symbols,
            granularity,
            full,
            simulated,
            config,
            data_dir,
            report,
            verbose,
        } => run_backfill(
            symbols, granularity, full, simulated, config, data_dir, report, verbose,
        ),
        Commands::Status { data_dir } => run_status(&data_dir),
        Commands::Export {
            symbol,
            granularity,
            data_dir,
            start,
            end,
            output,
        } => run_export(symbol, granularity, data_dir, start, end, output),
        Commands::Config { action } => match action {
            ConfigAction::Init { path, force } => run_config_init(path, force),
            ConfigAction::Show { path } => run_config_show(&path),
        },
    }
}

#[allow(clippy::too_many_arguments)]
fn run_backfill(
    symbols: Vec<String>,
    granularity: String,
    full: bool,
    simulated: bool,
    config_path: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    report_path: Option<PathBuf>,
    verbose: bool,
) -> Result<()> {
    let granularity: Granularity = granularity.parse().map_err(|e: String| anyhow!(e))?;

    let config = match &config_path {
        Some(path) => SyncConfig::from_file(path)?,
        None => SyncConfig::default(),
    };
    let store_dir = data_dir.unwrap_or_else(|| config.data_dir().to_path_buf());

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let source: Arc<dyn HistorySource> = if simulated {
        Arc::new(SimulatedHistory)
    } else {
        Arc::new(GatewayClient::new(config.gateway()))
    };
    let observer: Arc<dyn FetchObserver> = if verbose {
        Arc::new(StdoutFetchObserver)
    } else {
        Arc::new(NullFetchObserver)
    };

    let cancel = CancelToken::new();
    let throttle = RequestThrottle::new(config.throttle(), clock.clone());
    let fetcher = HistoryFetcher::new(
        source,
        throttle,
        config.retry(),
        clock.clone(),
        observer,
        cancel.clone(),
    )
    .with_page_size(config.page_size());

    let scheduler = SyncScheduler::new(
        fetcher,
        PartitionStore::new(store_dir),
        config.sync_options(),
        clock,
        cancel,
    );

    let summary = scheduler.backfill_many(&symbols, granularity, full, &StdoutProgress);

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&summary.reports)?;
        std::fs::write(&path, json)?;
        println!("Reports saved to: {}", path.display());
    }

    if !summary.all_succeeded() {
        for (sym, err) in &summary.errors {
            eprintln!("Error for {sym}: {err}");
        }
        std::process::exit(1);
    }

    Ok(())
}

fn run_status(data_dir: &Path) -> Result<()> {
    if !data_dir.exists() {
        println!("Store directory does not exist: {}", data_dir.display());
        return Ok(());
    }

    let store = PartitionStore::new(data_dir);
    let symbols = store.symbols()?;
    if symbols.is_empty() {
        println!("Store is empty: {}", data_dir.display());
        return Ok(());
    }

    let mut total_bytes: u64 = 0;
    let mut unreadable: Vec<String> = Vec::new();
    let mut rows: Vec<(String, usize, usize, u64)> = Vec::new();

    for symbol in &symbols {
        let statuses = store.status(symbol)?;
        let files = statuses.len();
        let mut symbol_rows = 0usize;
        let mut symbol_bytes = 0u64;
        for status in &statuses {
            match status.rows {
                Some(n) => symbol_rows += n,
                None => unreadable.push(format!("{symbol}/{}", status.file)),
            }
            symbol_bytes += status.bytes;
        }
        total_bytes += symbol_bytes;
        rows.push((symbol.clone(), files, symbol_rows, symbol_bytes));
    }

    println!("Store: {}", data_dir.display());
    println!("Symbols: {}", symbols.len());
    println!("Total size: {}", format_size(total_bytes));
    println!();
    println!("{:<12} {:>8} {:>12} {:>10}", "Symbol", "Files", "Rows", "Size");
    println!("{}", "-".repeat(46));
    for (sym, files, row_count, bytes) in &rows {
        println!(
            "{:<12} {:>8} {:>12} {:>10}",
            sym,
            files,
            row_count,
            format_size(*bytes)
        );
    }
    for file in &unreadable {
        println!("WARNING: unreadable partition: {file}");
    }

    Ok(())
}

fn run_export(
    symbol: String,
    granularity: String,
    data_dir: PathBuf,
    start: Option<String>,
    end: Option<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    let granularity: Granularity = granularity.parse().map_err(|e: String| anyhow!(e))?;

    let start_date = start
        .as_deref()
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()?;
    let end_date = end
        .as_deref()
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()?;

    let store = PartitionStore::new(&data_dir);
    let mut candles = store.load_series(&symbol, granularity)?;
    if let Some(date) = start_date {
        candles.retain(|c| c.ts.date() >= date);
    }
    if let Some(date) = end_date {
        candles.retain(|c| c.ts.date() <= date);
    }

    let path = output
        .unwrap_or_else(|| PathBuf::from(format!("{symbol}_{}.csv", granularity.tag())));
    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record([
        "timestamp", "open", "high", "low", "close", "volume", "turnover",
    ])?;
    for candle in &candles {
        writer.write_record([
            candle.ts.format("%Y-%m-%d %H:%M:%S").to_string(),
            candle.open.to_string(),
            candle.high.to_string(),
            candle.low.to_string(),
            candle.close.to_string(),
            candle.volume.to_string(),
            candle.turnover.to_string(),
        ])?;
    }
    writer.flush()?;

    println!("Exported {} rows to {}", candles.len(), path.display());
    Ok(())
}

fn run_config_init(path: PathBuf, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "config file already exists: {} (pass --force to overwrite)",
            path.display()
        );
    }
    let config = SyncConfig::default();
    std::fs::write(&path, config.to_toml()?)?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

fn run_config_show(path: &Path) -> Result<()> {
    let config = SyncConfig::from_file(path)?;
    print!("{}", config.to_toml()?);
    Ok(())
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
