//! Watchboard CLI: refresh, show, flag, and status commands.
//!
//! Commands:
//! - `refresh` fetches every configured category and commits one snapshot
//! - `show` prints one category from the cache (or fetches it with `--refresh`)
//! - `flag` marks a symbol as owned or not owned
//! - `status` reports the cache file, its timestamp, and per-key record counts

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use watchboard_core::data::{JsonWatchlist, YahooProvider};
use watchboard_core::domain::{CategoryRecord, Value};
use watchboard_core::{Dashboard, DashboardError, RefreshError, WatchboardConfig};

#[derive(Parser)]
#[command(name = "watchboard", about = "Watchboard CLI: category dashboards of RSI and ATR")]
struct Cli {
    /// Path to a TOML config file. Defaults apply when it does not exist.
    #[arg(long, global = true, default_value = "watchboard.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh all configured categories as one snapshot.
    Refresh {
        /// Refresh only this category, writing straight to the live cache.
        #[arg(long)]
        category: Option<String>,
    },
    /// Print one category.
    Show {
        /// Category name (e.g. Owned, Energy, ETFs).
        category: String,

        /// Fetch fresh data instead of reading the cache.
        #[arg(long, default_value_t = false)]
        refresh: bool,

        /// Print records as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Mark a symbol as owned (on) or not owned (off).
    Flag {
        symbol: String,
        #[arg(value_enum)]
        state: FlagState,
    },
    /// Report cache location, timestamp, and record counts.
    Status,
}

#[derive(Clone, Copy, ValueEnum)]
enum FlagState {
    On,
    Off,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = WatchboardConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let dashboard = open_dashboard(&config)?;

    match cli.command {
        Commands::Refresh { category } => run_refresh(&dashboard, category.as_deref()),
        Commands::Show {
            category,
            refresh,
            json,
        } => run_show(&dashboard, &category, refresh, json),
        Commands::Flag { symbol, state } => run_flag(&dashboard, &symbol, matches!(state, FlagState::On)),
        Commands::Status => run_status(&dashboard),
    }
}

fn open_dashboard(config: &WatchboardConfig) -> Result<Dashboard> {
    let provider = YahooProvider::new(&config.provider).context("creating market-data client")?;
    let watchlist = JsonWatchlist::new(&config.watchlist_file);
    Ok(Dashboard::from_config(config, Arc::new(provider), Box::new(watchlist)))
}

fn run_refresh(dashboard: &Dashboard, category: Option<&str>) -> Result<()> {
    if let Some(name) = category {
        let entry = dashboard.category(name, true)?;
        println!("{name}: {} records ({})", entry.records.len(), entry.last_updated);
        return Ok(());
    }

    match dashboard.refresh_all() {
        Ok(summary) => {
            println!(
                "Refreshed {} categories, {} records in {:.1}s",
                summary.categories.len(),
                summary.records,
                summary.elapsed.as_secs_f64()
            );
            Ok(())
        }
        Err(DashboardError::Refresh(RefreshError::RateLimited { staged, source })) => {
            bail!("rate limited after {staged} categories, live data kept: {source}")
        }
        Err(e) => Err(e.into()),
    }
}

fn run_show(dashboard: &Dashboard, category: &str, refresh: bool, json: bool) -> Result<()> {
    let entry = dashboard.category(category, refresh)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entry.records)?);
        return Ok(());
    }

    println!("{category} (last updated {})", entry.last_updated);
    if entry.records.is_empty() {
        println!("  (no records)");
        return Ok(());
    }
    println!(
        "  {:<8} {:<28} {:>10} {:>8} {:>7} {:>7} {:>7} {:>7} {:>12}",
        "Symbol", "Name", "Close", "Chg%", "RSI14", "yRSI", "RSI_i", "ATR%", "MktCap(M)"
    );
    for record in &entry.records {
        print_row(record);
    }
    Ok(())
}

fn print_row(r: &CategoryRecord) {
    let owned = if r.flag { "*" } else { " " };
    let gap = if r.data_gap { "~" } else { "" };
    println!(
        "{owned} {:<8} {:<28} {:>10} {:>8} {:>7} {:>7} {:>7} {:>7} {:>12}",
        r.symbol,
        truncate(&r.name, 28),
        cell(r.close, 2),
        format!("{}{gap}", cell(r.percent_change, 2)),
        cell(r.indicators.rsi, 1),
        cell(r.indicators.y_rsi, 1),
        cell(r.indicators.rsi_intraday, 1),
        cell(r.indicators.atr_percent, 2),
        cell(r.market_cap, 0),
    );
}

fn cell(value: Value, decimals: usize) -> String {
    match value.as_f64() {
        Some(v) => format!("{v:.decimals$}"),
        None => value.to_string(),
    }
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width - 1).collect();
        out.push('…');
        out
    }
}

fn run_flag(dashboard: &Dashboard, symbol: &str, flag: bool) -> Result<()> {
    let change = dashboard.update_flag(symbol, flag)?;
    let state = if flag { "owned" } else { "not owned" };
    println!("{symbol} ({}) is now {state}", change.origin);
    if !change.cached {
        info!(symbol, "symbol not cached yet; the next refresh will include it");
    }
    Ok(())
}

fn run_status(dashboard: &Dashboard) -> Result<()> {
    let cache = dashboard.cache();
    let snapshot = cache.snapshot();

    println!("Cache file:   {}", cache.store().path().display());
    println!("Last updated: {}", snapshot.last_updated);
    println!("Keys:         {}", snapshot.entries.len());
    for (key, records) in &snapshot.entries {
        println!("  {key:<36} {:>5} records", records.len());
    }

    let missing: Vec<&str> = dashboard
        .categories()
        .iter()
        .filter(|c| !snapshot.entries.contains_key(&cache.keys().key_for(c)))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        println!("Not cached:   {}", missing.join(", "));
    }
    Ok(())
}
