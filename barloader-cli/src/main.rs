//! barloader CLI — daily bar ingestion and table maintenance.
//!
//! Commands:
//! - `ingest` — fetch daily bars for every ticker in the list and append them
//! - `init-db` — create the `daily_prices` table if it does not exist
//! - `status` — report row counts and date ranges per symbol

use anyhow::{Context, Result};
use barloader_core::config::{
    load_dotenv, require_var, ConfigOverrides, Credentials, IngestConfig, API_KEY_ENV,
    DATABASE_URL_ENV,
};
use barloader_core::data::{
    ingest_tickers, BarStore, IngestProgress, LogProgress, MarketDataProvider, MemoryBarStore,
    PgBarStore, PolygonProvider, StdoutProgress, ThreadPacer,
};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "barloader",
    about = "barloader — append daily OHLCV bars from an aggregates API to Postgres"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch daily bars for every ticker in the list and append them to the table.
    Ingest(IngestArgs),
    /// Create the daily_prices table and index if they do not exist.
    InitDb,
    /// Report row counts and date ranges per symbol.
    Status,
}

#[derive(Args)]
struct IngestArgs {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Whitespace-delimited ticker list. Defaults to ./tickers.txt.
    #[arg(long)]
    tickers: Option<PathBuf>,

    /// Start date (YYYY-MM-DD). Defaults to 2015-01-01.
    #[arg(long)]
    start: Option<NaiveDate>,

    /// End date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Pause between tickers in seconds. Defaults to 12.5.
    #[arg(long)]
    delay_secs: Option<f64>,

    /// Provider record cap per request. Defaults to 50000.
    #[arg(long)]
    limit: Option<u32>,

    /// Append into memory instead of the database.
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Where per-ticker progress goes.
    #[arg(long, value_enum, default_value_t = ProgressMode::Stdout)]
    progress: ProgressMode,
}

#[derive(Clone, Copy, ValueEnum)]
enum ProgressMode {
    Stdout,
    Log,
}

fn main() -> Result<()> {
    load_dotenv();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest(args) => run_ingest(args),
        Commands::InitDb => run_init_db(),
        Commands::Status => run_status(),
    }
}

fn run_ingest(args: IngestArgs) -> Result<()> {
    let mut config = match args.config.as_deref() {
        Some(path) => IngestConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => IngestConfig::default(),
    };

    // A ticker path from the command line is taken as given; one from the
    // config file is relative to that file.
    let tickers_base: Option<&Path> = match (&args.tickers, args.config.as_deref()) {
        (None, Some(path)) => path.parent(),
        _ => None,
    };

    config.apply(ConfigOverrides {
        tickers_file: args.tickers,
        start: args.start,
        end: args.end,
        delay_secs: args.delay_secs,
        limit: args.limit,
    });

    let tickers = config.load_tickers(tickers_base)?;
    let range = config.date_range(chrono::Local::now().date_naive())?;
    let delay = config.delay()?;
    let limit = config.checked_limit()?;

    let (api_key, mut store): (String, Box<dyn BarStore>) = if args.dry_run {
        let key = require_var(API_KEY_ENV, |k| std::env::var(k).ok())?;
        (key, Box::new(MemoryBarStore::new()))
    } else {
        let creds = Credentials::from_env()?;
        let store = PgBarStore::open(&creds.database_url)
            .context("connecting to database and creating daily_prices")?;
        (creds.api_key, Box::new(store))
    };

    let provider = PolygonProvider::with_base_url(api_key, &config.base_url)?.with_limit(limit);

    info!(
        "ingesting {} tickers from {} over {range} (limit {}, {:.1}s between tickers{})",
        tickers.len(),
        provider.name(),
        provider.limit(),
        delay.as_secs_f64(),
        if args.dry_run { ", dry run" } else { "" }
    );

    let progress: &dyn IngestProgress = match args.progress {
        ProgressMode::Stdout => &StdoutProgress,
        ProgressMode::Log => &LogProgress,
    };

    let summary = ingest_tickers(
        &provider,
        store.as_mut(),
        tickers.as_slice(),
        range,
        &ThreadPacer,
        delay,
        progress,
    );

    if !summary.all_succeeded() {
        for (sym, err) in summary.failures() {
            eprintln!("Error for {sym}: {err}");
        }
        std::process::exit(1);
    }

    Ok(())
}

fn connect_store() -> Result<PgBarStore> {
    let url = require_var(DATABASE_URL_ENV, |k| std::env::var(k).ok())?;
    PgBarStore::connect(&url).context("connecting to database")
}

fn run_init_db() -> Result<()> {
    let mut store = connect_store()?;
    store.init_schema().context("creating daily_prices")?;
    println!("daily_prices is ready.");
    Ok(())
}

fn run_status() -> Result<()> {
    let mut store = connect_store()?;
    let stats = store.symbol_stats().context("querying daily_prices")?;

    if stats.is_empty() {
        println!("daily_prices is empty.");
        return Ok(());
    }

    let total_rows: u64 = stats.iter().map(|s| s.rows).sum();
    println!("Symbols: {}", stats.len());
    println!("Rows:    {total_rows}");
    println!();
    println!("{:<10} {:<25} {:>10}", "Symbol", "Date Range", "Rows");
    println!("{}", "-".repeat(47));
    for s in &stats {
        let range = match (s.first, s.last) {
            (Some(first), Some(last)) => format!("{first} to {last}"),
            _ => "(none)".to_string(),
        };
        println!("{:<10} {:<25} {:>10}", s.symbol, range, s.rows);
    }

    Ok(())
}
