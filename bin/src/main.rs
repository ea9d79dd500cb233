//! klinevault CLI - Binance historical kline downloader and indexer.

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use klinevault_lib::prelude::*;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod display;

#[derive(Parser)]
#[command(name = "klinevault")]
#[command(about = "Binance historical kline downloader and indexer", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (suppress progress output and non-error logs)
    #[arg(short, long, global = true)]
    quiet: bool,
}

/// Archive selection shared by every command.
#[derive(Args)]
struct MarketArgs {
    /// Market segment (spot, um, cm). Defaults to DEFAULT_TRADE or spot.
    #[arg(long)]
    trade: Option<TradeType>,

    /// Kline interval (e.g. 1m, 1h, 1d). Defaults to DEFAULT_INTERVAL or 1m.
    #[arg(long)]
    interval: Option<Interval>,

    /// Data kind. Only klines can be downloaded.
    #[arg(long)]
    kind: Option<DataKind>,

    /// Local data directory. Defaults to DATA_DIRECTORY or ./data.
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

/// Time window bounds.
#[derive(Args)]
struct WindowArgs {
    /// Window start, inclusive (YYYY-MM-DD or RFC 3339). Defaults to the first archived month.
    #[arg(short, long)]
    start: Option<String>,

    /// Window end, exclusive (YYYY-MM-DD or RFC 3339). Defaults to the end of yesterday.
    #[arg(short, long)]
    end: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Download every shard covering the window
    Download {
        /// Symbols (e.g. BTCUSDT ETHUSDT)
        #[arg(required = true)]
        symbols: Vec<Symbol>,

        #[command(flatten)]
        window: WindowArgs,

        #[command(flatten)]
        market: MarketArgs,

        /// Concurrent shard downloads per symbol
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Show the shards covering the window
    Plan {
        /// Symbol (e.g. BTCUSDT)
        symbol: Symbol,

        #[command(flatten)]
        window: WindowArgs,

        #[command(flatten)]
        market: MarketArgs,

        /// Only show shards missing locally
        #[arg(long)]
        truncate: bool,
    },

    /// List archived date keys
    Dates {
        /// Symbol (e.g. BTCUSDT)
        symbol: Symbol,

        /// Listing granularity (monthly, daily)
        #[arg(short, long, default_value = "monthly")]
        granularity: Granularity,

        #[command(flatten)]
        market: MarketArgs,
    },

    /// Index local shards and show a summary of the window
    Inspect {
        /// Symbol (e.g. BTCUSDT)
        symbol: Symbol,

        #[command(flatten)]
        window: WindowArgs,

        #[command(flatten)]
        market: MarketArgs,

        /// Download missing shards first
        #[arg(long)]
        download: bool,

        /// Rows to print from each end
        #[arg(long, default_value = "3")]
        head: usize,
    },
}

/// Installs the stderr log subscriber. `RUST_LOG` wins over `-v`/`-q`.
fn init_tracing(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Loads `.env` and the environment, then applies command-line overrides.
fn load_config(market: &MarketArgs, batch_size: Option<usize>) -> Result<VaultConfig> {
    dotenvy::dotenv().ok();
    let mut config = VaultConfig::from_env().context("Invalid environment configuration")?;

    if let Some(trade) = market.trade {
        config.trade = trade;
    }
    if let Some(interval) = market.interval {
        config.interval = interval;
    }
    if let Some(kind) = market.kind {
        config.kind = kind;
    }
    if let Some(dir) = &market.data_dir {
        config.data_root.clone_from(dir);
    }
    if let Some(batch_size) = batch_size {
        config.batch_size = batch_size;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    // Show help if no command provided
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Download {
            symbols,
            window,
            market,
            batch_size,
        } => {
            let config = load_config(&market, batch_size)?;
            commands::download::download(&config, &symbols, &window, cli.quiet).await
        }
        Commands::Plan {
            symbol,
            window,
            market,
            truncate,
        } => {
            let config = load_config(&market, None)?;
            commands::plan::show_plan(&config, &symbol, &window, truncate).await
        }
        Commands::Dates {
            symbol,
            granularity,
            market,
        } => {
            let config = load_config(&market, None)?;
            commands::dates::list_dates(&config, &symbol, granularity).await
        }
        Commands::Inspect {
            symbol,
            window,
            market,
            download,
            head,
        } => {
            let config = load_config(&market, None)?;
            commands::inspect::inspect(&config, &symbol, &window, download, head, cli.quiet).await
        }
    }
}
