mod config;

use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use stockpulse_market_data::MarketDataService;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use config::Config;

#[derive(Parser)]
#[command(name = "stockpulse")]
#[command(about = "Fetch company snapshots from free market data sources", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch snapshots for one or more symbols
    Fetch {
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Include which sources were tried for each symbol
        #[arg(long)]
        diagnostics: bool,
    },

    /// Fetch symbols, then print cache statistics
    Stats {
        symbols: Vec<String>,

        /// Show keys and TTL of a single partition
        #[arg(long)]
        partition: Option<String>,
    },

    /// List configured sources and usage counters
    Sources,

    /// Refresh symbols on an interval until Ctrl-C
    Watch {
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Seconds between refreshes
        #[arg(long, default_value_t = 60)]
        interval_secs: u64,
    },
}

fn init_tracing() {
    let log_format = std::env::var("STOCKPULSE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so stdout stays parseable JSON
    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    // Load .env before the subscriber so RUST_LOG and the log format apply
    dotenvy::dotenv().ok();
    init_tracing();
    let config = Config::from_env();

    let service = MarketDataService::with_default_sources(
        config.alpha_vantage_key,
        config.finnhub_key,
        config.market_data,
    )
    .context("Failed to initialise market data sources")?;

    match cli.command {
        Commands::Fetch {
            symbols,
            diagnostics,
        } => {
            for symbol in &symbols {
                if diagnostics {
                    let (snapshot, diag) = service.fetch_with_diagnostics(symbol).await;
                    tracing::info!("{}: {}", snapshot.symbol, diag.summary());
                    print_json(&json!({ "snapshot": snapshot, "diagnostics": diag }))?;
                } else {
                    print_json(&service.fetch(symbol).await)?;
                }
            }
        }
        Commands::Stats { symbols, partition } => {
            for symbol in &symbols {
                service.fetch(symbol).await;
            }
            print_json(&json!({
                "stats": service.cache_stats(),
                "info": service.cache_info(partition.as_deref()),
            }))?;
        }
        Commands::Sources => {
            print_json(&service.source_stats())?;
        }
        Commands::Watch {
            symbols,
            interval_secs,
        } => {
            let sweeper = service.start_sweeper();
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            tracing::info!(
                "Watching {} symbols every {}s",
                symbols.len(),
                interval_secs.max(1)
            );

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("Shutdown signal received");
                        break;
                    }
                    _ = interval.tick() => {
                        for symbol in &symbols {
                            let snapshot = service.fetch(symbol).await;
                            println!("{}", serde_json::to_string(&snapshot)?);
                        }
                    }
                }
            }

            sweeper.stop().await;
            print_json(&service.cache_stats())?;
        }
    }

    Ok(())
}
