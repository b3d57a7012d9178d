//! Fundamentals CLI binary.
//!
//! Refreshes and prints normalized statements for SEC filers.

use clap::{Parser, Subcommand};
use fundamentals::{
    Freshness, FundamentalsConfig, FundamentalsManager, StatementType, Symbol,
};
use std::path::PathBuf;
use std::process;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fundamentals")]
#[command(about = "Normalized financial statements from SEC company facts", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./fundamentals.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bring stored statements up to date with the latest filings
    Refresh {
        /// Ticker symbols
        #[arg(required = true)]
        tickers: Vec<String>,
    },

    /// Print a statement as JSON
    Show {
        /// Ticker symbol
        ticker: String,

        /// Statement: income_statement, balance_sheet or cash_flow_statement
        #[arg(long, default_value = "income_statement")]
        statement: StatementType,

        /// Print only reported facts, without derived concepts
        #[arg(long)]
        reported_only: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => FundamentalsConfig::load_from(path)?,
        None => FundamentalsConfig::load()?,
    };
    if let Some(data_dir) = cli.data_dir {
        config = config.with_data_dir(data_dir);
    }
    let manager = FundamentalsManager::from_config(&config)?;

    match cli.command {
        Commands::Refresh { tickers } => refresh(&manager, &tickers).await,
        Commands::Show {
            ticker,
            statement,
            reported_only,
        } => {
            let symbol = Symbol::new(ticker);
            let document = if reported_only {
                manager.statement(&symbol, statement).await?
            } else {
                manager.combined_statement(&symbol, statement).await?
            };
            match document {
                Some(document) => {
                    println!("{}", serde_json::to_string_pretty(&document)?);
                    Ok(())
                }
                None => Err(format!("no {statement} stored for {symbol}").into()),
            }
        }
    }
}

async fn refresh(
    manager: &FundamentalsManager,
    tickers: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut failed = Vec::new();
    for ticker in tickers {
        let symbol = Symbol::new(ticker.as_str());
        match manager.refresh(&symbol).await {
            Ok(Freshness::Fresh) => info!(company = %symbol, "Already up to date"),
            Ok(Freshness::Recomputed) => info!(company = %symbol, "Recomputed statements"),
            Err(e) => {
                error!(company = %symbol, error = %e, "Refresh failed");
                failed.push(symbol.to_string());
            }
        }
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(format!("refresh failed for {}", failed.join(", ")).into())
    }
}
