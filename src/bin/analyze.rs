//! Market structure decision CLI
//!
//! Reads an OHLC payload (`{"data": [...], "interval": "day"}`) from a JSON
//! file, runs the full decision pipeline and prints the bundle as JSON.
//!
//! # Usage
//! ```sh
//! cargo run --bin analyze -- --input prices.json --fundamentals funda.json --pretty
//! cargo run --bin analyze -- --matrix
//! ```
//!
//! # Environment Variables
//! - `RUST_LOG` - Log filter (default: info)
//! - `REGIME_*` - Detector thresholds, see `EngineConfig::from_env`

use anyhow::{Context, Result};
use clap::Parser;
use regime_engine::application::decision::{DecisionEngine, DecisionRequest, FundamentalInput};
use regime_engine::application::scoring::ConfluenceMatrix;
use regime_engine::config::EngineConfig;
use regime_engine::domain::market::MarketBias;
use std::path::Path;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(author, version, about = "Market structure decision engine", long_about = None)]
struct Cli {
    /// JSON file with the OHLC payload
    #[arg(short, long, required_unless_present = "matrix")]
    input: Option<String>,

    /// JSON file with fundamental inputs (regime, score, snapshot, history)
    #[arg(short, long)]
    fundamentals: Option<String>,

    /// TOML engine config; environment variables are used when omitted
    #[arg(short, long)]
    config: Option<String>,

    /// Bias from the previous evaluation, for transition narration
    #[arg(long)]
    previous_bias: Option<String>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Print the confluence matrix and exit
    #[arg(long)]
    matrix: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout stays valid JSON
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stderr_layer)
        .init();

    let cli = Cli::parse();

    if cli.matrix {
        println!("{}", ConfluenceMatrix::render());
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => EngineConfig::from_toml_file(path)?,
        None => EngineConfig::from_env()?,
    };
    info!(
        "Configuration loaded: default timeframe {}, window budget {}",
        config.default_timeframe, config.max_window_evaluations
    );

    let input = cli.input.as_deref().context("--input is required")?;
    let mut request: DecisionRequest = read_json(input)?;

    if let Some(path) = &cli.fundamentals {
        let fundamentals: FundamentalInput = read_json(path)?;
        request.fundamentals = Some(fundamentals);
    }
    if let Some(raw) = &cli.previous_bias {
        let bias = raw
            .parse::<MarketBias>()
            .map_err(anyhow::Error::msg)
            .context("Invalid --previous-bias")?;
        request.previous_bias = Some(bias);
    }

    let engine = DecisionEngine::new(&config).context("Invalid engine configuration")?;
    let bundle = engine.evaluate(&request);

    let output = if cli.pretty {
        serde_json::to_string_pretty(&bundle)?
    } else {
        serde_json::to_string(&bundle)?
    };
    println!("{}", output);

    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .context(format!("Failed to read input file: {}", path.display()))?;
    serde_json::from_str(&content).context(format!("Failed to parse JSON: {}", path.display()))
}
