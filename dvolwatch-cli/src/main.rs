//! DVOL Watch CLI — one fetch-align-write pass.
//!
//! Fetches the Deribit BTC volatility index and the blockchain.com BTC
//! price, aligns them by UTC day, prints the current stats and writes the
//! dashboard data file.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use dvolwatch_core::data::LogProgress;
use dvolwatch_runner::{run_pipeline, Config, RunReport, Sources};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "dvolwatch",
    about = "DVOL Watch — fetch BTC implied volatility and price, write dashboard data"
)]
struct Cli {
    /// Path to a TOML config file. Built-in defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output JSON path. Overrides `output_path` from the config.
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(output) = cli.output {
        config.output_path = output;
    }
    config.validate()?;

    let sources = Sources::from_config(&config).context("failed to set up HTTP sources")?;

    tracing::info!("starting DVOL fetch");
    let report = run_pipeline(
        &config,
        &sources.volatility,
        &sources.price,
        Some(&LogProgress),
        Utc::now(),
    )
    .context("run aborted, output file left unchanged")?;

    print_report(&report);
    Ok(())
}

fn print_report(report: &RunReport) {
    let r = &report.record;
    println!("\nCurrent Stats:");
    println!("BTC Price: ${}", with_thousands(r.current_price));
    println!("DVOL: {:.1}%", r.current_dvol);
    println!("Expected Daily Move: {:.2}%", r.expected_daily_move);
    println!("Status: {} ({})", r.status, r.status_en);
    println!("\nSaved {} days to {}", r.dates.len(), report.output_path.display());
}

/// Whole-dollar amount with comma separators, e.g. `60,000`.
fn with_thousands(value: f64) -> String {
    let whole = format!("{:.0}", value.abs());
    let mut out = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if value < 0.0 && whole != "0" {
        out.insert(0, '-');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thousands_separators() {
        assert_eq!(with_thousands(60000.12), "60,000");
        assert_eq!(with_thousands(999.6), "1,000");
        assert_eq!(with_thousands(123.0), "123");
        assert_eq!(with_thousands(1_234_567.0), "1,234,567");
        assert_eq!(with_thousands(-4321.0), "-4,321");
        assert_eq!(with_thousands(0.0), "0");
    }

    #[test]
    fn cli_parses_without_arguments() {
        let cli = Cli::try_parse_from(["dvolwatch"]).unwrap();
        assert!(cli.config.is_none());
        assert!(cli.output.is_none());
    }

    #[test]
    fn cli_parses_overrides() {
        let cli =
            Cli::try_parse_from(["dvolwatch", "--config", "dv.toml", "--output", "out.json"])
                .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("dv.toml")));
        assert_eq!(cli.output, Some(PathBuf::from("out.json")));
    }
}
