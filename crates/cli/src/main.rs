//! `stockwise` command line.
//!
//! ```bash
//! # Analyse a JSON export and print the run report
//! stockwise run --input inventory.json --pretty
//!
//! # Same, with a config file and a fixed analysis date
//! stockwise run --input inventory.json --config stockwise.json --as-of 2024-06-30T18:00:00Z
//!
//! # Show the effective configuration (file + STOCKWISE_* overrides)
//! stockwise config --config stockwise.json
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use stockwise_analytics::{AnalyticsEngine, AnalyticsInput, CancellationToken};
use stockwise_infra::{JsonDirectorySink, SnapshotSink, load_config};
use stockwise_observability::tracing::{LogFormat, TracingConfig, init_with};

/// Inventory analytics: ABC/XYZ classes, demand forecasts, reorder points and stock alerts.
#[derive(Debug, Parser)]
#[command(name = "stockwise")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Log format on stderr (json or compact).
    #[arg(long, global = true, default_value = "json", env = "STOCKWISE_LOG_FORMAT")]
    log_format: LogFormat,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the analytics pipeline over a JSON input file.
    Run {
        /// Input file: transactions, stock levels, catalog and lead times.
        #[arg(short, long)]
        input: PathBuf,

        /// Configuration file (JSON). STOCKWISE_* variables override it.
        #[arg(short, long, env = "STOCKWISE_CONFIG")]
        config: Option<PathBuf>,

        /// Analysis date (RFC 3339). Overrides `as_of` in the input file.
        #[arg(long)]
        as_of: Option<DateTime<Utc>>,

        /// Also write the report to `<DIR>/<run_id>.json`.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Pretty-print the report.
        #[arg(long)]
        pretty: bool,
    },

    /// Print the effective configuration.
    Config {
        /// Configuration file (JSON).
        #[arg(short, long, env = "STOCKWISE_CONFIG")]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_with(
        &TracingConfig::default()
            .with_format(cli.log_format)
            .with_default_filter(cli.log_level),
    );

    match cli.command {
        Commands::Run {
            input,
            config,
            as_of,
            output_dir,
            pretty,
        } => run(&input, config.as_deref(), as_of, output_dir, pretty),
        Commands::Config { config } => {
            let config = load_config(config.as_deref())?;
            config.validate()?;
            print_json(&config, true)
        }
    }
}

fn run(
    input_path: &Path,
    config_path: Option<&Path>,
    as_of: Option<DateTime<Utc>>,
    output_dir: Option<PathBuf>,
    pretty: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let engine = AnalyticsEngine::new(config).context("invalid analytics configuration")?;

    let raw = std::fs::read_to_string(input_path)
        .with_context(|| format!("failed to read input file {}", input_path.display()))?;
    let input = parse_input(&raw, as_of).with_context(|| format!("invalid input file {}", input_path.display()))?;

    tracing::info!(
        input = %input_path.display(),
        as_of = %input.as_of,
        transactions = input.transactions.len(),
        "starting analytics run"
    );
    let report = engine.run(&input, &CancellationToken::new())?;

    if let Some(dir) = output_dir {
        JsonDirectorySink::new(dir).emit(report.clone());
    }
    print_json(&report, pretty)
}

/// Parse an input document, replacing its `as_of` when one is given.
fn parse_input(raw: &str, as_of: Option<DateTime<Utc>>) -> Result<AnalyticsInput> {
    let mut doc: serde_json::Value = serde_json::from_str(raw)?;
    if let Some(as_of) = as_of {
        let obj = doc
            .as_object_mut()
            .context("input must be a JSON object")?;
        obj.insert("as_of".to_string(), serde_json::to_value(as_of)?);
    }
    let input: AnalyticsInput =
        serde_json::from_value(doc).context("input does not match the expected shape (is `as_of` set?)")?;
    Ok(input)
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<()> {
    let mut out = std::io::stdout().lock();
    if pretty {
        serde_json::to_writer_pretty(&mut out, value)?;
    } else {
        serde_json::to_writer(&mut out, value)?;
    }
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use clap::CommandFactory;

    const INPUT: &str = r#"{
        "as_of": "2024-06-30T18:00:00Z",
        "transactions": [
            { "sku": "B-1", "kind": "sale", "quantity": 4, "unit_price": 12.5, "occurred_at": "2024-06-20T10:00:00Z" },
            { "sku": "B-1", "kind": "receipt", "quantity": 20, "occurred_at": "2024-06-01T08:00:00Z" }
        ],
        "current_stock": { "B-1": 16 },
        "lead_time_days": { "B-1": 7 }
    }"#;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run_arguments() {
        let cli = Cli::try_parse_from([
            "stockwise",
            "run",
            "--input",
            "inventory.json",
            "--as-of",
            "2024-06-30T18:00:00Z",
            "--pretty",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.log_level, "debug");
        assert_eq!(cli.log_format, LogFormat::Json);
        match cli.command {
            Commands::Run { input, as_of, pretty, .. } => {
                assert_eq!(input, PathBuf::from("inventory.json"));
                assert_eq!(as_of, Some(Utc.with_ymd_and_hms(2024, 6, 30, 18, 0, 0).unwrap()));
                assert!(pretty);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn input_file_round_trips_into_engine_input() {
        let input = parse_input(INPUT, None).unwrap();
        assert_eq!(input.transactions.len(), 2);
        assert_eq!(input.current_stock.len(), 1);
        assert!(input.catalog.is_empty());
    }

    #[test]
    fn as_of_flag_overrides_the_file() {
        let at = Utc.with_ymd_and_hms(2024, 7, 7, 0, 0, 0).unwrap();
        let input = parse_input(INPUT, Some(at)).unwrap();
        assert_eq!(input.as_of, at);
    }

    #[test]
    fn missing_as_of_is_an_error() {
        assert!(parse_input(r#"{ "transactions": [] }"#, None).is_err());
        let at = Utc.with_ymd_and_hms(2024, 7, 7, 0, 0, 0).unwrap();
        assert!(parse_input(r#"{ "transactions": [] }"#, Some(at)).is_ok());
    }
}
