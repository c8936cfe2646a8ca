//! Cash Flow Simulator CLI
//!
//! Run a JSON scenario and print the resulting balances.
//!
//! # Example
//!
//! ```bash
//! # Balances after every date with activity
//! cashflow-sim scenario.json
//!
//! # Carry-forward balances on a given date
//! cashflow-sim scenario.json --at 2024-12-31
//!
//! # Full machine-readable report
//! RUST_LOG=cashflow_simulator_core=debug cashflow-sim scenario.json --format json
//! ```
//!
//! Exit status: 0 on success, 1 when the scenario cannot be loaded or the
//! run aborts, 2 when any process ended with an error. Invalid arguments,
//! including `--at` together with `--format json`, are reported by clap.

use cashflow_simulator_core::{BalanceRow, ScenarioConfig, ScenarioError, SimulationResult};
use chrono::NaiveDate;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, ValueEnum};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Balances by date, one row per date
    Table,
    /// SimulationReport as JSON
    Json,
}

/// Cash Flow Simulator
///
/// Drives the actors of a scenario against a virtual calendar and prints
/// the ledger they produce. Runs are deterministic.
#[derive(Parser, Debug)]
#[command(name = "cashflow-sim")]
#[command(version, about, long_about = None)]
struct Args {
    /// Scenario file (JSON)
    scenario: PathBuf,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Print carry-forward balances on this date instead of the full table
    /// (table format only)
    #[arg(long, value_name = "YYYY-MM-DD")]
    at: Option<NaiveDate>,
}

impl Args {
    fn check(&self) -> Result<(), &'static str> {
        if self.format == OutputFormat::Json && self.at.is_some() {
            return Err("--at cannot be used with --format json");
        }
        Ok(())
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,cashflow_simulator_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if let Err(message) = args.check() {
        Args::command().error(ErrorKind::ArgumentConflict, message).exit();
    }

    let scenario = match ScenarioConfig::from_path(&args.scenario) {
        Ok(scenario) => scenario,
        Err(e) => {
            error!(path = %args.scenario.display(), error = %e, "Failed to load scenario");
            return ExitCode::from(1);
        }
    };

    info!(
        path = %args.scenario.display(),
        actors = scenario.actors.len(),
        accounts = scenario.simulation.accounts.len(),
        "Loaded scenario"
    );

    let result = match scenario
        .into_simulation()
        .and_then(|s| s.run().map_err(ScenarioError::from))
    {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "Simulation aborted");
            return ExitCode::from(1);
        }
    };

    let output = match (args.format, args.at) {
        (OutputFormat::Json, _) => result.report().and_then(|report| report.to_json()),
        (OutputFormat::Table, Some(date)) => Ok(render_snapshot(&result, date)),
        (OutputFormat::Table, None) => Ok(render_table(&result.balances_by_date())),
    };
    match output {
        Ok(text) => println!("{}", text),
        Err(e) => {
            error!(error = %e, "Failed to render result");
            return ExitCode::from(1);
        }
    }

    for outcome in result.errored() {
        if let Some(e) = outcome.error() {
            error!(process = %outcome.name, error = %e, "Process errored");
        }
    }
    if result.has_errors() {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    }
}

/// Cents as a decimal amount
fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

fn render_table(rows: &[BalanceRow]) -> String {
    let Some(first) = rows.first() else {
        return "no transfers".to_string();
    };
    let accounts: Vec<&String> = first.balances.keys().collect();

    let mut cells: Vec<Vec<String>> = Vec::with_capacity(rows.len() + 1);
    cells.push(
        std::iter::once("date".to_string())
            .chain(accounts.iter().map(|id| id.to_string()))
            .collect(),
    );
    for row in rows {
        cells.push(
            std::iter::once(row.date.to_string())
                .chain(
                    accounts
                        .iter()
                        .map(|id| format_cents(row.balances.get(*id).copied().unwrap_or(0))),
                )
                .collect(),
        );
    }

    let widths: Vec<usize> = (0..cells[0].len())
        .map(|col| cells.iter().map(|row| row[col].len()).max().unwrap_or(0))
        .collect();

    cells
        .iter()
        .map(|row| {
            row.iter()
                .zip(&widths)
                .enumerate()
                .map(|(col, (cell, width))| {
                    if col == 0 {
                        format!("{:<width$}", cell, width = *width)
                    } else {
                        format!("{:>width$}", cell, width = *width)
                    }
                })
                .collect::<Vec<_>>()
                .join("  ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_snapshot(result: &SimulationResult, date: NaiveDate) -> String {
    let balances: BTreeMap<String, i64> = result.ledger().balances_at(date);
    let width = balances.keys().map(String::len).max().unwrap_or(0);
    std::iter::once(format!("balances on {}", date))
        .chain(balances.iter().map(|(id, balance)| {
            format!(
                "{:<width$}  {:>14}",
                id,
                format_cents(*balance),
                width = width
            )
        }))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(5), "0.05");
        assert_eq!(format_cents(-27_556_776), "-275567.76");
        assert_eq!(format_cents(123_456), "1234.56");
    }

    #[test]
    fn test_at_rejected_with_json() {
        let argv = ["cashflow-sim", "s.json", "-f", "json", "--at", "2020-01-01"];
        let args = Args::try_parse_from(argv).unwrap();
        assert!(args.check().is_err());

        let args = Args::try_parse_from(["cashflow-sim", "s.json", "--at", "2020-01-01"]).unwrap();
        assert!(args.check().is_ok());
        assert_eq!(args.at, NaiveDate::from_ymd_opt(2020, 1, 1));
    }

    #[test]
    fn test_empty_table() {
        assert_eq!(render_table(&[]), "no transfers");
    }
}
