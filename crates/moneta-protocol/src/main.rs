//! Moneta scenario runner - Entry Point
//!
//! Builds a deployment from a TOML config, replays its scenario and prints
//! one JSON outcome per step on stdout. Logs go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use moneta_protocol::{Deployment, ProtocolConfig};
use moneta_telemetry::SessionStatsReporter;
use serde::Serialize;
use tracing::info;

/// Moneta money market scenario runner
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via MONETA_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[derive(Serialize)]
struct Report<'a> {
    setup_events: usize,
    final_block: u64,
    steps: &'a [moneta_protocol::StepOutcome],
}

fn main() -> Result<()> {
    let args = Args::parse();

    // CLI arg > MONETA_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("MONETA_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    let config = ProtocolConfig::from_file(&config_path)
        .with_context(|| format!("loading {config_path}"))?;

    moneta_telemetry::init_logging(&config.log_filter)?;
    info!("Starting Moneta v{}", env!("CARGO_PKG_VERSION"));
    info!(
        config_path = %config_path,
        markets = config.markets.len(),
        steps = config.scenario.len(),
        "Configuration loaded"
    );

    let (mut deployment, setup_events) = Deployment::build(&config)?;
    let mut ops: Vec<String> = config
        .scenario
        .iter()
        .map(|step| step.op().to_string())
        .collect();
    ops.sort();
    ops.dedup();
    let stats = SessionStatsReporter::new(ops);

    let outcomes = deployment.run(&config.scenario)?;

    let report = Report {
        setup_events: setup_events.len(),
        final_block: deployment.protocol.block_number(),
        steps: &outcomes,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    stats.output_summary();
    Ok(())
}
