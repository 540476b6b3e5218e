use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use prospect_core::EngineParams;
use regtest_harness::{
    run_checks, CheckOptions, HarnessConfig, RegtestNode, ReportStatus, Scenario, ScenarioReport,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Drive the prospecting engine on a regtest chain")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one scenario and print the final game state.
    Run(RunArgs),
    /// Run the configured checks over all scenarios and emit a JSON report.
    Check(CheckArgs),
    /// Summarize an existing report.
    Report(ReportArgs),
}

#[derive(Args)]
struct RunArgs {
    #[arg(long)]
    scenario: PathBuf,
    /// Engine params TOML; defaults plus environment overrides otherwise.
    #[arg(long)]
    params: Option<PathBuf>,
}

#[derive(Args)]
struct CheckArgs {
    #[arg(long, default_value = "harness.toml")]
    config: PathBuf,
    #[arg(long)]
    id: Option<String>,
}

#[derive(Args)]
struct ReportArgs {
    #[arg(long)]
    input: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => handle_run(args),
        Commands::Check(args) => handle_check(args),
        Commands::Report(args) => handle_report(args),
    }
}

fn handle_run(args: RunArgs) -> Result<()> {
    let params = match &args.params {
        Some(path) => EngineParams::from_path(path)
            .with_context(|| format!("invalid engine params {}", path.display()))?,
        None => {
            let params = EngineParams::from_env();
            params.validate()?;
            params
        }
    };
    let scenario = Scenario::from_path(&args.scenario)?;
    let mut node = RegtestNode::new(params)?;
    scenario.run(&mut node)?;
    info!(target: "prospect_cli", scenario = %scenario.name, height = node.state().height, "scenario finished");
    println!("{}", serde_json::to_string_pretty(&node.game_state())?);
    Ok(())
}

fn handle_check(args: CheckArgs) -> Result<()> {
    let config_path = args.config;
    let base = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let config = HarnessConfig::from_path(&config_path)?.resolve(base);
    config.validate_sources()?;

    let run_id = args
        .id
        .unwrap_or_else(|| format!("run-{}", Utc::now().format("%Y%m%dT%H%M%S")));
    let workspace_root = std::env::current_dir()?;
    let options = CheckOptions::new(workspace_root, run_id.clone());

    let report = run_checks(&config, &options)?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(report_cfg) = config.report.as_ref() {
        if let Some(parent) = report_cfg.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&report_cfg.path, serde_json::to_string_pretty(&report)?)?;
        println!("Report written to {}", report_cfg.path.display());
    }

    if report.summary.status == ReportStatus::Fail {
        anyhow::bail!("run {run_id} failed");
    }
    Ok(())
}

fn handle_report(args: ReportArgs) -> Result<()> {
    let data = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read report {}", args.input.display()))?;
    let report: ScenarioReport = serde_json::from_str(&data)?;
    println!("{}", report.one_line());
    Ok(())
}
