mod cli;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use notebench_core::harness::{run_scenario, ContainerPair, HarnessConfig};
use notebench_core::report::{generate_with, ReportOptions};
use notebench_core::scenario::{notes_scenario, read_scenario};
use notebench_core::NotebenchError;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = cli::Cli::parse();
    let result = match cli.command {
        cli::Commands::Run {
            url,
            scenario,
            users,
            spawn_rate,
            duration,
            out,
            benchmark_container,
            db_container,
        } => {
            cmd_run(
                url,
                scenario,
                users,
                spawn_rate,
                duration,
                out,
                benchmark_container.zip(db_container),
            )
            .await
        }
        cli::Commands::Report {
            root,
            no_readme,
            no_json,
        } => cmd_report(root, no_readme, no_json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn cmd_run(
    url: String,
    scenario_path: Option<PathBuf>,
    users: Option<u32>,
    spawn_rate: Option<f64>,
    duration: Option<u64>,
    out: PathBuf,
    containers: Option<(String, String)>,
) -> Result<(), NotebenchError> {
    let scenario = match scenario_path {
        Some(path) => read_scenario(&path).await?,
        None => notes_scenario(),
    };

    let mut config = HarnessConfig::from_scenario(scenario, url, out);
    if let Some(users) = users {
        config.users = users;
    }
    if let Some(rate) = spawn_rate {
        config.spawn_rate = rate;
    }
    if let Some(secs) = duration {
        config.duration = Duration::from_secs(secs);
    }
    config.containers = containers.map(|(benchmark, db)| ContainerPair { benchmark, db });

    let outcome = run_scenario(config).await?;
    info!(
        stats = %outcome.stats_path.display(),
        requests = outcome.total_requests,
        failures = outcome.total_failures,
        mean_response_ms = outcome.mean_response_ms.unwrap_or(0.0),
        "run complete"
    );
    if let Some(path) = outcome.resource_path {
        info!(resources = %path.display(), "resource usage written");
    }
    Ok(())
}

fn cmd_report(root: PathBuf, no_readme: bool, no_json: bool) -> Result<(), NotebenchError> {
    let options = ReportOptions {
        write_json: !no_json,
        write_readme: !no_readme,
    };
    let report = generate_with(&root, options)?;

    for run in &report.runs {
        info!(name = %run.name, graph = %run.graph_path.display(), "run reported");
    }
    for failure in &report.failures {
        warn!(name = %failure.name, error = %failure.error, "run skipped");
    }
    info!(
        runs = report.runs.len(),
        failures = report.failures.len(),
        "report complete"
    );
    // Per-run failures are non-fatal; only batch-level errors reach main.
    Ok(())
}
