//! Turns loaded runs into report artifacts: per-run charts, a comparison
//! chart, a JSON data document and a regenerated README.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::NotebenchError;
use crate::run::align::align;
use crate::run::discover::discover_runs;
use crate::run::load::load_run;
use crate::run::summary::summarize;
use crate::run::{AlignedRow, Run, RunSummary};

pub mod chart;
pub mod compare;
pub mod readme;

pub use chart::{render_chart, ChartRun, PALETTE};
pub use compare::{build_table, ComparisonTable};
pub use readme::{write_readme, ReadmeEntry};

/// Per-run chart, written next to the run's CSV files.
pub const RUN_GRAPH_FILE: &str = "graph.png";
/// Cross-run chart, written at the results root.
pub const COMPARISON_GRAPH_FILE: &str = "comparison.png";
/// JSON document with every run's summary and aligned rows.
pub const DATA_JSON_FILE: &str = "data.json";
pub const README_FILE: &str = "README.md";

// ---------------------------------------------------------------------------
// Batch types
// ---------------------------------------------------------------------------

/// A run that has been loaded, summarized and aligned, ready for rendering.
#[derive(Debug, Clone)]
pub struct ReportedRun {
    pub id: Uuid,
    pub name: String,
    pub dir: PathBuf,
    pub summary: RunSummary,
    pub rows: Vec<AlignedRow>,
    pub graph_path: PathBuf,
}

/// A run that dropped out of the batch, with the error that removed it.
#[derive(Debug)]
pub struct RunFailure {
    pub name: String,
    pub dir: PathBuf,
    pub error: NotebenchError,
}

/// Which optional artifacts a reporting pass writes. Charts are always
/// rendered; the data document and README can be switched off.
#[derive(Debug, Clone, Copy)]
pub struct ReportOptions {
    pub write_json: bool,
    pub write_readme: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            write_json: true,
            write_readme: true,
        }
    }
}

/// Outcome of one reporting pass over a results root.
#[derive(Debug)]
pub struct BatchReport {
    pub generated_at: DateTime<Utc>,
    pub runs: Vec<ReportedRun>,
    pub failures: Vec<RunFailure>,
    pub readme_version: Option<u64>,
}

#[derive(Serialize)]
struct DataEntry<'a> {
    summary: &'a RunSummary,
    rows: &'a [AlignedRow],
}

// ---------------------------------------------------------------------------
// Pipeline steps
// ---------------------------------------------------------------------------

/// Summarize and align one loaded run.
pub fn prepare_run(run: &Run) -> ReportedRun {
    ReportedRun {
        id: Uuid::new_v4(),
        name: run.name.clone(),
        dir: run.dir.clone(),
        summary: summarize(run),
        rows: align(&run.metrics, &run.resources),
        graph_path: run.dir.join(RUN_GRAPH_FILE),
    }
}

/// Discover and prepare every run under `root`. A run that fails to load is
/// recorded as a failure and the rest of the batch proceeds.
pub fn collect_runs(root: &Path) -> Result<(Vec<ReportedRun>, Vec<RunFailure>), NotebenchError> {
    let discovered = discover_runs(root)?;
    info!(root = %root.display(), runs = discovered.len(), "collecting runs");

    let mut runs = Vec::with_capacity(discovered.len());
    let mut failures = Vec::new();
    for found in discovered {
        match load_run(&found.dir, found.name.clone()) {
            Ok(run) => runs.push(prepare_run(&run)),
            Err(error) => {
                warn!(name = %found.name, dir = %found.dir.display(), %error, "skipping run");
                failures.push(RunFailure {
                    name: found.name,
                    dir: found.dir,
                    error,
                });
            }
        }
    }
    Ok((runs, failures))
}

/// Serialize all runs to the data document: run name to summary plus aligned
/// rows, names sorted. A duplicate name keeps the last run seen.
pub fn render_data(runs: &[ReportedRun]) -> Result<String, NotebenchError> {
    let mut map = BTreeMap::new();
    for run in runs {
        let entry = DataEntry {
            summary: &run.summary,
            rows: &run.rows,
        };
        if map.insert(run.name.clone(), entry).is_some() {
            warn!(name = %run.name, "duplicate run name in data document, keeping the last one");
        }
    }
    Ok(serde_json::to_string_pretty(&map)?)
}

/// Run the whole reporting pass with every artifact enabled.
pub fn generate_all(root: &Path) -> Result<BatchReport, NotebenchError> {
    generate_with(root, ReportOptions::default())
}

/// Run one reporting pass: per-run charts, comparison chart, and (per
/// `options`) the data document and README. Per-run errors demote that run
/// to a failure; palette exhaustion on the comparison chart aborts the pass.
pub fn generate_with(root: &Path, options: ReportOptions) -> Result<BatchReport, NotebenchError> {
    let generated_at = Utc::now();
    let (prepared, mut failures) = collect_runs(root)?;

    let mut runs = Vec::with_capacity(prepared.len());
    for run in prepared {
        let chart_run = ChartRun {
            name: &run.name,
            rows: &run.rows,
            summary: &run.summary,
        };
        match chart::render_chart(&run.graph_path, &[chart_run]) {
            Ok(()) => {
                info!(run_id = %run.id, name = %run.name, "rendered run chart");
                runs.push(run);
            }
            Err(error) => {
                warn!(name = %run.name, %error, "skipping run after chart failure");
                failures.push(RunFailure {
                    name: run.name.clone(),
                    dir: run.dir.clone(),
                    error,
                });
            }
        }
    }

    if runs.is_empty() {
        warn!(root = %root.display(), "no runs survived, skipping comparison artifacts");
        return Ok(BatchReport {
            generated_at,
            runs,
            failures,
            readme_version: None,
        });
    }

    let chart_runs: Vec<ChartRun<'_>> = runs
        .iter()
        .map(|run| ChartRun {
            name: &run.name,
            rows: &run.rows,
            summary: &run.summary,
        })
        .collect();
    chart::render_chart(&root.join(COMPARISON_GRAPH_FILE), &chart_runs)?;

    if options.write_json {
        fs::write(root.join(DATA_JSON_FILE), render_data(&runs)?)?;
    }

    let readme_version = if options.write_readme {
        let entries: Vec<ReadmeEntry> = runs
            .iter()
            .map(|run| ReadmeEntry {
                name: run.name.clone(),
                image: relative_link(root, &run.graph_path),
            })
            .collect();
        Some(readme::write_readme(root, &entries)?)
    } else {
        None
    };

    info!(
        runs = runs.len(),
        failures = failures.len(),
        "reporting pass finished"
    );
    Ok(BatchReport {
        generated_at,
        runs,
        failures,
        readme_version,
    })
}

/// Root-relative link with forward slashes, for use inside the README.
fn relative_link(root: &Path, target: &Path) -> String {
    let rel = target.strip_prefix(root).unwrap_or(target);
    rel.components()
        .filter_map(|c| c.as_os_str().to_str())
        .collect::<Vec<_>>()
        .join("/")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
