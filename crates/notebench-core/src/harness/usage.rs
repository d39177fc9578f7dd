//! Docker-stats sampler feeding the resource-usage CSV.

use std::path::Path;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::NotebenchError;
use crate::harness::FLUSH_INTERVAL;

/// Header of the resource-usage CSV.
pub const RESOURCE_HEADER: &str =
    "timestamp,benchmark_cpu_usage,benchmark_mem_usage_mb,db_cpu_usage,db_mem_usage";

/// The two containers a run samples: the backend under test and its database.
#[derive(Debug, Clone)]
pub struct ContainerPair {
    pub benchmark: String,
    pub db: String,
}

/// One `docker stats` reading for a single container.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerSample {
    pub cpu_pct: f64,
    pub mem_mb: f64,
}

// ---------------------------------------------------------------------------
// Sampling
// ---------------------------------------------------------------------------

/// Take one non-streaming `docker stats` reading for `container`.
pub async fn sample_container(container: &str) -> Result<ContainerSample, NotebenchError> {
    let output = Command::new("docker")
        .arg("stats")
        .arg("--no-stream")
        .arg("--format")
        .arg("{{.CPUPerc}};{{.MemUsage}}")
        .arg(container)
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(NotebenchError::Harness(format!(
            "docker stats failed for {container}: {}",
            stderr.trim()
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_stats_line(stdout.trim()).ok_or_else(|| {
        NotebenchError::Harness(format!(
            "unparsable docker stats output for {container}: {}",
            stdout.trim()
        ))
    })
}

/// Parse one `CPUPerc;MemUsage` line, e.g. `1.25%;128.5MiB / 7.667GiB`.
fn parse_stats_line(line: &str) -> Option<ContainerSample> {
    let (cpu_part, mem_part) = line.split_once(';')?;
    let cpu_pct = cpu_part.trim().trim_end_matches('%').parse::<f64>().ok()?;
    let mem_mb = parse_mem_mb(mem_part.split('/').next()?.trim())?;
    Some(ContainerSample { cpu_pct, mem_mb })
}

/// Parse a docker memory figure like `128.5MiB` into megabytes.
fn parse_mem_mb(s: &str) -> Option<f64> {
    let mut num = String::new();
    let mut unit = String::new();
    for c in s.trim().chars() {
        if c.is_ascii_digit() || c == '.' {
            num.push(c);
        } else {
            unit.push(c);
        }
    }
    let value: f64 = num.parse().ok()?;
    let bytes = match unit.trim() {
        "B" => value,
        "KiB" => value * 1024.0,
        "MiB" => value * 1024.0 * 1024.0,
        "GiB" => value * 1024.0 * 1024.0 * 1024.0,
        _ => return None,
    };
    Some(bytes / (1024.0 * 1024.0))
}

/// Format one resource-usage row. CPU keeps the `%` suffix the downstream
/// loader strips; memory is megabytes.
pub fn format_row(timestamp: i64, benchmark: &ContainerSample, db: &ContainerSample) -> String {
    format!(
        "{},{:.2}%,{:.2},{:.2}%,{:.2}",
        timestamp, benchmark.cpu_pct, benchmark.mem_mb, db.cpu_pct, db.mem_mb
    )
}

// ---------------------------------------------------------------------------
// Sampler loop
// ---------------------------------------------------------------------------

/// Append resource rows to `path` until `cancel` fires. A failed reading is
/// logged and skipped; the sampler keeps running.
pub async fn run_sampler(
    path: &Path,
    containers: ContainerPair,
    cancel: CancellationToken,
) -> Result<(), NotebenchError> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .await?;
    file.write_all(RESOURCE_HEADER.as_bytes()).await?;
    file.write_all(b"\n").await?;

    let mut ticker = tokio::time::interval(FLUSH_INTERVAL);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // The first tick fires immediately; skip it so samples line up with the
    // stats flush cadence.
    ticker.tick().await;

    info!(file = %path.display(), benchmark = %containers.benchmark, db = %containers.db, "resource sampler started");
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let timestamp = chrono::Utc::now().timestamp();
                let benchmark = sample_container(&containers.benchmark).await;
                let db = sample_container(&containers.db).await;
                match (benchmark, db) {
                    (Ok(benchmark), Ok(db)) => {
                        let row = format_row(timestamp, &benchmark, &db);
                        file.write_all(row.as_bytes()).await?;
                        file.write_all(b"\n").await?;
                    }
                    (Err(error), _) | (_, Err(error)) => {
                        warn!(%error, "skipping resource sample");
                    }
                }
            }
            _ = cancel.cancelled() => break,
        }
    }
    file.flush().await?;
    info!(file = %path.display(), "resource sampler stopped");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
