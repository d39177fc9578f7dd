use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::NotebenchError;
use crate::run::model::{MetricRow, ResourceRow, Run};
use crate::run::{RESOURCE_USAGE_FILE, STATS_HISTORY_FILE};

// Column names of the stats-history CSV.
const COL_TIMESTAMP: &str = "Timestamp";
const COL_REQUESTS_PER_SEC: &str = "Requests/s";
const COL_FAILURES_PER_SEC: &str = "Failures/s";
const COL_P50: &str = "50%";
const COL_P75: &str = "75%";
const COL_P99: &str = "99%";
const COL_TOTAL_REQUESTS: &str = "Total Request Count";
const COL_TOTAL_FAILURES: &str = "Total Failure Count";
const COL_MEAN_RESPONSE: &str = "Total Average Response Time";
const COL_USER_COUNT: &str = "User Count";
const COL_CONTENT_SIZE: &str = "Total Average Content Size";

// Column names of the resource-usage CSV.
const COL_RES_TIMESTAMP: &str = "timestamp";
const COL_RES_BENCH_CPU: &str = "benchmark_cpu_usage";
const COL_RES_BENCH_MEM: &str = "benchmark_mem_usage_mb";
const COL_RES_DB_CPU: &str = "db_cpu_usage";
const COL_RES_DB_MEM: &str = "db_mem_usage";

// ---------------------------------------------------------------------------
// Public entry points
// ---------------------------------------------------------------------------

/// Load one run from its directory: the stats-history CSV (required) and the
/// resource-usage CSV (optional; an absent file yields an empty series).
pub fn load_run(dir: &Path, name: impl Into<String>) -> Result<Run, NotebenchError> {
    let name = name.into();
    let metrics = load_metrics(&dir.join(STATS_HISTORY_FILE))?;

    let resource_path = dir.join(RESOURCE_USAGE_FILE);
    let resources = if resource_path.exists() {
        load_resources(&resource_path)?
    } else {
        info!(run = %name, "no resource-usage file, skipping CPU/memory series");
        Vec::new()
    };

    Ok(Run {
        name,
        dir: dir.to_path_buf(),
        metrics,
        resources,
    })
}

/// Load and post-process a stats-history CSV: rows sorted by raw timestamp,
/// elapsed seconds relative to the earliest sample, and the derived
/// responses-per-second column populated.
pub fn load_metrics(path: &Path) -> Result<Vec<MetricRow>, NotebenchError> {
    if !path.exists() {
        return Err(NotebenchError::MissingFile(path.display().to_string()));
    }
    let content = fs::read_to_string(path)?;
    let label = path.display().to_string();
    let mut rows = parse_metrics(&label, &content)?;

    rows.sort_by_key(|r| r.timestamp);
    apply_elapsed(&mut rows);
    derive_response_rates(&mut rows);

    info!(file = %label, rows = rows.len(), "loaded stats history");
    Ok(rows)
}

/// Load a resource-usage CSV, rows sorted by raw timestamp.
pub fn load_resources(path: &Path) -> Result<Vec<ResourceRow>, NotebenchError> {
    if !path.exists() {
        return Err(NotebenchError::MissingFile(path.display().to_string()));
    }
    let content = fs::read_to_string(path)?;
    let label = path.display().to_string();
    let mut rows = parse_resources(&label, &content)?;

    rows.sort_by_key(|r| r.timestamp);
    info!(file = %label, rows = rows.len(), "loaded resource usage");
    Ok(rows)
}

// ---------------------------------------------------------------------------
// CSV parsing
// ---------------------------------------------------------------------------

fn parse_metrics(file: &str, content: &str) -> Result<Vec<MetricRow>, NotebenchError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let idx_timestamp = header_index(&headers, file, COL_TIMESTAMP)?;
    let idx_rps = header_index(&headers, file, COL_REQUESTS_PER_SEC)?;
    let idx_fps = header_index(&headers, file, COL_FAILURES_PER_SEC)?;
    let idx_p50 = header_index(&headers, file, COL_P50)?;
    let idx_p75 = header_index(&headers, file, COL_P75)?;
    let idx_p99 = header_index(&headers, file, COL_P99)?;
    let idx_total_req = header_index(&headers, file, COL_TOTAL_REQUESTS)?;
    let idx_total_fail = header_index(&headers, file, COL_TOTAL_FAILURES)?;
    let idx_mean_resp = header_index(&headers, file, COL_MEAN_RESPONSE)?;
    let idx_users = header_index(&headers, file, COL_USER_COUNT)?;
    let idx_content = header_index(&headers, file, COL_CONTENT_SIZE)?;

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for (line, result) in reader.records().enumerate() {
        let record = result?;

        let timestamp = match field(&record, idx_timestamp).parse::<i64>() {
            Ok(ts) => ts,
            Err(_) => {
                warn!(
                    file = %file,
                    row = line + 1,
                    value = field(&record, idx_timestamp),
                    "skipping row with unparsable timestamp"
                );
                skipped += 1;
                continue;
            }
        };
        let total_requests = match field(&record, idx_total_req).parse::<u64>() {
            Ok(n) => n,
            Err(_) => {
                warn!(file = %file, row = line + 1, "skipping row with unparsable request count");
                skipped += 1;
                continue;
            }
        };
        let total_failures = match field(&record, idx_total_fail).parse::<u64>() {
            Ok(n) => n,
            Err(_) => {
                warn!(file = %file, row = line + 1, "skipping row with unparsable failure count");
                skipped += 1;
                continue;
            }
        };
        let user_count = field(&record, idx_users).parse::<u64>().unwrap_or(0);

        rows.push(MetricRow {
            timestamp,
            elapsed_secs: 0.0,
            requests_per_sec: parse_opt_f64(field(&record, idx_rps)),
            failures_per_sec: parse_opt_f64(field(&record, idx_fps)),
            p50_ms: parse_opt_f64(field(&record, idx_p50)),
            p75_ms: parse_opt_f64(field(&record, idx_p75)),
            p99_ms: parse_opt_f64(field(&record, idx_p99)),
            total_requests,
            total_failures,
            mean_response_ms: parse_opt_f64(field(&record, idx_mean_resp)),
            user_count,
            mean_content_size: parse_opt_f64(field(&record, idx_content)),
            responses_per_sec: None,
        });
    }

    if skipped > 0 {
        warn!(file = %file, skipped, "skipped malformed stats rows");
    }
    Ok(rows)
}

fn parse_resources(file: &str, content: &str) -> Result<Vec<ResourceRow>, NotebenchError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let idx_timestamp = header_index(&headers, file, COL_RES_TIMESTAMP)?;
    let idx_bench_cpu = header_index(&headers, file, COL_RES_BENCH_CPU)?;
    let idx_bench_mem = header_index(&headers, file, COL_RES_BENCH_MEM)?;
    let idx_db_cpu = header_index(&headers, file, COL_RES_DB_CPU)?;
    let idx_db_mem = header_index(&headers, file, COL_RES_DB_MEM)?;

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for (line, result) in reader.records().enumerate() {
        let record = result?;

        let parsed = (
            field(&record, idx_timestamp).parse::<i64>().ok(),
            parse_pct(field(&record, idx_bench_cpu)),
            parse_opt_f64(field(&record, idx_bench_mem)),
            parse_pct(field(&record, idx_db_cpu)),
            parse_opt_f64(field(&record, idx_db_mem)),
        );
        match parsed {
            (Some(timestamp), Some(benchmark_cpu_pct), Some(benchmark_mem_mb), Some(db_cpu_pct), Some(db_mem_mb)) => {
                rows.push(ResourceRow {
                    timestamp,
                    benchmark_cpu_pct,
                    benchmark_mem_mb,
                    db_cpu_pct,
                    db_mem_mb,
                });
            }
            _ => {
                warn!(file = %file, row = line + 1, "skipping malformed resource row");
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        warn!(file = %file, skipped, "skipped malformed resource rows");
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Derived columns
// ---------------------------------------------------------------------------

/// Rewrite `elapsed_secs` relative to the earliest timestamp. Rows must
/// already be sorted ascending, so the first row's elapsed time is 0.
fn apply_elapsed(rows: &mut [MetricRow]) {
    let Some(start) = rows.first().map(|r| r.timestamp) else {
        return;
    };
    for row in rows.iter_mut() {
        row.elapsed_secs = (row.timestamp - start) as f64;
    }
}

/// Populate `responses_per_sec` from consecutive cumulative request counts.
///
/// The first row has no prior sample and gets 0; later rows whose
/// elapsed-time delta is zero get a missing value instead of an infinite
/// rate.
fn derive_response_rates(rows: &mut [MetricRow]) {
    for i in 0..rows.len() {
        rows[i].responses_per_sec = if i == 0 {
            Some(0.0)
        } else {
            let dt = rows[i].elapsed_secs - rows[i - 1].elapsed_secs;
            let dn = rows[i].total_requests as f64 - rows[i - 1].total_requests as f64;
            if dt > 0.0 {
                Some(dn / dt)
            } else {
                None
            }
        };
    }
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

fn header_index(headers: &[String], file: &str, column: &str) -> Result<usize, NotebenchError> {
    headers
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| NotebenchError::MissingColumn {
            file: file.to_string(),
            column: column.to_string(),
        })
}

fn field<'a>(record: &'a csv::StringRecord, idx: usize) -> &'a str {
    record.get(idx).unwrap_or("").trim()
}

/// Parse an optional numeric field. Empty cells and the "N/A" marker the
/// load generator writes for empty windows become missing values, as do
/// non-finite results.
fn parse_opt_f64(s: &str) -> Option<f64> {
    if s.is_empty() || s.eq_ignore_ascii_case("n/a") {
        return None;
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        Ok(_) => None,
        Err(_) => {
            debug!(value = s, "unparsable numeric field treated as missing");
            None
        }
    }
}

/// Parse a CPU field of the form `"42.5%"` (the trailing `%` is optional).
fn parse_pct(s: &str) -> Option<f64> {
    parse_opt_f64(s.trim_end_matches('%').trim_end())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const STATS_HEADER: &str = "Timestamp,User Count,Type,Name,Requests/s,Failures/s,50%,75%,99%,Total Request Count,Total Failure Count,Total Average Response Time,Total Average Content Size";

    fn stats_csv(rows: &[&str]) -> String {
        let mut out = String::from(STATS_HEADER);
        for row in rows {
            out.push('\n');
            out.push_str(row);
        }
        out.push('\n');
        out
    }

    fn parse(rows: &[&str]) -> Vec<MetricRow> {
        let content = stats_csv(rows);
        let mut parsed = parse_metrics("test.csv", &content).expect("parse");
        parsed.sort_by_key(|r| r.timestamp);
        apply_elapsed(&mut parsed);
        derive_response_rates(&mut parsed);
        parsed
    }

    // -----------------------------------------------------------------------
    // Metrics parsing
    // -----------------------------------------------------------------------

    #[test]
    fn first_row_elapsed_is_zero() {
        let rows = parse(&[
            "1700000100,10,,Aggregated,5.0,0.0,12,18,45,10,0,14.0,120",
            "1700000102,10,,Aggregated,6.0,0.0,12,18,45,22,0,14.0,120",
        ]);
        assert_eq!(rows[0].elapsed_secs, 0.0);
        assert_eq!(rows[1].elapsed_secs, 2.0);
    }

    #[test]
    fn first_row_derived_rate_is_zero() {
        let rows = parse(&[
            "1700000100,10,,Aggregated,5.0,0.0,12,18,45,10,0,14.0,120",
            "1700000102,10,,Aggregated,6.0,0.0,12,18,45,22,0,14.0,120",
        ]);
        assert_eq!(rows[0].responses_per_sec, Some(0.0));
    }

    #[test]
    fn derived_rate_uses_count_delta_over_time_delta() {
        let rows = parse(&[
            "1700000100,10,,Aggregated,5.0,0.0,12,18,45,10,0,14.0,120",
            "1700000102,10,,Aggregated,6.0,0.0,12,18,45,22,0,14.0,120",
            "1700000106,10,,Aggregated,6.0,0.0,12,18,45,30,0,14.0,120",
        ]);
        // (22 - 10) / 2s and (30 - 22) / 4s.
        assert_eq!(rows[1].responses_per_sec, Some(6.0));
        assert_eq!(rows[2].responses_per_sec, Some(2.0));
    }

    #[test]
    fn zero_time_delta_yields_missing_rate() {
        let rows = parse(&[
            "1700000100,10,,Aggregated,5.0,0.0,12,18,45,10,0,14.0,120",
            "1700000100,10,,Aggregated,6.0,0.0,12,18,45,22,0,14.0,120",
        ]);
        assert_eq!(rows[1].responses_per_sec, None);
    }

    #[test]
    fn rows_are_sorted_by_timestamp() {
        let rows = parse(&[
            "1700000104,10,,Aggregated,5.0,0.0,12,18,45,30,0,14.0,120",
            "1700000100,10,,Aggregated,5.0,0.0,12,18,45,10,0,14.0,120",
            "1700000102,10,,Aggregated,5.0,0.0,12,18,45,22,0,14.0,120",
        ]);
        let timestamps: Vec<i64> = rows.iter().map(|r| r.timestamp).collect();
        assert_eq!(timestamps, vec![1700000100, 1700000102, 1700000104]);
        assert_eq!(rows[0].elapsed_secs, 0.0);
    }

    #[test]
    fn malformed_timestamp_skips_row() {
        let rows = parse(&[
            "not-a-number,10,,Aggregated,5.0,0.0,12,18,45,10,0,14.0,120",
            "1700000102,10,,Aggregated,6.0,0.0,12,18,45,22,0,14.0,120",
        ]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].timestamp, 1700000102);
    }

    #[test]
    fn na_percentile_becomes_missing() {
        let rows = parse(&["1700000100,10,,Aggregated,0.0,0.0,N/A,N/A,N/A,0,0,0,0"]);
        assert_eq!(rows[0].p50_ms, None);
        assert_eq!(rows[0].p75_ms, None);
        assert_eq!(rows[0].p99_ms, None);
    }

    #[test]
    fn missing_column_is_an_error() {
        let content = "Timestamp,User Count\n1700000100,10\n";
        let err = parse_metrics("test.csv", content).unwrap_err();
        assert!(err.to_string().contains("Requests/s"));
    }

    #[test]
    fn missing_stats_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_metrics(&dir.path().join(STATS_HISTORY_FILE)).unwrap_err();
        assert!(matches!(err, NotebenchError::MissingFile(_)));
    }

    #[test]
    fn empty_file_yields_zero_rows() {
        let rows = parse(&[]);
        assert!(rows.is_empty());
    }

    // -----------------------------------------------------------------------
    // Resource parsing
    // -----------------------------------------------------------------------

    const RES_HEADER: &str = "timestamp,benchmark_cpu_usage,benchmark_mem_usage_mb,db_cpu_usage,db_mem_usage";

    #[test]
    fn resource_rows_parse_percent_strings() {
        let content = format!("{RES_HEADER}\n1700000099,42.5%,128.0,7.25%,256.0\n");
        let rows = parse_resources("usage.csv", &content).expect("parse");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].benchmark_cpu_pct, 42.5);
        assert_eq!(rows[0].db_cpu_pct, 7.25);
        assert_eq!(rows[0].benchmark_mem_mb, 128.0);
    }

    #[test]
    fn resource_rows_accept_bare_numbers() {
        let content = format!("{RES_HEADER}\n1700000099,42.5,128.0,7.25,256.0\n");
        let rows = parse_resources("usage.csv", &content).expect("parse");
        assert_eq!(rows[0].benchmark_cpu_pct, 42.5);
    }

    #[test]
    fn malformed_resource_row_is_skipped() {
        let content = format!(
            "{RES_HEADER}\n1700000099,garbage,128.0,7.25%,256.0\n1700000101,50.0%,128.0,7.25%,256.0\n"
        );
        let rows = parse_resources("usage.csv", &content).expect("parse");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].timestamp, 1700000101);
    }

    // -----------------------------------------------------------------------
    // load_run
    // -----------------------------------------------------------------------

    #[test]
    fn load_run_without_resource_file_yields_empty_series() {
        let dir = tempfile::tempdir().expect("tempdir");
        let stats = stats_csv(&["1700000100,10,,Aggregated,5.0,0.0,12,18,45,10,0,14.0,120"]);
        std::fs::write(dir.path().join(STATS_HISTORY_FILE), stats).expect("write");

        let run = load_run(dir.path(), "actix").expect("load");
        assert_eq!(run.name, "actix");
        assert_eq!(run.metrics.len(), 1);
        assert!(run.resources.is_empty());
    }

    #[test]
    fn load_run_reads_both_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let stats = stats_csv(&[
            "1700000100,10,,Aggregated,5.0,0.0,12,18,45,10,0,14.0,120",
            "1700000102,10,,Aggregated,6.0,0.0,12,18,45,22,0,14.0,120",
        ]);
        std::fs::write(dir.path().join(STATS_HISTORY_FILE), stats).expect("write");
        let usage = format!("{RES_HEADER}\n1700000099,42.5%,128.0,7.25%,256.0\n");
        std::fs::write(dir.path().join(RESOURCE_USAGE_FILE), usage).expect("write");

        let run = load_run(dir.path(), "axum").expect("load");
        assert_eq!(run.metrics.len(), 2);
        assert_eq!(run.resources.len(), 1);
    }

    // -----------------------------------------------------------------------
    // Field helpers
    // -----------------------------------------------------------------------

    #[test]
    fn parse_pct_strips_suffix() {
        assert_eq!(parse_pct("12.5%"), Some(12.5));
        assert_eq!(parse_pct("12.5"), Some(12.5));
        assert_eq!(parse_pct(""), None);
        assert_eq!(parse_pct("oops%"), None);
    }

    #[test]
    fn parse_opt_f64_rejects_non_finite() {
        assert_eq!(parse_opt_f64("inf"), None);
        assert_eq!(parse_opt_f64("NaN"), None);
        assert_eq!(parse_opt_f64("1.25"), Some(1.25));
    }
}
