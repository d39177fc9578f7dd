use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// MetricRow — one sampled instant of request performance
// ---------------------------------------------------------------------------

/// One sampled instant from a run's stats-history CSV.
///
/// `timestamp` is the raw Unix-seconds value from the file; `elapsed_secs`
/// is relative to the earliest timestamp in the same file and therefore
/// starts at 0 and never decreases once the rows are sorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MetricRow {
    /// Raw Unix timestamp in seconds, as sampled.
    pub timestamp: i64,
    /// Seconds since the run's first sample.
    pub elapsed_secs: f64,
    /// Current-window requests per second.
    pub requests_per_sec: Option<f64>,
    /// Current-window failures per second.
    pub failures_per_sec: Option<f64>,
    /// 50th percentile response time for the window (ms).
    pub p50_ms: Option<f64>,
    /// 75th percentile response time for the window (ms).
    pub p75_ms: Option<f64>,
    /// 99th percentile response time for the window (ms).
    pub p99_ms: Option<f64>,
    /// Cumulative request count since the run started.
    pub total_requests: u64,
    /// Cumulative failure count since the run started.
    pub total_failures: u64,
    /// Cumulative mean response time (ms).
    pub mean_response_ms: Option<f64>,
    /// Active virtual users at this instant.
    pub user_count: u64,
    /// Cumulative mean response content size (bytes).
    pub mean_content_size: Option<f64>,
    /// Responses per second derived from consecutive cumulative counts.
    /// 0 for the first row (no prior sample); absent when the elapsed-time
    /// delta between rows is zero.
    pub responses_per_sec: Option<f64>,
}

// ---------------------------------------------------------------------------
// ResourceRow — one sampled instant of infrastructure usage
// ---------------------------------------------------------------------------

/// One sampled instant from a run's resource-usage CSV.
///
/// CPU values arrive as `%`-suffixed strings in the source file and are
/// numeric here; rows whose fields cannot be parsed are skipped at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ResourceRow {
    /// Raw Unix timestamp in seconds, as sampled.
    pub timestamp: i64,
    pub benchmark_cpu_pct: f64,
    pub benchmark_mem_mb: f64,
    pub db_cpu_pct: f64,
    pub db_mem_mb: f64,
}

// ---------------------------------------------------------------------------
// AlignedRow — a MetricRow with the resource sample active at that instant
// ---------------------------------------------------------------------------

/// A [`MetricRow`] extended with the fields of the latest resource sample
/// taken strictly before the row's own timestamp.
///
/// The resource fields are all absent when no such sample exists; they are
/// never back-filled from a later one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AlignedRow {
    #[serde(flatten)]
    pub metric: MetricRow,
    /// Timestamp of the attached resource sample, when one matched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benchmark_cpu_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benchmark_mem_mb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_cpu_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_mem_mb: Option<f64>,
}

// ---------------------------------------------------------------------------
// RunSummary — scalar aggregate over a run's rows
// ---------------------------------------------------------------------------

/// Scalar aggregate over a run's rows. Every field is the arithmetic mean of
/// the present values of the matching column; a field with no contributing
/// rows is `None` and serializes as JSON `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RunSummary {
    pub requests_per_sec: Option<f64>,
    pub failures_per_sec: Option<f64>,
    pub responses_per_sec: Option<f64>,
    pub p50_ms: Option<f64>,
    pub p75_ms: Option<f64>,
    pub p99_ms: Option<f64>,
    /// Arithmetic mean of the three percentile means. An approximation of
    /// overall latency, not a true aggregate percentile.
    pub blended_latency_ms: Option<f64>,
    pub benchmark_cpu_pct: Option<f64>,
    pub benchmark_mem_mb: Option<f64>,
    pub db_cpu_pct: Option<f64>,
    pub db_mem_mb: Option<f64>,
}

// ---------------------------------------------------------------------------
// Run — one benchmark execution
// ---------------------------------------------------------------------------

/// One benchmark execution, identified by the directory its result files
/// live in. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Run {
    /// Display name derived from the run's path (see `discover`).
    pub name: String,
    /// Directory containing the run's result files.
    pub dir: PathBuf,
    /// Request-metrics time series, ascending by raw timestamp.
    pub metrics: Vec<MetricRow>,
    /// Resource-usage time series, ascending by raw timestamp. Empty when
    /// the usage CSV is absent.
    pub resources: Vec<ResourceRow>,
}
