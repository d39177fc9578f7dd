use crate::run::model::{MetricRow, ResourceRow, Run, RunSummary};

// ---------------------------------------------------------------------------
// Per-run summarizer
// ---------------------------------------------------------------------------

/// Reduce a run's time series to scalar means.
///
/// Every mean skips rows where the underlying value is missing; a column with
/// no present values at all yields `None`. A run with zero rows therefore
/// produces an all-`None` summary rather than an error.
pub fn summarize(run: &Run) -> RunSummary {
    summarize_rows(&run.metrics, &run.resources)
}

pub fn summarize_rows(metrics: &[MetricRow], resources: &[ResourceRow]) -> RunSummary {
    let p50_ms = mean_of(metrics.iter().map(|r| r.p50_ms));
    let p75_ms = mean_of(metrics.iter().map(|r| r.p75_ms));
    let p99_ms = mean_of(metrics.iter().map(|r| r.p99_ms));

    // The blend is the arithmetic mean of the three percentile means, which
    // approximates overall latency. It is undefined when any of the three
    // columns never produced a value.
    let blended_latency_ms = match (p50_ms, p75_ms, p99_ms) {
        (Some(a), Some(b), Some(c)) => Some((a + b + c) / 3.0),
        _ => None,
    };

    RunSummary {
        requests_per_sec: mean_of(metrics.iter().map(|r| r.requests_per_sec)),
        failures_per_sec: mean_of(metrics.iter().map(|r| r.failures_per_sec)),
        responses_per_sec: mean_of(metrics.iter().map(|r| r.responses_per_sec)),
        p50_ms,
        p75_ms,
        p99_ms,
        blended_latency_ms,
        benchmark_cpu_pct: mean_of(resources.iter().map(|r| Some(r.benchmark_cpu_pct))),
        benchmark_mem_mb: mean_of(resources.iter().map(|r| Some(r.benchmark_mem_mb))),
        db_cpu_pct: mean_of(resources.iter().map(|r| Some(r.db_cpu_pct))),
        db_mem_mb: mean_of(resources.iter().map(|r| Some(r.db_mem_mb))),
    }
}

/// Mean over the present values of an optional column; `None` when no value
/// is present.
fn mean_of(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for v in values.flatten() {
        sum += v;
        count += 1;
    }
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
