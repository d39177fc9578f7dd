use serde::Serialize;

use crate::run::model::RunSummary;

// ---------------------------------------------------------------------------
// Table metrics
// ---------------------------------------------------------------------------

/// Which direction is an improvement for a ranked metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    HigherBetter,
    LowerBetter,
}

/// The rows of the comparison table, in display order.
///
/// Ranked metrics take part in deviation coloring and the combined score;
/// the resource means are displayed as plain values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableMetric {
    RequestsPerSec,
    FailuresPerSec,
    ResponsesPerSec,
    P50,
    P75,
    P99,
    BlendedLatency,
    BenchmarkCpu,
    BenchmarkMem,
    DbCpu,
    DbMem,
}

impl TableMetric {
    pub const ALL: [TableMetric; 11] = [
        TableMetric::RequestsPerSec,
        TableMetric::FailuresPerSec,
        TableMetric::ResponsesPerSec,
        TableMetric::P50,
        TableMetric::P75,
        TableMetric::P99,
        TableMetric::BlendedLatency,
        TableMetric::BenchmarkCpu,
        TableMetric::BenchmarkMem,
        TableMetric::DbCpu,
        TableMetric::DbMem,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TableMetric::RequestsPerSec => "Requests/s",
            TableMetric::FailuresPerSec => "Failures/s",
            TableMetric::ResponsesPerSec => "Responses/s",
            TableMetric::P50 => "50% (ms)",
            TableMetric::P75 => "75% (ms)",
            TableMetric::P99 => "99% (ms)",
            TableMetric::BlendedLatency => "Avg Latency (ms)",
            TableMetric::BenchmarkCpu => "Benchmark CPU (%)",
            TableMetric::BenchmarkMem => "Benchmark Mem (MB)",
            TableMetric::DbCpu => "DB CPU (%)",
            TableMetric::DbMem => "DB Mem (MB)",
        }
    }

    /// `None` for display-only metrics outside the ranked set.
    pub fn polarity(&self) -> Option<Polarity> {
        match self {
            TableMetric::RequestsPerSec | TableMetric::ResponsesPerSec => {
                Some(Polarity::HigherBetter)
            }
            TableMetric::FailuresPerSec
            | TableMetric::P50
            | TableMetric::P75
            | TableMetric::P99
            | TableMetric::BlendedLatency => Some(Polarity::LowerBetter),
            TableMetric::BenchmarkCpu
            | TableMetric::BenchmarkMem
            | TableMetric::DbCpu
            | TableMetric::DbMem => None,
        }
    }

    pub fn value(&self, summary: &RunSummary) -> Option<f64> {
        match self {
            TableMetric::RequestsPerSec => summary.requests_per_sec,
            TableMetric::FailuresPerSec => summary.failures_per_sec,
            TableMetric::ResponsesPerSec => summary.responses_per_sec,
            TableMetric::P50 => summary.p50_ms,
            TableMetric::P75 => summary.p75_ms,
            TableMetric::P99 => summary.p99_ms,
            TableMetric::BlendedLatency => summary.blended_latency_ms,
            TableMetric::BenchmarkCpu => summary.benchmark_cpu_pct,
            TableMetric::BenchmarkMem => summary.benchmark_mem_mb,
            TableMetric::DbCpu => summary.db_cpu_pct,
            TableMetric::DbMem => summary.db_mem_mb,
        }
    }
}

// ---------------------------------------------------------------------------
// ComparisonTable — ranked columns and deviation cells
// ---------------------------------------------------------------------------

/// One table cell: a run's summary value for a metric, plus its percentage
/// deviation from the best run when the metric is ranked.
///
/// `deviation_pct` is absent when the value itself is absent, the metric is
/// unranked, or the best value is zero (a percentage of zero is undefined; a
/// zero value still ties the best at 0%). `favorable` follows the metric's
/// polarity: an improvement or a tie with the best is favorable.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct TableCell {
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deviation_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorable: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct TableRow {
    pub metric: TableMetric,
    pub label: &'static str,
    /// Cells in column order.
    pub cells: Vec<TableCell>,
}

/// The ranked comparison table: columns are runs sorted by descending
/// combined score (best leftmost), rows follow [`TableMetric::ALL`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ComparisonTable {
    /// Run names in column order.
    pub columns: Vec<String>,
    /// Combined score per column, same order.
    pub scores: Vec<f64>,
    pub rows: Vec<TableRow>,
}

/// Build the comparison table for the given runs.
///
/// Per ranked metric, the best value among the runs is the minimum or
/// maximum per polarity; each run's deviation is `(value − best) / best ×
/// 100`, sign preserved. The combined score adds a favorable deviation as-is
/// and subtracts the absolute value of an unfavorable one; runs are then
/// ordered by descending score, name as tie-break.
pub fn build_table(runs: &[(&str, &RunSummary)]) -> ComparisonTable {
    // Per-metric cells in input order, scores accumulated alongside.
    let mut scores = vec![0.0f64; runs.len()];
    let mut unordered_rows: Vec<(TableMetric, Vec<TableCell>)> =
        Vec::with_capacity(TableMetric::ALL.len());

    for metric in TableMetric::ALL {
        let values: Vec<Option<f64>> = runs.iter().map(|(_, s)| metric.value(s)).collect();

        let cells = match metric.polarity() {
            Some(polarity) => {
                let best = best_value(polarity, &values);
                values
                    .iter()
                    .enumerate()
                    .map(|(i, value)| {
                        let cell = ranked_cell(polarity, best, *value);
                        if let (Some(dev), Some(fav)) = (cell.deviation_pct, cell.favorable) {
                            scores[i] += if fav { dev } else { -dev.abs() };
                        }
                        cell
                    })
                    .collect()
            }
            None => values
                .into_iter()
                .map(|value| TableCell {
                    value,
                    deviation_pct: None,
                    favorable: None,
                })
                .collect(),
        };

        unordered_rows.push((metric, cells));
    }

    // Column order: descending combined score, best leftmost.
    let mut order: Vec<usize> = (0..runs.len()).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .total_cmp(&scores[a])
            .then_with(|| runs[a].0.cmp(runs[b].0))
    });

    ComparisonTable {
        columns: order.iter().map(|&i| runs[i].0.to_string()).collect(),
        scores: order.iter().map(|&i| scores[i]).collect(),
        rows: unordered_rows
            .into_iter()
            .map(|(metric, cells)| TableRow {
                metric,
                label: metric.label(),
                cells: order.iter().map(|&i| cells[i].clone()).collect(),
            })
            .collect(),
    }
}

fn best_value(polarity: Polarity, values: &[Option<f64>]) -> Option<f64> {
    let present = values.iter().flatten().copied();
    match polarity {
        Polarity::LowerBetter => present.reduce(f64::min),
        Polarity::HigherBetter => present.reduce(f64::max),
    }
}

fn ranked_cell(polarity: Polarity, best: Option<f64>, value: Option<f64>) -> TableCell {
    let deviation_pct = match (best, value) {
        (Some(best), Some(value)) if best != 0.0 => Some((value - best) / best * 100.0),
        (Some(best), Some(value)) if best == 0.0 && value == 0.0 => Some(0.0),
        _ => None,
    };
    let favorable = deviation_pct.map(|dev| match polarity {
        Polarity::LowerBetter => dev <= 0.0,
        Polarity::HigherBetter => dev >= 0.0,
    });
    TableCell {
        value,
        deviation_pct,
        favorable,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn summary_with_latency(blended: f64) -> RunSummary {
        RunSummary {
            requests_per_sec: Some(100.0),
            failures_per_sec: Some(0.0),
            responses_per_sec: Some(100.0),
            p50_ms: Some(blended),
            p75_ms: Some(blended),
            p99_ms: Some(blended),
            blended_latency_ms: Some(blended),
            ..RunSummary::default()
        }
    }

    fn find_row<'t>(table: &'t ComparisonTable, metric: TableMetric) -> &'t TableRow {
        table
            .rows
            .iter()
            .find(|r| r.metric == metric)
            .expect("row present")
    }

    fn column_index(table: &ComparisonTable, name: &str) -> usize {
        table
            .columns
            .iter()
            .position(|c| c == name)
            .expect("column present")
    }

    // -----------------------------------------------------------------------
    // Deviation sign convention
    // -----------------------------------------------------------------------

    #[test]
    fn lower_better_deviation_is_positive_and_unfavorable() {
        let a = summary_with_latency(100.0);
        let b = summary_with_latency(150.0);
        let table = build_table(&[("a", &a), ("b", &b)]);

        let row = find_row(&table, TableMetric::BlendedLatency);
        let a_cell = &row.cells[column_index(&table, "a")];
        let b_cell = &row.cells[column_index(&table, "b")];

        assert_eq!(a_cell.deviation_pct, Some(0.0));
        assert_eq!(a_cell.favorable, Some(true));
        assert_eq!(b_cell.deviation_pct, Some(50.0));
        assert_eq!(b_cell.favorable, Some(false));
    }

    #[test]
    fn higher_better_deviation_is_negative_and_unfavorable() {
        let mut a = summary_with_latency(100.0);
        a.requests_per_sec = Some(200.0);
        let mut b = summary_with_latency(100.0);
        b.requests_per_sec = Some(150.0);
        let table = build_table(&[("a", &a), ("b", &b)]);

        let row = find_row(&table, TableMetric::RequestsPerSec);
        let b_cell = &row.cells[column_index(&table, "b")];
        assert_eq!(b_cell.deviation_pct, Some(-25.0));
        assert_eq!(b_cell.favorable, Some(false));

        let a_cell = &row.cells[column_index(&table, "a")];
        assert_eq!(a_cell.deviation_pct, Some(0.0));
        assert_eq!(a_cell.favorable, Some(true));
    }

    // -----------------------------------------------------------------------
    // Combined score and column order
    // -----------------------------------------------------------------------

    #[test]
    fn best_scoring_run_is_leftmost() {
        // "fast" is best on every ranked metric, "slow" worst.
        let fast = summary_with_latency(50.0);
        let mid = summary_with_latency(100.0);
        let slow = summary_with_latency(200.0);
        let table = build_table(&[("mid", &mid), ("slow", &slow), ("fast", &fast)]);

        assert_eq!(table.columns, vec!["fast", "mid", "slow"]);
        assert!(table.scores[0] >= table.scores[1]);
        assert!(table.scores[1] >= table.scores[2]);
    }

    #[test]
    fn best_run_scores_zero_when_others_trail() {
        let fast = summary_with_latency(50.0);
        let slow = summary_with_latency(100.0);
        let table = build_table(&[("slow", &slow), ("fast", &fast)]);

        // fast ties or wins every ranked metric, so nothing is subtracted.
        assert_eq!(table.columns[0], "fast");
        assert_eq!(table.scores[0], 0.0);
        assert!(table.scores[1] < 0.0);
    }

    #[test]
    fn unfavorable_deviations_subtract_from_the_score() {
        // slow trails by +100% on each of the five lower-better metrics.
        let fast = summary_with_latency(50.0);
        let slow = summary_with_latency(100.0);
        let table = build_table(&[("slow", &slow), ("fast", &fast)]);

        let slow_score = table.scores[column_index(&table, "slow")];
        assert!((slow_score - (-500.0)).abs() < 1e-9);
    }

    #[test]
    fn tied_scores_order_by_name() {
        let a = summary_with_latency(100.0);
        let b = summary_with_latency(100.0);
        let table = build_table(&[("zeta", &b), ("alpha", &a)]);
        assert_eq!(table.columns, vec!["alpha", "zeta"]);
    }

    // -----------------------------------------------------------------------
    // Zero-best and missing values
    // -----------------------------------------------------------------------

    #[test]
    fn zero_best_leaves_nonzero_values_without_percentage() {
        let mut clean = summary_with_latency(100.0);
        clean.failures_per_sec = Some(0.0);
        let mut failing = summary_with_latency(100.0);
        failing.failures_per_sec = Some(2.5);
        let table = build_table(&[("clean", &clean), ("failing", &failing)]);

        let row = find_row(&table, TableMetric::FailuresPerSec);
        let clean_cell = &row.cells[column_index(&table, "clean")];
        let failing_cell = &row.cells[column_index(&table, "failing")];

        assert_eq!(clean_cell.deviation_pct, Some(0.0));
        assert_eq!(failing_cell.deviation_pct, None);
        assert_eq!(failing_cell.value, Some(2.5));
    }

    #[test]
    fn missing_summary_value_yields_empty_cell_and_no_score_change() {
        let a = summary_with_latency(100.0);
        let empty = RunSummary::default();
        let table = build_table(&[("a", &a), ("empty", &empty)]);

        let row = find_row(&table, TableMetric::BlendedLatency);
        let empty_cell = &row.cells[column_index(&table, "empty")];
        assert_eq!(empty_cell.value, None);
        assert_eq!(empty_cell.deviation_pct, None);

        let empty_score = table.scores[column_index(&table, "empty")];
        assert_eq!(empty_score, 0.0);
    }

    // -----------------------------------------------------------------------
    // Unranked metrics and single-run tables
    // -----------------------------------------------------------------------

    #[test]
    fn resource_metrics_are_displayed_without_ranking() {
        let mut a = summary_with_latency(100.0);
        a.benchmark_cpu_pct = Some(80.0);
        let mut b = summary_with_latency(100.0);
        b.benchmark_cpu_pct = Some(20.0);
        let table = build_table(&[("a", &a), ("b", &b)]);

        let row = find_row(&table, TableMetric::BenchmarkCpu);
        for cell in &row.cells {
            assert_eq!(cell.deviation_pct, None);
            assert_eq!(cell.favorable, None);
        }
    }

    #[test]
    fn single_run_table_has_one_column_and_zero_score() {
        let a = summary_with_latency(100.0);
        let table = build_table(&[("only", &a)]);
        assert_eq!(table.columns, vec!["only"]);
        assert_eq!(table.scores, vec![0.0]);
        assert_eq!(table.rows.len(), TableMetric::ALL.len());
    }
}
