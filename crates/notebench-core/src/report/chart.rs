use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use tracing::info;

use crate::error::NotebenchError;
use crate::report::compare::{self, ComparisonTable, TableCell};
use crate::run::model::{AlignedRow, RunSummary};

/// Fixed per-run color assignment for comparison charts, keyed by a run's
/// index in the input slice. Ten distinct colors; more runs than colors is
/// an error rather than a silent reuse.
pub const PALETTE: [RGBColor; 10] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
    RGBColor(188, 189, 34),
    RGBColor(23, 190, 207),
];

// Single-run panels keep one fixed color per metric.
const SOLO_GREEN: RGBColor = RGBColor(44, 160, 44);
const SOLO_RED: RGBColor = RGBColor(214, 39, 40);
const SOLO_PURPLE: RGBColor = RGBColor(148, 103, 189);
const SOLO_BLUE: RGBColor = RGBColor(31, 119, 180);
const SOLO_BROWN: RGBColor = RGBColor(140, 86, 75);
const SOLO_ORANGE: RGBColor = RGBColor(255, 127, 14);
const SOLO_CYAN: RGBColor = RGBColor(23, 190, 207);

// Cell backgrounds for favorable/unfavorable deviations in the table panel.
const GOOD_CELL: RGBColor = RGBColor(46, 160, 67);
const BAD_CELL: RGBColor = RGBColor(218, 54, 51);

const CHART_WIDTH: u32 = 1800;
const CHART_HEIGHT: u32 = 2400;
const HISTOGRAM_BINS: usize = 20;

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// One run's data handed to the chart renderer.
pub struct ChartRun<'a> {
    pub name: &'a str,
    pub rows: &'a [AlignedRow],
    pub summary: &'a RunSummary,
}

/// Render the multi-panel chart for one or more runs to a PNG file.
///
/// With a single run the panels draw that run alone and the summary table is
/// a plain single-column table; with several runs every panel gets one
/// series per run in its palette color and the table panel becomes the
/// ranked comparison table.
pub fn render_chart(path: &Path, runs: &[ChartRun<'_>]) -> Result<(), NotebenchError> {
    if runs.is_empty() {
        return Err(NotebenchError::Chart("no runs to draw".to_string()));
    }
    if runs.len() > PALETTE.len() {
        return Err(NotebenchError::TooManyRuns {
            runs: runs.len(),
            colors: PALETTE.len(),
        });
    }

    let pairs: Vec<(&str, &RunSummary)> = runs.iter().map(|r| (r.name, r.summary)).collect();
    let table = compare::build_table(&pairs);

    let root = BitMapBackend::new(path, (CHART_WIDTH, CHART_HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;
    let areas = root.split_evenly((4, 3));

    draw_line_panel(
        &areas[0],
        runs,
        "Requests per Second Over Time",
        "Requests/s",
        SOLO_GREEN,
        |row| row.metric.requests_per_sec,
    )?;
    draw_line_panel(
        &areas[1],
        runs,
        "Failures per Second Over Time",
        "Failures/s",
        SOLO_RED,
        |row| row.metric.failures_per_sec,
    )?;
    draw_percentile_panel(&areas[2], runs)?;
    draw_line_panel(
        &areas[3],
        runs,
        "Responses per Second Over Time",
        "Responses/s",
        SOLO_PURPLE,
        |row| row.metric.responses_per_sec,
    )?;
    draw_cumulative_panel(&areas[4], runs)?;
    draw_line_panel(
        &areas[5],
        runs,
        "Active Users Over Time",
        "Users",
        SOLO_BLUE,
        |row| Some(row.metric.user_count as f64),
    )?;
    draw_histogram_panel(&areas[6], runs)?;
    draw_scatter_panel(&areas[7], runs)?;
    draw_line_panel(
        &areas[8],
        runs,
        "Average Content Size Over Time",
        "Bytes",
        SOLO_BROWN,
        |row| row.metric.mean_content_size,
    )?;
    draw_line_panel(
        &areas[9],
        runs,
        "Benchmark CPU Usage Over Time",
        "CPU (%)",
        SOLO_ORANGE,
        |row| row.benchmark_cpu_pct,
    )?;
    draw_line_panel(
        &areas[10],
        runs,
        "Database CPU Usage Over Time",
        "CPU (%)",
        SOLO_CYAN,
        |row| row.db_cpu_pct,
    )?;
    draw_table_panel(&areas[11], runs, &table)?;

    root.present().map_err(chart_err)?;
    info!(path = %path.display(), runs = runs.len(), "wrote chart");
    Ok(())
}

fn chart_err<E: std::fmt::Display>(err: E) -> NotebenchError {
    NotebenchError::Chart(err.to_string())
}

// ---------------------------------------------------------------------------
// Line panels
// ---------------------------------------------------------------------------

fn draw_line_panel<F>(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    runs: &[ChartRun<'_>],
    title: &str,
    y_desc: &str,
    solo: RGBColor,
    field: F,
) -> Result<(), NotebenchError>
where
    F: Fn(&AlignedRow) -> Option<f64>,
{
    let series: Vec<Vec<(f64, f64)>> = runs
        .iter()
        .map(|run| {
            run.rows
                .iter()
                .filter_map(|row| field(row).map(|v| (row.metric.elapsed_secs, v)))
                .collect()
        })
        .collect();

    let x_max = axis_max(series.iter().flatten().map(|p| p.0));
    let y_max = axis_max(series.iter().flatten().map(|p| p.1));

    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(55)
        .build_cartesian_2d(0.0..x_max, 0.0..y_max)
        .map_err(chart_err)?;
    chart
        .configure_mesh()
        .x_desc("Time (seconds)")
        .y_desc(y_desc)
        .label_style(("sans-serif", 12))
        .draw()
        .map_err(chart_err)?;

    let multi = runs.len() > 1;
    for (i, (run, points)) in runs.iter().zip(&series).enumerate() {
        let color = if multi { PALETTE[i] } else { solo };
        let anno = chart
            .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))
            .map_err(chart_err)?;
        if multi {
            anno.label(run.name).legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 16, y)], color.stroke_width(2))
            });
        }
    }
    if multi {
        draw_legend(&mut chart)?;
    }
    Ok(())
}

fn draw_percentile_panel(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    runs: &[ChartRun<'_>],
) -> Result<(), NotebenchError> {
    let percentile_of = |row: &AlignedRow, which: usize| match which {
        0 => row.metric.p50_ms,
        1 => row.metric.p75_ms,
        _ => row.metric.p99_ms,
    };

    let all_points = runs.iter().flat_map(|run| {
        run.rows.iter().flat_map(|row| {
            [row.metric.p50_ms, row.metric.p75_ms, row.metric.p99_ms]
                .into_iter()
                .flatten()
                .map(|v| (row.metric.elapsed_secs, v))
        })
    });
    let (xs, ys): (Vec<f64>, Vec<f64>) = all_points.unzip();
    let x_max = axis_max(xs.into_iter());
    let y_max = axis_max(ys.into_iter());

    let mut chart = ChartBuilder::on(area)
        .caption("Response Time Percentiles Over Time", ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(55)
        .build_cartesian_2d(0.0..x_max, 0.0..y_max)
        .map_err(chart_err)?;
    chart
        .configure_mesh()
        .x_desc("Time (seconds)")
        .y_desc("Response Time (ms)")
        .label_style(("sans-serif", 12))
        .draw()
        .map_err(chart_err)?;

    let multi = runs.len() > 1;
    for (i, run) in runs.iter().enumerate() {
        for which in 0..3 {
            let points: Vec<(f64, f64)> = run
                .rows
                .iter()
                .filter_map(|row| percentile_of(row, which).map(|v| (row.metric.elapsed_secs, v)))
                .collect();

            // Single run: one color per percentile, labelled directly.
            // Several runs: the run's color with the percentile encoded in
            // the dash pattern (50% dotted, 75% dashed, 99% solid).
            let color = if multi { PALETTE[i] } else { PALETTE[which] };
            let label = match (multi, which) {
                (false, 0) => Some("50% Response Time"),
                (false, 1) => Some("75% Response Time"),
                (false, 2) => Some("99% Response Time"),
                (true, 2) => Some(run.name),
                _ => None,
            };

            let anno = match which {
                0 if multi => chart
                    .draw_series(DashedLineSeries::new(
                        points.into_iter(),
                        2,
                        4,
                        color.stroke_width(1),
                    ))
                    .map_err(chart_err)?,
                1 if multi => chart
                    .draw_series(DashedLineSeries::new(
                        points.into_iter(),
                        6,
                        4,
                        color.stroke_width(1),
                    ))
                    .map_err(chart_err)?,
                _ => chart
                    .draw_series(LineSeries::new(points.into_iter(), color.stroke_width(2)))
                    .map_err(chart_err)?,
            };
            if let Some(label) = label {
                anno.label(label).legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 16, y)], color.stroke_width(2))
                });
            }
        }
    }
    draw_legend(&mut chart)?;
    Ok(())
}

fn draw_cumulative_panel(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    runs: &[ChartRun<'_>],
) -> Result<(), NotebenchError> {
    let x_max = axis_max(
        runs.iter()
            .flat_map(|run| run.rows.iter().map(|row| row.metric.elapsed_secs)),
    );
    let y_max = axis_max(
        runs.iter()
            .flat_map(|run| run.rows.iter().map(|row| row.metric.total_requests as f64)),
    );

    let mut chart = ChartBuilder::on(area)
        .caption("Cumulative Request Count Over Time", ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(70)
        .build_cartesian_2d(0.0..x_max, 0.0..y_max)
        .map_err(chart_err)?;
    chart
        .configure_mesh()
        .x_desc("Time (seconds)")
        .y_desc("Count")
        .label_style(("sans-serif", 12))
        .draw()
        .map_err(chart_err)?;

    let multi = runs.len() > 1;
    for (i, run) in runs.iter().enumerate() {
        let requests: Vec<(f64, f64)> = run
            .rows
            .iter()
            .map(|row| (row.metric.elapsed_secs, row.metric.total_requests as f64))
            .collect();
        let failures: Vec<(f64, f64)> = run
            .rows
            .iter()
            .map(|row| (row.metric.elapsed_secs, row.metric.total_failures as f64))
            .collect();

        let req_color = if multi { PALETTE[i] } else { SOLO_GREEN };
        let fail_color = if multi { PALETTE[i] } else { SOLO_RED };

        let anno = chart
            .draw_series(LineSeries::new(
                requests.into_iter(),
                req_color.stroke_width(2),
            ))
            .map_err(chart_err)?;
        let label = if multi { run.name } else { "Total Requests" };
        anno.label(label).legend(move |(x, y)| {
            PathElement::new(vec![(x, y), (x + 16, y)], req_color.stroke_width(2))
        });

        let anno = chart
            .draw_series(DashedLineSeries::new(
                failures.into_iter(),
                5,
                3,
                fail_color.stroke_width(1),
            ))
            .map_err(chart_err)?;
        if !multi {
            anno.label("Total Failures").legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 16, y)], fail_color.stroke_width(1))
            });
        }
    }
    draw_legend(&mut chart)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Distribution and scatter panels
// ---------------------------------------------------------------------------

fn draw_histogram_panel(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    runs: &[ChartRun<'_>],
) -> Result<(), NotebenchError> {
    let samples: Vec<Vec<f64>> = runs
        .iter()
        .map(|run| run.rows.iter().filter_map(|row| row.metric.p50_ms).collect())
        .collect();

    let lo = samples
        .iter()
        .flatten()
        .copied()
        .fold(f64::INFINITY, f64::min);
    let hi = samples
        .iter()
        .flatten()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let (lo, span) = if lo.is_finite() && hi.is_finite() {
        (lo, if hi > lo { hi - lo } else { 1.0 })
    } else {
        (0.0, 1.0)
    };
    let bin_width = span / HISTOGRAM_BINS as f64;

    let counts: Vec<Vec<u32>> = samples
        .iter()
        .map(|values| {
            let mut bins = vec![0u32; HISTOGRAM_BINS];
            for &v in values {
                let idx = (((v - lo) / bin_width) as usize).min(HISTOGRAM_BINS - 1);
                bins[idx] += 1;
            }
            bins
        })
        .collect();
    let y_max = axis_max(counts.iter().flatten().map(|&c| c as f64));

    let mut chart = ChartBuilder::on(area)
        .caption("Latency Distribution (50th percentile)", ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(55)
        .build_cartesian_2d(lo..lo + span * 1.02, 0.0..y_max)
        .map_err(chart_err)?;
    chart
        .configure_mesh()
        .x_desc("Response Time (ms)")
        .y_desc("Samples")
        .label_style(("sans-serif", 12))
        .draw()
        .map_err(chart_err)?;

    let multi = runs.len() > 1;
    for (i, (run, bins)) in runs.iter().zip(&counts).enumerate() {
        let color = if multi { PALETTE[i] } else { SOLO_BLUE };
        let anno = chart
            .draw_series(bins.iter().enumerate().filter(|(_, &c)| c > 0).map(
                |(b, &c)| {
                    let x0 = lo + b as f64 * bin_width;
                    Rectangle::new(
                        [(x0, 0.0), (x0 + bin_width, c as f64)],
                        color.mix(0.45).filled(),
                    )
                },
            ))
            .map_err(chart_err)?;
        if multi {
            anno.label(run.name).legend(move |(x, y)| {
                Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.mix(0.45).filled())
            });
        }
    }
    if multi {
        draw_legend(&mut chart)?;
    }
    Ok(())
}

fn draw_scatter_panel(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    runs: &[ChartRun<'_>],
) -> Result<(), NotebenchError> {
    let points_of = |run: &ChartRun<'_>| -> Vec<(f64, f64)> {
        run.rows
            .iter()
            .filter_map(|row| row.metric.p50_ms.map(|v| (row.metric.user_count as f64, v)))
            .collect()
    };
    let series: Vec<Vec<(f64, f64)>> = runs.iter().map(points_of).collect();

    let x_max = axis_max(series.iter().flatten().map(|p| p.0));
    let y_max = axis_max(series.iter().flatten().map(|p| p.1));

    let mut chart = ChartBuilder::on(area)
        .caption("Load vs Latency", ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(55)
        .build_cartesian_2d(0.0..x_max, 0.0..y_max)
        .map_err(chart_err)?;
    chart
        .configure_mesh()
        .x_desc("Active Users")
        .y_desc("50% Response Time (ms)")
        .label_style(("sans-serif", 12))
        .draw()
        .map_err(chart_err)?;

    let multi = runs.len() > 1;
    for (i, (run, points)) in runs.iter().zip(&series).enumerate() {
        let color = if multi { PALETTE[i] } else { SOLO_BLUE };
        let anno = chart
            .draw_series(
                points
                    .iter()
                    .map(|&(x, y)| Circle::new((x, y), 3, color.mix(0.8).filled())),
            )
            .map_err(chart_err)?;
        if multi {
            anno.label(run.name).legend(move |(x, y)| {
                Circle::new((x + 8, y), 3, color.mix(0.8).filled())
            });
        }
    }
    if multi {
        draw_legend(&mut chart)?;
    }
    Ok(())
}

fn draw_legend<'a, X, Y>(
    chart: &mut ChartContext<'a, BitMapBackend<'a>, Cartesian2d<X, Y>>,
) -> Result<(), NotebenchError>
where
    X: plotters::coord::ranged1d::Ranged,
    Y: plotters::coord::ranged1d::Ranged,
{
    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.85))
        .border_style(BLACK.mix(0.4))
        .label_font(("sans-serif", 12))
        .draw()
        .map_err(chart_err)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Table panel
// ---------------------------------------------------------------------------

fn draw_table_panel(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    runs: &[ChartRun<'_>],
    table: &ComparisonTable,
) -> Result<(), NotebenchError> {
    let (width, height) = area.dim_in_pixel();
    let multi = table.columns.len() > 1;

    // Header row, one row per metric, plus a combined-score row when
    // comparing.
    let grid_rows = table.rows.len() + if multi { 2 } else { 1 };
    let cols = table.columns.len() + 1;

    let title_band = 34i32;
    let col_width = width as i32 / cols as i32;
    let row_height = ((height as i32 - title_band) / grid_rows as i32).min(30);
    let text_style = ("sans-serif", 13);
    let text_y = |row: usize| title_band + row as i32 * row_height + (row_height - 13) / 2;

    let title = if multi { "Ranked Comparison" } else { "Summary" };
    area.draw(&Text::new(title.to_string(), (10, 8), ("sans-serif", 20)))
        .map_err(chart_err)?;

    // Column headers in ranked order, tinted with the run's series color.
    for (c, name) in table.columns.iter().enumerate() {
        let x0 = (c as i32 + 1) * col_width;
        if multi {
            if let Some(idx) = runs.iter().position(|r| r.name == name) {
                area.draw(&Rectangle::new(
                    [(x0, title_band), (x0 + col_width, title_band + row_height)],
                    PALETTE[idx].mix(0.3).filled(),
                ))
                .map_err(chart_err)?;
            }
        }
        area.draw(&Text::new(
            truncate_label(name, 16),
            (x0 + 4, text_y(0)),
            text_style,
        ))
        .map_err(chart_err)?;
    }

    // Metric rows: label column plus one colored value cell per run.
    for (r, row) in table.rows.iter().enumerate() {
        let y0 = title_band + (r as i32 + 1) * row_height;
        area.draw(&Text::new(row.label.to_string(), (4, text_y(r + 1)), text_style))
            .map_err(chart_err)?;

        for (c, cell) in row.cells.iter().enumerate() {
            let x0 = (c as i32 + 1) * col_width;
            if multi {
                let tint = match cell.favorable {
                    Some(true) => Some(GOOD_CELL.mix(0.22)),
                    Some(false) => Some(BAD_CELL.mix(0.22)),
                    None => None,
                };
                if let Some(tint) = tint {
                    area.draw(&Rectangle::new(
                        [(x0, y0), (x0 + col_width, y0 + row_height)],
                        tint.filled(),
                    ))
                    .map_err(chart_err)?;
                }
            }
            area.draw(&Text::new(
                fmt_cell(cell, multi),
                (x0 + 4, text_y(r + 1)),
                text_style,
            ))
            .map_err(chart_err)?;
        }
    }

    if multi {
        let score_row = table.rows.len() + 1;
        area.draw(&Text::new(
            "Combined Score".to_string(),
            (4, text_y(score_row)),
            text_style,
        ))
        .map_err(chart_err)?;
        for (c, score) in table.scores.iter().enumerate() {
            let x0 = (c as i32 + 1) * col_width;
            area.draw(&Text::new(
                format!("{score:+.1}"),
                (x0 + 4, text_y(score_row)),
                text_style,
            ))
            .map_err(chart_err)?;
        }
    }

    // Grid lines over the cell backgrounds.
    let grid_style = BLACK.mix(0.35);
    let x_end = cols as i32 * col_width;
    let y_end = title_band + grid_rows as i32 * row_height;
    for r in 0..=grid_rows {
        let y = title_band + r as i32 * row_height;
        area.draw(&PathElement::new(vec![(0, y), (x_end, y)], &grid_style))
            .map_err(chart_err)?;
    }
    for c in 0..=cols {
        let x = c as i32 * col_width;
        area.draw(&PathElement::new(
            vec![(x, title_band), (x, y_end)],
            &grid_style,
        ))
        .map_err(chart_err)?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

fn axis_max(values: impl Iterator<Item = f64>) -> f64 {
    let max = values.fold(0.0f64, f64::max);
    if max > 0.0 {
        max * 1.05
    } else {
        1.0
    }
}

fn fmt_value(v: f64) -> String {
    if v.abs() >= 1000.0 {
        format!("{v:.0}")
    } else if v.abs() >= 10.0 {
        format!("{v:.1}")
    } else {
        format!("{v:.2}")
    }
}

/// Cell text: the value, followed by the deviation percentage when several
/// runs are compared. Absent values render as a bare dash.
fn fmt_cell(cell: &TableCell, multi: bool) -> String {
    match cell.value {
        None => "-".to_string(),
        Some(v) => {
            let mut out = fmt_value(v);
            if multi {
                if let Some(dev) = cell.deviation_pct {
                    out.push_str(&format!(" ({dev:+.1}%)"));
                }
            }
            out
        }
    }
}

fn truncate_label(name: &str, max_chars: usize) -> String {
    if name.chars().count() <= max_chars {
        name.to_string()
    } else {
        let head: String = name.chars().take(max_chars.saturating_sub(2)).collect();
        format!("{head}..")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::model::MetricRow;

    fn make_rows(n: usize) -> Vec<AlignedRow> {
        (0..n)
            .map(|i| AlignedRow {
                metric: MetricRow {
                    timestamp: 1_700_000_000 + i as i64 * 2,
                    elapsed_secs: i as f64 * 2.0,
                    requests_per_sec: Some(100.0 + i as f64),
                    failures_per_sec: Some(0.0),
                    p50_ms: Some(10.0 + i as f64),
                    p75_ms: Some(15.0 + i as f64),
                    p99_ms: Some(40.0 + i as f64),
                    total_requests: (i as u64 + 1) * 200,
                    total_failures: 0,
                    mean_response_ms: Some(12.0),
                    user_count: 50,
                    mean_content_size: Some(180.0),
                    responses_per_sec: Some(if i == 0 { 0.0 } else { 100.0 }),
                },
                resource_timestamp: Some(1_699_999_999 + i as i64 * 2),
                benchmark_cpu_pct: Some(40.0),
                benchmark_mem_mb: Some(128.0),
                db_cpu_pct: Some(5.0),
                db_mem_mb: Some(256.0),
            })
            .collect()
    }

    #[test]
    fn too_many_runs_is_an_error() {
        let rows = make_rows(2);
        let summary = RunSummary::default();
        let names: Vec<String> = (0..PALETTE.len() + 1).map(|i| format!("run {i}")).collect();
        let runs: Vec<ChartRun<'_>> = names
            .iter()
            .map(|name| ChartRun {
                name,
                rows: &rows,
                summary: &summary,
            })
            .collect();

        let dir = tempfile::tempdir().expect("tempdir");
        let err = render_chart(&dir.path().join("comparison.png"), &runs).unwrap_err();
        match err {
            NotebenchError::TooManyRuns { runs, colors } => {
                assert_eq!(runs, PALETTE.len() + 1);
                assert_eq!(colors, PALETTE.len());
            }
            other => panic!("expected TooManyRuns, got {other:?}"),
        }
    }

    #[test]
    fn zero_runs_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = render_chart(&dir.path().join("comparison.png"), &[]).unwrap_err();
        assert!(matches!(err, NotebenchError::Chart(_)));
    }

    #[test]
    fn axis_max_pads_the_largest_value() {
        let max = axis_max([1.0, 4.0, 2.0].into_iter());
        assert!((max - 4.2).abs() < 1e-9);
    }

    #[test]
    fn axis_max_of_nothing_is_one() {
        assert_eq!(axis_max(std::iter::empty()), 1.0);
    }

    #[test]
    fn fmt_value_scales_precision() {
        assert_eq!(fmt_value(12345.6), "12346");
        assert_eq!(fmt_value(123.45), "123.5");
        assert_eq!(fmt_value(1.2345), "1.23");
    }

    #[test]
    fn fmt_cell_includes_deviation_only_when_comparing() {
        let cell = TableCell {
            value: Some(150.0),
            deviation_pct: Some(50.0),
            favorable: Some(false),
        };
        assert_eq!(fmt_cell(&cell, true), "150.0 (+50.0%)");
        assert_eq!(fmt_cell(&cell, false), "150.0");
    }

    #[test]
    fn fmt_cell_renders_missing_value_as_dash() {
        let cell = TableCell {
            value: None,
            deviation_pct: None,
            favorable: None,
        };
        assert_eq!(fmt_cell(&cell, true), "-");
    }

    #[test]
    fn truncate_label_keeps_short_names() {
        assert_eq!(truncate_label("axum", 16), "axum");
        assert_eq!(truncate_label("a-very-long-backend-name", 10), "a-very-l..");
    }
}
