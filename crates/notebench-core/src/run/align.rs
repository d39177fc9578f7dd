use crate::run::model::{AlignedRow, MetricRow, ResourceRow};

// ---------------------------------------------------------------------------
// Cross-run aligner
// ---------------------------------------------------------------------------

/// Attach to each metric row the latest resource sample taken strictly
/// before it.
///
/// Both inputs must be sorted ascending by raw timestamp (the loader
/// guarantees this). A single forward pointer walks the resource series once,
/// so the pass is linear in the combined length of the two inputs. A resource
/// sample with a timestamp equal to the metric row's does not count as
/// preceding, and rows before every resource sample keep absent resource
/// fields; nothing is ever back-filled from a later sample.
pub fn align(metrics: &[MetricRow], resources: &[ResourceRow]) -> Vec<AlignedRow> {
    let mut aligned = Vec::with_capacity(metrics.len());
    let mut next = 0usize;
    let mut current: Option<&ResourceRow> = None;

    for metric in metrics {
        while next < resources.len() && resources[next].timestamp < metric.timestamp {
            current = Some(&resources[next]);
            next += 1;
        }

        aligned.push(match current {
            Some(res) => AlignedRow {
                metric: metric.clone(),
                resource_timestamp: Some(res.timestamp),
                benchmark_cpu_pct: Some(res.benchmark_cpu_pct),
                benchmark_mem_mb: Some(res.benchmark_mem_mb),
                db_cpu_pct: Some(res.db_cpu_pct),
                db_mem_mb: Some(res.db_mem_mb),
            },
            None => AlignedRow {
                metric: metric.clone(),
                resource_timestamp: None,
                benchmark_cpu_pct: None,
                benchmark_mem_mb: None,
                db_cpu_pct: None,
                db_mem_mb: None,
            },
        });
    }

    aligned
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn make_metric(timestamp: i64) -> MetricRow {
        MetricRow {
            timestamp,
            elapsed_secs: 0.0,
            requests_per_sec: Some(1.0),
            failures_per_sec: Some(0.0),
            p50_ms: Some(10.0),
            p75_ms: Some(20.0),
            p99_ms: Some(30.0),
            total_requests: 1,
            total_failures: 0,
            mean_response_ms: Some(12.0),
            user_count: 5,
            mean_content_size: Some(100.0),
            responses_per_sec: Some(0.0),
        }
    }

    fn make_resource(timestamp: i64, cpu: f64) -> ResourceRow {
        ResourceRow {
            timestamp,
            benchmark_cpu_pct: cpu,
            benchmark_mem_mb: 128.0,
            db_cpu_pct: cpu / 10.0,
            db_mem_mb: 256.0,
        }
    }

    #[test]
    fn attaches_the_nearest_preceding_sample() {
        let metrics = vec![make_metric(100), make_metric(110)];
        let resources = vec![
            make_resource(95, 10.0),
            make_resource(105, 20.0),
            make_resource(120, 30.0),
        ];
        let aligned = align(&metrics, &resources);
        assert_eq!(aligned[0].resource_timestamp, Some(95));
        assert_eq!(aligned[0].benchmark_cpu_pct, Some(10.0));
        assert_eq!(aligned[1].resource_timestamp, Some(105));
        assert_eq!(aligned[1].benchmark_cpu_pct, Some(20.0));
    }

    #[test]
    fn no_preceding_sample_leaves_resource_fields_absent() {
        let metrics = vec![make_metric(100)];
        let resources = vec![make_resource(100, 10.0), make_resource(150, 20.0)];
        let aligned = align(&metrics, &resources);
        // A later sample never back-fills.
        assert_eq!(aligned[0].resource_timestamp, None);
        assert_eq!(aligned[0].benchmark_cpu_pct, None);
    }

    #[test]
    fn equal_timestamps_do_not_match() {
        let metrics = vec![make_metric(100), make_metric(105)];
        let resources = vec![make_resource(100, 10.0), make_resource(105, 20.0)];
        let aligned = align(&metrics, &resources);
        assert_eq!(aligned[0].resource_timestamp, None);
        // At t=105 the strictly earlier t=100 sample wins, not the tied one.
        assert_eq!(aligned[1].resource_timestamp, Some(100));
        assert_eq!(aligned[1].benchmark_cpu_pct, Some(10.0));
    }

    #[test]
    fn attached_timestamps_are_strictly_earlier() {
        let metrics: Vec<MetricRow> = (0..20).map(|i| make_metric(100 + i * 3)).collect();
        let resources: Vec<ResourceRow> =
            (0..20).map(|i| make_resource(99 + i * 4, i as f64)).collect();
        for row in align(&metrics, &resources) {
            if let Some(rts) = row.resource_timestamp {
                assert!(rts < row.metric.timestamp);
            }
        }
    }

    #[test]
    fn alignment_is_idempotent() {
        let metrics = vec![make_metric(100), make_metric(104), make_metric(108)];
        let resources = vec![make_resource(99, 10.0), make_resource(103, 20.0)];
        let first = align(&metrics, &resources);
        let second = align(&metrics, &resources);
        assert_eq!(first, second);
    }

    #[test]
    fn one_sample_can_serve_several_metric_rows() {
        let metrics = vec![make_metric(100), make_metric(102), make_metric(104)];
        let resources = vec![make_resource(99, 42.0)];
        let aligned = align(&metrics, &resources);
        for row in &aligned {
            assert_eq!(row.resource_timestamp, Some(99));
            assert_eq!(row.benchmark_cpu_pct, Some(42.0));
        }
    }

    #[test]
    fn empty_resource_series_aligns_to_all_absent() {
        let metrics = vec![make_metric(100), make_metric(102)];
        let aligned = align(&metrics, &[]);
        assert_eq!(aligned.len(), 2);
        assert!(aligned.iter().all(|r| r.benchmark_cpu_pct.is_none()));
    }

    #[test]
    fn empty_metrics_align_to_nothing() {
        let resources = vec![make_resource(99, 42.0)];
        assert!(align(&[], &resources).is_empty());
    }

    #[test]
    fn row_count_matches_metric_count() {
        let metrics: Vec<MetricRow> = (0..7).map(|i| make_metric(100 + i)).collect();
        let resources: Vec<ResourceRow> = (0..3).map(|i| make_resource(90 + i, 1.0)).collect();
        assert_eq!(align(&metrics, &resources).len(), metrics.len());
    }
}
