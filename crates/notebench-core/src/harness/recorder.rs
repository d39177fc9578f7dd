// ---------------------------------------------------------------------------
// RequestEvent — one completed request, reported by a virtual user
// ---------------------------------------------------------------------------

/// The result of one HTTP request. Network-level errors arrive with
/// `status: None` and the error message attached; they count as failures,
/// as do 4xx/5xx responses.
#[derive(Debug, Clone)]
pub struct RequestEvent {
    pub task: String,
    pub status: Option<u16>,
    pub elapsed_ms: u64,
    pub size_bytes: u64,
    pub error: Option<String>,
}

impl RequestEvent {
    pub fn is_failure(&self) -> bool {
        match (self.status, &self.error) {
            (_, Some(_)) => true,
            (Some(code), None) => code >= 400,
            (None, None) => true,
        }
    }
}

// ---------------------------------------------------------------------------
// StatsRow — one flushed interval, matching the stats-history CSV layout
// ---------------------------------------------------------------------------

/// One row of the stats-history CSV, produced by [`StatsRecorder::flush`].
#[derive(Debug, Clone, PartialEq)]
pub struct StatsRow {
    pub timestamp: i64,
    pub user_count: u64,
    pub requests_per_sec: f64,
    pub failures_per_sec: f64,
    /// Percentiles over the flushed window's samples; absent for an empty
    /// window, written as `N/A` in the CSV.
    pub p50_ms: Option<u64>,
    pub p75_ms: Option<u64>,
    pub p99_ms: Option<u64>,
    pub total_requests: u64,
    pub total_failures: u64,
    pub mean_response_ms: f64,
    pub mean_content_size: f64,
}

/// Header of the stats-history CSV. The `Type` and `Name` columns mirror the
/// source data's layout; the recorder only emits the aggregated series.
pub const STATS_HEADER: &str = "Timestamp,User Count,Type,Name,Requests/s,Failures/s,50%,75%,99%,Total Request Count,Total Failure Count,Total Average Response Time,Total Average Content Size";

/// Format one row in the stats-history layout, without a trailing newline.
pub fn format_row(row: &StatsRow) -> String {
    format!(
        "{},{},,Aggregated,{:.2},{:.2},{},{},{},{},{},{:.2},{:.2}",
        row.timestamp,
        row.user_count,
        row.requests_per_sec,
        row.failures_per_sec,
        pct_field(row.p50_ms),
        pct_field(row.p75_ms),
        pct_field(row.p99_ms),
        row.total_requests,
        row.total_failures,
        row.mean_response_ms,
        row.mean_content_size,
    )
}

fn pct_field(v: Option<u64>) -> String {
    match v {
        Some(ms) => ms.to_string(),
        None => "N/A".to_string(),
    }
}

// ---------------------------------------------------------------------------
// StatsRecorder
// ---------------------------------------------------------------------------

/// Aggregates request events and turns them into stats-history rows on a
/// fixed flush cadence. Owned by the aggregation loop; virtual users only
/// send events.
pub struct StatsRecorder {
    interval_secs: f64,
    // Current window, drained on every flush.
    window_latencies: Vec<u64>,
    window_requests: u64,
    window_failures: u64,
    // Cumulative over the whole run.
    total_requests: u64,
    total_failures: u64,
    sum_response_ms: u64,
    sum_content_bytes: u64,
}

impl StatsRecorder {
    pub fn new(interval_secs: f64) -> Self {
        Self {
            interval_secs,
            window_latencies: Vec::new(),
            window_requests: 0,
            window_failures: 0,
            total_requests: 0,
            total_failures: 0,
            sum_response_ms: 0,
            sum_content_bytes: 0,
        }
    }

    /// Record one completed request.
    pub fn record(&mut self, event: &RequestEvent) {
        self.window_requests += 1;
        self.total_requests += 1;
        if event.is_failure() {
            self.window_failures += 1;
            self.total_failures += 1;
        }
        self.window_latencies.push(event.elapsed_ms);
        self.sum_response_ms += event.elapsed_ms;
        self.sum_content_bytes += event.size_bytes;
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests
    }

    pub fn total_failures(&self) -> u64 {
        self.total_failures
    }

    /// Cumulative mean response time, absent before the first request.
    pub fn mean_response_ms(&self) -> Option<f64> {
        if self.total_requests == 0 {
            return None;
        }
        Some(self.sum_response_ms as f64 / self.total_requests as f64)
    }

    /// Close the current window and produce its stats row. Rates cover the
    /// flush interval; totals and means cover the whole run so far.
    pub fn flush(&mut self, timestamp: i64, user_count: u64) -> StatsRow {
        let row = StatsRow {
            timestamp,
            user_count,
            requests_per_sec: self.window_requests as f64 / self.interval_secs,
            failures_per_sec: self.window_failures as f64 / self.interval_secs,
            p50_ms: self.percentile(50.0),
            p75_ms: self.percentile(75.0),
            p99_ms: self.percentile(99.0),
            total_requests: self.total_requests,
            total_failures: self.total_failures,
            mean_response_ms: if self.total_requests > 0 {
                self.sum_response_ms as f64 / self.total_requests as f64
            } else {
                0.0
            },
            mean_content_size: if self.total_requests > 0 {
                self.sum_content_bytes as f64 / self.total_requests as f64
            } else {
                0.0
            },
        };
        self.window_latencies.clear();
        self.window_requests = 0;
        self.window_failures = 0;
        row
    }

    /// The p-th percentile of the current window's latencies, `p` in
    /// (0.0, 100.0]. Absent when the window is empty.
    fn percentile(&self, p: f64) -> Option<u64> {
        if self.window_latencies.is_empty() {
            return None;
        }
        let mut sorted = self.window_latencies.clone();
        sorted.sort_unstable();
        let idx = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
        let idx = idx.saturating_sub(1).min(sorted.len() - 1);
        Some(sorted[idx])
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
