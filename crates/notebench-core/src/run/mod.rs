pub mod align;
pub mod discover;
pub mod load;
pub mod model;
pub mod summary;

pub use model::{AlignedRow, MetricRow, ResourceRow, Run, RunSummary};

/// Fixed filename of the request-metrics CSV inside a run directory.
pub const STATS_HISTORY_FILE: &str = "benchmark_stats_history.csv";

/// Fixed filename of the co-located resource-usage CSV.
pub const RESOURCE_USAGE_FILE: &str = "resource_usage.csv";
