//! Built-in load harness: executes a [`crate::scenario::Scenario`] against a
//! target backend and writes the two CSVs the reporting pipeline consumes.

use std::time::Duration;

pub mod recorder;
pub mod runner;
pub mod usage;

pub use recorder::{RequestEvent, StatsRecorder, StatsRow};
pub use runner::{run_scenario, HarnessConfig, HarnessOutcome};
pub use usage::ContainerPair;

/// Cadence of stats-history rows and resource samples, matching the source
/// data the reporting pipeline was built against.
pub const FLUSH_INTERVAL: Duration = Duration::from_secs(2);
