use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::NotebenchError;
use crate::run::STATS_HISTORY_FILE;

/// Path segments that carry no information about which backend a run
/// belongs to and are dropped from display names.
const IGNORED_SEGMENTS: &[&str] = &["tests", "results", "backend", "benchmark", "benchmarks"];

/// Anchor segment: only segments after its first occurrence contribute to a
/// run's display name.
const ANCHOR_SEGMENT: &str = "backends";

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// A run location found under the results root, not yet loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredRun {
    /// Directory containing the run's result files.
    pub dir: PathBuf,
    /// Display name derived from the stats file's path.
    pub name: String,
}

/// Recursively scan `root` for stats-history files, one discovered run per
/// match, sorted by display name so downstream color assignment is stable.
pub fn discover_runs(root: &Path) -> Result<Vec<DiscoveredRun>, NotebenchError> {
    if !root.is_dir() {
        return Err(NotebenchError::MissingFile(root.display().to_string()));
    }

    let mut found = Vec::new();
    for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() || entry.file_name() != STATS_HISTORY_FILE {
            continue;
        }
        let stats_path = entry.path();
        let Some(dir) = stats_path.parent() else {
            continue;
        };
        let name = display_name(stats_path);
        debug!(file = %stats_path.display(), name = %name, "discovered run");
        found.push(DiscoveredRun {
            dir: dir.to_path_buf(),
            name,
        });
    }

    found.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(found)
}

/// Derive a human-readable run name from a stats file path.
///
/// Lowercases the path, takes the segments after the first `backends`
/// segment (all segments when there is none), drops boilerplate segments and
/// the filename itself, joins the rest with spaces, and turns hyphens into
/// spaces.
pub fn display_name(path: &Path) -> String {
    let segments: Vec<String> = path
        .iter()
        .filter_map(|s| s.to_str())
        .map(str::to_lowercase)
        .collect();

    let start = segments
        .iter()
        .position(|s| s == ANCHOR_SEGMENT)
        .map(|i| i + 1)
        .unwrap_or(0);

    let kept: Vec<&str> = segments[start..]
        .iter()
        .map(String::as_str)
        .filter(|s| !IGNORED_SEGMENTS.contains(s) && *s != STATS_HISTORY_FILE)
        .collect();

    kept.join(" ").replace('-', " ").trim().to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
