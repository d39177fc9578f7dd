//! Serializable workload descriptions executed by the harness.
//!
//! A [`Scenario`] is what one benchmark run executes: a set of weighted HTTP
//! tasks, a wait-time range between iterations, and default load parameters
//! (users, spawn rate, duration). Scenarios are stored as pretty-printed
//! JSON files.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::NotebenchError;

// ---------------------------------------------------------------------------
// HttpMethod
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// ScenarioTask
// ---------------------------------------------------------------------------

/// One weighted HTTP task. `path` is joined onto the run's base URL; a weight
/// of 2 makes the task twice as likely to be picked per iteration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ScenarioTask {
    pub name: String,
    pub method: HttpMethod,
    pub path: String,
    /// Optional JSON request body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

/// A complete workload description. The load parameters are defaults; the
/// CLI may override them per invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Scenario {
    pub name: String,
    /// Default number of concurrent virtual users.
    pub users: u32,
    /// Users spawned per second during ramp-up.
    pub spawn_rate: f64,
    /// Default run duration in seconds.
    pub duration_secs: u64,
    /// Wait between task iterations, uniform in `[wait_min_ms, wait_max_ms]`.
    pub wait_min_ms: u64,
    pub wait_max_ms: u64,
    pub tasks: Vec<ScenarioTask>,
}

impl Scenario {
    /// Check the invariants the runner relies on.
    pub fn validate(&self) -> Result<(), NotebenchError> {
        if self.tasks.is_empty() {
            return Err(NotebenchError::InvalidScenario(
                "scenario has no tasks".to_string(),
            ));
        }
        if self.tasks.iter().all(|t| t.weight == 0) {
            return Err(NotebenchError::InvalidScenario(
                "all task weights are zero".to_string(),
            ));
        }
        if self.users == 0 {
            return Err(NotebenchError::InvalidScenario(
                "scenario needs at least one user".to_string(),
            ));
        }
        if self.spawn_rate <= 0.0 {
            return Err(NotebenchError::InvalidScenario(
                "spawn rate must be positive".to_string(),
            ));
        }
        if self.wait_min_ms > self.wait_max_ms {
            return Err(NotebenchError::InvalidScenario(format!(
                "wait range is inverted: {} > {}",
                self.wait_min_ms, self.wait_max_ms
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Built-in scenario
// ---------------------------------------------------------------------------

/// The notes CRUD workload: create a note, list notes, and hit the two
/// no-database control endpoints, waiting 1-2 s between iterations.
pub fn notes_scenario() -> Scenario {
    Scenario {
        name: "notes".to_string(),
        users: 50,
        spawn_rate: 10.0,
        duration_secs: 60,
        wait_min_ms: 1000,
        wait_max_ms: 2000,
        tasks: vec![
            ScenarioTask {
                name: "create note".to_string(),
                method: HttpMethod::Post,
                path: "/notes/".to_string(),
                body: Some(serde_json::json!({
                    "title": "Sample Note",
                    "content": "This is a note content."
                })),
                weight: 1,
            },
            ScenarioTask {
                name: "list notes".to_string(),
                method: HttpMethod::Get,
                path: "/notes/".to_string(),
                body: None,
                weight: 1,
            },
            ScenarioTask {
                name: "no db".to_string(),
                method: HttpMethod::Get,
                path: "/no-db".to_string(),
                body: None,
                weight: 1,
            },
            ScenarioTask {
                name: "no db 2".to_string(),
                method: HttpMethod::Get,
                path: "/no-db2".to_string(),
                body: None,
                weight: 1,
            },
        ],
    }
}

// ---------------------------------------------------------------------------
// File IO
// ---------------------------------------------------------------------------

/// Read a scenario JSON file from disk and validate it.
pub async fn read_scenario(path: impl AsRef<Path>) -> Result<Scenario, NotebenchError> {
    let content = tokio::fs::read_to_string(path.as_ref()).await?;
    let scenario: Scenario = serde_json::from_str(&content)?;
    scenario.validate()?;
    Ok(scenario)
}

/// Write a scenario to disk as pretty-printed JSON.
pub async fn write_scenario(
    scenario: &Scenario,
    path: impl AsRef<Path>,
) -> Result<(), NotebenchError> {
    let content = serde_json::to_string_pretty(scenario)?;
    tokio::fs::write(path.as_ref(), content).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
