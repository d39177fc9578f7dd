use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::NotebenchError;
use crate::harness::recorder::{format_row, RequestEvent, StatsRecorder, STATS_HEADER};
use crate::harness::usage::{run_sampler, ContainerPair};
use crate::harness::FLUSH_INTERVAL;
use crate::run::{RESOURCE_USAGE_FILE, STATS_HISTORY_FILE};
use crate::scenario::{HttpMethod, Scenario, ScenarioTask};

// ---------------------------------------------------------------------------
// Configuration and outcome
// ---------------------------------------------------------------------------

/// Everything one harness execution needs: the workload, the target, the
/// load parameters and the output directory.
pub struct HarnessConfig {
    pub scenario: Scenario,
    pub base_url: String,
    pub users: u32,
    /// Users spawned per second during ramp-up.
    pub spawn_rate: f64,
    pub duration: Duration,
    pub out_dir: PathBuf,
    /// When set, a sampler writes the resource-usage CSV alongside the
    /// stats history.
    pub containers: Option<ContainerPair>,
}

impl HarnessConfig {
    /// Build a config from a scenario, using its load parameters as defaults.
    pub fn from_scenario(scenario: Scenario, base_url: String, out_dir: PathBuf) -> Self {
        let users = scenario.users;
        let spawn_rate = scenario.spawn_rate;
        let duration = Duration::from_secs(scenario.duration_secs);
        Self {
            scenario,
            base_url,
            users,
            spawn_rate,
            duration,
            out_dir,
            containers: None,
        }
    }
}

/// What a finished run produced.
#[derive(Debug)]
pub struct HarnessOutcome {
    pub stats_path: PathBuf,
    pub resource_path: Option<PathBuf>,
    pub total_requests: u64,
    pub total_failures: u64,
    pub mean_response_ms: Option<f64>,
}

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Execute a scenario: spawn the virtual users, aggregate their request
/// events, and write the stats-history CSV (plus the resource-usage CSV when
/// containers are configured) under the output directory.
pub async fn run_scenario(config: HarnessConfig) -> Result<HarnessOutcome, NotebenchError> {
    config.scenario.validate()?;
    if config.users == 0 {
        return Err(NotebenchError::InvalidScenario(
            "user count must be positive".to_string(),
        ));
    }
    if config.spawn_rate <= 0.0 {
        return Err(NotebenchError::InvalidScenario(
            "spawn rate must be positive".to_string(),
        ));
    }

    tokio::fs::create_dir_all(&config.out_dir).await?;
    let stats_path = config.out_dir.join(STATS_HISTORY_FILE);
    let mut stats_file = tokio::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&stats_path)
        .await?;
    stats_file.write_all(STATS_HEADER.as_bytes()).await?;
    stats_file.write_all(b"\n").await?;

    let client = Arc::new(
        reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(100)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(format!("notebench/{}", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .brotli(true)
            .build()?,
    );

    let cancel = CancellationToken::new();
    let (event_tx, mut event_rx) = mpsc::channel::<RequestEvent>(4096);
    let active_users = Arc::new(AtomicU64::new(0));

    // End the run at the configured duration.
    let deadline_cancel = cancel.clone();
    let duration = config.duration;
    tokio::spawn(async move {
        sleep(duration).await;
        deadline_cancel.cancel();
    });

    // Resource sampler, when containers are named.
    let resource_path = config.containers.as_ref().map(|_| config.out_dir.join(RESOURCE_USAGE_FILE));
    let sampler_task = config.containers.clone().map(|containers| {
        let path = config.out_dir.join(RESOURCE_USAGE_FILE);
        let cancel = cancel.clone();
        tokio::spawn(async move { run_sampler(&path, containers, cancel).await })
    });

    info!(
        scenario = %config.scenario.name,
        url = %config.base_url,
        users = config.users,
        spawn_rate = config.spawn_rate,
        duration_secs = config.duration.as_secs(),
        "starting run"
    );

    // Ramp users up in a task of its own so aggregation starts immediately.
    let spawner = tokio::spawn(spawn_users(
        config.users,
        config.spawn_rate,
        Arc::new(config.scenario.tasks.clone()),
        (config.scenario.wait_min_ms, config.scenario.wait_max_ms),
        Arc::new(config.base_url.clone()),
        Arc::clone(&client),
        cancel.clone(),
        event_tx,
        Arc::clone(&active_users),
    ));

    // Aggregation loop: drain events, flush a stats row on each tick.
    let mut recorder = StatsRecorder::new(FLUSH_INTERVAL.as_secs_f64());
    let mut ticker = interval(FLUSH_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker.tick().await;
    loop {
        tokio::select! {
            event = event_rx.recv() => match event {
                Some(event) => recorder.record(&event),
                None => break,
            },
            _ = ticker.tick() => {
                let row = recorder.flush(
                    chrono::Utc::now().timestamp(),
                    active_users.load(Ordering::Relaxed),
                );
                stats_file.write_all(format_row(&row).as_bytes()).await?;
                stats_file.write_all(b"\n").await?;
            }
        }
    }

    // Final partial window.
    let row = recorder.flush(chrono::Utc::now().timestamp(), 0);
    stats_file.write_all(format_row(&row).as_bytes()).await?;
    stats_file.write_all(b"\n").await?;
    stats_file.flush().await?;

    if let Err(error) = spawner.await {
        warn!(%error, "user spawner task panicked");
    }
    if let Some(task) = sampler_task {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => warn!(%error, "resource sampler failed"),
            Err(error) => warn!(%error, "resource sampler task panicked"),
        }
    }

    info!(
        requests = recorder.total_requests(),
        failures = recorder.total_failures(),
        "run finished"
    );
    Ok(HarnessOutcome {
        stats_path,
        resource_path,
        total_requests: recorder.total_requests(),
        total_failures: recorder.total_failures(),
        mean_response_ms: recorder.mean_response_ms(),
    })
}

// ---------------------------------------------------------------------------
// Virtual users
// ---------------------------------------------------------------------------

/// Spawn `users` virtual users staggered at `spawn_rate` per second and wait
/// for all of them to finish. Holds the only long-lived event sender, so the
/// channel closes once the last user exits.
#[allow(clippy::too_many_arguments)]
async fn spawn_users(
    users: u32,
    spawn_rate: f64,
    tasks: Arc<Vec<ScenarioTask>>,
    wait_range: (u64, u64),
    base_url: Arc<String>,
    client: Arc<reqwest::Client>,
    cancel: CancellationToken,
    event_tx: mpsc::Sender<RequestEvent>,
    active_users: Arc<AtomicU64>,
) {
    let total_weight: u32 = tasks.iter().map(|t| t.weight).sum();
    let ramp_delay = Duration::from_secs_f64(1.0 / spawn_rate);

    let mut join_set: JoinSet<()> = JoinSet::new();
    for user_id in 0..users {
        if cancel.is_cancelled() {
            break;
        }
        if user_id > 0 && !ramp_delay.is_zero() {
            tokio::select! {
                _ = sleep(ramp_delay) => {}
                _ = cancel.cancelled() => break,
            }
        }

        let client = Arc::clone(&client);
        let tasks = Arc::clone(&tasks);
        let base_url = Arc::clone(&base_url);
        let tx = event_tx.clone();
        let cancel = cancel.clone();
        let active = Arc::clone(&active_users);

        active.fetch_add(1, Ordering::Relaxed);
        join_set.spawn(async move {
            run_user(base_url, tasks, total_weight, wait_range, client, cancel, tx).await;
            active.fetch_sub(1, Ordering::Relaxed);
        });
    }
    drop(event_tx);

    while join_set.join_next().await.is_some() {}
}

/// One virtual user: loop over weighted task picks with a wait between
/// iterations until cancelled. Checked between requests, never mid-request.
async fn run_user(
    base_url: Arc<String>,
    tasks: Arc<Vec<ScenarioTask>>,
    total_weight: u32,
    wait_range: (u64, u64),
    client: Arc<reqwest::Client>,
    cancel: CancellationToken,
    tx: mpsc::Sender<RequestEvent>,
) {
    loop {
        if cancel.is_cancelled() {
            return;
        }

        let roll = rand::thread_rng().gen_range(0..total_weight);
        let task = pick_task(&tasks, roll);
        let event = execute_task(task, &base_url, &client).await;
        // A closed channel means the aggregation loop is gone; stop quietly.
        if tx.send(event).await.is_err() {
            return;
        }

        let wait_ms = if wait_range.0 == wait_range.1 {
            wait_range.0
        } else {
            rand::thread_rng().gen_range(wait_range.0..=wait_range.1)
        };
        tokio::select! {
            _ = sleep(Duration::from_millis(wait_ms)) => {}
            _ = cancel.cancelled() => return,
        }
    }
}

/// Weighted task pick. `roll` must be in `[0, total_weight)`; zero-weight
/// tasks are never chosen. `tasks` must be non-empty, which scenario
/// validation guarantees.
fn pick_task(tasks: &[ScenarioTask], roll: u32) -> &ScenarioTask {
    let mut remaining = roll;
    let mut fallback = &tasks[0];
    for task in tasks {
        if task.weight == 0 {
            continue;
        }
        fallback = task;
        if remaining < task.weight {
            return task;
        }
        remaining -= task.weight;
    }
    fallback
}

/// Send one task's request and turn the outcome into an event. Network
/// errors are captured in the event, never propagated.
async fn execute_task(
    task: &ScenarioTask,
    base_url: &str,
    client: &reqwest::Client,
) -> RequestEvent {
    let url = join_url(base_url, &task.path);
    let method = match task.method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Delete => reqwest::Method::DELETE,
    };

    let mut builder = client.request(method, &url);
    if let Some(body) = &task.body {
        builder = builder.json(body);
    }

    let start = Instant::now();
    match builder.send().await {
        Ok(response) => {
            let status = response.status().as_u16();
            match response.bytes().await {
                Ok(bytes) => RequestEvent {
                    task: task.name.clone(),
                    status: Some(status),
                    elapsed_ms: start.elapsed().as_millis() as u64,
                    size_bytes: bytes.len() as u64,
                    error: None,
                },
                Err(error) => RequestEvent {
                    task: task.name.clone(),
                    status: Some(status),
                    elapsed_ms: start.elapsed().as_millis() as u64,
                    size_bytes: 0,
                    error: Some(format!("error reading response body: {error}")),
                },
            }
        }
        Err(error) => RequestEvent {
            task: task.name.clone(),
            status: None,
            elapsed_ms: start.elapsed().as_millis() as u64,
            size_bytes: 0,
            error: Some(format!("network error: {error}")),
        },
    }
}

/// Join a base URL and a task path without doubling the slash between them.
fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
