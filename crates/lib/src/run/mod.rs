//! Deferred process execution.
//!
//! Targets only *schedule* processes (test binaries, examples). Once an
//! evaluation has completed, the scheduled runs are executed here:
//! - concurrently, bounded by a semaphore
//! - each with its own working directory and extra environment
//! - with output captured and reported per process

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::eval::ScheduledRun;
use crate::target::{ProcessHandle, RunMode};

/// Errors that prevent a process from producing an outcome.
#[derive(Debug, Error)]
pub enum RunError {
  #[error("failed to spawn {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  #[error("run task failed: {0}")]
  Join(String),
}

/// Runner configuration.
#[derive(Debug, Clone)]
pub struct RunConfig {
  /// Maximum number of processes running at once.
  pub parallelism: usize,
}

impl Default for RunConfig {
  fn default() -> Self {
    Self {
      parallelism: num_cpus(),
    }
  }
}

fn num_cpus() -> usize {
  std::thread::available_parallelism().map(|p| p.get()).unwrap_or(4)
}

/// Result of running one process to completion.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
  pub handle: ProcessHandle,
  pub mode: RunMode,
  pub code: Option<i32>,
  pub success: bool,
  pub stdout: String,
  pub stderr: String,
  #[serde(with = "duration_ms")]
  pub duration: Duration,
}

mod duration_ms {
  use std::time::Duration;

  use serde::Serializer;

  pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
  }
}

/// Outcomes of all scheduled runs, in scheduling order.
#[derive(Debug, Default, Serialize)]
pub struct RunReport {
  pub outcomes: Vec<RunOutcome>,
  /// Processes that could not be started, with the reason.
  pub errors: Vec<(String, String)>,
}

impl RunReport {
  pub fn success(&self) -> bool {
    self.errors.is_empty() && self.outcomes.iter().all(|o| o.success)
  }

  pub fn failed(&self) -> impl Iterator<Item = &RunOutcome> {
    self.outcomes.iter().filter(|o| !o.success)
  }
}

impl ProcessHandle {
  /// Run the process to completion, capturing its output.
  pub async fn run(&self, mode: RunMode) -> Result<RunOutcome, RunError> {
    info!(process = %self.name, mode = %mode, "running process");
    let mut command = Command::new(&self.program);
    command.args(&self.args);
    if let Some(cwd) = &self.cwd {
      command.current_dir(cwd);
    }
    for (key, value) in &self.env {
      command.env(key, value);
    }

    let started = Instant::now();
    let output = command.output().await.map_err(|source| RunError::Spawn {
      program: self.program.display().to_string(),
      source,
    })?;
    let duration = started.elapsed();

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    if !output.status.success() {
      if !stderr.is_empty() {
        debug!(stderr = %stderr, "process stderr");
      }
      warn!(process = %self.name, code = ?output.status.code(), "process failed");
    }

    Ok(RunOutcome {
      handle: self.clone(),
      mode,
      code: output.status.code(),
      success: output.status.success(),
      stdout,
      stderr,
      duration,
    })
  }
}

/// Execute scheduled runs concurrently and collect their outcomes.
pub async fn run_scheduled(runs: &[ScheduledRun], config: &RunConfig) -> RunReport {
  info!(count = runs.len(), parallelism = config.parallelism, "executing scheduled runs");
  let semaphore = Arc::new(Semaphore::new(config.parallelism.max(1)));
  let mut join_set = JoinSet::new();

  for (index, run) in runs.iter().enumerate() {
    let handle = run.handle.clone();
    let mode = run.mode;
    let semaphore = semaphore.clone();
    join_set.spawn(async move {
      let result = match semaphore.acquire_owned().await {
        Ok(_permit) => handle.run(mode).await,
        Err(e) => Err(RunError::Join(e.to_string())),
      };
      (index, handle.name, result)
    });
  }

  let mut results = Vec::with_capacity(runs.len());
  while let Some(joined) = join_set.join_next().await {
    match joined {
      Ok(entry) => results.push(entry),
      Err(e) => error!(error = %e, "run task panicked"),
    }
  }
  results.sort_by_key(|(index, _, _)| *index);

  let mut report = RunReport::default();
  for (_, name, result) in results {
    match result {
      Ok(outcome) => report.outcomes.push(outcome),
      Err(e) => report.errors.push((name, e.to_string())),
    }
  }
  report
}
