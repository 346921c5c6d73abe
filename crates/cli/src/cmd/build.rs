//! Implementation of the `rig build` and `rig run` commands.
//!
//! Evaluates one target for each requested kit, prints the planned build
//! steps, and optionally executes the processes the evaluation scheduled.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::info;

use rig_lib::eval::ScheduledRun;
use rig_lib::run::{RunConfig, RunReport, run_scheduled};
use rig_lib::workspace::{KitEvaluation, evaluate_kits, resolve_out_dir};

use super::BuildArgs;
use crate::output::{format_duration, print_error, print_info, print_json, print_stat, print_success, print_warning, symbols};

pub fn cmd_build(args: &BuildArgs, run: bool, verbose: bool) -> Result<ExitCode> {
  let (request, overrides) = args.request()?;
  let kits = args.kits()?;
  let file = args.project.project_file()?;
  let root = file.parent().unwrap_or(Path::new("."));
  let out_dir = resolve_out_dir(args.out_dir.as_deref(), root);
  info!(file = %file.display(), request = %request, kits = kits.len(), out_dir = %out_dir.display(), "building");

  let mut evaluations = Vec::with_capacity(kits.len());
  for result in evaluate_kits(&file, &overrides, &request, &kits, &out_dir) {
    evaluations.push(result?);
  }

  if let Some(first) = evaluations.first() {
    for key in &first.unused_overrides {
      print_warning(&format!("Override '{}' does not match any configuration variable", key));
    }
  }

  let runs = if run {
    let scheduled: Vec<ScheduledRun> = evaluations
      .iter()
      .flat_map(|e| e.report.scheduled.iter().cloned())
      .collect();
    let mut config = RunConfig::default();
    if let Some(jobs) = args.jobs {
      config.parallelism = jobs;
    }
    let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
    Some(rt.block_on(run_scheduled(&scheduled, &config)))
  } else {
    None
  };

  if args.json {
    print_json(&serde_json::json!({ "evaluations": evaluations, "runs": runs }))?;
  } else {
    for evaluation in &evaluations {
      print_evaluation(evaluation, verbose);
    }
    if let Some(runs) = &runs {
      print_runs(runs);
    }
  }

  match runs {
    Some(runs) if !runs.success() => Ok(ExitCode::FAILURE),
    _ => Ok(ExitCode::SUCCESS),
  }
}

fn print_evaluation(evaluation: &KitEvaluation, verbose: bool) {
  let report = &evaluation.report;
  print_success(&format!("{} for {}", report.root.target, evaluation.kit));
  print_stat("Targets evaluated", &report.body_runs.to_string());
  print_stat("Build steps", &evaluation.steps.len().to_string());
  print_stat("Output", &report.output.to_string());

  if verbose {
    for step in &evaluation.steps {
      println!("  {} {}", symbols::ARROW, step.command_line());
    }
  }
  for scheduled in &report.scheduled {
    println!("  {} {} {}", symbols::INFO, scheduled.mode, scheduled.handle.name);
  }
}

fn print_runs(runs: &RunReport) {
  if runs.outcomes.is_empty() && runs.errors.is_empty() {
    print_info("Nothing scheduled to run");
    return;
  }
  println!();
  for outcome in &runs.outcomes {
    let label = format!("{} {}", outcome.mode, outcome.handle.name);
    if outcome.success {
      print_success(&format!("{} ({})", label, format_duration(outcome.duration)));
    } else {
      let code = outcome.code.map_or("a signal".to_string(), |c| format!("code {}", c));
      print_error(&format!("{} failed with {}", label, code));
      for line in outcome.stdout.lines().chain(outcome.stderr.lines()) {
        eprintln!("    {}", line);
      }
    }
  }
  for (name, reason) in &runs.errors {
    print_error(&format!("{}: {}", name, reason));
  }
}
