//! Shared helpers for workspace tests.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use rig_lib::backend::{BuildStep, PlanBackend};
use rig_lib::config::ConfigOverrides;
use rig_lib::eval::EvaluationReport;
use rig_lib::kit::Kit;
use rig_lib::workspace::Workspace;
use rig_lib::EvalError;
use tempfile::TempDir;

/// Path to a project under `tests/fixtures`.
pub fn fixture(name: &str) -> PathBuf {
  let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
    .join("tests")
    .join("fixtures")
    .join(name);
  dunce::canonicalize(&path).unwrap_or(path)
}

/// Overrides pointing subprojects at their fixtures, plus `assignments`.
pub fn overrides(assignments: &[&str]) -> ConfigOverrides {
  let mut overrides = ConfigOverrides::new();
  overrides.insert("test_o_matic.root", fixture("test_o_matic").to_string_lossy().as_ref());
  overrides.insert("fungo.root", fixture("fungo").to_string_lossy().as_ref());
  for assignment in assignments {
    overrides.parse_assignment(assignment).unwrap();
  }
  overrides
}

pub fn kit(text: &str) -> Kit {
  text.parse().unwrap()
}

/// A finished evaluation and the build steps it planned.
pub struct Evaluated {
  pub report: EvaluationReport,
  pub steps: Vec<BuildStep>,
}

impl Evaluated {
  pub fn commands(&self) -> Vec<String> {
    self.steps.iter().map(BuildStep::command_line).collect()
  }

  pub fn evaluated(&self, key: &str) -> bool {
    self.report.order.iter().any(|k| k.to_string() == key)
  }
}

/// Load `project` and evaluate `request` for `kit`.
pub fn evaluate(project: &Path, request: &str, kit: &Kit, overrides: ConfigOverrides) -> Result<Evaluated, EvalError> {
  let workspace = Workspace::load(project, overrides)?;
  let backend = Rc::new(PlanBackend::new("/out"));
  let report = workspace.evaluate(request, kit, backend.clone())?;
  Ok(Evaluated {
    report,
    steps: backend.take_steps(),
  })
}

/// Write a throwaway project tree.
pub fn project_tree(files: &[(&str, &str)]) -> TempDir {
  let temp = TempDir::new().unwrap();
  for (relative, content) in files {
    let path = temp.path().join(relative);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }
  temp
}
