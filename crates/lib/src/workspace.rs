//! A loaded tree of project files, ready to evaluate.
//!
//! A [`Workspace`] owns one Lua state, one [`ConfigStore`] and the
//! [`ProjectGraph`] its project files declared. Each call to
//! [`Workspace::evaluate`] uses a fresh [`GraphEvaluator`], so memoized
//! results never leak between requests.
//!
//! Lua states are single-threaded. [`evaluate_kits`] evaluates several kits in
//! parallel by giving each kit a workspace of its own.

use std::cell::{Ref, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use mlua::Lua;
use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::backend::{BuildBackend, BuildStep, PlanBackend};
use crate::config::{ConfigOverrides, ConfigStore};
use crate::consts::{DEFAULT_OUT_DIR, OUT_DIR_ENV};
use crate::error::EvalError;
use crate::eval::{EvalContext, EvaluationReport, GraphEvaluator};
use crate::glob::{FsGlobber, Globber};
use crate::kit::Kit;
use crate::lua::convert::eval_error;
use crate::lua::loader::Loader;
use crate::lua::runtime::create_runtime;
use crate::project::ProjectGraph;

pub struct Workspace {
  graph: Rc<ProjectGraph>,
  config: Rc<RefCell<ConfigStore>>,
  globber: Rc<dyn Globber>,
  lua: Lua,
}

impl Workspace {
  /// Load the project file at `path` (or `path/make.lua`) and everything it references.
  pub fn load(path: &Path, overrides: ConfigOverrides) -> Result<Self, EvalError> {
    Self::load_with(path, overrides, Rc::new(FsGlobber))
  }

  pub fn load_with(path: &Path, overrides: ConfigOverrides, globber: Rc<dyn Globber>) -> Result<Self, EvalError> {
    let lua = create_runtime().map_err(|e| eval_error(&e))?;
    let config = Rc::new(RefCell::new(ConfigStore::new(overrides)));
    let root = Loader::new(config.clone()).load(&lua, path)?;
    let graph = Rc::new(ProjectGraph::new(root)?);
    info!(
      root = %graph.root().name(),
      projects = graph.projects().count(),
      "loaded workspace"
    );
    Ok(Self {
      graph,
      config,
      globber,
      lua,
    })
  }

  pub fn graph(&self) -> &Rc<ProjectGraph> {
    &self.graph
  }

  /// The configuration variables declared while loading.
  pub fn config(&self) -> Ref<'_, ConfigStore> {
    self.config.borrow()
  }

  /// Evaluate `request` (`name` or `project:name`) for `kit`.
  ///
  /// A fatal error anywhere in the graph fails the whole request; no partial
  /// report is returned.
  pub fn evaluate(
    &self,
    request: &str,
    kit: &Kit,
    backend: Rc<dyn BuildBackend>,
  ) -> Result<EvaluationReport, EvalError> {
    let id = self.graph.resolve(request)?;
    info!(target_id = %id, kit = %kit, "evaluating request");

    let context = EvalContext {
      config: self.config.borrow().snapshot(),
      backend,
      globber: self.globber.clone(),
    };
    let evaluator = GraphEvaluator::new(self.graph.clone(), context);

    self.lua.set_app_data(evaluator.clone());
    let result = evaluator.evaluate(&id, kit);
    self.lua.remove_app_data::<GraphEvaluator>();

    let report = result?;
    info!(
      target_id = %id,
      body_runs = report.body_runs,
      scheduled = report.scheduled.len(),
      "evaluation complete"
    );
    Ok(report)
  }
}

/// The result of evaluating one request for one kit.
#[derive(Debug, Serialize)]
pub struct KitEvaluation {
  pub kit: Kit,
  pub report: EvaluationReport,
  pub steps: Vec<BuildStep>,
  /// Override keys no project consumed.
  pub unused_overrides: Vec<String>,
}

/// Evaluate `request` for each kit in parallel, each in its own workspace.
///
/// Results are returned in the order of `kits`.
pub fn evaluate_kits(
  file: &Path,
  overrides: &ConfigOverrides,
  request: &str,
  kits: &[Kit],
  out_dir: &Path,
) -> Vec<Result<KitEvaluation, EvalError>> {
  kits
    .par_iter()
    .map(|kit| {
      let workspace = Workspace::load(file, overrides.clone())?;
      let backend = Rc::new(PlanBackend::new(out_dir));
      let report = workspace.evaluate(request, kit, backend.clone())?;
      Ok(KitEvaluation {
        kit: kit.clone(),
        report,
        steps: backend.take_steps(),
        unused_overrides: workspace.config().unused_overrides(),
      })
    })
    .collect()
}

/// Output directory: `explicit`, else `$RIG_OUT_DIR`, else `.rig-out` under `root`.
pub fn resolve_out_dir(explicit: Option<&Path>, root: &Path) -> PathBuf {
  if let Some(dir) = explicit {
    return dir.to_path_buf();
  }
  match std::env::var_os(OUT_DIR_ENV) {
    Some(dir) if !dir.is_empty() => PathBuf::from(dir),
    _ => root.join(DEFAULT_OUT_DIR),
  }
}
