use std::path::PathBuf;
use std::rc::Rc;

use super::GraphEvaluator;
use crate::backend::BuildBackend;
use crate::config::ConfigSnapshot;
use crate::error::EvalError;
use crate::kit::Kit;
use crate::project::Project;
use crate::properties::PropertySet;
use crate::target::{ProcessHandle, RunMode, TargetId, TargetOutput};

/// What a target body can reach while it runs.
#[derive(Clone)]
pub struct Scope {
  evaluator: GraphEvaluator,
  target: TargetId,
}

impl Scope {
  pub(crate) fn new(evaluator: GraphEvaluator, target: TargetId) -> Self {
    Self { evaluator, target }
  }

  /// The target being evaluated.
  pub fn target(&self) -> &TargetId {
    &self.target
  }

  pub fn evaluator(&self) -> &GraphEvaluator {
    &self.evaluator
  }

  pub fn project(&self) -> Result<Rc<Project>, EvalError> {
    self.evaluator.graph().project(&self.target.project).cloned()
  }

  /// Root directory of the project declaring the current target.
  pub fn root(&self) -> Result<PathBuf, EvalError> {
    Ok(self.project()?.root().to_path_buf())
  }

  /// Another target of the current project.
  pub fn local(&self, name: &str) -> Result<TargetId, EvalError> {
    self.project()?.target(name)
  }

  pub fn call(&self, id: &TargetId, kit: &Kit) -> Result<Rc<TargetOutput>, EvalError> {
    self.evaluator.call(id, kit)
  }

  /// Call a target that must produce properties.
  pub fn properties(&self, id: &TargetId, kit: &Kit) -> Result<PropertySet, EvalError> {
    let output = self.call(id, kit)?;
    output.properties().ok_or_else(|| EvalError::InvalidValue {
      message: format!("target {} produced {} where properties were expected", id, output),
    })
  }

  pub fn config(&self) -> &ConfigSnapshot {
    &self.evaluator.context().config
  }

  pub fn backend(&self) -> &dyn BuildBackend {
    self.evaluator.context().backend.as_ref()
  }

  pub fn schedule(&self, handle: ProcessHandle, mode: RunMode) {
    self.evaluator.schedule(handle, mode);
  }
}
