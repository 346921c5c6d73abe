//! Targets and what they produce.
//!
//! A target is a named function of a [`Kit`] declared by a project. It is
//! evaluated at most once per kit; see [`crate::eval::GraphEvaluator`].

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::EvalError;
use crate::eval::Scope;
use crate::kit::Kit;
use crate::properties::{Artifact, PropertySet};

/// Identity of a target: its project and its name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TargetId {
  pub project: String,
  pub name: String,
}

impl TargetId {
  pub fn new(project: impl Into<String>, name: impl Into<String>) -> Self {
    Self {
      project: project.into(),
      name: name.into(),
    }
  }
}

impl fmt::Display for TargetId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.project, self.name)
  }
}

/// A deferred external action, such as running a freshly built test binary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessHandle {
  pub name: String,
  pub program: PathBuf,
  #[serde(default)]
  pub args: Vec<String>,
  #[serde(default)]
  pub cwd: Option<PathBuf>,
  #[serde(default)]
  pub env: BTreeMap<String, String>,
}

impl ProcessHandle {
  pub fn new(name: impl Into<String>, program: impl Into<PathBuf>) -> Self {
    Self {
      name: name.into(),
      program: program.into(),
      args: Vec::new(),
      cwd: None,
      env: BTreeMap::new(),
    }
  }
}

impl fmt::Display for ProcessHandle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.program.display())?;
    for arg in &self.args {
      write!(f, " {}", arg)?;
    }
    Ok(())
  }
}

/// Why a process was scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
  Run,
  Test,
}

impl fmt::Display for RunMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RunMode::Run => write!(f, "run"),
      RunMode::Test => write!(f, "test"),
    }
  }
}

/// The value a target evaluates to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum TargetOutput {
  Nothing,
  Properties(PropertySet),
  Process(ProcessHandle),
  Artifact(Artifact),
  Sequence(Vec<TargetOutput>),
}

impl TargetOutput {
  /// The property set, if this output is one. `Nothing` reads as an empty set.
  pub fn properties(&self) -> Option<PropertySet> {
    match self {
      TargetOutput::Properties(set) => Some(set.clone()),
      TargetOutput::Nothing => Some(PropertySet::new()),
      _ => None,
    }
  }

  /// Every process handle reachable from this output, in order.
  pub fn processes(&self) -> Vec<&ProcessHandle> {
    let mut out = Vec::new();
    self.collect_processes(&mut out);
    out
  }

  fn collect_processes<'a>(&'a self, out: &mut Vec<&'a ProcessHandle>) {
    match self {
      TargetOutput::Process(handle) => out.push(handle),
      TargetOutput::Sequence(items) => items.iter().for_each(|item| item.collect_processes(out)),
      _ => {}
    }
  }

  /// Every artifact reachable from this output, in order.
  pub fn artifacts(&self) -> Vec<&Artifact> {
    match self {
      TargetOutput::Artifact(artifact) => vec![artifact],
      TargetOutput::Sequence(items) => items.iter().flat_map(TargetOutput::artifacts).collect(),
      _ => Vec::new(),
    }
  }
}

impl fmt::Display for TargetOutput {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TargetOutput::Nothing => write!(f, "nothing"),
      TargetOutput::Properties(set) => write!(f, "{}", set),
      TargetOutput::Process(handle) => write!(f, "Process({})", handle),
      TargetOutput::Artifact(artifact) => write!(f, "{}", artifact),
      TargetOutput::Sequence(items) => write!(f, "Sequence[{}]", items.len()),
    }
  }
}

impl From<PropertySet> for TargetOutput {
  fn from(set: PropertySet) -> Self {
    TargetOutput::Properties(set)
  }
}

/// A target body. It receives the evaluation scope and the kit it is evaluated for.
pub type TargetBody = Rc<dyn Fn(&Scope, &Kit) -> Result<TargetOutput, EvalError>>;

/// A target as declared by its project.
#[derive(Clone)]
pub struct TargetDef {
  pub id: TargetId,
  pub description: Option<String>,
  pub body: TargetBody,
}

impl fmt::Debug for TargetDef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TargetDef")
      .field("id", &self.id)
      .field("description", &self.description)
      .finish_non_exhaustive()
  }
}
