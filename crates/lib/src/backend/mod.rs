//! Toolchain collaborators.
//!
//! Compiling and linking are delegated to a [`BuildBackend`]. The evaluator
//! only hands it property sets and records what it returns; the shipped
//! [`PlanBackend`] computes artifact paths and the command lines a toolchain
//! would run without running them.

mod plan;

use std::path::PathBuf;

use serde::Serialize;

pub use plan::PlanBackend;

use crate::error::EvalError;
use crate::kit::{Kit, Toolchain};
use crate::properties::{Executable, LibraryRef, ObjectRef, PropertySet};
use crate::target::TargetId;

/// Where a build step comes from.
pub struct StepContext<'a> {
  pub kit: &'a Kit,
  pub toolchain: Toolchain,
  pub target: &'a TargetId,
}

/// A toolchain able to turn property sets into artifacts.
///
/// `opt` carries everything the step consumes: sources to compile, objects
/// and libraries to link, flags, defines and include paths.
pub trait BuildBackend {
  fn objects(&self, ctx: &StepContext<'_>, opt: &PropertySet) -> Result<Vec<ObjectRef>, EvalError>;

  fn static_library(&self, ctx: &StepContext<'_>, name: &str, opt: &PropertySet) -> Result<LibraryRef, EvalError>;

  fn shared_library(&self, ctx: &StepContext<'_>, name: &str, opt: &PropertySet) -> Result<LibraryRef, EvalError>;

  fn executable(&self, ctx: &StepContext<'_>, name: &str, opt: &PropertySet) -> Result<Executable, EvalError>;

  /// Steps recorded so far, for backends that record them.
  fn steps(&self) -> Vec<BuildStep> {
    Vec::new()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
  Compile,
  Archive,
  LinkShared,
  LinkExecutable,
}

/// One toolchain invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildStep {
  pub kind: StepKind,
  pub target: TargetId,
  pub kit: String,
  pub output: PathBuf,
  pub command: Vec<String>,
}

impl BuildStep {
  pub fn command_line(&self) -> String {
    self.command.join(" ")
  }
}
