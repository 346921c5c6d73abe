//! Error taxonomy for graph evaluation.
//!
//! Every fatal condition of an evaluation is an [`EvalError`]. Errors raised
//! inside a target body are wrapped in [`EvalError::InTarget`] on their way up
//! the call graph, which gives the caller a causal chain from the top-level
//! request down to the target that actually failed.

use thiserror::Error;

use crate::target::TargetId;

/// Errors that can occur while loading projects or evaluating targets.
///
/// The type is `Clone` so an error can cross the Lua boundary (where it is
/// wrapped in an `Arc`) and be recovered intact on the other side.
#[derive(Debug, Clone, Error)]
pub enum EvalError {
  /// A required configuration variable has no default and no override.
  #[error("MissingConfigurationError: missing required variable '{name}'")]
  MissingConfiguration { name: String },

  /// A target was re-entered while it was still evaluating for the same kit.
  #[error("CyclicDependencyError: {}", .chain.join(" -> "))]
  CyclicDependency { chain: Vec<String> },

  /// A reference to a target that its project does not declare.
  #[error("UnknownTargetError: project '{project}' has no target '{target}'")]
  UnknownTarget { project: String, target: String },

  /// A reference to a project that is not part of the loaded graph.
  #[error("UnknownTargetError: no project named '{name}'")]
  UnknownProject { name: String },

  /// A branch requires a toolchain that the kit does not provide.
  #[error("ToolchainUnavailableError: toolchain '{toolchain}' is not installed in this kit")]
  ToolchainUnavailable { toolchain: String },

  /// The toolchain collaborator reported a failure.
  #[error("BuildStepFailedError: {step}: {message}")]
  BuildStepFailed { step: String, message: String },

  /// A glob pattern was invalid or matched nothing where a match was required.
  #[error("GlobError: {pattern}: {message}")]
  Glob { pattern: String, message: String },

  /// A value had the wrong shape for where it was used.
  #[error("invalid value: {message}")]
  InvalidValue { message: String },

  /// A project description is malformed (duplicate names, cyclic subprojects, ...).
  #[error("definition error in {origin}: {message}")]
  Definition { origin: String, message: String },

  /// A Lua error that did not originate from the evaluator.
  #[error("script error: {message}")]
  Script { message: String },

  /// An error raised while evaluating a target, tagged with its identity.
  #[error("target {target} failed for kit {kit}")]
  InTarget {
    target: TargetId,
    kit: String,
    #[source]
    source: Box<EvalError>,
  },
}

impl EvalError {
  /// Wrap this error with the identity of the target that propagated it.
  pub fn in_target(self, target: &TargetId, kit: impl ToString) -> Self {
    EvalError::InTarget {
      target: target.clone(),
      kit: kit.to_string(),
      source: Box::new(self),
    }
  }

  /// The innermost error, skipping any `InTarget` wrappers.
  pub fn root_cause(&self) -> &EvalError {
    match self {
      EvalError::InTarget { source, .. } => source.root_cause(),
      other => other,
    }
  }

  /// Taxonomy name of the root cause.
  pub fn kind(&self) -> &'static str {
    match self.root_cause() {
      EvalError::MissingConfiguration { .. } => "MissingConfigurationError",
      EvalError::CyclicDependency { .. } => "CyclicDependencyError",
      EvalError::UnknownTarget { .. } | EvalError::UnknownProject { .. } => "UnknownTargetError",
      EvalError::ToolchainUnavailable { .. } => "ToolchainUnavailableError",
      EvalError::BuildStepFailed { .. } => "BuildStepFailedError",
      EvalError::Glob { .. } => "GlobError",
      EvalError::InvalidValue { .. } => "InvalidValueError",
      EvalError::Definition { .. } => "DefinitionError",
      EvalError::Script { .. } => "ScriptError",
      EvalError::InTarget { .. } => "EvaluationError",
    }
  }

  /// Identities of the targets the error passed through, outermost first.
  pub fn target_chain(&self) -> Vec<String> {
    let mut chain = Vec::new();
    let mut current = self;
    while let EvalError::InTarget { target, kit, source } = current {
      chain.push(format!("{}@{}", target, kit));
      current = source;
    }
    chain
  }

  /// Whether this error is a toolchain absence raised directly by a target body.
  pub fn is_toolchain_unavailable(&self) -> bool {
    matches!(self, EvalError::ToolchainUnavailable { .. })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn root_cause_skips_target_wrappers() {
    let err = EvalError::MissingConfiguration {
      name: "fungo.flags".to_string(),
    }
    .in_target(&TargetId::new("fungo", "staticlib"), "linux:gpp=7.0")
    .in_target(&TargetId::new("dbg", "default"), "linux:gpp=7.0");

    assert_eq!(err.kind(), "MissingConfigurationError");
    assert_eq!(
      err.target_chain(),
      vec!["dbg:default@linux:gpp=7.0", "fungo:staticlib@linux:gpp=7.0"]
    );
  }

  #[test]
  fn display_carries_taxonomy_name_and_key() {
    let err = EvalError::UnknownTarget {
      project: "fungo".to_string(),
      target: "nope".to_string(),
    };
    let text = err.to_string();
    assert!(text.starts_with("UnknownTargetError"));
    assert!(text.contains("nope"));
  }

  #[test]
  fn cycle_message_lists_chain() {
    let err = EvalError::CyclicDependency {
      chain: vec!["p:a@k".to_string(), "p:b@k".to_string(), "p:a@k".to_string()],
    };
    assert_eq!(err.to_string(), "CyclicDependencyError: p:a@k -> p:b@k -> p:a@k");
  }
}
