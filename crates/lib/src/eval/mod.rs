//! Target evaluation.
//!
//! The [`GraphEvaluator`] resolves `target(kit)` invocations against a memo
//! table keyed by `(target, kit)`. The dependency graph is discovered lazily as
//! target bodies call each other; each key moves from unrequested to evaluating
//! to memoized, and re-entering a key that is still evaluating is a cycle.
//!
//! One evaluator serves one invocation on one thread. It is cheap to clone;
//! clones share the same memo table.

mod report;
mod scope;

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use serde::{Serialize, Serializer};
use tracing::{debug, info, trace};

pub use report::EvaluationReport;
pub use scope::Scope;

use crate::backend::BuildBackend;
use crate::config::ConfigSnapshot;
use crate::error::EvalError;
use crate::glob::Globber;
use crate::kit::Kit;
use crate::project::ProjectGraph;
use crate::properties::PropertySet;
use crate::target::{ProcessHandle, RunMode, TargetId, TargetOutput};

/// Memoization key: a target evaluated for a kit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EvalKey {
  pub target: TargetId,
  pub kit: Kit,
}

impl EvalKey {
  pub fn new(target: TargetId, kit: Kit) -> Self {
    Self { target, kit }
  }
}

impl fmt::Display for EvalKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}@{}", self.target, self.kit)
  }
}

impl Serialize for EvalKey {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

/// A process run requested during evaluation, executed after it completes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledRun {
  pub handle: ProcessHandle,
  pub mode: RunMode,
  /// The target whose evaluation scheduled the run.
  pub scheduled_by: Option<EvalKey>,
}

/// Collaborators shared by every target of one evaluation.
#[derive(Clone)]
pub struct EvalContext {
  pub config: ConfigSnapshot,
  pub backend: Rc<dyn BuildBackend>,
  pub globber: Rc<dyn Globber>,
}

enum Slot {
  Evaluating,
  Done(Rc<TargetOutput>),
}

struct Inner {
  graph: Rc<ProjectGraph>,
  context: EvalContext,
  memo: RefCell<HashMap<EvalKey, Slot>>,
  stack: RefCell<Vec<EvalKey>>,
  edges: RefCell<Vec<(EvalKey, EvalKey)>>,
  seen_edges: RefCell<HashSet<(EvalKey, EvalKey)>>,
  order: RefCell<Vec<EvalKey>>,
  scheduled: RefCell<Vec<ScheduledRun>>,
  runs: Cell<usize>,
  /// First fatal error raised by any call, even if a body caught it.
  failure: RefCell<Option<EvalError>>,
  /// Set while `failure` is still propagating out of nested calls.
  unwinding: Cell<bool>,
}

#[derive(Clone)]
pub struct GraphEvaluator {
  inner: Rc<Inner>,
}

impl GraphEvaluator {
  pub fn new(graph: Rc<ProjectGraph>, context: EvalContext) -> Self {
    Self {
      inner: Rc::new(Inner {
        graph,
        context,
        memo: RefCell::new(HashMap::new()),
        stack: RefCell::new(Vec::new()),
        edges: RefCell::new(Vec::new()),
        seen_edges: RefCell::new(HashSet::new()),
        order: RefCell::new(Vec::new()),
        scheduled: RefCell::new(Vec::new()),
        runs: Cell::new(0),
        failure: RefCell::new(None),
        unwinding: Cell::new(false),
      }),
    }
  }

  pub fn graph(&self) -> &Rc<ProjectGraph> {
    &self.inner.graph
  }

  pub fn context(&self) -> &EvalContext {
    &self.inner.context
  }

  /// Number of target bodies actually executed so far.
  pub fn body_runs(&self) -> usize {
    self.inner.runs.get()
  }

  /// Evaluate `id` for `kit`, or return the memoized output.
  ///
  /// Fatal errors are also kept by the evaluator, so a body that catches one
  /// cannot turn the evaluation into a success.
  pub fn call(&self, id: &TargetId, kit: &Kit) -> Result<Rc<TargetOutput>, EvalError> {
    self.inner.unwinding.set(false);
    let result = self.call_inner(id, kit);
    match &result {
      Ok(_) => self.inner.unwinding.set(false),
      Err(err) => {
        let mut failure = self.inner.failure.borrow_mut();
        if failure.is_none() || self.inner.unwinding.get() {
          *failure = Some(err.clone());
        }
        self.inner.unwinding.set(true);
      }
    }
    result
  }

  fn call_inner(&self, id: &TargetId, kit: &Kit) -> Result<Rc<TargetOutput>, EvalError> {
    let key = EvalKey::new(id.clone(), kit.clone());
    self.record_edge(&key);

    match self.inner.memo.borrow().get(&key) {
      Some(Slot::Done(output)) => {
        trace!(key = %key, "memo hit");
        return Ok(output.clone());
      }
      Some(Slot::Evaluating) => return Err(self.cycle_error(&key)),
      None => {}
    }

    let project = self.inner.graph.project(&id.project)?;
    let def = project.get(&id.name).ok_or_else(|| EvalError::UnknownTarget {
      project: id.project.clone(),
      target: id.name.clone(),
    })?;
    let body = def.body.clone();

    self.inner.memo.borrow_mut().insert(key.clone(), Slot::Evaluating);
    self.inner.stack.borrow_mut().push(key.clone());
    self.inner.runs.set(self.inner.runs.get() + 1);
    debug!(key = %key, "evaluating target");

    let scope = Scope::new(self.clone(), id.clone());
    let result = (*body)(&scope, kit);
    self.inner.stack.borrow_mut().pop();

    let output = match result {
      Ok(output) => output,
      Err(err) if err.is_toolchain_unavailable() => {
        info!(key = %key, reason = %err, "toolchain unavailable, target contributes nothing");
        TargetOutput::Properties(PropertySet::new())
      }
      Err(err) => {
        self.inner.memo.borrow_mut().remove(&key);
        debug!(key = %key, error = %err, "target failed");
        return Err(err.in_target(id, kit));
      }
    };

    let output = Rc::new(output);
    self
      .inner
      .memo
      .borrow_mut()
      .insert(key.clone(), Slot::Done(output.clone()));
    self.inner.order.borrow_mut().push(key);
    Ok(output)
  }

  fn record_edge(&self, key: &EvalKey) {
    let Some(caller) = self.inner.stack.borrow().last().cloned() else {
      return;
    };
    let edge = (caller, key.clone());
    if self.inner.seen_edges.borrow_mut().insert(edge.clone()) {
      self.inner.edges.borrow_mut().push(edge);
    }
  }

  fn cycle_error(&self, key: &EvalKey) -> EvalError {
    let stack = self.inner.stack.borrow();
    let start = stack.iter().position(|k| k == key).unwrap_or(0);
    let mut chain: Vec<String> = stack[start..].iter().map(ToString::to_string).collect();
    chain.push(key.to_string());
    EvalError::CyclicDependency { chain }
  }

  /// Record a deferred process run. The same handle is scheduled at most once per mode.
  pub fn schedule(&self, handle: ProcessHandle, mode: RunMode) {
    let mut scheduled = self.inner.scheduled.borrow_mut();
    if scheduled.iter().any(|run| run.handle == handle && run.mode == mode) {
      return;
    }
    let scheduled_by = self.inner.stack.borrow().last().cloned();
    debug!(process = %handle.name, mode = %mode, "scheduled process");
    scheduled.push(ScheduledRun {
      handle,
      mode,
      scheduled_by,
    });
  }

  /// Evaluate the root request and package everything observed into a report.
  pub fn evaluate(self, id: &TargetId, kit: &Kit) -> Result<EvaluationReport, EvalError> {
    let output = self.call(id, kit)?;
    self.finish(EvalKey::new(id.clone(), kit.clone()), output)
  }

  /// Consume the evaluator and produce its report.
  ///
  /// Fails with the first fatal error seen during evaluation, wrapped in the
  /// root target, when a body recovered from it.
  pub fn finish(self, root: EvalKey, output: Rc<TargetOutput>) -> Result<EvaluationReport, EvalError> {
    let inner = &self.inner;
    if let Some(err) = inner.failure.take() {
      debug!(key = %root, error = %err, "fatal error was caught by a target body");
      return Err(err.in_target(&root.target, &root.kit));
    }
    Ok(EvaluationReport {
      root,
      output: Rc::unwrap_or_clone(output),
      order: inner.order.take(),
      edges: inner.edges.take(),
      scheduled: inner.scheduled.take(),
      body_runs: inner.runs.get(),
    })
  }
}
