use std::collections::HashMap;
use std::fmt::Write;

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;

use super::{EvalKey, ScheduledRun};
use crate::error::EvalError;
use crate::target::TargetOutput;

/// Everything one evaluation observed.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
  /// The requested target and kit.
  pub root: EvalKey,
  pub output: TargetOutput,
  /// Keys in completion order; dependencies finish before their dependents.
  pub order: Vec<EvalKey>,
  /// Caller to callee edges, each recorded once.
  pub edges: Vec<(EvalKey, EvalKey)>,
  pub scheduled: Vec<ScheduledRun>,
  /// How many target bodies ran.
  pub body_runs: usize,
}

impl EvaluationReport {
  /// The discovered dependency graph, with edges from dependency to dependent.
  pub fn graph(&self) -> DiGraph<EvalKey, ()> {
    let mut graph = DiGraph::new();
    let mut nodes: HashMap<&EvalKey, NodeIndex> = HashMap::new();
    for key in &self.order {
      nodes.insert(key, graph.add_node(key.clone()));
    }
    for (caller, callee) in &self.edges {
      if let (Some(&from), Some(&to)) = (nodes.get(callee), nodes.get(caller)) {
        graph.add_edge(from, to, ());
      }
    }
    graph
  }

  /// Evaluated keys ordered so that every dependency precedes its dependents.
  pub fn dependency_order(&self) -> Result<Vec<EvalKey>, EvalError> {
    let graph = self.graph();
    let sorted = toposort(&graph, None).map_err(|cycle| EvalError::CyclicDependency {
      chain: vec![graph[cycle.node_id()].to_string()],
    })?;
    Ok(sorted.into_iter().map(|idx| graph[idx].clone()).collect())
  }

  /// Group evaluated keys into levels: each level depends only on earlier ones.
  pub fn waves(&self) -> Vec<Vec<EvalKey>> {
    let graph = self.graph();
    let mut level: HashMap<NodeIndex, usize> = HashMap::new();
    let Ok(sorted) = toposort(&graph, None) else {
      return Vec::new();
    };
    let mut waves: Vec<Vec<EvalKey>> = Vec::new();
    for idx in sorted {
      let depth = graph
        .neighbors_directed(idx, Direction::Incoming)
        .filter_map(|dep| level.get(&dep))
        .map(|l| l + 1)
        .max()
        .unwrap_or(0);
      level.insert(idx, depth);
      if waves.len() <= depth {
        waves.resize_with(depth + 1, Vec::new);
      }
      waves[depth].push(graph[idx].clone());
    }
    waves
  }

  /// Render the dependency graph in Graphviz DOT.
  pub fn to_dot(&self) -> String {
    let mut out = String::from("digraph targets {\n");
    for key in &self.order {
      let _ = writeln!(out, "  \"{}\";", key);
    }
    for (caller, callee) in &self.edges {
      let _ = writeln!(out, "  \"{}\" -> \"{}\";", caller, callee);
    }
    out.push_str("}\n");
    out
  }
}
