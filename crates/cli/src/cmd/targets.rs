use std::process::ExitCode;

use anyhow::Result;
use owo_colors::{OwoColorize, Stream};

use super::ProjectArgs;
use crate::output::print_json;

pub fn cmd_targets(project: &ProjectArgs, json: bool) -> Result<ExitCode> {
  let workspace = project.load()?;
  let graph = workspace.graph();

  if json {
    let projects: Vec<_> = graph
      .projects()
      .map(|p| {
        let targets: Vec<_> = p
          .targets()
          .iter()
          .map(|t| serde_json::json!({ "name": t.id.name, "description": t.description }))
          .collect();
        serde_json::json!({
          "name": p.name(),
          "root": p.root(),
          "is_root": p.name() == graph.root().name(),
          "targets": targets,
        })
      })
      .collect();
    print_json(&projects)?;
    return Ok(ExitCode::SUCCESS);
  }

  for p in graph.projects() {
    println!(
      "{} {}",
      p.name().if_supports_color(Stream::Stdout, |s| s.bold()),
      format!("({})", p.root().display()).if_supports_color(Stream::Stdout, |s| s.dimmed())
    );
    let width = p.targets().iter().map(|t| t.id.name.len()).max().unwrap_or(0);
    for target in p.targets() {
      match &target.description {
        Some(description) => println!("  {:width$}  {}", target.id.name, description, width = width),
        None => println!("  {}", target.id.name),
      }
    }
  }
  Ok(ExitCode::SUCCESS)
}
