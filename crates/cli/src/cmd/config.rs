use std::process::ExitCode;

use anyhow::Result;

use rig_lib::config::Resolution;

use super::ProjectArgs;
use crate::output::{print_json, print_stat, print_warning};

pub fn cmd_config(project: &ProjectArgs, json: bool) -> Result<ExitCode> {
  let workspace = project.load()?;
  let config = workspace.config();

  if json {
    let variables: Vec<_> = config
      .variables()
      .map(|v| serde_json::json!({ "variable": v, "resolution": config.resolution(&v.name) }))
      .collect();
    print_json(&serde_json::json!({
      "variables": variables,
      "unused_overrides": config.unused_overrides(),
    }))?;
    return Ok(ExitCode::SUCCESS);
  }

  for variable in config.variables() {
    let value = match config.resolution(&variable.name) {
      Some(Resolution::Override { key, value }) if *key == variable.name => format!("{}", value),
      Some(Resolution::Override { key, value }) => format!("{} (from {})", value, key),
      Some(Resolution::Default { value }) => format!("{} (default)", value),
      Some(Resolution::Missing) | None => "<missing>".to_string(),
    };
    print_stat(&variable.name, &value);
    if !variable.aliases.is_empty() {
      println!("      aliases: {}", variable.aliases.join(", "));
    }
    if let Some(description) = &variable.description {
      println!("      {}", description);
    }
  }
  for key in config.unused_overrides() {
    print_warning(&format!("Override '{}' does not match any configuration variable", key));
  }
  Ok(ExitCode::SUCCESS)
}
