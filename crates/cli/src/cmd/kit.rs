use std::process::ExitCode;

use anyhow::Result;

use super::parse_kit;
use crate::output::{print_json, print_stat};

pub fn cmd_kit(spec: Option<&str>, json: bool) -> Result<ExitCode> {
  let kit = parse_kit(spec)?;
  let toolchains: Vec<String> = kit
    .installed()
    .into_iter()
    .filter_map(|id| kit.version(id).map(|v| format!("{}={}", id, v)))
    .collect();
  let cpp = kit.cpp().ok().map(|t| t.to_string());

  if json {
    print_json(&serde_json::json!({
      "kit": kit.to_string(),
      "platform": kit.platform(),
      "toolchains": toolchains,
      "cpp": cpp,
      "fingerprint": kit.fingerprint(),
    }))?;
    return Ok(ExitCode::SUCCESS);
  }

  print_stat("Kit", &kit.to_string());
  print_stat("Platform", kit.platform().as_str());
  print_stat(
    "Toolchains",
    &if toolchains.is_empty() {
      "none".to_string()
    } else {
      toolchains.join(", ")
    },
  );
  print_stat("C++", cpp.as_deref().unwrap_or("none"));
  print_stat("Fingerprint", &kit.fingerprint());
  Ok(ExitCode::SUCCESS)
}
