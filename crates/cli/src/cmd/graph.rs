use std::path::Path;
use std::process::ExitCode;
use std::rc::Rc;

use anyhow::Result;

use rig_lib::backend::PlanBackend;
use rig_lib::workspace::resolve_out_dir;

use super::{GraphFormat, ProjectArgs, parse_kit};

pub fn cmd_graph(target: &str, project: &ProjectArgs, kit: Option<&str>, format: GraphFormat) -> Result<ExitCode> {
  let kit = parse_kit(kit)?;
  let file = project.project_file()?;
  let workspace = project.load()?;
  let out_dir = resolve_out_dir(None, file.parent().unwrap_or(Path::new(".")));
  let report = workspace.evaluate(target, &kit, Rc::new(PlanBackend::new(out_dir)))?;

  match format {
    GraphFormat::Dot => print!("{}", report.to_dot()),
    GraphFormat::Waves => {
      for (index, wave) in report.waves().iter().enumerate() {
        println!("wave {}:", index + 1);
        for key in wave {
          println!("  {}", key);
        }
      }
    }
    GraphFormat::Order => {
      for key in report.dependency_order()? {
        println!("{}", key);
      }
    }
  }
  Ok(ExitCode::SUCCESS)
}
