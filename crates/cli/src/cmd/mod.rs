mod build;
mod config;
mod graph;
mod kit;
mod targets;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use tracing::debug;

use rig_lib::config::ConfigOverrides;
use rig_lib::consts::{CONFIG_FILE_ENV, DEFAULT_TARGET, OUT_DIR_ENV, PROJECT_FILE};
use rig_lib::kit::Kit;
use rig_lib::lua::loader::project_file;
use rig_lib::workspace::Workspace;

pub use build::cmd_build;
pub use config::cmd_config;
pub use graph::cmd_graph;
pub use kit::cmd_kit;
pub use targets::cmd_targets;

/// Where the project lives and how it is configured.
#[derive(Args, Debug)]
pub struct ProjectArgs {
  /// Configuration overrides
  #[arg(value_name = "NAME=VALUE")]
  pub assignments: Vec<String>,

  /// Project file, or a directory holding make.lua
  #[arg(short, long, default_value = PROJECT_FILE)]
  pub file: PathBuf,

  /// JSON file of configuration overrides; NAME=VALUE arguments take precedence
  #[arg(long, env = CONFIG_FILE_ENV)]
  pub config: Option<PathBuf>,
}

impl ProjectArgs {
  /// The project file, canonicalized.
  pub fn project_file(&self) -> Result<PathBuf> {
    Ok(project_file(&self.file)?)
  }

  pub fn overrides(&self) -> Result<ConfigOverrides> {
    overrides(self.config.as_deref(), &self.assignments)
  }

  pub fn load(&self) -> Result<Workspace> {
    Ok(Workspace::load(&self.file, self.overrides()?)?)
  }
}

fn overrides(config: Option<&Path>, assignments: &[String]) -> Result<ConfigOverrides> {
  let mut overrides = match config {
    Some(path) => {
      debug!(path = %path.display(), "reading configuration file");
      ConfigOverrides::from_json_file(path)?
    }
    None => ConfigOverrides::new(),
  };
  for assignment in assignments {
    overrides.parse_assignment(assignment)?;
  }
  Ok(overrides)
}

#[derive(Args, Debug)]
pub struct BuildArgs {
  /// Target to evaluate: NAME or PROJECT:NAME
  pub target: Option<String>,

  #[command(flatten)]
  pub project: ProjectArgs,

  /// Kit to evaluate for, e.g. linux:gpp=7.0 (repeatable; default: the host kit)
  #[arg(long = "kit", value_name = "KIT")]
  pub kits: Vec<String>,

  /// Directory receiving planned artifacts
  #[arg(long, env = OUT_DIR_ENV)]
  pub out_dir: Option<PathBuf>,

  /// Print JSON instead of text
  #[arg(long)]
  pub json: bool,

  /// Maximum number of scheduled processes running at once
  #[arg(short, long)]
  pub jobs: Option<usize>,
}

impl BuildArgs {
  /// The requested target and the overrides. A first positional that looks
  /// like an assignment is one.
  pub fn request(&self) -> Result<(String, ConfigOverrides)> {
    let mut assignments = self.project.assignments.clone();
    let target = match &self.target {
      Some(target) if target.contains('=') => {
        assignments.insert(0, target.clone());
        DEFAULT_TARGET.to_string()
      }
      Some(target) => target.clone(),
      None => DEFAULT_TARGET.to_string(),
    };
    Ok((target, overrides(self.project.config.as_deref(), &assignments)?))
  }

  pub fn kits(&self) -> Result<Vec<Kit>> {
    if self.kits.is_empty() {
      return Ok(vec![parse_kit(None)?]);
    }
    self.kits.iter().map(|spec| parse_kit(Some(spec))).collect()
  }
}

/// Parse a kit description, or detect the host kit.
pub fn parse_kit(spec: Option<&str>) -> Result<Kit> {
  match spec {
    Some(spec) => spec.parse().with_context(|| format!("Invalid kit: {}", spec)),
    None => Kit::detect().context("Failed to detect the host kit"),
  }
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum GraphFormat {
  /// Graphviz dot
  #[default]
  Dot,
  /// Evaluation waves, each depending only on earlier ones
  Waves,
  /// One target per line, dependencies first
  Order,
}
