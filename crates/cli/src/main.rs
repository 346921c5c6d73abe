mod cmd;
mod output;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd::{BuildArgs, GraphFormat, ProjectArgs};

/// rig - evaluate make.lua build graphs
#[derive(Parser)]
#[command(name = "rig")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug logging
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Evaluate a target and plan its build steps
  Build {
    #[command(flatten)]
    args: BuildArgs,

    /// Run the tests and processes the evaluation scheduled
    #[arg(long)]
    run: bool,
  },

  /// Evaluate a target, then run everything it scheduled
  Run {
    #[command(flatten)]
    args: BuildArgs,
  },

  /// List the targets of every loaded project
  Targets {
    #[command(flatten)]
    project: ProjectArgs,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
  },

  /// List configuration variables and how they resolved
  Config {
    #[command(flatten)]
    project: ProjectArgs,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
  },

  /// Show the host kit, or the kit described by --kit
  Kit {
    /// Kit description, e.g. linux:gpp=7.0
    #[arg(long)]
    kit: Option<String>,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
  },

  /// Print the dependency graph discovered while evaluating a target
  Graph {
    /// Target to evaluate: NAME or PROJECT:NAME
    #[arg(default_value = rig_lib::consts::DEFAULT_TARGET)]
    target: String,

    #[command(flatten)]
    project: ProjectArgs,

    /// Kit description, e.g. linux:gpp=7.0 (default: the host kit)
    #[arg(long)]
    kit: Option<String>,

    #[arg(long, value_enum, default_value_t)]
    format: GraphFormat,
  },
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let filter = if cli.verbose {
    EnvFilter::new("debug")
  } else {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
  };
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let result = match cli.command {
    Commands::Build { args, run } => cmd::cmd_build(&args, run, cli.verbose),
    Commands::Run { args } => cmd::cmd_build(&args, true, cli.verbose),
    Commands::Targets { project, json } => cmd::cmd_targets(&project, json),
    Commands::Config { project, json } => cmd::cmd_config(&project, json),
    Commands::Kit { kit, json } => cmd::cmd_kit(kit.as_deref(), json),
    Commands::Graph {
      target,
      project,
      kit,
      format,
    } => cmd::cmd_graph(&target, &project, kit.as_deref(), format),
  };

  match result {
    Ok(code) => code,
    Err(err) => {
      output::print_failure(&err);
      ExitCode::FAILURE
    }
  }
}
