//! Host toolchain detection.

use std::process::Command;

use tracing::{debug, trace};

use super::toolchain::{ToolchainId, Version};

/// Probe the host for one toolchain. Any failure to run it means "not installed".
pub fn probe(id: ToolchainId) -> Option<Version> {
  let version = match id {
    ToolchainId::Gpp => run(id.driver(), &["-dumpfullversion", "-dumpversion"]).and_then(|(out, _)| first_version(&out)),
    ToolchainId::Clang => run(id.driver(), &["-dumpversion"]).and_then(|(out, _)| first_version(&out)),
    // cl prints its banner on stderr and exits non-zero without input.
    ToolchainId::Mscl => run_any(id.driver(), &[]).and_then(|(_, err)| msvc_version(&err)),
  };
  debug!(toolchain = %id, version = ?version, "probed toolchain");
  version
}

fn run(program: &str, args: &[&str]) -> Option<(String, String)> {
  let output = Command::new(program).args(args).output().ok()?;
  if !output.status.success() {
    trace!(program, status = ?output.status, "probe exited unsuccessfully");
    return None;
  }
  Some((
    String::from_utf8_lossy(&output.stdout).into_owned(),
    String::from_utf8_lossy(&output.stderr).into_owned(),
  ))
}

fn run_any(program: &str, args: &[&str]) -> Option<(String, String)> {
  let output = Command::new(program).args(args).output().ok()?;
  Some((
    String::from_utf8_lossy(&output.stdout).into_owned(),
    String::from_utf8_lossy(&output.stderr).into_owned(),
  ))
}

fn first_version(text: &str) -> Option<Version> {
  text.split_whitespace().find_map(|word| word.parse().ok())
}

/// Extract `19.29` from `Microsoft (R) C/C++ Optimizing Compiler Version 19.29.30133 for x64`.
fn msvc_version(banner: &str) -> Option<Version> {
  let mut words = banner.split_whitespace();
  words.find(|w| *w == "Version")?;
  words.next()?.parse().ok()
}
