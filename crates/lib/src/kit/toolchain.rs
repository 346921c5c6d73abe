use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EvalError;

/// Known C++ toolchains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolchainId {
  Gpp,
  Clang,
  Mscl,
}

/// Command-line conventions shared by a group of toolchains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
  Gnu,
  Msvc,
}

impl ToolchainId {
  /// Order in which a kit picks its default C++ toolchain.
  pub const PREFERENCE: [ToolchainId; 3] = [ToolchainId::Gpp, ToolchainId::Clang, ToolchainId::Mscl];

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Gpp => "gpp",
      Self::Clang => "clang",
      Self::Mscl => "mscl",
    }
  }

  pub fn family(&self) -> Family {
    match self {
      Self::Gpp | Self::Clang => Family::Gnu,
      Self::Mscl => Family::Msvc,
    }
  }

  /// Compiler driver executable.
  pub fn driver(&self) -> &'static str {
    match self {
      Self::Gpp => "g++",
      Self::Clang => "clang++",
      Self::Mscl => "cl",
    }
  }
}

impl fmt::Display for ToolchainId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for ToolchainId {
  type Err = EvalError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "gpp" | "g++" | "gcc" => Ok(Self::Gpp),
      "clang" | "clang++" => Ok(Self::Clang),
      "mscl" | "msvc" | "cl" => Ok(Self::Mscl),
      other => Err(EvalError::InvalidValue {
        message: format!("unknown toolchain '{}'", other),
      }),
    }
  }
}

/// A `major.minor` toolchain version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version {
  pub major: u32,
  pub minor: u32,
}

impl Version {
  pub fn new(major: u32, minor: u32) -> Self {
    Self { major, minor }
  }
}

impl fmt::Display for Version {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{}", self.major, self.minor)
  }
}

impl FromStr for Version {
  type Err = EvalError;

  /// Accepts `7`, `7.0` and longer forms like `4.2.1` (extra components are ignored).
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let invalid = || EvalError::InvalidValue {
      message: format!("invalid toolchain version '{}'", s),
    };
    let mut parts = s.trim().split('.');
    let major = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
    let minor = match parts.next() {
      Some(p) => p.parse().map_err(|_| invalid())?,
      None => 0,
    };
    Ok(Self { major, minor })
  }
}

/// A toolchain installed in a kit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Toolchain {
  pub id: ToolchainId,
  pub version: Version,
}

impl fmt::Display for Toolchain {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}={}", self.id, self.version)
  }
}
