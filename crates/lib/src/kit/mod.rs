//! Build kits.
//!
//! A [`Kit`] is the immutable context a target is evaluated in: the target
//! platform, the toolchains installed and their versions, and which toolchain
//! builds C++. Kits compare and hash by value, so two kits that differ only in
//! a toolchain version are distinct memoization keys.
//!
//! Kits have a text form used on the command line:
//!
//! ```text
//! linux:gpp=7.0,clang=14.0;cpp=clang
//! ```

mod detect;
pub mod flags;
mod platform;
mod toolchain;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::info;

pub use flags::{Expanded, expand_flags};
pub use platform::Platform;
pub use toolchain::{Family, Toolchain, ToolchainId, Version};

use crate::consts::FINGERPRINT_LEN;
use crate::error::EvalError;
use crate::util::hash::short_hash;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Kit {
  platform: Platform,
  toolchains: BTreeMap<ToolchainId, Version>,
  cpp: Option<ToolchainId>,
}

impl Kit {
  pub fn builder(platform: Platform) -> KitBuilder {
    KitBuilder {
      platform,
      toolchains: BTreeMap::new(),
      cpp: None,
    }
  }

  /// Describe the host: current platform plus every toolchain that answers a version probe.
  pub fn detect() -> Result<Kit, EvalError> {
    let platform = Platform::current().ok_or_else(|| EvalError::InvalidValue {
      message: format!("unsupported host platform '{}'", std::env::consts::OS),
    })?;
    let mut builder = Kit::builder(platform);
    for id in ToolchainId::PREFERENCE {
      if let Some(version) = detect::probe(id) {
        builder = builder.toolchain(id, version);
      }
    }
    let kit = builder.build()?;
    info!(kit = %kit, "detected host kit");
    Ok(kit)
  }

  pub fn platform(&self) -> Platform {
    self.platform
  }

  /// Installed toolchains, in preference order.
  pub fn installed(&self) -> Vec<ToolchainId> {
    ToolchainId::PREFERENCE
      .into_iter()
      .filter(|id| self.toolchains.contains_key(id))
      .collect()
  }

  pub fn has(&self, id: ToolchainId) -> bool {
    self.toolchains.contains_key(&id)
  }

  pub fn version(&self, id: ToolchainId) -> Option<Version> {
    self.toolchains.get(&id).copied()
  }

  pub fn require(&self, id: ToolchainId) -> Result<Toolchain, EvalError> {
    self
      .version(id)
      .map(|version| Toolchain { id, version })
      .ok_or_else(|| EvalError::ToolchainUnavailable {
        toolchain: id.to_string(),
      })
  }

  /// The toolchain selected for C++.
  pub fn cpp(&self) -> Result<Toolchain, EvalError> {
    match self.cpp {
      Some(id) => self.require(id),
      None => Err(EvalError::ToolchainUnavailable {
        toolchain: "cpp".to_string(),
      }),
    }
  }

  /// Short stable identifier, used to separate per-kit output directories.
  pub fn fingerprint(&self) -> String {
    short_hash(self.to_string().as_bytes(), FINGERPRINT_LEN)
  }
}

impl fmt::Display for Kit {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:", self.platform)?;
    let toolchains: Vec<String> = self
      .toolchains
      .iter()
      .map(|(id, version)| format!("{}={}", id, version))
      .collect();
    write!(f, "{}", toolchains.join(","))?;
    let default_cpp = self.installed().first().copied();
    if let Some(cpp) = self.cpp
      && Some(cpp) != default_cpp
    {
      write!(f, ";cpp={}", cpp)?;
    }
    Ok(())
  }
}

impl FromStr for Kit {
  type Err = EvalError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let invalid = |why: &str| EvalError::InvalidValue {
      message: format!("invalid kit '{}': {}", s, why),
    };
    let (main, options) = match s.split_once(';') {
      Some((main, options)) => (main, Some(options)),
      None => (s, None),
    };
    let (platform, toolchains) = main.split_once(':').unwrap_or((main, ""));
    let mut builder = Kit::builder(platform.trim().parse()?);
    for entry in toolchains.split(',').map(str::trim).filter(|e| !e.is_empty()) {
      let (id, version) = entry
        .split_once('=')
        .ok_or_else(|| invalid("toolchains are written as name=version"))?;
      builder = builder.toolchain(id.trim().parse()?, version.parse()?);
    }
    if let Some(options) = options {
      for option in options.split(';').map(str::trim).filter(|o| !o.is_empty()) {
        match option.split_once('=') {
          Some(("cpp", id)) => builder = builder.cpp(id.trim().parse()?),
          _ => return Err(invalid(&format!("unknown option '{}'", option))),
        }
      }
    }
    builder.build()
  }
}

pub struct KitBuilder {
  platform: Platform,
  toolchains: BTreeMap<ToolchainId, Version>,
  cpp: Option<ToolchainId>,
}

impl KitBuilder {
  pub fn toolchain(mut self, id: ToolchainId, version: Version) -> Self {
    self.toolchains.insert(id, version);
    self
  }

  pub fn cpp(mut self, id: ToolchainId) -> Self {
    self.cpp = Some(id);
    self
  }

  /// Finish the kit. Without an explicit choice the C++ toolchain is the first
  /// installed one in preference order.
  pub fn build(self) -> Result<Kit, EvalError> {
    let cpp = match self.cpp {
      Some(id) if !self.toolchains.contains_key(&id) => {
        return Err(EvalError::InvalidValue {
          message: format!("cpp toolchain '{}' is not installed in the kit", id),
        });
      }
      Some(id) => Some(id),
      None => ToolchainId::PREFERENCE
        .into_iter()
        .find(|id| self.toolchains.contains_key(id)),
    };
    Ok(Kit {
      platform: self.platform,
      toolchains: self.toolchains,
      cpp,
    })
  }
}
