use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryKind {
  Static,
  Shared,
}

/// A library produced by a target or named by a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LibraryRef {
  pub name: String,
  pub path: PathBuf,
  pub kind: LibraryKind,
}

/// A compiled object file and the source it came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
  pub path: PathBuf,
  pub source: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Executable {
  pub name: String,
  pub path: PathBuf,
}

/// Any file artifact a toolchain collaborator can produce.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Artifact {
  Library(LibraryRef),
  Object(ObjectRef),
  Executable(Executable),
}

impl Artifact {
  pub fn path(&self) -> &PathBuf {
    match self {
      Artifact::Library(l) => &l.path,
      Artifact::Object(o) => &o.path,
      Artifact::Executable(e) => &e.path,
    }
  }

  pub fn type_name(&self) -> &'static str {
    match self {
      Artifact::Library(_) => "Library",
      Artifact::Object(_) => "Object",
      Artifact::Executable(_) => "Executable",
    }
  }
}

impl fmt::Display for Artifact {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}({})", self.type_name(), self.path().display())
  }
}
