//! Filesystem glob expansion.

use std::path::{Path, PathBuf};

use tracing::trace;

use crate::error::EvalError;

/// Expands glob patterns into matching paths.
pub trait Globber {
  /// Matching paths, sorted. An empty result is not an error here.
  fn glob(&self, pattern: &Path) -> Result<Vec<PathBuf>, EvalError>;
}

/// Expand `pattern`. With `required`, an empty match is a `GlobError`.
pub fn expand(globber: &dyn Globber, pattern: &Path, required: bool) -> Result<Vec<PathBuf>, EvalError> {
  let matches = globber.glob(pattern)?;
  if required && matches.is_empty() {
    return Err(EvalError::Glob {
      pattern: pattern.display().to_string(),
      message: "pattern matched no files".to_string(),
    });
  }
  Ok(matches)
}

/// Globs against the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsGlobber;

impl Globber for FsGlobber {
  fn glob(&self, pattern: &Path) -> Result<Vec<PathBuf>, EvalError> {
    let text = pattern.to_string_lossy();
    let err = |message: String| EvalError::Glob {
      pattern: text.to_string(),
      message,
    };
    let paths = ::glob::glob(&text).map_err(|e| err(e.to_string()))?;
    let mut matches = Vec::new();
    for entry in paths {
      let path = entry.map_err(|e| err(e.to_string()))?;
      if path.is_file() {
        matches.push(path);
      }
    }
    matches.sort();
    trace!(pattern = %text, count = matches.len(), "expanded glob");
    Ok(matches)
  }
}
