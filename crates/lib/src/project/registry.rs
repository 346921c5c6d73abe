use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::debug;

use super::Project;
use crate::error::EvalError;

enum Entry {
  Loading,
  Loaded(Rc<Project>),
}

/// Loads each project file at most once per invocation.
///
/// Keys are canonical file paths, so a project reached through two different
/// relative paths is still the same project.
#[derive(Default)]
pub struct ProjectRegistry {
  entries: HashMap<PathBuf, Entry>,
  stack: Vec<PathBuf>,
}

impl ProjectRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Start loading `file`. Returns the project if it was loaded before.
  pub fn begin(&mut self, file: &Path) -> Result<Option<Rc<Project>>, EvalError> {
    match self.entries.get(file) {
      Some(Entry::Loaded(project)) => {
        debug!(file = %file.display(), "project already loaded");
        Ok(Some(project.clone()))
      }
      Some(Entry::Loading) => {
        let mut chain: Vec<String> = self.stack.iter().map(|p| p.display().to_string()).collect();
        chain.push(file.display().to_string());
        Err(EvalError::Definition {
          origin: file.display().to_string(),
          message: format!("cyclic subproject reference: {}", chain.join(" -> ")),
        })
      }
      None => {
        self.entries.insert(file.to_path_buf(), Entry::Loading);
        self.stack.push(file.to_path_buf());
        Ok(None)
      }
    }
  }

  pub fn finish(&mut self, file: &Path, project: Rc<Project>) {
    self.stack.retain(|p| p != file);
    self.entries.insert(file.to_path_buf(), Entry::Loaded(project));
  }

  /// Forget a load that failed.
  pub fn abandon(&mut self, file: &Path) {
    self.stack.retain(|p| p != file);
    self.entries.remove(file);
  }

  pub fn len(&self) -> usize {
    self
      .entries
      .values()
      .filter(|e| matches!(e, Entry::Loaded(_)))
      .count()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}
