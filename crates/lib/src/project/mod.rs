//! Projects and the project graph.
//!
//! A [`Project`] owns its targets and the subprojects it depends on. Projects
//! are immutable once built; the [`ProjectGraph`] indexes every project
//! reachable from a root so that targets can be resolved by name.

mod registry;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::error::EvalError;
use crate::eval::Scope;
use crate::kit::Kit;
use crate::target::{TargetBody, TargetDef, TargetId, TargetOutput};

pub use registry::ProjectRegistry;

#[derive(Debug)]
pub struct Project {
  name: String,
  root: PathBuf,
  file: Option<PathBuf>,
  targets: Vec<TargetDef>,
  subprojects: Vec<Rc<Project>>,
}

impl Project {
  pub fn builder(name: impl Into<String>, root: impl Into<PathBuf>) -> ProjectBuilder {
    ProjectBuilder {
      project: Project {
        name: name.into(),
        root: root.into(),
        file: None,
        targets: Vec::new(),
        subprojects: Vec::new(),
      },
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// The project file this project was loaded from, if any.
  pub fn file(&self) -> Option<&Path> {
    self.file.as_deref()
  }

  /// Targets in declaration order.
  pub fn targets(&self) -> &[TargetDef] {
    &self.targets
  }

  pub fn subprojects(&self) -> &[Rc<Project>] {
    &self.subprojects
  }

  pub fn get(&self, name: &str) -> Option<&TargetDef> {
    self.targets.iter().find(|t| t.id.name == name)
  }

  /// Look up a target by name.
  pub fn target(&self, name: &str) -> Result<TargetId, EvalError> {
    self.get(name).map(|t| t.id.clone()).ok_or_else(|| EvalError::UnknownTarget {
      project: self.name.clone(),
      target: name.to_string(),
    })
  }

  fn origin(&self) -> String {
    match &self.file {
      Some(file) => file.display().to_string(),
      None => format!("project '{}'", self.name),
    }
  }
}

#[derive(Debug)]
pub struct ProjectBuilder {
  project: Project,
}

impl ProjectBuilder {
  pub fn file(mut self, file: impl Into<PathBuf>) -> Self {
    self.project.file = Some(file.into());
    self
  }

  pub fn subproject(mut self, project: Rc<Project>) -> Self {
    if !self.project.subprojects.iter().any(|p| Rc::ptr_eq(p, &project)) {
      self.project.subprojects.push(project);
    }
    self
  }

  /// Declare a target from a body.
  pub fn target<F>(self, name: impl Into<String>, body: F) -> Result<Self, EvalError>
  where
    F: Fn(&Scope, &Kit) -> Result<TargetOutput, EvalError> + 'static,
  {
    self.target_with(name, None, Rc::new(body))
  }

  pub fn target_with(
    mut self,
    name: impl Into<String>,
    description: Option<String>,
    body: TargetBody,
  ) -> Result<Self, EvalError> {
    let name = name.into();
    if self.project.get(&name).is_some() {
      return Err(EvalError::Definition {
        origin: self.project.origin(),
        message: format!("target '{}' is declared twice", name),
      });
    }
    self.project.targets.push(TargetDef {
      id: TargetId::new(self.project.name.clone(), name),
      description,
      body,
    });
    Ok(self)
  }

  pub fn build(self) -> Rc<Project> {
    Rc::new(self.project)
  }
}

/// Every project reachable from a root, indexed by name.
#[derive(Debug)]
pub struct ProjectGraph {
  root: Rc<Project>,
  projects: BTreeMap<String, Rc<Project>>,
}

impl ProjectGraph {
  pub fn new(root: Rc<Project>) -> Result<Self, EvalError> {
    let mut projects: BTreeMap<String, Rc<Project>> = BTreeMap::new();
    let mut pending = vec![root.clone()];
    while let Some(project) = pending.pop() {
      if let Some(existing) = projects.get(project.name()) {
        if Rc::ptr_eq(existing, &project) {
          continue;
        }
        if existing.root() != project.root() {
          return Err(EvalError::Definition {
            origin: project.origin(),
            message: format!(
              "project name '{}' is already used by the project at {}",
              project.name(),
              existing.root().display()
            ),
          });
        }
        continue;
      }
      pending.extend(project.subprojects().iter().cloned());
      projects.insert(project.name().to_string(), project);
    }
    Ok(Self { root, projects })
  }

  pub fn root(&self) -> &Rc<Project> {
    &self.root
  }

  pub fn projects(&self) -> impl Iterator<Item = &Rc<Project>> {
    self.projects.values()
  }

  pub fn project(&self, name: &str) -> Result<&Rc<Project>, EvalError> {
    self
      .projects
      .get(name)
      .ok_or_else(|| EvalError::UnknownProject { name: name.to_string() })
  }

  /// Resolve `name` (a target of the root project) or `project:name`.
  pub fn resolve(&self, request: &str) -> Result<TargetId, EvalError> {
    match request.split_once(':') {
      Some((project, name)) => self.project(project)?.target(name),
      None => self.root.target(request),
    }
  }
}
