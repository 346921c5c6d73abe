//! Loading `make.lua` project files.
//!
//! Each file runs once, in its own environment table whose metatable falls
//! back to the shared globals. Running the file only *declares* things: the
//! project name, configuration variables, subprojects and targets. Target
//! functions are kept and become [`TargetBody`] closures, called later by the
//! evaluator.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use mlua::prelude::*;
use tracing::{debug, info};

use super::convert::{eval_error, lua_to_artifact, lua_to_output, lua_to_value, resolve_path, value_to_lua};
use super::{LuaKit, LuaProcess, LuaProjectHandle, LuaProperties};
use crate::config::{ConfigStore, ConfigVariable, Value};
use crate::consts::PROJECT_FILE;
use crate::error::EvalError;
use crate::eval::GraphEvaluator;
use crate::project::{Project, ProjectRegistry};
use crate::properties::Artifact;
use crate::target::{ProcessHandle, TargetBody};

/// Shared state for loading one tree of project files.
#[derive(Clone)]
pub struct Loader {
  config: Rc<RefCell<ConfigStore>>,
  registry: Rc<RefCell<ProjectRegistry>>,
}

/// What a project file declared while it ran.
#[derive(Default)]
struct Declared {
  name: Option<String>,
  handle: Option<LuaProjectHandle>,
  targets: Vec<(String, Option<String>, LuaFunction)>,
  subprojects: Vec<Rc<Project>>,
}

/// Canonical path of the project file named by `path` (a file or a directory).
pub fn project_file(path: &Path) -> Result<PathBuf, EvalError> {
  let unreadable = |e: std::io::Error| EvalError::Definition {
    origin: path.display().to_string(),
    message: format!("cannot find project file: {}", e),
  };
  let path = dunce::canonicalize(path).map_err(unreadable)?;
  if path.is_dir() {
    return dunce::canonicalize(path.join(PROJECT_FILE)).map_err(unreadable);
  }
  Ok(path)
}

impl Loader {
  pub fn new(config: Rc<RefCell<ConfigStore>>) -> Self {
    Self {
      config,
      registry: Rc::new(RefCell::new(ProjectRegistry::new())),
    }
  }

  /// Load the project at `path`, or return it if this loader already did.
  pub fn load(&self, lua: &Lua, path: &Path) -> Result<Rc<Project>, EvalError> {
    let file = project_file(path)?;
    if let Some(project) = self.registry.borrow_mut().begin(&file)? {
      return Ok(project);
    }
    match self.run_file(lua, &file) {
      Ok(project) => {
        self.registry.borrow_mut().finish(&file, project.clone());
        Ok(project)
      }
      Err(err) => {
        self.registry.borrow_mut().abandon(&file);
        Err(err)
      }
    }
  }

  fn run_file(&self, lua: &Lua, file: &Path) -> Result<Rc<Project>, EvalError> {
    info!(file = %file.display(), "loading project file");
    let origin = file.display().to_string();
    let content = std::fs::read_to_string(file).map_err(|e| EvalError::Definition {
      origin: origin.clone(),
      message: format!("cannot read project file: {}", e),
    })?;
    let here = file.parent().unwrap_or(Path::new("")).to_path_buf();

    let declared = Rc::new(RefCell::new(Declared::default()));
    let env = self
      .environment(lua, &here, declared.clone())
      .map_err(|e| eval_error(&e))?;

    lua
      .load(&content)
      .set_name(format!("@{}", file.display()))
      .set_environment(env)
      .exec()
      .map_err(|e| eval_error(&e))?;

    let declared = declared.take();
    let name = declared.name.ok_or_else(|| EvalError::Definition {
      origin: origin.clone(),
      message: "project file never calls project(name)".to_string(),
    })?;

    let mut builder = Project::builder(name.clone(), here).file(file);
    for subproject in declared.subprojects {
      builder = builder.subproject(subproject);
    }
    let count = declared.targets.len();
    for (target, description, func) in declared.targets {
      builder = builder.target_with(target, description, target_body(func))?;
    }
    debug!(project = %name, targets = count, "loaded project");
    Ok(builder.build())
  }

  fn environment(&self, lua: &Lua, here: &Path, declared: Rc<RefCell<Declared>>) -> LuaResult<LuaTable> {
    let env = lua.create_table()?;
    let mt = lua.create_table()?;
    mt.set("__index", lua.globals())?;
    env.set_metatable(Some(mt))?;

    env.set("here", here.to_string_lossy().to_string())?;

    let root = here.to_path_buf();
    env.set(
      "path",
      lua.create_function(move |_, segments: LuaMultiValue| {
        let mut path = root.clone();
        for segment in segments {
          path = resolve_path(&path, &string_arg(segment, "path segment")?);
        }
        Ok(path.to_string_lossy().to_string())
      })?,
    )?;

    let state = declared.clone();
    let project_env = env.clone();
    let origin = here.display().to_string();
    env.set(
      "project",
      lua.create_function(move |_, name: String| {
        let mut state = state.borrow_mut();
        if let Some(existing) = &state.name {
          return Err(
            EvalError::Definition {
              origin: origin.clone(),
              message: format!("project is already named '{}', cannot rename it to '{}'", existing, name),
            }
            .into_lua_err(),
          );
        }
        let handle = LuaProjectHandle::new(&name);
        project_env.raw_set("targets", handle.clone())?;
        state.name = Some(name);
        state.handle = Some(handle.clone());
        Ok(handle)
      })?,
    )?;

    let config = self.config.clone();
    env.set(
      "cfgvar",
      lua.create_function(move |lua, (name, opts): (String, LuaValue)| cfgvar(lua, &config, name, opts))?,
    )?;

    let loader = self.clone();
    let state = declared.clone();
    let root = here.to_path_buf();
    env.set(
      "subproject",
      lua.create_function(move |lua, path: LuaValue| {
        let path = resolve_path(&root, &string_arg(path, "subproject path")?);
        let project = loader.load(lua, &path).into_lua_err()?;
        let handle = LuaProjectHandle::new(project.name());
        handle
          .targets
          .borrow_mut()
          .extend(project.targets().iter().map(|t| t.id.name.clone()));
        state.borrow_mut().subprojects.push(project);
        Ok(handle)
      })?,
    )?;

    let state = declared;
    let target_env = env.clone();
    let origin = here.display().to_string();
    env.set(
      "target",
      lua.create_function(
        move |lua, (name, func, description): (String, LuaFunction, Option<String>)| {
          let mut state = state.borrow_mut();
          let Some(handle) = state.handle.clone() else {
            return Err(
              EvalError::Definition {
                origin: origin.clone(),
                message: format!("target '{}' is declared before project(name)", name),
              }
              .into_lua_err(),
            );
          };
          if state.targets.iter().any(|(existing, _, _)| *existing == name) {
            return Err(
              EvalError::Definition {
                origin: handle.name.clone(),
                message: format!("target '{}' is declared twice", name),
              }
              .into_lua_err(),
            );
          }
          handle.targets.borrow_mut().insert(name.clone());
          state.targets.push((name.clone(), description, func));

          let target = handle.target(&name).into_lua_err()?;
          // Bare names resolve to targets unless they would shadow a builtin.
          if target_env.raw_get::<LuaValue>(name.as_str())?.is_nil() && !lua.globals().contains_key(name.as_str())? {
            target_env.raw_set(name.as_str(), target.clone())?;
          }
          Ok(target)
        },
      )?,
    )?;

    let root = here.to_path_buf();
    env.set(
      "properties",
      lua.create_function(move |_, table: Option<LuaTable>| match table {
        Some(table) => LuaProperties::from_table(table, root.clone()),
        None => Ok(LuaProperties::new(Default::default(), root.clone())),
      })?,
    )?;

    let root = here.to_path_buf();
    env.set(
      "process",
      lua.create_function(move |lua, (exe, opts): (LuaValue, Option<LuaTable>)| {
        process(lua, &root, exe, opts)
      })?,
    )?;

    let root = here.to_path_buf();
    env.set(
      "glob",
      lua.create_function(move |lua, (pattern, opts): (LuaValue, Option<LuaTable>)| {
        let optional = match opts {
          Some(opts) => opts.get::<Option<bool>>("optional")?.unwrap_or(false),
          None => false,
        };
        let pattern = resolve_path(&root, &string_arg(pattern, "glob pattern")?);
        let Some(evaluator) = lua.app_data_ref::<GraphEvaluator>().map(|e| (*e).clone()) else {
          return Err(
            EvalError::Glob {
              pattern: pattern.display().to_string(),
              message: "glob can only be used while a target is evaluating".to_string(),
            }
            .into_lua_err(),
          );
        };
        let matches =
          crate::glob::expand(evaluator.context().globber.as_ref(), &pattern, !optional).into_lua_err()?;
        Ok(
          matches
            .iter()
            .map(|p| p.to_string_lossy().to_string())
            .collect::<Vec<_>>(),
        )
      })?,
    )?;

    Ok(env)
  }
}

fn target_body(func: LuaFunction) -> TargetBody {
  Rc::new(move |scope, kit| {
    let value: LuaValue = func
      .call(LuaKit::new(kit.clone(), scope.clone()))
      .map_err(|e| eval_error(&e))?;
    lua_to_output(value)
  })
}

fn string_arg(value: LuaValue, what: &str) -> LuaResult<String> {
  match value {
    LuaValue::String(s) => Ok(s.to_str()?.to_string()),
    other => Err(
      EvalError::InvalidValue {
        message: format!("{} must be a string, got a {}", what, other.type_name()),
      }
      .into_lua_err(),
    ),
  }
}

/// `cfgvar(name, opts)`: define a variable and return its resolved value.
///
/// A required variable with no default and no override fails right here.
///
/// `opts` is either an alias string or a table with `alias`, `aliases`,
/// `default`, `optional` and `description`.
fn cfgvar(lua: &Lua, config: &RefCell<ConfigStore>, name: String, opts: LuaValue) -> LuaResult<LuaValue> {
  let mut variable = ConfigVariable::new(&name);
  match opts {
    LuaValue::Nil => {}
    LuaValue::String(alias) => variable = variable.alias(alias.to_str()?.to_string()),
    LuaValue::Table(opts) => {
      if let Some(alias) = opts.get::<Option<String>>("alias")? {
        variable = variable.alias(alias);
      }
      if let Some(aliases) = opts.get::<Option<Vec<String>>>("aliases")? {
        for alias in aliases {
          variable = variable.alias(alias);
        }
      }
      let default: LuaValue = opts.get("default")?;
      if !default.is_nil() {
        variable = variable.default(lua_to_value(default)?);
      } else if opts.get::<Option<bool>>("optional")?.unwrap_or(false) {
        variable = variable.default(Value::Null);
      }
      if let Some(description) = opts.get::<Option<String>>("description")? {
        variable = variable.description(description);
      }
    }
    other => {
      return Err(
        EvalError::InvalidValue {
          message: format!("cfgvar options must be a string or a table, got a {}", other.type_name()),
        }
        .into_lua_err(),
      );
    }
  }

  let mut config = config.borrow_mut();
  config.define(variable);
  let value = config.resolve(&name).into_lua_err()?;
  value_to_lua(lua, &value)
}

/// `process(exe, opts)`: describe a process to run later.
///
/// `exe` is an executable artifact (or a one-element array holding one), an
/// existing process, or a program path.
fn process(lua: &Lua, root: &Path, exe: LuaValue, opts: Option<LuaTable>) -> LuaResult<LuaProcess> {
  let not_executable = || {
    EvalError::InvalidValue {
      message: "process() expects an executable".to_string(),
    }
    .into_lua_err()
  };
  let mut handle = match exe {
    LuaValue::Table(table) => match lua_to_artifact(&table)? {
      Some(Artifact::Executable(exe)) => ProcessHandle::new(exe.name, exe.path),
      Some(_) => return Err(not_executable()),
      None if table.raw_len() == 1 => return process(lua, root, table.raw_get(1)?, opts),
      None => return Err(not_executable()),
    },
    LuaValue::UserData(ud) if ud.is::<LuaProcess>() => ud.borrow::<LuaProcess>()?.handle.clone(),
    other => {
      let program = resolve_path(root, &string_arg(other, "process program")?);
      let name = program
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
      ProcessHandle::new(name, program)
    }
  };

  if let Some(opts) = opts {
    if let Some(name) = opts.get::<Option<String>>("name")? {
      handle.name = name;
    }
    if let Some(args) = opts.get::<Option<Vec<String>>>("args")? {
      handle.args = args;
    }
    if let Some(cwd) = opts.get::<Option<String>>("cwd")? {
      handle.cwd = Some(resolve_path(root, &cwd));
    }
    let env: LuaValue = opts.get("env")?;
    if !env.is_nil() {
      handle.env = lua.from_value::<BTreeMap<String, String>>(env)?;
    }
  }
  Ok(LuaProcess { handle })
}
