//! Userdata handed to project files: target and project handles and process
//! handles.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use mlua::prelude::*;

use super::LuaKit;
use super::convert::output_to_lua;
use crate::error::EvalError;
use crate::eval::GraphEvaluator;
use crate::target::{ProcessHandle, RunMode, TargetId};

/// A deferred process, returned by `process(...)`.
#[derive(Debug, Clone)]
pub struct LuaProcess {
  pub handle: ProcessHandle,
}

impl LuaProcess {
  fn schedule(lua: &Lua, handle: &ProcessHandle, mode: RunMode) -> LuaResult<()> {
    let Some(evaluator) = lua.app_data_ref::<GraphEvaluator>().map(|e| (*e).clone()) else {
      return Err(LuaError::external(format!(
        "cannot {} process '{}' outside of target evaluation",
        mode, handle.name
      )));
    };
    evaluator.schedule(handle.clone(), mode);
    Ok(())
  }
}

impl LuaUserData for LuaProcess {
  fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
    fields.add_field_method_get("name", |_, this| Ok(this.handle.name.clone()));
    fields.add_field_method_get("program", |_, this| Ok(this.handle.program.to_string_lossy().to_string()));
    fields.add_field_method_get("args", |_, this| Ok(this.handle.args.clone()));
  }

  fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
    methods.add_method("run", |lua, this, ()| {
      LuaProcess::schedule(lua, &this.handle, RunMode::Run)?;
      Ok(this.clone())
    });
    methods.add_method("test", |lua, this, ()| {
      LuaProcess::schedule(lua, &this.handle, RunMode::Test)?;
      Ok(this.clone())
    });
    methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| Ok(format!("process({})", this.handle)));
  }
}

/// A callable reference to a target: `handle(kit)` evaluates it.
#[derive(Debug, Clone)]
pub struct LuaTargetHandle {
  pub id: TargetId,
}

impl LuaUserData for LuaTargetHandle {
  fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
    fields.add_field_method_get("name", |_, this| Ok(this.id.name.clone()));
    fields.add_field_method_get("project", |_, this| Ok(this.id.project.clone()));
  }

  fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
    methods.add_meta_method(LuaMetaMethod::Call, |lua, this, kit: LuaAnyUserData| {
      let (kit, scope) = {
        let kit = kit.borrow::<LuaKit>()?;
        (kit.kit.clone(), kit.scope.clone())
      };
      let output = scope.call(&this.id, &kit).into_lua_err()?;
      let root = scope.root().into_lua_err()?;
      output_to_lua(lua, &output, &root)
    });
    methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| Ok(format!("target({})", this.id)));
  }
}

/// The targets of a project, indexed by name.
///
/// The name set is shared with the loader, so targets declared after the
/// handle was created are still reachable through it.
#[derive(Debug, Clone)]
pub struct LuaProjectHandle {
  pub name: String,
  pub targets: Rc<RefCell<BTreeSet<String>>>,
}

impl LuaProjectHandle {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      targets: Rc::new(RefCell::new(BTreeSet::new())),
    }
  }

  pub fn target(&self, name: &str) -> Result<LuaTargetHandle, EvalError> {
    if !self.targets.borrow().contains(name) {
      return Err(EvalError::UnknownTarget {
        project: self.name.clone(),
        target: name.to_string(),
      });
    }
    Ok(LuaTargetHandle {
      id: TargetId::new(&self.name, name),
    })
  }
}

impl LuaUserData for LuaProjectHandle {
  fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
    methods.add_meta_method(LuaMetaMethod::Index, |_, this, name: String| {
      this.target(&name).into_lua_err()
    });
    methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| Ok(format!("project({})", this.name)));
  }
}
