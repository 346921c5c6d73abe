//! The `kit` argument of target functions.

use mlua::prelude::*;

use super::LuaProperties;
use super::convert::artifact_to_lua;
use crate::backend::StepContext;
use crate::error::EvalError;
use crate::eval::Scope;
use crate::kit::{Kit, Toolchain, ToolchainId, Version, expand_flags};
use crate::properties::{Artifact, Field, PropValue, PropertySet};

/// A kit bound to the target it was passed to.
///
/// Calling another target with this kit records the dependency on the
/// bound target.
#[derive(Clone)]
pub struct LuaKit {
  pub kit: Kit,
  pub scope: Scope,
}

impl LuaKit {
  pub fn new(kit: Kit, scope: Scope) -> Self {
    Self { kit, scope }
  }
}

fn toolchain_id(name: &str) -> LuaResult<ToolchainId> {
  name.parse().into_lua_err()
}

fn version_table(lua: &Lua, version: Version) -> LuaResult<LuaTable> {
  let table = lua.create_table()?;
  table.set(1, version.major)?;
  table.set(2, version.minor)?;
  table.set("major", version.major)?;
  table.set("minor", version.minor)?;
  Ok(table)
}

impl LuaUserData for LuaKit {
  fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
    fields.add_field_method_get("platform", |_, this| Ok(this.kit.platform().as_str()));
    fields.add_field_method_get("cpp", |_, this| {
      let toolchain = this.kit.cpp().into_lua_err()?;
      Ok(LuaCpp {
        kit: this.kit.clone(),
        toolchain,
        scope: this.scope.clone(),
      })
    });
  }

  fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
    methods.add_method("installed", |_, this, ()| {
      Ok(this.kit.installed().iter().map(|id| id.as_str()).collect::<Vec<_>>())
    });

    methods.add_method("has", |_, this, id: String| Ok(this.kit.has(toolchain_id(&id)?)));

    methods.add_method("version", |lua, this, id: String| {
      match this.kit.version(toolchain_id(&id)?) {
        Some(version) => version_table(lua, version).map(LuaValue::Table),
        None => Ok(LuaValue::Nil),
      }
    });

    methods.add_method("require", |lua, this, id: String| {
      let toolchain = this.kit.require(toolchain_id(&id)?).into_lua_err()?;
      let table = lua.create_table()?;
      table.set("id", toolchain.id.as_str())?;
      table.set("version", version_table(lua, toolchain.version)?)?;
      Ok(table)
    });

    methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| Ok(this.kit.to_string()));
  }
}

/// The kit's C++ toolchain.
#[derive(Clone)]
pub struct LuaCpp {
  kit: Kit,
  toolchain: Toolchain,
  scope: Scope,
}

impl LuaCpp {
  fn step_context(&self) -> StepContext<'_> {
    StepContext {
      kit: &self.kit,
      toolchain: self.toolchain,
      target: self.scope.target(),
    }
  }

  fn root(&self) -> LuaResult<std::path::PathBuf> {
    self.scope.root().into_lua_err()
  }
}

fn collect_flags(value: LuaValue, out: &mut Vec<String>) -> LuaResult<()> {
  match value {
    LuaValue::Nil => Ok(()),
    LuaValue::String(s) => {
      out.push(s.to_str()?.to_string());
      Ok(())
    }
    LuaValue::Table(t) => {
      for item in t.sequence_values::<LuaValue>() {
        collect_flags(item?, out)?;
      }
      Ok(())
    }
    other => Err(
      EvalError::InvalidValue {
        message: format!("build flags must be strings, got a {}", other.type_name()),
      }
      .into_lua_err(),
    ),
  }
}

fn artifact_table(lua: &Lua, artifact: Artifact) -> LuaResult<LuaValue> {
  artifact_to_lua(lua, &artifact)
}

impl LuaUserData for LuaCpp {
  fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
    fields.add_field_method_get("compiler", |lua, this| {
      let compiler = lua.create_table()?;
      compiler.set("id", this.toolchain.id.as_str())?;
      compiler.set("version", version_table(lua, this.toolchain.version)?)?;
      Ok(compiler)
    });
  }

  fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
    methods.add_method("opt", |_, this, args: LuaMultiValue| {
      let mut flags = Vec::new();
      for arg in args {
        collect_flags(arg, &mut flags)?;
      }
      let expanded = expand_flags(this.toolchain.id.family(), &flags).into_lua_err()?;
      let mut set = PropertySet::new();
      set
        .append(Field::CompilerFlags, expanded.compiler_flags.into_iter().map(PropValue::Text))
        .into_lua_err()?;
      set
        .append(Field::Defines, expanded.defines.into_iter().map(PropValue::Text))
        .into_lua_err()?;
      Ok(LuaProperties::new(set, this.root()?))
    });

    methods.add_method("objs", |lua, this, opt: LuaUserDataRef<LuaProperties>| {
      let objects = this
        .scope
        .backend()
        .objects(&this.step_context(), &opt.set)
        .into_lua_err()?;
      let table = lua.create_table()?;
      for (i, obj) in objects.into_iter().enumerate() {
        table.set(i + 1, artifact_table(lua, Artifact::Object(obj))?)?;
      }
      Ok(table)
    });

    methods.add_method("lib", |lua, this, (name, opt): (String, LuaUserDataRef<LuaProperties>)| {
      let lib = this
        .scope
        .backend()
        .static_library(&this.step_context(), &name, &opt.set)
        .into_lua_err()?;
      artifact_table(lua, Artifact::Library(lib))
    });

    methods.add_method("shlib", |lua, this, (name, opt): (String, LuaUserDataRef<LuaProperties>)| {
      let lib = this
        .scope
        .backend()
        .shared_library(&this.step_context(), &name, &opt.set)
        .into_lua_err()?;
      artifact_table(lua, Artifact::Library(lib))
    });

    methods.add_method("exe", |lua, this, (name, opt): (String, LuaUserDataRef<LuaProperties>)| {
      let exe = this
        .scope
        .backend()
        .executable(&this.step_context(), &name, &opt.set)
        .into_lua_err()?;
      artifact_table(lua, Artifact::Executable(exe))
    });

    methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| Ok(format!("cpp({})", this.toolchain)));
  }
}
