//! Conversions between Lua values and evaluator types.
//!
//! Artifacts cross into Lua as plain tables whose metatable carries a `__type`
//! marker (`Library`, `Object`, `Executable`). Property sets and processes
//! cross as userdata. Errors cross as external errors wrapping [`EvalError`],
//! so the original error is recovered intact when it comes back out.

use std::path::{Component, Path, PathBuf};

use mlua::prelude::*;

use super::{LuaProcess, LuaProperties};
use crate::config::Value;
use crate::error::EvalError;
use crate::properties::{Artifact, Executable, Field, LibraryKind, LibraryRef, ObjectRef, PropValue};
use crate::target::TargetOutput;

pub const LIBRARY_TYPE: &str = "Library";
pub const OBJECT_TYPE: &str = "Object";
pub const EXECUTABLE_TYPE: &str = "Executable";

/// Recover the evaluator error carried by a Lua error.
pub fn eval_error(err: &LuaError) -> EvalError {
  match err {
    LuaError::CallbackError { cause, .. } => eval_error(cause),
    LuaError::WithContext { cause, .. } => eval_error(cause),
    LuaError::ExternalError(inner) => match inner.downcast_ref::<EvalError>() {
      Some(eval) => eval.clone(),
      None => EvalError::Script {
        message: inner.to_string(),
      },
    },
    LuaError::RuntimeError(message) => EvalError::Script {
      message: message.clone(),
    },
    other => EvalError::Script {
      message: other.to_string(),
    },
  }
}

/// Join `path` onto `root` unless it is absolute, then drop `.` and `..` lexically.
pub fn resolve_path(root: &Path, path: &str) -> PathBuf {
  let joined = root.join(path);
  let mut normalized = PathBuf::new();
  for component in joined.components() {
    match component {
      Component::ParentDir => {
        normalized.pop();
      }
      Component::CurDir => {}
      _ => normalized.push(component),
    }
  }
  normalized
}

/// The `__type` marker of a table, if it has one.
pub fn type_marker(table: &LuaTable) -> Option<String> {
  let mt = table.metatable()?;
  mt.get::<String>("__type").ok()
}

fn marked(lua: &Lua, table: LuaTable, type_name: &str) -> LuaResult<LuaValue> {
  let mt = lua.create_table()?;
  mt.set("__type", type_name)?;
  table.set_metatable(Some(mt))?;
  Ok(LuaValue::Table(table))
}

pub fn artifact_to_lua(lua: &Lua, artifact: &Artifact) -> LuaResult<LuaValue> {
  let table = lua.create_table()?;
  match artifact {
    Artifact::Library(lib) => {
      table.set("name", lib.name.as_str())?;
      table.set("path", lib.path.to_string_lossy().to_string())?;
      table.set(
        "kind",
        match lib.kind {
          LibraryKind::Static => "static",
          LibraryKind::Shared => "shared",
        },
      )?;
      marked(lua, table, LIBRARY_TYPE)
    }
    Artifact::Object(obj) => {
      table.set("path", obj.path.to_string_lossy().to_string())?;
      table.set("source", obj.source.to_string_lossy().to_string())?;
      marked(lua, table, OBJECT_TYPE)
    }
    Artifact::Executable(exe) => {
      table.set("name", exe.name.as_str())?;
      table.set("path", exe.path.to_string_lossy().to_string())?;
      marked(lua, table, EXECUTABLE_TYPE)
    }
  }
}

/// Read an artifact table. Returns `None` for tables without an artifact marker.
pub fn lua_to_artifact(table: &LuaTable) -> LuaResult<Option<Artifact>> {
  let Some(type_name) = type_marker(table) else {
    return Ok(None);
  };
  let path = |key: &str| -> LuaResult<PathBuf> { Ok(PathBuf::from(table.get::<String>(key)?)) };
  let artifact = match type_name.as_str() {
    LIBRARY_TYPE => {
      let kind = match table.get::<Option<String>>("kind")?.as_deref() {
        Some("shared") => LibraryKind::Shared,
        _ => LibraryKind::Static,
      };
      Artifact::Library(LibraryRef {
        name: table.get("name")?,
        path: path("path")?,
        kind,
      })
    }
    OBJECT_TYPE => Artifact::Object(ObjectRef {
      path: path("path")?,
      source: path("source")?,
    }),
    EXECUTABLE_TYPE => Artifact::Executable(Executable {
      name: table.get("name")?,
      path: path("path")?,
    }),
    _ => return Ok(None),
  };
  Ok(Some(artifact))
}

pub fn prop_value_to_lua(lua: &Lua, value: &PropValue) -> LuaResult<LuaValue> {
  match value {
    PropValue::Library(lib) => artifact_to_lua(lua, &Artifact::Library(lib.clone())),
    PropValue::Object(obj) => artifact_to_lua(lua, &Artifact::Object(obj.clone())),
    PropValue::Text(text) => Ok(LuaValue::String(lua.create_string(text)?)),
    PropValue::Path(path) => Ok(LuaValue::String(lua.create_string(path.to_string_lossy().as_ref())?)),
  }
}

/// Flatten a Lua value into values for `field`.
///
/// Nested arrays are flattened, strings in path fields are resolved against
/// `root`, and artifact tables become library or object references.
pub fn collect_prop_values(value: LuaValue, field: Field, root: &Path, out: &mut Vec<PropValue>) -> LuaResult<()> {
  match value {
    LuaValue::String(s) => {
      let text = s.to_str()?.to_string();
      if field.holds_paths() {
        out.push(PropValue::Path(resolve_path(root, &text)));
      } else {
        out.push(PropValue::Text(text));
      }
      Ok(())
    }
    LuaValue::Integer(i) => {
      out.push(PropValue::Text(i.to_string()));
      Ok(())
    }
    LuaValue::Number(n) => {
      out.push(PropValue::Text(n.to_string()));
      Ok(())
    }
    LuaValue::Table(t) => {
      if let Some(artifact) = lua_to_artifact(&t)? {
        let value = match artifact {
          Artifact::Library(lib) => PropValue::Library(lib),
          Artifact::Object(obj) => PropValue::Object(obj),
          Artifact::Executable(exe) => {
            return Err(
              EvalError::InvalidValue {
                message: format!("executable '{}' cannot be stored in property field '{}'", exe.name, field),
              }
              .into_lua_err(),
            );
          }
        };
        out.push(value);
        return Ok(());
      }
      for item in t.sequence_values::<LuaValue>() {
        collect_prop_values(item?, field, root, out)?;
      }
      Ok(())
    }
    LuaValue::UserData(ud) => {
      if let Ok(props) = ud.borrow::<LuaProperties>() {
        out.extend(props.set.values(field));
        return Ok(());
      }
      Err(
        EvalError::InvalidValue {
          message: format!("cannot store userdata in property field '{}'", field),
        }
        .into_lua_err(),
      )
    }
    other => Err(
      EvalError::InvalidValue {
        message: format!("cannot store a {} in property field '{}'", other.type_name(), field),
      }
      .into_lua_err(),
    ),
  }
}

pub fn value_to_lua(lua: &Lua, value: &Value) -> LuaResult<LuaValue> {
  Ok(match value {
    Value::Null => LuaValue::Nil,
    Value::Bool(b) => LuaValue::Boolean(*b),
    Value::Integer(i) => LuaValue::Integer(*i),
    Value::Float(f) => LuaValue::Number(*f),
    Value::String(s) => LuaValue::String(lua.create_string(s)?),
    Value::List(items) => {
      let table = lua.create_table()?;
      for (i, item) in items.iter().enumerate() {
        table.set(i + 1, value_to_lua(lua, item)?)?;
      }
      LuaValue::Table(table)
    }
  })
}

pub fn lua_to_value(value: LuaValue) -> LuaResult<Value> {
  match value {
    LuaValue::Nil => Ok(Value::Null),
    LuaValue::Boolean(b) => Ok(Value::Bool(b)),
    LuaValue::Integer(i) => Ok(Value::Integer(i)),
    LuaValue::Number(n) => Ok(Value::Float(n)),
    LuaValue::String(s) => Ok(Value::String(s.to_str()?.to_string())),
    LuaValue::Table(t) => t
      .sequence_values::<LuaValue>()
      .map(|item| lua_to_value(item?))
      .collect::<LuaResult<Vec<_>>>()
      .map(Value::List),
    other => Err(
      EvalError::InvalidValue {
        message: format!("a {} cannot be a configuration value", other.type_name()),
      }
      .into_lua_err(),
    ),
  }
}

/// Convert what a target function returned.
pub fn lua_to_output(value: LuaValue) -> Result<TargetOutput, EvalError> {
  match value {
    LuaValue::Nil => Ok(TargetOutput::Nothing),
    LuaValue::UserData(ud) => {
      if let Ok(props) = ud.borrow::<LuaProperties>() {
        return Ok(TargetOutput::Properties(props.set.clone()));
      }
      if let Ok(process) = ud.borrow::<LuaProcess>() {
        return Ok(TargetOutput::Process(process.handle.clone()));
      }
      Err(EvalError::InvalidValue {
        message: "a target returned an unsupported userdata value".to_string(),
      })
    }
    LuaValue::Table(t) => {
      if let Some(artifact) = lua_to_artifact(&t).map_err(|e| eval_error(&e))? {
        return Ok(TargetOutput::Artifact(artifact));
      }
      let mut items = Vec::new();
      for item in t.sequence_values::<LuaValue>() {
        items.push(lua_to_output(item.map_err(|e| eval_error(&e))?)?);
      }
      Ok(TargetOutput::Sequence(items))
    }
    other => Err(EvalError::InvalidValue {
      message: format!("a target cannot return a {}", other.type_name()),
    }),
  }
}

/// Convert a target output for a caller in Lua.
pub fn output_to_lua(lua: &Lua, output: &TargetOutput, root: &Path) -> LuaResult<LuaValue> {
  match output {
    TargetOutput::Nothing => Ok(LuaValue::Nil),
    TargetOutput::Properties(set) => lua
      .create_userdata(LuaProperties::new(set.clone(), root.to_path_buf()))
      .map(LuaValue::UserData),
    TargetOutput::Process(handle) => lua
      .create_userdata(LuaProcess {
        handle: handle.clone(),
      })
      .map(LuaValue::UserData),
    TargetOutput::Artifact(artifact) => artifact_to_lua(lua, artifact),
    TargetOutput::Sequence(items) => {
      let table = lua.create_table()?;
      for (i, item) in items.iter().enumerate() {
        table.set(i + 1, output_to_lua(lua, item, root)?)?;
      }
      Ok(LuaValue::Table(table))
    }
  }
}
