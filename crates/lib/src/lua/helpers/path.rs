use std::path::{Path, PathBuf};

use mlua::prelude::*;

use crate::lua::convert::resolve_path;

fn lossy(path: &Path) -> String {
  path.to_string_lossy().into_owned()
}

fn joined(segments: LuaMultiValue) -> LuaResult<PathBuf> {
  let mut result = PathBuf::new();
  for segment in segments {
    match segment {
      LuaValue::String(s) => result.push(s.to_str()?.as_ref()),
      LuaValue::Nil => {}
      other => {
        return Err(LuaError::external(format!(
          "path segments must be strings, got a {}",
          other.type_name()
        )));
      }
    }
  }
  Ok(result)
}

/// Relative path from `from` to `to`, both taken lexically.
fn relative(from: &Path, to: &Path) -> PathBuf {
  let from: Vec<_> = from.components().collect();
  let to: Vec<_> = to.components().collect();
  let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

  let mut out = PathBuf::new();
  for _ in common..from.len() {
    out.push("..");
  }
  for component in &to[common..] {
    out.push(component);
  }
  if out.as_os_str().is_empty() {
    out.push(".");
  }
  out
}

/// Create the `rig.path` table of lexical path helpers.
pub fn create_path_helpers(lua: &Lua) -> LuaResult<LuaTable> {
  let path = lua.create_table()?;

  path.set(
    "join",
    lua.create_function(|_, segments: LuaMultiValue| Ok(lossy(&joined(segments)?)))?,
  )?;

  path.set(
    "dirname",
    lua.create_function(|_, p: String| Ok(Path::new(&p).parent().map(lossy).unwrap_or_default()))?,
  )?;

  path.set(
    "basename",
    lua.create_function(|_, p: String| {
      Ok(Path::new(&p).file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default())
    })?,
  )?;

  path.set(
    "stem",
    lua.create_function(|_, p: String| {
      Ok(Path::new(&p).file_stem().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default())
    })?,
  )?;

  // Includes the dot, empty when there is no extension.
  path.set(
    "extname",
    lua.create_function(|_, p: String| {
      Ok(
        Path::new(&p)
          .extension()
          .map(|e| format!(".{}", e.to_string_lossy()))
          .unwrap_or_default(),
      )
    })?,
  )?;

  path.set(
    "is_absolute",
    lua.create_function(|_, p: String| Ok(Path::new(&p).is_absolute()))?,
  )?;

  path.set(
    "normalize",
    lua.create_function(|_, p: String| Ok(lossy(&resolve_path(Path::new(""), &p))))?,
  )?;

  path.set(
    "relative",
    lua.create_function(|_, (from, to): (String, String)| Ok(lossy(&relative(Path::new(&from), Path::new(&to)))))?,
  )?;

  path.set(
    "split",
    lua.create_function(|_, p: String| {
      Ok(
        Path::new(&p)
          .components()
          .map(|c| c.as_os_str().to_string_lossy().into_owned())
          .collect::<Vec<_>>(),
      )
    })?,
  )?;

  Ok(path)
}
