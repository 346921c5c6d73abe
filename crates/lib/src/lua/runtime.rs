use mlua::prelude::*;

use crate::consts::APP_NAME;
use crate::kit::Platform;
use crate::lua::helpers;

/// Create a Lua state with the globals every project file sees.
///
/// - `rig.version`, `rig.host_platform`, `rig.path`
/// - `concat(...)`: flatten strings and arrays into one array
pub fn create_runtime() -> LuaResult<Lua> {
  let lua = Lua::new();

  let rig = lua.create_table()?;
  rig.set("version", env!("CARGO_PKG_VERSION"))?;
  rig.set("host_platform", Platform::current().map(|p| p.as_str()).unwrap_or("unknown"))?;
  rig.set("path", helpers::path::create_path_helpers(&lua)?)?;
  lua.globals().set(APP_NAME, rig)?;

  lua.globals().set("concat", lua.create_function(concat)?)?;

  Ok(lua)
}

fn flatten(value: LuaValue, out: &mut Vec<LuaValue>) -> LuaResult<()> {
  match value {
    LuaValue::Nil => {}
    LuaValue::Table(t) if t.metatable().is_none() => {
      for item in t.sequence_values::<LuaValue>() {
        flatten(item?, out)?;
      }
    }
    other => out.push(other),
  }
  Ok(())
}

fn concat(lua: &Lua, args: LuaMultiValue) -> LuaResult<LuaTable> {
  let mut items = Vec::new();
  for arg in args {
    flatten(arg, &mut items)?;
  }
  lua.create_sequence_from(items)
}
