//! `PropertySet` as Lua userdata.

use std::path::PathBuf;

use mlua::prelude::*;

use super::convert::{collect_prop_values, prop_value_to_lua};
use crate::properties::{Field, PropValue, PropertySet};

/// A property set plus the project root its relative paths resolve against.
#[derive(Debug, Clone)]
pub struct LuaProperties {
  pub set: PropertySet,
  pub root: PathBuf,
}

impl LuaProperties {
  pub fn new(set: PropertySet, root: PathBuf) -> Self {
    Self { set, root }
  }

  /// Build a set from a `{ libs = ..., includes = ... }` table.
  pub fn from_table(table: LuaTable, root: PathBuf) -> LuaResult<Self> {
    let mut props = Self::new(PropertySet::new(), root);
    for pair in table.pairs::<String, LuaValue>() {
      let (key, value) = pair?;
      let field: Field = key.parse().into_lua_err()?;
      let values = props.values_of(field, LuaMultiValue::from_vec(vec![value]))?;
      props.set.append(field, values).into_lua_err()?;
    }
    Ok(props)
  }

  fn values_of(&self, field: Field, args: LuaMultiValue) -> LuaResult<Vec<PropValue>> {
    let mut values = Vec::new();
    for arg in args {
      collect_prop_values(arg, field, &self.root, &mut values)?;
    }
    Ok(values)
  }

  fn field_table(&self, lua: &Lua, field: Field) -> LuaResult<LuaTable> {
    let table = lua.create_table()?;
    for (i, value) in self.set.values(field).iter().enumerate() {
      table.set(i + 1, prop_value_to_lua(lua, value)?)?;
    }
    Ok(table)
  }
}

impl LuaUserData for LuaProperties {
  fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
    methods.add_method_mut("append", |_, this, (field, args): (String, LuaMultiValue)| {
      let field: Field = field.parse().into_lua_err()?;
      let values = this.values_of(field, args)?;
      this.set.append(field, values).into_lua_err()
    });

    methods.add_method_mut("remove", |_, this, (field, args): (String, LuaMultiValue)| {
      let field: Field = field.parse().into_lua_err()?;
      let values = this.values_of(field, args)?;
      this.set.remove(field, values).into_lua_err()
    });

    methods.add_method_mut("remove_all", |_, this, (field, args): (String, LuaMultiValue)| {
      let field: Field = field.parse().into_lua_err()?;
      let values = this.values_of(field, args)?;
      this.set.remove_all(field, values).into_lua_err()
    });

    methods.add_method("contains", |_, this, (field, value): (String, LuaValue)| {
      let field: Field = field.parse().into_lua_err()?;
      let values = this.values_of(field, LuaMultiValue::from_vec(vec![value]))?;
      Ok(!values.is_empty() && values.iter().all(|v| this.set.contains(field, v)))
    });

    methods.add_method_mut("dedup", |_, this, ()| {
      this.set.dedup();
      Ok(())
    });

    methods.add_method("copy", |_, this, ()| Ok(this.clone()));

    methods.add_method("is_empty", |_, this, ()| Ok(this.set.is_empty()));

    // Read the other set first so `a:merge(a)` does not hit a borrow conflict.
    methods.add_function("merge", |_, (this, other): (LuaAnyUserData, LuaAnyUserData)| {
      let other = other.borrow::<LuaProperties>()?.set.clone();
      this.borrow_mut::<LuaProperties>()?.set.merge(&other);
      Ok(this)
    });

    methods.add_meta_method(LuaMetaMethod::Index, |lua, this, key: LuaValue| {
      let LuaValue::String(key) = key else {
        return Ok(LuaValue::Nil);
      };
      let field: Field = key.to_str()?.parse().into_lua_err()?;
      this.field_table(lua, field).map(LuaValue::Table)
    });

    methods.add_meta_method_mut(LuaMetaMethod::NewIndex, |_, this, (key, value): (String, LuaValue)| {
      let field: Field = key.parse().into_lua_err()?;
      let values = this.values_of(field, LuaMultiValue::from_vec(vec![value]))?;
      let mut replaced = this.set.clone();
      replaced.remove_all(field, this.set.values(field)).into_lua_err()?;
      replaced.append(field, values).into_lua_err()?;
      this.set = replaced;
      Ok(())
    });

    methods.add_meta_function(
      LuaMetaMethod::Add,
      |_, (a, b): (LuaUserDataRef<LuaProperties>, LuaUserDataRef<LuaProperties>)| {
        Ok(LuaProperties::new(&a.set + &b.set, a.root.clone()))
      },
    );

    methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| Ok(this.set.to_string()));
  }
}
