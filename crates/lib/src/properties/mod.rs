//! Composable build properties.
//!
//! A [`PropertySet`] is the value that flows along the project graph: a target
//! returns one, its consumers merge it into their own. Ordered fields keep
//! insertion order and allow duplicates until [`PropertySet::dedup`] is called;
//! `sources` is a set.

mod artifact;
mod list;

use std::collections::BTreeSet;
use std::fmt;
use std::ops::Add;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use artifact::{Artifact, Executable, LibraryKind, LibraryRef, ObjectRef};
pub use list::PropList;

use crate::error::EvalError;

/// Names a field of a [`PropertySet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
  Libraries,
  IncludePaths,
  SystemLibraries,
  Defines,
  CompilerFlags,
  Objects,
  Sources,
}

impl Field {
  pub const ALL: [Field; 7] = [
    Field::Libraries,
    Field::IncludePaths,
    Field::SystemLibraries,
    Field::Defines,
    Field::CompilerFlags,
    Field::Objects,
    Field::Sources,
  ];

  /// Short name used by project files.
  pub fn as_str(&self) -> &'static str {
    match self {
      Field::Libraries => "libs",
      Field::IncludePaths => "includes",
      Field::SystemLibraries => "syslibs",
      Field::Defines => "defines",
      Field::CompilerFlags => "cppflags",
      Field::Objects => "objs",
      Field::Sources => "sources",
    }
  }

  /// Whether plain strings stored in this field are filesystem paths.
  pub fn holds_paths(&self) -> bool {
    matches!(self, Field::IncludePaths | Field::Sources)
  }
}

impl fmt::Display for Field {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for Field {
  type Err = EvalError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "libs" | "libraries" => Ok(Field::Libraries),
      "includes" | "include_paths" => Ok(Field::IncludePaths),
      "syslibs" | "system_libraries" => Ok(Field::SystemLibraries),
      "defines" => Ok(Field::Defines),
      "cppflags" | "compiler_flags" => Ok(Field::CompilerFlags),
      "objs" | "objects" => Ok(Field::Objects),
      "sources" => Ok(Field::Sources),
      other => Err(EvalError::InvalidValue {
        message: format!("unknown property field '{}'", other),
      }),
    }
  }
}

/// A single value stored in, or removed from, a property field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
  Library(LibraryRef),
  Object(ObjectRef),
  Text(String),
  Path(PathBuf),
}

impl PropValue {
  fn describe(&self) -> String {
    match self {
      PropValue::Library(l) => format!("library '{}'", l.name),
      PropValue::Object(o) => format!("object '{}'", o.path.display()),
      PropValue::Text(t) => format!("string '{}'", t),
      PropValue::Path(p) => format!("path '{}'", p.display()),
    }
  }

  fn mismatch(&self, field: Field) -> EvalError {
    EvalError::InvalidValue {
      message: format!("cannot store {} in property field '{}'", self.describe(), field),
    }
  }

  fn into_library(self, field: Field) -> Result<LibraryRef, EvalError> {
    match self {
      PropValue::Library(l) => Ok(l),
      other => Err(other.mismatch(field)),
    }
  }

  fn into_object(self, field: Field) -> Result<ObjectRef, EvalError> {
    match self {
      PropValue::Object(o) => Ok(o),
      other => Err(other.mismatch(field)),
    }
  }

  fn into_path(self, field: Field) -> Result<PathBuf, EvalError> {
    match self {
      PropValue::Path(p) => Ok(p),
      PropValue::Text(t) => Ok(PathBuf::from(t)),
      other => Err(other.mismatch(field)),
    }
  }

  fn into_text(self, field: Field) -> Result<String, EvalError> {
    match self {
      PropValue::Text(t) => Ok(t),
      other => Err(other.mismatch(field)),
    }
  }
}

/// Ordered build properties contributed by a target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySet {
  #[serde(default)]
  pub libraries: PropList<LibraryRef>,
  #[serde(default)]
  pub include_paths: PropList<PathBuf>,
  #[serde(default)]
  pub system_libraries: PropList<String>,
  #[serde(default)]
  pub defines: PropList<String>,
  #[serde(default)]
  pub compiler_flags: PropList<String>,
  #[serde(default)]
  pub objects: PropList<ObjectRef>,
  #[serde(default)]
  pub sources: BTreeSet<PathBuf>,
}

impl PropertySet {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_empty(&self) -> bool {
    self.libraries.is_empty()
      && self.include_paths.is_empty()
      && self.system_libraries.is_empty()
      && self.defines.is_empty()
      && self.compiler_flags.is_empty()
      && self.objects.is_empty()
      && self.sources.is_empty()
  }

  /// Append `other` field by field; `sources` becomes the union.
  pub fn merge(&mut self, other: &PropertySet) {
    self.libraries.extend_from(&other.libraries);
    self.include_paths.extend_from(&other.include_paths);
    self.system_libraries.extend_from(&other.system_libraries);
    self.defines.extend_from(&other.defines);
    self.compiler_flags.extend_from(&other.compiler_flags);
    self.objects.extend_from(&other.objects);
    self.sources.extend(other.sources.iter().cloned());
  }

  pub fn append(&mut self, field: Field, values: impl IntoIterator<Item = PropValue>) -> Result<(), EvalError> {
    for value in values {
      match field {
        Field::Libraries => self.libraries.push(value.into_library(field)?),
        Field::IncludePaths => self.include_paths.push(value.into_path(field)?),
        Field::SystemLibraries => self.system_libraries.push(value.into_text(field)?),
        Field::Defines => self.defines.push(value.into_text(field)?),
        Field::CompilerFlags => self.compiler_flags.push(value.into_text(field)?),
        Field::Objects => self.objects.push(value.into_object(field)?),
        Field::Sources => {
          self.sources.insert(value.into_path(field)?);
        }
      }
    }
    Ok(())
  }

  /// Remove the first occurrence of each value; absent values are ignored.
  pub fn remove(&mut self, field: Field, values: impl IntoIterator<Item = PropValue>) -> Result<(), EvalError> {
    self.remove_with(field, values, false)
  }

  /// Remove every occurrence of each value.
  pub fn remove_all(&mut self, field: Field, values: impl IntoIterator<Item = PropValue>) -> Result<(), EvalError> {
    self.remove_with(field, values, true)
  }

  fn remove_with(
    &mut self,
    field: Field,
    values: impl IntoIterator<Item = PropValue>,
    every: bool,
  ) -> Result<(), EvalError> {
    fn apply<T: PartialEq>(list: &mut PropList<T>, value: &T, every: bool) {
      if every {
        list.remove_all(value);
      } else {
        list.remove(value);
      }
    }

    for value in values {
      match field {
        Field::Libraries => apply(&mut self.libraries, &value.into_library(field)?, every),
        Field::IncludePaths => apply(&mut self.include_paths, &value.into_path(field)?, every),
        Field::SystemLibraries => apply(&mut self.system_libraries, &value.into_text(field)?, every),
        Field::Defines => apply(&mut self.defines, &value.into_text(field)?, every),
        Field::CompilerFlags => apply(&mut self.compiler_flags, &value.into_text(field)?, every),
        Field::Objects => apply(&mut self.objects, &value.into_object(field)?, every),
        Field::Sources => {
          self.sources.remove(&value.into_path(field)?);
        }
      }
    }
    Ok(())
  }

  pub fn contains(&self, field: Field, value: &PropValue) -> bool {
    match (field, value) {
      (Field::Libraries, PropValue::Library(l)) => self.libraries.contains(l),
      (Field::Objects, PropValue::Object(o)) => self.objects.contains(o),
      (Field::IncludePaths, PropValue::Path(p)) => self.include_paths.contains(p),
      (Field::IncludePaths, PropValue::Text(t)) => self.include_paths.contains(&PathBuf::from(t)),
      (Field::Sources, PropValue::Path(p)) => self.sources.contains(p),
      (Field::Sources, PropValue::Text(t)) => self.sources.contains(&PathBuf::from(t)),
      (Field::SystemLibraries, PropValue::Text(t)) => self.system_libraries.contains(t),
      (Field::Defines, PropValue::Text(t)) => self.defines.contains(t),
      (Field::CompilerFlags, PropValue::Text(t)) => self.compiler_flags.contains(t),
      _ => false,
    }
  }

  /// Values of one field, in order.
  pub fn values(&self, field: Field) -> Vec<PropValue> {
    match field {
      Field::Libraries => self.libraries.iter().cloned().map(PropValue::Library).collect(),
      Field::IncludePaths => self.include_paths.iter().cloned().map(PropValue::Path).collect(),
      Field::SystemLibraries => self.system_libraries.iter().cloned().map(PropValue::Text).collect(),
      Field::Defines => self.defines.iter().cloned().map(PropValue::Text).collect(),
      Field::CompilerFlags => self.compiler_flags.iter().cloned().map(PropValue::Text).collect(),
      Field::Objects => self.objects.iter().cloned().map(PropValue::Object).collect(),
      Field::Sources => self.sources.iter().cloned().map(PropValue::Path).collect(),
    }
  }

  /// Keep only the first occurrence of each value in every ordered field.
  pub fn dedup(&mut self) {
    self.libraries.dedup();
    self.include_paths.dedup();
    self.system_libraries.dedup();
    self.defines.dedup();
    self.compiler_flags.dedup();
    self.objects.dedup();
  }
}

/// `a` followed by `b`, leaving both inputs untouched.
pub fn merge(a: &PropertySet, b: &PropertySet) -> PropertySet {
  let mut out = a.clone();
  out.merge(b);
  out
}

impl Add for PropertySet {
  type Output = PropertySet;

  fn add(mut self, rhs: PropertySet) -> PropertySet {
    self.merge(&rhs);
    self
  }
}

impl<'a> Add<&'a PropertySet> for &'a PropertySet {
  type Output = PropertySet;

  fn add(self, rhs: &'a PropertySet) -> PropertySet {
    merge(self, rhs)
  }
}

impl fmt::Display for PropertySet {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "PropertySet(libs={}, includes={}, syslibs={}, defines={}, cppflags={}, objs={}, sources={})",
      self.libraries.len(),
      self.include_paths.len(),
      self.system_libraries.len(),
      self.defines.len(),
      self.compiler_flags.len(),
      self.objects.len(),
      self.sources.len()
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use proptest::prelude::*;

  fn text(values: &[&str]) -> Vec<PropValue> {
    values.iter().map(|v| PropValue::Text(v.to_string())).collect()
  }

  fn lib(name: &str) -> LibraryRef {
    LibraryRef {
      name: name.to_string(),
      path: PathBuf::from(format!("/out/lib{}.a", name)),
      kind: LibraryKind::Static,
    }
  }

  #[test]
  fn field_names_accept_short_and_long_forms() {
    assert_eq!("cppflags".parse::<Field>().unwrap(), Field::CompilerFlags);
    assert_eq!("compiler_flags".parse::<Field>().unwrap(), Field::CompilerFlags);
    assert_eq!("includes".parse::<Field>().unwrap(), Field::IncludePaths);
    assert!("linkflags".parse::<Field>().is_err());
    for field in Field::ALL {
      assert_eq!(field.as_str().parse::<Field>().unwrap(), field);
    }
  }

  #[test]
  fn merge_appends_in_order() {
    let mut a = PropertySet::new();
    a.append(Field::Defines, text(&["A", "B"])).unwrap();
    let mut b = PropertySet::new();
    b.append(Field::Defines, text(&["B", "C"])).unwrap();
    let merged = merge(&a, &b);
    assert_eq!(merged.defines.as_slice(), ["A", "B", "B", "C"]);
    assert_eq!(a.defines.len(), 2);
  }

  #[test]
  fn sources_are_a_set() {
    let mut a = PropertySet::new();
    a.append(Field::Sources, text(&["/src/a.cpp", "/src/a.cpp"])).unwrap();
    let mut b = PropertySet::new();
    b.append(Field::Sources, text(&["/src/a.cpp", "/src/b.cpp"])).unwrap();
    assert_eq!((a + b).sources.len(), 2);
  }

  #[test]
  fn remove_takes_first_occurrence_only() {
    let mut set = PropertySet::new();
    set.append(Field::CompilerFlags, text(&["-g", "-O2", "-g"])).unwrap();
    set.remove(Field::CompilerFlags, text(&["-g"])).unwrap();
    assert_eq!(set.compiler_flags.as_slice(), ["-O2", "-g"]);
    set.remove(Field::CompilerFlags, text(&["-Wall"])).unwrap();
    assert_eq!(set.compiler_flags.len(), 2);
  }

  #[test]
  fn remove_all_drops_every_occurrence() {
    let mut set = PropertySet::new();
    set.append(Field::CompilerFlags, text(&["-g", "-O2", "-g"])).unwrap();
    set.remove_all(Field::CompilerFlags, text(&["-g"])).unwrap();
    assert_eq!(set.compiler_flags.as_slice(), ["-O2"]);
  }

  #[test]
  fn dedup_keeps_first() {
    let mut set = PropertySet::new();
    set.append(Field::Libraries, [lib("b"), lib("a"), lib("b")].map(PropValue::Library)).unwrap();
    set.dedup();
    let names: Vec<_> = set.libraries.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, ["b", "a"]);
  }

  #[test]
  fn wrong_value_kind_is_rejected() {
    let mut set = PropertySet::new();
    let err = set.append(Field::Libraries, text(&["m"])).unwrap_err();
    assert_eq!(err.kind(), "InvalidValueError");
    assert!(set.append(Field::Defines, [PropValue::Library(lib("m"))]).is_err());
  }

  #[test]
  fn contains_matches_text_against_paths() {
    let mut set = PropertySet::new();
    set.append(Field::IncludePaths, text(&["/inc"])).unwrap();
    assert!(set.contains(Field::IncludePaths, &PropValue::Text("/inc".into())));
    assert!(!set.contains(Field::Defines, &PropValue::Text("/inc".into())));
  }

  fn arb_set() -> impl Strategy<Value = PropertySet> {
    (
      prop::collection::vec("[a-d]", 0..5),
      prop::collection::vec("-[a-d]", 0..5),
      prop::collection::vec("/[a-c]", 0..4),
    )
      .prop_map(|(defines, flags, sources)| {
        let mut set = PropertySet::new();
        set.defines = PropList::from(defines);
        set.compiler_flags = PropList::from(flags);
        set.sources = sources.into_iter().map(PathBuf::from).collect();
        set
      })
  }

  proptest! {
    #[test]
    fn merge_is_associative(a in arb_set(), b in arb_set(), c in arb_set()) {
      prop_assert_eq!(merge(&merge(&a, &b), &c), merge(&a, &merge(&b, &c)));
    }

    #[test]
    fn merge_preserves_each_side_in_order(a in arb_set(), b in arb_set()) {
      let merged = merge(&a, &b);
      let (left, right) = merged.defines.split_at(a.defines.len());
      prop_assert_eq!(left, a.defines.as_slice());
      prop_assert_eq!(right, b.defines.as_slice());
    }

    #[test]
    fn remove_undoes_append_of_absent_value(a in arb_set(), v in "[x-z]{2}") {
      let mut set = a.clone();
      set.append(Field::Defines, [PropValue::Text(v.clone())]).unwrap();
      set.remove(Field::Defines, [PropValue::Text(v)]).unwrap();
      prop_assert_eq!(set, a);
    }
  }
}
