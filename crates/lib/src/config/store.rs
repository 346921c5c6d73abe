use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use super::Value;
use crate::error::EvalError;

/// A named configuration variable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigVariable {
  pub name: String,
  /// Alternative override keys, tried in order after `name`.
  pub aliases: Vec<String>,
  pub default: Option<Value>,
  pub description: Option<String>,
}

impl ConfigVariable {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      aliases: Vec::new(),
      default: None,
      description: None,
    }
  }

  pub fn alias(mut self, alias: impl Into<String>) -> Self {
    self.aliases.push(alias.into());
    self
  }

  pub fn default(mut self, value: impl Into<Value>) -> Self {
    self.default = Some(value.into());
    self
  }

  pub fn description(mut self, text: impl Into<String>) -> Self {
    self.description = Some(text.into());
    self
  }
}

/// Per-invocation configuration values keyed by variable name or alias.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
  values: BTreeMap<String, Value>,
}

impl ConfigOverrides {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
    self.values.insert(key.into(), value.into());
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.values.get(key)
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.values.keys().map(String::as_str)
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  /// Parse a `name=value` assignment and record it.
  pub fn parse_assignment(&mut self, assignment: &str) -> Result<(), EvalError> {
    let (key, value) = assignment.split_once('=').ok_or_else(|| EvalError::InvalidValue {
      message: format!("expected NAME=VALUE, got '{}'", assignment),
    })?;
    let key = key.trim();
    if key.is_empty() {
      return Err(EvalError::InvalidValue {
        message: format!("empty variable name in '{}'", assignment),
      });
    }
    self.insert(key, Value::parse(value));
    Ok(())
  }

  /// Load overrides from a JSON file holding a single object.
  pub fn from_json_file(path: &Path) -> Result<Self, EvalError> {
    let content = fs::read_to_string(path).map_err(|e| EvalError::InvalidValue {
      message: format!("cannot read config file {}: {}", path.display(), e),
    })?;
    let values: BTreeMap<String, Value> = serde_json::from_str(&content).map_err(|e| EvalError::InvalidValue {
      message: format!("config file {} is not a JSON object: {}", path.display(), e),
    })?;
    Ok(Self { values })
  }

  /// Merge `other` into `self`; keys in `other` win.
  pub fn merge(&mut self, other: ConfigOverrides) {
    self.values.extend(other.values);
  }
}

/// How a variable obtained its value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum Resolution {
  Override { key: String, value: Value },
  Default { value: Value },
  Missing,
}

impl Resolution {
  pub fn value(&self) -> Option<&Value> {
    match self {
      Resolution::Override { value, .. } | Resolution::Default { value } => Some(value),
      Resolution::Missing => None,
    }
  }
}

/// Configuration variables of one build invocation.
///
/// Variables are resolved when they are defined, so every reader in the same
/// invocation sees the same value.
#[derive(Debug, Default)]
pub struct ConfigStore {
  overrides: ConfigOverrides,
  variables: BTreeMap<String, ConfigVariable>,
  resolved: BTreeMap<String, Resolution>,
}

impl ConfigStore {
  pub fn new(overrides: ConfigOverrides) -> Self {
    Self {
      overrides,
      variables: BTreeMap::new(),
      resolved: BTreeMap::new(),
    }
  }

  /// Record a variable and resolve it. The first definition of a name wins.
  pub fn define(&mut self, variable: ConfigVariable) -> &ConfigVariable {
    let name = variable.name.clone();
    if let Some(existing) = self.variables.get(&name) {
      if *existing != variable {
        warn!(name = %name, "configuration variable redefined with different settings, keeping the first");
      }
    } else {
      let resolution = self.lookup(&variable);
      debug!(name = %name, resolution = ?resolution, "defined configuration variable");
      self.resolved.insert(name.clone(), resolution);
      self.variables.insert(name.clone(), variable);
    }
    &self.variables[&name]
  }

  fn lookup(&self, variable: &ConfigVariable) -> Resolution {
    let keys = std::iter::once(&variable.name).chain(variable.aliases.iter());
    for key in keys {
      if let Some(value) = self.overrides.get(key) {
        return Resolution::Override {
          key: key.clone(),
          value: value.clone(),
        };
      }
    }
    match &variable.default {
      Some(value) => Resolution::Default { value: value.clone() },
      None => Resolution::Missing,
    }
  }

  /// Effective value of `name`: override, then default, else `MissingConfiguration`.
  pub fn resolve(&self, name: &str) -> Result<Value, EvalError> {
    match self.resolved.get(name) {
      Some(resolution) => resolution.value().cloned(),
      None => self.overrides.get(name).cloned(),
    }
    .ok_or_else(|| EvalError::MissingConfiguration { name: name.to_string() })
  }

  pub fn resolution(&self, name: &str) -> Option<&Resolution> {
    self.resolved.get(name)
  }

  pub fn variables(&self) -> impl Iterator<Item = &ConfigVariable> {
    self.variables.values()
  }

  pub fn overrides(&self) -> &ConfigOverrides {
    &self.overrides
  }

  /// Override keys that no defined variable consumed.
  pub fn unused_overrides(&self) -> Vec<String> {
    let consumed: BTreeSet<&str> = self
      .resolved
      .values()
      .filter_map(|r| match r {
        Resolution::Override { key, .. } => Some(key.as_str()),
        _ => None,
      })
      .collect();
    self
      .overrides
      .keys()
      .filter(|k| !consumed.contains(k))
      .map(str::to_string)
      .collect()
  }

  /// Freeze the current resolutions.
  pub fn snapshot(&self) -> ConfigSnapshot {
    ConfigSnapshot {
      resolved: Arc::new(self.resolved.clone()),
      overrides: Arc::new(self.overrides.clone()),
    }
  }
}

/// Immutable view of resolved configuration, shared by every target of an invocation.
#[derive(Debug, Clone, Default)]
pub struct ConfigSnapshot {
  resolved: Arc<BTreeMap<String, Resolution>>,
  overrides: Arc<ConfigOverrides>,
}

impl ConfigSnapshot {
  pub fn get(&self, name: &str) -> Result<Value, EvalError> {
    match self.resolved.get(name) {
      Some(resolution) => resolution.value().cloned(),
      None => self.overrides.get(name).cloned(),
    }
    .ok_or_else(|| EvalError::MissingConfiguration { name: name.to_string() })
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.resolved.keys().map(String::as_str)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  fn overrides(pairs: &[(&str, &str)]) -> ConfigOverrides {
    let mut o = ConfigOverrides::new();
    for (k, v) in pairs {
      o.insert(*k, *v);
    }
    o
  }

  #[test]
  fn override_beats_default() {
    let mut store = ConfigStore::new(overrides(&[("fungo.flags", "debuggable")]));
    store.define(ConfigVariable::new("fungo.flags").default(vec!["optimise"]));
    assert_eq!(store.resolve("fungo.flags").unwrap(), Value::from("debuggable"));
  }

  #[test]
  fn default_used_without_override() {
    let mut store = ConfigStore::new(ConfigOverrides::new());
    store.define(ConfigVariable::new("fungo.flags").default(vec!["optimise"]));
    assert_eq!(store.resolve("fungo.flags").unwrap(), Value::from(vec!["optimise"]));
  }

  #[test]
  fn missing_without_default() {
    let mut store = ConfigStore::new(ConfigOverrides::new());
    store.define(ConfigVariable::new("test_o_matic.root"));
    let err = store.resolve("test_o_matic.root").unwrap_err();
    assert_eq!(err.kind(), "MissingConfigurationError");
    assert!(err.to_string().contains("test_o_matic.root"));
  }

  #[test]
  fn aliases_tried_in_order_after_name() {
    let mut store = ConfigStore::new(overrides(&[("tom", "/b"), ("test_o_matic", "/a")]));
    store.define(ConfigVariable::new("test_o_matic.root").alias("test_o_matic").alias("tom"));
    assert_eq!(store.resolve("test_o_matic.root").unwrap(), Value::from("/a"));

    let mut store = ConfigStore::new(overrides(&[("tom", "/b"), ("test_o_matic.root", "/q")]));
    store.define(ConfigVariable::new("test_o_matic.root").alias("test_o_matic").alias("tom"));
    assert_eq!(store.resolve("test_o_matic.root").unwrap(), Value::from("/q"));
  }

  #[test]
  fn first_definition_wins() {
    let mut store = ConfigStore::new(ConfigOverrides::new());
    store.define(ConfigVariable::new("x").default("one"));
    store.define(ConfigVariable::new("x").default("two"));
    assert_eq!(store.resolve("x").unwrap(), Value::from("one"));
    assert_eq!(store.variables().count(), 1);
  }

  #[test]
  fn undefined_name_reads_override_directly() {
    let store = ConfigStore::new(overrides(&[("adhoc", "yes")]));
    assert_eq!(store.resolve("adhoc").unwrap(), Value::from("yes"));
    assert!(store.resolve("other").is_err());
  }

  #[test]
  fn unused_overrides_reported() {
    let mut store = ConfigStore::new(overrides(&[("used", "1"), ("typo", "2")]));
    store.define(ConfigVariable::new("used"));
    assert_eq!(store.unused_overrides(), vec!["typo".to_string()]);
  }

  #[test]
  fn snapshot_is_frozen() {
    let mut store = ConfigStore::new(ConfigOverrides::new());
    store.define(ConfigVariable::new("a").default("1"));
    let snapshot = store.snapshot();
    store.define(ConfigVariable::new("b").default("2"));
    assert_eq!(snapshot.get("a").unwrap(), Value::from("1"));
    assert!(snapshot.get("b").is_err());
  }

  #[test]
  fn assignments_parse_json_or_string() {
    let mut o = ConfigOverrides::new();
    o.parse_assignment("fungo.flags=[\"debuggable\",\"warnings\"]").unwrap();
    o.parse_assignment("platform=linux").unwrap();
    o.parse_assignment("empty=").unwrap();
    assert_eq!(o.get("fungo.flags"), Some(&Value::from(vec!["debuggable", "warnings"])));
    assert_eq!(o.get("platform"), Some(&Value::from("linux")));
    assert_eq!(o.get("empty"), Some(&Value::from("")));
    assert!(o.parse_assignment("novalue").is_err());
    assert!(o.parse_assignment("=x").is_err());
  }

  #[test]
  fn json_file_merges_under_cli() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"a": 1, "b": "file"}}"#).unwrap();
    let mut merged = ConfigOverrides::from_json_file(file.path()).unwrap();
    merged.merge(overrides(&[("b", "cli")]));
    assert_eq!(merged.get("a"), Some(&Value::Integer(1)));
    assert_eq!(merged.get("b"), Some(&Value::from("cli")));
  }

  #[test]
  fn json_file_must_be_object() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "[1, 2]").unwrap();
    assert!(ConfigOverrides::from_json_file(file.path()).is_err());
  }
}
