use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EvalError;

/// A configuration value supplied on the command line, in a config file, or as
/// a variable's declared default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
  Null,
  Bool(bool),
  Integer(i64),
  Float(f64),
  String(String),
  List(Vec<Value>),
}

impl Value {
  /// Parse a value given as text.
  ///
  /// JSON is tried first so `true`, `3` and `["a", "b"]` keep their types;
  /// anything that is not valid JSON is taken as a plain string.
  pub fn parse(text: &str) -> Self {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
  }

  pub fn is_null(&self) -> bool {
    matches!(self, Value::Null)
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::String(s) => Some(s),
      _ => None,
    }
  }

  /// Truthiness as the project files see it: null and `false` are false.
  pub fn is_truthy(&self) -> bool {
    !matches!(self, Value::Null | Value::Bool(false))
  }

  /// Interpret the value as a list of strings.
  ///
  /// A single string is accepted as a one-element list and null as an empty
  /// one, which lets a flag variable be given as `flags=debuggable`.
  pub fn to_string_list(&self) -> Result<Vec<String>, EvalError> {
    match self {
      Value::Null => Ok(Vec::new()),
      Value::String(s) => Ok(vec![s.clone()]),
      Value::List(items) => items
        .iter()
        .map(|item| match item {
          Value::String(s) => Ok(s.clone()),
          other => Err(EvalError::InvalidValue {
            message: format!("expected a list of strings, found element {}", other),
          }),
        })
        .collect(),
      other => Err(EvalError::InvalidValue {
        message: format!("expected a list of strings, found {}", other),
      }),
    }
  }
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::String(s) => write!(f, "{}", s),
      other => match serde_json::to_string(other) {
        Ok(json) => write!(f, "{}", json),
        Err(_) => write!(f, "{:?}", other),
      },
    }
  }
}

impl From<&str> for Value {
  fn from(s: &str) -> Self {
    Value::String(s.to_string())
  }
}

impl From<bool> for Value {
  fn from(b: bool) -> Self {
    Value::Bool(b)
  }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
  fn from(items: Vec<T>) -> Self {
    Value::List(items.into_iter().map(Into::into).collect())
  }
}
