use std::ops::Deref;

use serde::{Deserialize, Serialize};

/// An ordered property field. Duplicates are kept until [`PropList::dedup`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropList<T>(Vec<T>);

impl<T> Default for PropList<T> {
  fn default() -> Self {
    Self(Vec::new())
  }
}

impl<T> PropList<T> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, value: T) {
    self.0.push(value);
  }

  pub fn append(&mut self, values: impl IntoIterator<Item = T>) {
    self.0.extend(values);
  }

  pub fn as_slice(&self) -> &[T] {
    &self.0
  }

  pub fn into_vec(self) -> Vec<T> {
    self.0
  }
}

impl<T: Clone> PropList<T> {
  pub fn extend_from(&mut self, other: &PropList<T>) {
    self.0.extend_from_slice(&other.0);
  }
}

impl<T: PartialEq> PropList<T> {
  /// Remove the first occurrence of `value`. Returns whether anything was removed.
  pub fn remove(&mut self, value: &T) -> bool {
    match self.0.iter().position(|v| v == value) {
      Some(index) => {
        self.0.remove(index);
        true
      }
      None => false,
    }
  }

  pub fn remove_all(&mut self, value: &T) {
    self.0.retain(|v| v != value);
  }

  pub fn dedup(&mut self) {
    let mut kept: Vec<T> = Vec::with_capacity(self.0.len());
    for value in self.0.drain(..) {
      if !kept.contains(&value) {
        kept.push(value);
      }
    }
    self.0 = kept;
  }
}

impl<T> Deref for PropList<T> {
  type Target = [T];

  fn deref(&self) -> &[T] {
    &self.0
  }
}

impl<T> From<Vec<T>> for PropList<T> {
  fn from(values: Vec<T>) -> Self {
    Self(values)
  }
}

impl<T> FromIterator<T> for PropList<T> {
  fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
    Self(iter.into_iter().collect())
  }
}

impl<'a, T> IntoIterator for &'a PropList<T> {
  type Item = &'a T;
  type IntoIter = std::slice::Iter<'a, T>;

  fn into_iter(self) -> Self::IntoIter {
    self.0.iter()
  }
}
