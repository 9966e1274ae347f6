//! A string map that always iterates in ascending key order.
//!
//! Property maps are stored in this type so that neither the order keys
//! appeared in the source document nor the order a merge inserted them can
//! leak into the written file.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrderedKeyMap {
  entries: BTreeMap<String, String>,
}

impl OrderedKeyMap {
  pub fn new() -> Self {
    Self::default()
  }

  /// Inserts a value, returning the previous value for the key.
  pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
    self.entries.insert(key.into(), value.into())
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.entries.get(key).map(String::as_str)
  }

  pub fn remove(&mut self, key: &str) -> Option<String> {
    self.entries.remove(key)
  }

  pub fn contains_key(&self, key: &str) -> bool {
    self.entries.contains_key(key)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.entries.keys().map(String::as_str)
  }

  pub fn iter(&self) -> Iter<'_> {
    Iter {
      inner: self.entries.iter(),
    }
  }

  /// Key union with `other`; entries of `other` win on conflict.
  pub fn union_from(&mut self, other: &OrderedKeyMap) {
    for (key, value) in other.iter() {
      self.insert(key, value);
    }
  }
}

pub struct Iter<'a> {
  inner: btree_map::Iter<'a, String, String>,
}

impl<'a> Iterator for Iter<'a> {
  type Item = (&'a str, &'a str);

  fn next(&mut self) -> Option<Self::Item> {
    self
      .inner
      .next()
      .map(|(key, value)| (key.as_str(), value.as_str()))
  }
}

impl<'a> IntoIterator for &'a OrderedKeyMap {
  type Item = (&'a str, &'a str);
  type IntoIter = Iter<'a>;

  fn into_iter(self) -> Self::IntoIter {
    self.iter()
  }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for OrderedKeyMap {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    let mut map = Self::new();
    map.extend(iter);
    map
  }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for OrderedKeyMap {
  fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
    for (key, value) in iter {
      self.insert(key, value);
    }
  }
}

impl fmt::Display for OrderedKeyMap {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (key, value) in self {
      writeln!(f, "{}={}", key, value)?;
    }
    Ok(())
  }
}
