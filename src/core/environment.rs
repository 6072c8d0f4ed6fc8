//! Variable snapshot used to evaluate step conditions
//!
//! Taken once before a release is planned so that condition results cannot
//! change while steps run.

use std::collections::BTreeMap;

/// An immutable set of variables
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
  vars: BTreeMap<String, String>,
}

impl Environment {
  /// Empty environment
  pub fn new() -> Self {
    Self::default()
  }

  /// Snapshot of the current process environment (non UTF-8 entries skipped)
  pub fn from_process() -> Self {
    Self::from_pairs(std::env::vars_os().filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?))))
  }

  /// Build from explicit key/value pairs
  pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
    Self {
      vars: pairs.into_iter().collect(),
    }
  }

  /// Fill in values only for keys that are not already set
  pub fn with_defaults<'a>(mut self, defaults: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
    for (key, value) in defaults {
      self.vars.entry(key.clone()).or_insert_with(|| value.clone());
    }
    self
  }

  /// Set or replace a value
  pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
    self.vars.insert(key.into(), value.into());
  }

  /// Look up a value
  pub fn get(&self, key: &str) -> Option<&str> {
    self.vars.get(key).map(String::as_str)
  }

  pub fn contains(&self, key: &str) -> bool {
    self.vars.contains_key(key)
  }
}
