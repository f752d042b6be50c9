//! Core record types mirrored into the search index

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Stable node identifier
pub type NodeId = u64;

/// Property value as stored on a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
  Null,
  Bool(bool),
  I64(i64),
  F64(f64),
  String(String),
  VectorF32(Vec<f32>),
  List(Vec<PropValue>),
}

impl From<bool> for PropValue {
  fn from(value: bool) -> Self {
    PropValue::Bool(value)
  }
}

impl From<i64> for PropValue {
  fn from(value: i64) -> Self {
    PropValue::I64(value)
  }
}

impl From<i32> for PropValue {
  fn from(value: i32) -> Self {
    PropValue::I64(value as i64)
  }
}

impl From<f64> for PropValue {
  fn from(value: f64) -> Self {
    PropValue::F64(value)
  }
}

impl From<&str> for PropValue {
  fn from(value: &str) -> Self {
    PropValue::String(value.to_string())
  }
}

impl From<String> for PropValue {
  fn from(value: String) -> Self {
    PropValue::String(value)
  }
}

impl From<Vec<f32>> for PropValue {
  fn from(value: Vec<f32>) -> Self {
    PropValue::VectorF32(value)
  }
}

/// Current state of a mutated node: identity, labels and properties.
///
/// Labels keep their assignment order and properties keep insertion order,
/// so serialized documents enumerate them the way the store does.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeRecord {
  pub id: NodeId,
  pub labels: Vec<String>,
  pub props: IndexMap<String, PropValue>,
}

impl NodeRecord {
  pub fn new(id: NodeId) -> Self {
    Self {
      id,
      labels: Vec::new(),
      props: IndexMap::new(),
    }
  }

  pub fn with_label(mut self, label: impl Into<String>) -> Self {
    self.add_label(label);
    self
  }

  pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<PropValue>) -> Self {
    self.props.insert(key.into(), value.into());
    self
  }

  /// Document id used in the search index
  pub fn doc_id(&self) -> String {
    self.id.to_string()
  }

  pub fn has_label(&self, label: &str) -> bool {
    self.labels.iter().any(|l| l == label)
  }

  /// Add a label; returns false if the node already carried it
  pub fn add_label(&mut self, label: impl Into<String>) -> bool {
    let label = label.into();
    if self.has_label(&label) {
      return false;
    }
    self.labels.push(label);
    true
  }

  /// Remove a label; returns false if the node did not carry it
  pub fn remove_label(&mut self, label: &str) -> bool {
    let before = self.labels.len();
    self.labels.retain(|l| l != label);
    self.labels.len() != before
  }

  pub fn prop(&self, key: &str) -> Option<&PropValue> {
    self.props.get(key)
  }

  pub fn has_prop(&self, key: &str) -> bool {
    self.props.contains_key(key)
  }
}
