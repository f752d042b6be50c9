//! Per-transaction mutation snapshot consumed by the translator

use std::collections::{HashMap, HashSet};

use crate::types::{NodeId, NodeRecord, PropValue};

/// A label assigned to or removed from a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEntry {
  pub node: NodeId,
  pub label: String,
}

/// A property assigned to or removed from a node
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyEntry {
  pub node: NodeId,
  pub key: String,
  /// New value; `None` for removals
  pub value: Option<PropValue>,
  /// Value before this transaction, if the property existed
  pub previous: Option<PropValue>,
}

/// Read-only view of what one transaction changed.
///
/// Node lookups return state after the transaction's in-memory mutations. For
/// nodes deleted in the transaction, lookups return the state observed just
/// before deletion.
pub trait TransactionData {
  fn created_nodes(&self) -> &[NodeId];
  fn assigned_labels(&self) -> &[LabelEntry];
  fn removed_labels(&self) -> &[LabelEntry];
  fn assigned_node_properties(&self) -> &[PropertyEntry];
  fn removed_node_properties(&self) -> &[PropertyEntry];
  fn is_deleted(&self, node: NodeId) -> bool;
  fn node(&self, node: NodeId) -> Option<&NodeRecord>;
}

/// Owned [`TransactionData`] implementation.
///
/// Hosts fill it while committing; tests build it directly.
#[derive(Debug, Clone, Default)]
pub struct MutationSnapshot {
  nodes: HashMap<NodeId, NodeRecord>,
  created: Vec<NodeId>,
  assigned_labels: Vec<LabelEntry>,
  removed_labels: Vec<LabelEntry>,
  assigned_props: Vec<PropertyEntry>,
  removed_props: Vec<PropertyEntry>,
  deleted: HashSet<NodeId>,
}

impl MutationSnapshot {
  pub fn new() -> Self {
    Self::default()
  }

  /// Record (or replace) the current state of a node
  pub fn with_node(mut self, node: NodeRecord) -> Self {
    self.put_node(node);
    self
  }

  pub fn created(mut self, node: NodeId) -> Self {
    self.created.push(node);
    self
  }

  pub fn label_assigned(mut self, node: NodeId, label: impl Into<String>) -> Self {
    self.assigned_labels.push(LabelEntry {
      node,
      label: label.into(),
    });
    self
  }

  pub fn label_removed(mut self, node: NodeId, label: impl Into<String>) -> Self {
    self.removed_labels.push(LabelEntry {
      node,
      label: label.into(),
    });
    self
  }

  pub fn property_assigned(
    mut self,
    node: NodeId,
    key: impl Into<String>,
    value: impl Into<PropValue>,
  ) -> Self {
    self.assigned_props.push(PropertyEntry {
      node,
      key: key.into(),
      value: Some(value.into()),
      previous: None,
    });
    self
  }

  pub fn property_removed(mut self, node: NodeId, key: impl Into<String>) -> Self {
    self.removed_props.push(PropertyEntry {
      node,
      key: key.into(),
      value: None,
      previous: None,
    });
    self
  }

  pub fn deleted(mut self, node: NodeId) -> Self {
    self.deleted.insert(node);
    self
  }

  pub(crate) fn put_node(&mut self, node: NodeRecord) {
    self.nodes.insert(node.id, node);
  }

  pub(crate) fn push_created(&mut self, node: NodeId) {
    self.created.push(node);
  }

  pub(crate) fn push_assigned_label(&mut self, entry: LabelEntry) {
    self.assigned_labels.push(entry);
  }

  pub(crate) fn push_removed_label(&mut self, entry: LabelEntry) {
    self.removed_labels.push(entry);
  }

  pub(crate) fn push_assigned_prop(&mut self, entry: PropertyEntry) {
    self.assigned_props.push(entry);
  }

  pub(crate) fn push_removed_prop(&mut self, entry: PropertyEntry) {
    self.removed_props.push(entry);
  }

  pub(crate) fn mark_deleted(&mut self, node: NodeId) {
    self.deleted.insert(node);
  }

  /// True when the transaction changed nothing
  pub fn is_empty(&self) -> bool {
    self.created.is_empty()
      && self.assigned_labels.is_empty()
      && self.removed_labels.is_empty()
      && self.assigned_props.is_empty()
      && self.removed_props.is_empty()
      && self.deleted.is_empty()
  }
}

impl TransactionData for MutationSnapshot {
  fn created_nodes(&self) -> &[NodeId] {
    &self.created
  }

  fn assigned_labels(&self) -> &[LabelEntry] {
    &self.assigned_labels
  }

  fn removed_labels(&self) -> &[LabelEntry] {
    &self.removed_labels
  }

  fn assigned_node_properties(&self) -> &[PropertyEntry] {
    &self.assigned_props
  }

  fn removed_node_properties(&self) -> &[PropertyEntry] {
    &self.removed_props
  }

  fn is_deleted(&self, node: NodeId) -> bool {
    self.deleted.contains(&node)
  }

  fn node(&self, node: NodeId) -> Option<&NodeRecord> {
    self.nodes.get(&node)
  }
}
