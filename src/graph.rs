//! In-memory graph with transaction hooks
//!
//! A minimal host for the search sync engine: node creation/deletion, labels
//! and properties inside explicit transactions, with registered
//! [`TransactionEventHandler`]s called around each commit.

use indexmap::{IndexMap, IndexSet};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{Result, SearchSyncError};
use crate::handler::{HandlerId, HandlerRegistry, TransactionEventHandler};
use crate::snapshot::{LabelEntry, MutationSnapshot, PropertyEntry};
use crate::types::{NodeId, NodeRecord, PropValue};

type RegisteredHandler = (HandlerId, Arc<dyn TransactionEventHandler>);

#[derive(Default)]
pub struct MemoryGraph {
  nodes: RwLock<HashMap<NodeId, NodeRecord>>,
  next_node_id: AtomicU64,
  next_handler_id: AtomicU64,
  handlers: RwLock<Vec<RegisteredHandler>>,
  commit_lock: Mutex<()>,
}

impl std::fmt::Debug for MemoryGraph {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("MemoryGraph")
      .field("nodes", &self.nodes.read().len())
      .field("handlers", &self.handlers.read().len())
      .finish()
  }
}

impl MemoryGraph {
  pub fn new() -> Self {
    Self::default()
  }

  /// Begin a write transaction
  pub fn begin(&self) -> GraphTx<'_> {
    GraphTx {
      graph: self,
      pending: PendingDelta::default(),
    }
  }

  /// Committed state of a node
  pub fn node(&self, node_id: NodeId) -> Option<NodeRecord> {
    self.nodes.read().get(&node_id).cloned()
  }

  pub fn node_count(&self) -> usize {
    self.nodes.read().len()
  }

  fn alloc_node_id(&self) -> NodeId {
    self.next_node_id.fetch_add(1, Ordering::SeqCst)
  }

  fn committed_prop(&self, node_id: NodeId, key: &str) -> Option<PropValue> {
    self
      .nodes
      .read()
      .get(&node_id)
      .and_then(|node| node.prop(key).cloned())
  }
}

impl HandlerRegistry for MemoryGraph {
  fn register_handler(&self, handler: Arc<dyn TransactionEventHandler>) -> HandlerId {
    let id = HandlerId(self.next_handler_id.fetch_add(1, Ordering::SeqCst));
    self.handlers.write().push((id, handler));
    id
  }

  fn unregister_handler(&self, id: HandlerId) -> bool {
    let mut handlers = self.handlers.write();
    let before = handlers.len();
    handlers.retain(|(registered, _)| *registered != id);
    handlers.len() != before
  }
}

/// Net changes of one transaction relative to committed state
#[derive(Debug, Default)]
struct PendingDelta {
  /// Working copies of every live node the transaction touched
  touched: HashMap<NodeId, NodeRecord>,
  created: IndexSet<NodeId>,
  /// State of each deleted node just before deletion
  deleted: IndexMap<NodeId, NodeRecord>,
  labels_added: IndexSet<(NodeId, String)>,
  labels_deleted: IndexSet<(NodeId, String)>,
  props_set: IndexMap<(NodeId, String), PropValue>,
  props_deleted: IndexSet<(NodeId, String)>,
}

/// Write transaction. Dropping it without [`GraphTx::commit`] rolls back.
pub struct GraphTx<'g> {
  graph: &'g MemoryGraph,
  pending: PendingDelta,
}

impl<'g> GraphTx<'g> {
  // ========================================================================
  // Node Operations
  // ========================================================================

  /// Create a node carrying `labels`
  pub fn create_node(&mut self, labels: &[&str]) -> NodeId {
    let node_id = self.graph.alloc_node_id();
    self.pending.created.insert(node_id);
    self.pending.touched.insert(node_id, NodeRecord::new(node_id));
    for label in labels {
      self.pending.labels_added.insert((node_id, label.to_string()));
      if let Some(node) = self.pending.touched.get_mut(&node_id) {
        node.add_label(*label);
      }
    }
    node_id
  }

  /// Delete a node, removing its labels and properties first
  pub fn delete_node(&mut self, node_id: NodeId) -> Result<()> {
    let node = self.working(node_id)?.clone();
    for label in &node.labels {
      self.remove_label(node_id, label)?;
    }
    for key in node.props.keys() {
      self.remove_property(node_id, key)?;
    }

    self.pending.touched.remove(&node_id);
    if !self.pending.created.shift_remove(&node_id) {
      self.pending.deleted.insert(node_id, node);
    }
    Ok(())
  }

  /// Current state of a node as seen by this transaction
  pub fn node(&self, node_id: NodeId) -> Option<NodeRecord> {
    if self.pending.deleted.contains_key(&node_id) {
      return None;
    }
    match self.pending.touched.get(&node_id) {
      Some(node) => Some(node.clone()),
      None => self.graph.node(node_id),
    }
  }

  // ========================================================================
  // Labels
  // ========================================================================

  pub fn add_label(&mut self, node_id: NodeId, label: &str) -> Result<()> {
    if !self.working(node_id)?.add_label(label) {
      return Ok(());
    }
    let key = (node_id, label.to_string());
    if !self.pending.labels_deleted.shift_remove(&key) {
      self.pending.labels_added.insert(key);
    }
    Ok(())
  }

  pub fn remove_label(&mut self, node_id: NodeId, label: &str) -> Result<()> {
    if !self.working(node_id)?.remove_label(label) {
      return Ok(());
    }
    let key = (node_id, label.to_string());
    if !self.pending.labels_added.shift_remove(&key) {
      self.pending.labels_deleted.insert(key);
    }
    Ok(())
  }

  // ========================================================================
  // Properties
  // ========================================================================

  pub fn set_property(
    &mut self,
    node_id: NodeId,
    key: &str,
    value: impl Into<PropValue>,
  ) -> Result<()> {
    let value = value.into();
    self
      .working(node_id)?
      .props
      .insert(key.to_string(), value.clone());
    let key = (node_id, key.to_string());
    self.pending.props_deleted.shift_remove(&key);
    self.pending.props_set.insert(key, value);
    Ok(())
  }

  pub fn remove_property(&mut self, node_id: NodeId, key: &str) -> Result<()> {
    if self.working(node_id)?.props.shift_remove(key).is_none() {
      return Ok(());
    }
    let entry_key = (node_id, key.to_string());
    self.pending.props_set.shift_remove(&entry_key);
    if self.graph.committed_prop(node_id, key).is_some() {
      self.pending.props_deleted.insert(entry_key);
    }
    Ok(())
  }

  // ========================================================================
  // Commit / Rollback
  // ========================================================================

  /// Commit: run `before_commit` hooks, apply, then run `after_commit` hooks
  pub fn commit(mut self) {
    let graph = self.graph;
    let handlers: Vec<RegisteredHandler> = graph.handlers.read().clone();

    let after_commit = {
      // Serialize commits so hooks observe a stable committed state.
      let _commit_guard = graph.commit_lock.lock();
      self.rebase();
      let snapshot = self.snapshot();
      let staged: Vec<_> = handlers
        .iter()
        .map(|(_, handler)| (handler.clone(), handler.before_commit(&snapshot)))
        .collect();

      let PendingDelta {
        touched, deleted, ..
      } = self.pending;
      let mut nodes = graph.nodes.write();
      for (node_id, node) in touched {
        nodes.insert(node_id, node);
      }
      for node_id in deleted.keys() {
        nodes.remove(node_id);
      }
      staged
    };

    for (handler, operations) in after_commit {
      handler.after_commit(operations);
    }
  }

  /// Discard every pending change. Hooks are not invoked.
  pub fn rollback(self) {}

  /// Snapshot of the net changes made so far
  pub fn snapshot(&self) -> MutationSnapshot {
    let pending = &self.pending;
    let mut snapshot = MutationSnapshot::new();

    for node in pending.touched.values() {
      snapshot.put_node(node.clone());
    }
    for (&node_id, node) in &pending.deleted {
      snapshot.put_node(node.clone());
      snapshot.mark_deleted(node_id);
    }
    for &node_id in &pending.created {
      snapshot.push_created(node_id);
    }
    for (node, label) in &pending.labels_added {
      snapshot.push_assigned_label(LabelEntry {
        node: *node,
        label: label.clone(),
      });
    }
    for (node, label) in &pending.labels_deleted {
      snapshot.push_removed_label(LabelEntry {
        node: *node,
        label: label.clone(),
      });
    }
    for ((node, key), value) in &pending.props_set {
      snapshot.push_assigned_prop(PropertyEntry {
        node: *node,
        key: key.clone(),
        value: Some(value.clone()),
        previous: self.graph.committed_prop(*node, key),
      });
    }
    for (node, key) in &pending.props_deleted {
      snapshot.push_removed_prop(PropertyEntry {
        node: *node,
        key: key.clone(),
        value: None,
        previous: self.graph.committed_prop(*node, key),
      });
    }
    snapshot
  }

  /// Replay the net changes onto the latest committed state, so commits that
  /// landed since this transaction first touched a node are kept.
  fn rebase(&mut self) {
    let graph = self.graph;
    let nodes = graph.nodes.read();
    let pending = &mut self.pending;
    let mut vanished = Vec::new();

    for (node_id, working) in pending.touched.iter_mut() {
      if pending.created.contains(node_id) {
        continue;
      }
      match nodes.get(node_id) {
        Some(current) => *working = current.clone(),
        None => vanished.push(*node_id),
      }
    }
    for (node_id, before) in pending.deleted.iter_mut() {
      match nodes.get(node_id) {
        Some(current) => {
          for label in &current.labels {
            pending.labels_deleted.insert((*node_id, label.clone()));
          }
          for key in current.props.keys() {
            pending.props_deleted.insert((*node_id, key.clone()));
          }
          *before = current.clone();
        }
        None => vanished.push(*node_id),
      }
    }
    drop(nodes);

    // Deleted by a concurrent commit: nothing left to change or mirror.
    if !vanished.is_empty() {
      for node_id in &vanished {
        pending.touched.remove(node_id);
        pending.deleted.shift_remove(node_id);
      }
      pending.labels_added.retain(|(node, _)| !vanished.contains(node));
      pending.labels_deleted.retain(|(node, _)| !vanished.contains(node));
      pending.props_set.retain(|(node, _), _| !vanished.contains(node));
      pending.props_deleted.retain(|(node, _)| !vanished.contains(node));
    }

    for (node_id, label) in &pending.labels_deleted {
      if let Some(working) = pending.touched.get_mut(node_id) {
        working.remove_label(label);
      }
    }
    for (node_id, label) in &pending.labels_added {
      if let Some(working) = pending.touched.get_mut(node_id) {
        working.add_label(label.as_str());
      }
    }
    for (node_id, key) in &pending.props_deleted {
      if let Some(working) = pending.touched.get_mut(node_id) {
        working.props.shift_remove(key);
      }
    }
    for ((node_id, key), value) in &pending.props_set {
      if let Some(working) = pending.touched.get_mut(node_id) {
        working.props.insert(key.clone(), value.clone());
      }
    }
  }

  fn working(&mut self, node_id: NodeId) -> Result<&mut NodeRecord> {
    if self.pending.deleted.contains_key(&node_id) {
      return Err(SearchSyncError::NodeNotFound(node_id));
    }
    if !self.pending.touched.contains_key(&node_id) {
      let committed = self
        .graph
        .node(node_id)
        .ok_or(SearchSyncError::NodeNotFound(node_id))?;
      self.pending.touched.insert(node_id, committed);
    }
    self
      .pending
      .touched
      .get_mut(&node_id)
      .ok_or(SearchSyncError::NodeNotFound(node_id))
  }
}
