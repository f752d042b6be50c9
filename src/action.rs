//! Candidate index operations per change category
//!
//! The builder turns one node plus one kind of change into zero or more
//! [`CandidateOperation`]s. Deduplication across categories happens later in
//! [`crate::merge`].

use std::fmt;

use crate::document::Document;
use crate::error::{Result, SearchSyncError};
use crate::index_spec::IndexSpecTable;
use crate::snapshot::TransactionData;
use crate::types::{NodeId, NodeRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
  /// Full upsert of the document
  Index,
  /// Partial update of an existing document
  Update,
  Delete,
}

impl fmt::Display for OperationKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let value = match self {
      OperationKind::Index => "index",
      OperationKind::Update => "update",
      OperationKind::Delete => "delete",
    };
    write!(f, "{value}")
  }
}

/// Deduplication key: one operation per (index, document id) per transaction
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationKey {
  pub index: String,
  pub id: String,
}

impl OperationKey {
  pub fn new(index: impl Into<String>, id: impl Into<String>) -> Self {
    Self {
      index: index.into(),
      id: id.into(),
    }
  }
}

impl fmt::Display for OperationKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.index, self.id)
  }
}

/// One proposed write before deduplication
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateOperation {
  pub kind: OperationKind,
  pub index: String,
  /// Matched label, or the catch-all type
  pub doc_type: String,
  pub id: String,
  /// Present for index and update, absent for delete
  pub body: Option<Document>,
}

impl CandidateOperation {
  pub fn index(index: &str, doc_type: &str, id: &str, body: Document) -> Self {
    Self::with_body(OperationKind::Index, index, doc_type, id, Some(body))
  }

  pub fn update(index: &str, doc_type: &str, id: &str, body: Document) -> Self {
    Self::with_body(OperationKind::Update, index, doc_type, id, Some(body))
  }

  pub fn delete(index: &str, doc_type: &str, id: &str) -> Self {
    Self::with_body(OperationKind::Delete, index, doc_type, id, None)
  }

  fn with_body(
    kind: OperationKind,
    index: &str,
    doc_type: &str,
    id: &str,
    body: Option<Document>,
  ) -> Self {
    Self {
      kind,
      index: index.to_string(),
      doc_type: doc_type.to_string(),
      id: id.to_string(),
      body,
    }
  }

  pub fn key(&self) -> OperationKey {
    OperationKey::new(self.index.clone(), self.id.clone())
  }
}

/// Kinds of change a transaction reports, in processing order.
///
/// Later categories overwrite earlier ones for the same [`OperationKey`], so
/// this order decides the net effect of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeCategory {
  Created,
  LabelsAssigned,
  LabelsRemoved,
  PropertiesAssigned,
  PropertiesRemoved,
}

impl ChangeCategory {
  pub const ORDER: [ChangeCategory; 5] = [
    ChangeCategory::Created,
    ChangeCategory::LabelsAssigned,
    ChangeCategory::LabelsRemoved,
    ChangeCategory::PropertiesAssigned,
    ChangeCategory::PropertiesRemoved,
  ];
}

impl fmt::Display for ChangeCategory {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let value = match self {
      ChangeCategory::Created => "created",
      ChangeCategory::LabelsAssigned => "labels_assigned",
      ChangeCategory::LabelsRemoved => "labels_removed",
      ChangeCategory::PropertiesAssigned => "properties_assigned",
      ChangeCategory::PropertiesRemoved => "properties_removed",
    };
    write!(f, "{value}")
  }
}

type UpsertFn = fn(&str, &str, &str, Document) -> CandidateOperation;

/// Builds candidate operations against a fixed [`IndexSpecTable`]
#[derive(Debug, Clone, Copy)]
pub struct ActionBuilder<'a> {
  table: &'a IndexSpecTable,
}

impl<'a> ActionBuilder<'a> {
  pub fn new(table: &'a IndexSpecTable) -> Self {
    Self { table }
  }

  /// All candidates for one change category of a transaction, in entry order
  pub fn build(
    &self,
    category: ChangeCategory,
    data: &dyn TransactionData,
  ) -> Result<Vec<CandidateOperation>> {
    let mut ops = Vec::new();
    match category {
      ChangeCategory::Created => {
        for &node_id in data.created_nodes() {
          ops.extend(self.index_requests(lookup(data, node_id)?));
        }
      }
      ChangeCategory::LabelsAssigned => {
        for entry in data.assigned_labels() {
          let node = lookup(data, entry.node)?;
          if data.is_deleted(entry.node) {
            ops.extend(self.delete_requests_for_label(node, &entry.label));
          } else {
            ops.extend(self.index_requests_for_label(node, &entry.label));
          }
        }
      }
      ChangeCategory::LabelsRemoved => {
        for entry in data.removed_labels() {
          let node = lookup(data, entry.node)?;
          ops.extend(self.delete_requests_for_label(node, &entry.label));
        }
      }
      ChangeCategory::PropertiesAssigned => {
        for entry in data.assigned_node_properties() {
          ops.extend(self.index_requests(lookup(data, entry.node)?));
        }
      }
      ChangeCategory::PropertiesRemoved => {
        for entry in data.removed_node_properties() {
          if data.is_deleted(entry.node) {
            continue;
          }
          ops.extend(self.update_requests(lookup(data, entry.node)?));
        }
      }
    }
    Ok(ops)
  }

  /// Index writes for every binding of every label the node carries
  pub fn index_requests(&self, node: &NodeRecord) -> Vec<CandidateOperation> {
    self.upserts(node, CandidateOperation::index, node.labels.iter().map(String::as_str))
  }

  /// Index writes for the bindings of one newly assigned label
  pub fn index_requests_for_label(&self, node: &NodeRecord, label: &str) -> Vec<CandidateOperation> {
    self.upserts(node, CandidateOperation::index, [label])
  }

  /// Partial updates for every binding of every label the node carries
  pub fn update_requests(&self, node: &NodeRecord) -> Vec<CandidateOperation> {
    self.upserts(node, CandidateOperation::update, node.labels.iter().map(String::as_str))
  }

  /// Deletes for the bindings of `label`, plus the catch-all document.
  ///
  /// Emitted even when the node keeps other indexed labels.
  pub fn delete_requests_for_label(&self, node: &NodeRecord, label: &str) -> Vec<CandidateOperation> {
    let id = node.doc_id();
    let mut ops = Vec::new();
    if let Some(all) = self.table.catch_all_index() {
      ops.push(CandidateOperation::delete(all, self.table.catch_all_type(), &id));
    }
    for spec in self.table.specs_for(label) {
      ops.push(CandidateOperation::delete(spec.index_name(), label, &id));
    }
    ops
  }

  fn upserts<'l>(
    &self,
    node: &NodeRecord,
    make: UpsertFn,
    labels: impl IntoIterator<Item = &'l str>,
  ) -> Vec<CandidateOperation> {
    let id = node.doc_id();
    let fields = self.table.document_fields();
    let mut ops = Vec::new();

    if let Some(all) = self.table.catch_all_index() {
      let body = Document::from_node(node, None, fields);
      ops.push(make(all, self.table.catch_all_type(), &id, body));
    }

    for label in labels {
      for spec in self.table.specs_for(label) {
        let body = Document::from_node(node, Some(spec.properties()), fields);
        ops.push(make(spec.index_name(), label, &id, body));
      }
    }
    ops
  }
}

fn lookup(data: &dyn TransactionData, node: NodeId) -> Result<&NodeRecord> {
  data.node(node).ok_or(SearchSyncError::NodeNotFound(node))
}
