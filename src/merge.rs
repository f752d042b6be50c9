//! Per-transaction merge of candidate operations
//!
//! Candidates from every change category are folded into one map keyed by
//! [`OperationKey`]. Categories run in [`ChangeCategory::ORDER`] and a later
//! candidate replaces an earlier one for the same key, so a node created and
//! then stripped of its label in the same transaction nets to a delete.

use indexmap::IndexMap;

use crate::action::{ActionBuilder, CandidateOperation, ChangeCategory, OperationKey};
use crate::error::Result;
use crate::index_spec::IndexSpecTable;
use crate::snapshot::TransactionData;

/// Final, deduplicated operations of one transaction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationSet {
  ops: IndexMap<OperationKey, CandidateOperation>,
}

impl OperationSet {
  pub fn new() -> Self {
    Self::default()
  }

  /// Store `op` under its key, returning whatever it replaced.
  ///
  /// A replaced key keeps its original position.
  pub fn insert(&mut self, op: CandidateOperation) -> Option<CandidateOperation> {
    self.ops.insert(op.key(), op)
  }

  pub fn extend(&mut self, ops: impl IntoIterator<Item = CandidateOperation>) {
    for op in ops {
      self.insert(op);
    }
  }

  pub fn get(&self, key: &OperationKey) -> Option<&CandidateOperation> {
    self.ops.get(key)
  }

  pub fn len(&self) -> usize {
    self.ops.len()
  }

  pub fn is_empty(&self) -> bool {
    self.ops.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &CandidateOperation> {
    self.ops.values()
  }

  pub fn into_operations(self) -> Vec<CandidateOperation> {
    self.ops.into_values().collect()
  }
}

impl IntoIterator for OperationSet {
  type Item = CandidateOperation;
  type IntoIter = indexmap::map::IntoValues<OperationKey, CandidateOperation>;

  fn into_iter(self) -> Self::IntoIter {
    self.ops.into_values()
  }
}

/// Translate one transaction's mutations into its net index operations
pub fn translate(table: &IndexSpecTable, data: &dyn TransactionData) -> Result<OperationSet> {
  let builder = ActionBuilder::new(table);
  let mut set = OperationSet::new();
  for category in ChangeCategory::ORDER {
    set.extend(builder.build(category, data)?);
  }
  Ok(set)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::action::OperationKind;
  use crate::snapshot::MutationSnapshot;
  use crate::types::NodeRecord;
  use rand::{rngs::StdRng, Rng, SeedableRng};

  #[test]
  fn later_insert_replaces_but_keeps_position() {
    let mut set = OperationSet::new();
    set.insert(CandidateOperation::delete("a", "L", "1"));
    set.insert(CandidateOperation::delete("b", "L", "1"));
    let replaced = set.insert(CandidateOperation::delete("a", "M", "1"));

    assert_eq!(replaced.map(|op| op.doc_type), Some("L".to_string()));
    assert_eq!(set.len(), 2);
    let order: Vec<(String, String)> = set
      .iter()
      .map(|op| (op.index.clone(), op.doc_type.clone()))
      .collect();
    assert_eq!(
      order,
      vec![
        ("a".to_string(), "M".to_string()),
        ("b".to_string(), "L".to_string()),
      ]
    );
  }

  #[test]
  fn empty_transaction_yields_empty_set() {
    let table = IndexSpecTable::parse("idx:A", Some("all"), true, true).expect("parse");
    let set = translate(&table, &MutationSnapshot::new()).expect("translate");
    assert!(set.is_empty());
  }

  #[test]
  fn random_event_mixes_keep_one_operation_per_key() {
    let table = IndexSpecTable::parse("i1:A;i2:A(x);i3:B", Some("all"), true, true).expect("parse");
    let labels = ["A", "B", "C"];
    let mut rng = StdRng::seed_from_u64(0x5eed_cafe);

    for _ in 0..500 {
      let mut data = MutationSnapshot::new();
      for id in 0..4u64 {
        let mut node = NodeRecord::new(id).with_prop("x", id as i64);
        for label in labels {
          if rng.gen_bool(0.5) {
            node = node.with_label(label);
          }
        }
        data = data.with_node(node);
        if rng.gen_bool(0.3) {
          data = data.created(id);
        }
        if rng.gen_bool(0.3) {
          data = data.label_assigned(id, labels[rng.gen_range(0..labels.len())]);
        }
        if rng.gen_bool(0.3) {
          data = data.label_removed(id, labels[rng.gen_range(0..labels.len())]);
        }
        if rng.gen_bool(0.3) {
          data = data.property_assigned(id, "x", 1);
        }
        if rng.gen_bool(0.3) {
          data = data.property_removed(id, "y");
        }
        if rng.gen_bool(0.2) {
          data = data.deleted(id);
        }
      }

      let set = translate(&table, &data).expect("translate");
      let mut keys: Vec<OperationKey> = set.iter().map(CandidateOperation::key).collect();
      let total = keys.len();
      keys.sort();
      keys.dedup();
      assert_eq!(keys.len(), total);

      for op in set.iter() {
        assert_eq!(op.body.is_none(), op.kind == OperationKind::Delete);
      }
    }
  }
}
