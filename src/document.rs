//! Search document bodies built from node state

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use crate::index_spec::DocumentFields;
use crate::types::{NodeRecord, PropValue};

/// Document body sent to the search index.
///
/// Node properties live one level down under `properties` so they can never
/// collide with the reserved `id` and `labels` keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub labels: Option<Vec<String>>,
  pub properties: IndexMap<String, PropValue>,
}

impl Document {
  /// Build a document for `node`.
  ///
  /// `subset` restricts `properties` to the named keys the node actually
  /// carries, in subset order. `None` or an empty subset copies every property.
  pub fn from_node(
    node: &NodeRecord,
    subset: Option<&IndexSet<String>>,
    fields: DocumentFields,
  ) -> Self {
    let id = fields.contains(DocumentFields::ID).then(|| node.doc_id());
    let labels = fields
      .contains(DocumentFields::LABELS)
      .then(|| node.labels.clone());

    let properties = match subset {
      Some(subset) if !subset.is_empty() => subset
        .iter()
        .filter_map(|key| node.prop(key).map(|value| (key.clone(), value.clone())))
        .collect(),
      _ => node.props.clone(),
    };

    Self {
      id,
      labels,
      properties,
    }
  }

  pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
    serde_json::to_value(self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn sample() -> NodeRecord {
    NodeRecord::new(42)
      .with_label("Person")
      .with_label("Employee")
      .with_prop("name", "Ann")
      .with_prop("age", 30)
  }

  #[test]
  fn full_document_has_id_labels_and_all_properties() {
    let doc = Document::from_node(&sample(), None, DocumentFields::all());
    assert_eq!(
      doc.to_json().expect("json"),
      json!({
        "id": "42",
        "labels": ["Person", "Employee"],
        "properties": {"name": "Ann", "age": 30}
      })
    );
  }

  #[test]
  fn subset_omits_missing_properties() {
    let subset: IndexSet<String> = ["age", "email"].iter().map(|s| s.to_string()).collect();
    let doc = Document::from_node(&sample(), Some(&subset), DocumentFields::empty());
    assert_eq!(doc.to_json().expect("json"), json!({"properties": {"age": 30}}));
  }

  #[test]
  fn empty_subset_means_every_property() {
    let doc = Document::from_node(&sample(), Some(&IndexSet::new()), DocumentFields::ID);
    assert_eq!(doc.properties.len(), 2);
    assert_eq!(doc.id.as_deref(), Some("42"));
    assert!(doc.labels.is_none());
  }

  #[test]
  fn shape_flags_round_trip() {
    let node = sample();
    let bare = Document::from_node(&node, None, DocumentFields::empty());
    assert_eq!(
      bare.to_json().expect("json"),
      json!({"properties": {"name": "Ann", "age": 30}})
    );

    let full = Document::from_node(&node, None, DocumentFields::ID | DocumentFields::LABELS);
    assert_eq!(full.id.as_deref(), Some("42"));
    assert_eq!(
      full.labels,
      Some(vec!["Person".to_string(), "Employee".to_string()])
    );
    assert_eq!(full.properties, bare.properties);
  }
}
