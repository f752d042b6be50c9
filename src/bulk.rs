//! Bulk request/response payloads and the `_bulk` NDJSON wire codec.

use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt::Write as _;

use crate::action::{CandidateOperation, OperationKind};
use crate::error::{Result, SearchSyncError};
use crate::merge::OperationSet;

pub const BULK_CONTENT_TYPE: &str = "application/x-ndjson";

/// Painless script used for updates: replaces each top-level field of the
/// stored document, so the nested `properties` object is swapped wholesale
/// and removed properties disappear. Update lines also carry the document as
/// `upsert`, so a missing target is created instead of rejected.
pub const UPDATE_SCRIPT: &str = "ctx._source.putAll(params.doc)";

/// One batched submission of write operations, in operation-set order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkRequest {
  pub operations: Vec<CandidateOperation>,
}

impl BulkRequest {
  pub fn new(operations: Vec<CandidateOperation>) -> Self {
    Self { operations }
  }

  pub fn len(&self) -> usize {
    self.operations.len()
  }

  pub fn is_empty(&self) -> bool {
    self.operations.is_empty()
  }

  /// Encode as `_bulk` NDJSON. Every line, the last included, ends in `\n`.
  pub fn to_ndjson(&self, include_type: bool) -> Result<String> {
    let mut out = String::new();
    for op in &self.operations {
      let mut meta = serde_json::Map::new();
      meta.insert("_index".to_string(), Value::String(op.index.clone()));
      if include_type {
        meta.insert("_type".to_string(), Value::String(op.doc_type.clone()));
      }
      meta.insert("_id".to_string(), Value::String(op.id.clone()));

      let mut action = serde_json::Map::new();
      action.insert(op.kind.to_string(), Value::Object(meta));
      push_line(&mut out, &Value::Object(action))?;

      match (op.kind, op.body.as_ref()) {
        (OperationKind::Index, Some(body)) => push_line(&mut out, &serde_json::to_value(body)?)?,
        (OperationKind::Update, Some(body)) => {
          let doc = serde_json::to_value(body)?;
          let script = json!({
            "script": {
              "lang": "painless",
              "source": UPDATE_SCRIPT,
              "params": { "doc": doc.clone() },
            },
            "upsert": doc,
          });
          push_line(&mut out, &script)?;
        }
        (OperationKind::Delete, _) => {}
        (kind, None) => {
          return Err(SearchSyncError::Serialization(format!(
            "{kind} operation for {} has no body",
            op.key()
          )))
        }
      }
    }
    Ok(out)
  }
}

impl From<OperationSet> for BulkRequest {
  fn from(set: OperationSet) -> Self {
    Self::new(set.into_operations())
  }
}

fn push_line(out: &mut String, value: &Value) -> Result<()> {
  let line = serde_json::to_string(value)?;
  writeln!(out, "{line}").map_err(|e| SearchSyncError::Serialization(e.to_string()))
}

/// Result of one operation inside a bulk request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItemOutcome {
  pub kind: OperationKind,
  pub index: String,
  pub id: String,
  pub status: u16,
  pub error: Option<String>,
}

impl BulkItemOutcome {
  /// 2xx, or 404 on a delete (document already gone)
  pub fn is_success(&self) -> bool {
    match self.kind {
      OperationKind::Delete if self.status == 404 => true,
      _ => self.error.is_none() && (200..300).contains(&self.status),
    }
  }
}

/// Transport answer for one bulk request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkResponse {
  pub took_ms: Option<u64>,
  pub items: Vec<BulkItemOutcome>,
  /// Transport-level error message, if any
  pub error: Option<String>,
}

impl BulkResponse {
  pub fn is_success(&self) -> bool {
    self.error.is_none() && self.items.iter().all(BulkItemOutcome::is_success)
  }

  pub fn failed_items(&self) -> impl Iterator<Item = &BulkItemOutcome> {
    self.items.iter().filter(|item| !item.is_success())
  }

  /// Successful response acknowledging every operation of `request`
  pub fn acknowledge(request: &BulkRequest) -> Self {
    let items = request
      .operations
      .iter()
      .map(|op| BulkItemOutcome {
        kind: op.kind,
        index: op.index.clone(),
        id: op.id.clone(),
        status: match op.kind {
          OperationKind::Index => 201,
          OperationKind::Update | OperationKind::Delete => 200,
        },
        error: None,
      })
      .collect();
    Self {
      took_ms: Some(0),
      items,
      error: None,
    }
  }
}

#[derive(Debug, Deserialize)]
struct RawBulkResponse {
  took: Option<u64>,
  #[serde(default)]
  errors: bool,
  #[serde(default)]
  items: Vec<HashMap<String, RawBulkItem>>,
}

#[derive(Debug, Deserialize)]
struct RawBulkItem {
  #[serde(rename = "_index", default)]
  index: String,
  #[serde(rename = "_id", default)]
  id: String,
  status: u16,
  error: Option<Value>,
}

/// Decode a `_bulk` response body
pub fn decode_bulk_response(body: &[u8]) -> Result<BulkResponse> {
  let raw: RawBulkResponse = serde_json::from_slice(body)
    .map_err(|e| SearchSyncError::Serialization(format!("decode bulk response: {e}")))?;

  let mut items = Vec::with_capacity(raw.items.len());
  for entry in raw.items {
    let (action, item) = entry.into_iter().next().ok_or_else(|| {
      SearchSyncError::Serialization("bulk response item without action".to_string())
    })?;
    let kind = match action.as_str() {
      "index" | "create" => OperationKind::Index,
      "update" => OperationKind::Update,
      "delete" => OperationKind::Delete,
      other => {
        return Err(SearchSyncError::Serialization(format!(
          "unknown bulk action in response: {other}"
        )))
      }
    };
    items.push(BulkItemOutcome {
      kind,
      index: item.index,
      id: item.id,
      status: item.status,
      error: item.error.map(|error| error_reason(&error)),
    });
  }

  let error = if raw.errors && items.is_empty() {
    Some("bulk response flagged errors without items".to_string())
  } else {
    None
  };

  Ok(BulkResponse {
    took_ms: raw.took,
    items,
    error,
  })
}

fn error_reason(error: &Value) -> String {
  match error.get("reason").and_then(Value::as_str) {
    Some(reason) => match error.get("type").and_then(Value::as_str) {
      Some(kind) => format!("{kind}: {reason}"),
      None => reason.to_string(),
    },
    None => error.to_string(),
  }
}
