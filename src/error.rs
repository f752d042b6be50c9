//! Error types for the search sync engine

use thiserror::Error;

use crate::types::NodeId;

/// Errors produced while configuring, translating or shipping index writes
#[derive(Debug, Error)]
pub enum SearchSyncError {
  #[error("Invalid index spec: {0}")]
  InvalidIndexSpec(String),

  #[error("Index {index} is declared twice for label {label}")]
  DuplicateIndexSpec { index: String, label: String },

  #[error("Invalid configuration: {0}")]
  InvalidConfig(String),

  #[error("Handler already registered")]
  AlreadyRegistered,

  #[error("Node not found: {0}")]
  NodeNotFound(NodeId),

  #[error("Transport error: {0}")]
  Transport(String),

  #[error("Transport returned HTTP {status}: {body}")]
  TransportStatus { status: u16, body: String },

  #[error("Serialization error: {0}")]
  Serialization(String),

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SearchSyncError>;

impl From<serde_json::Error> for SearchSyncError {
  fn from(error: serde_json::Error) -> Self {
    SearchSyncError::Serialization(error.to_string())
  }
}
