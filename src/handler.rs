//! Transaction hooks that tie translation and dispatch together

use std::fmt;
use std::sync::Arc;

use crate::dispatch::{DispatchMode, DispatchStatus, Dispatcher};
use crate::index_spec::IndexSpecTable;
use crate::merge::{translate, OperationSet};
use crate::snapshot::TransactionData;
use crate::transport::SearchTransport;

/// Hooks a host invokes around each write transaction.
///
/// `before_commit` runs on the committing thread after the in-memory
/// mutations are applied and before they become durable. Whatever it returns
/// is handed back to `after_commit` once the commit has succeeded, or to
/// `after_rollback` if it did not.
pub trait TransactionEventHandler: Send + Sync {
  fn before_commit(&self, data: &dyn TransactionData) -> OperationSet;

  fn after_commit(&self, operations: OperationSet);

  fn after_rollback(&self, _operations: OperationSet) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(pub u64);

impl fmt::Display for HandlerId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "handler-{}", self.0)
  }
}

/// Host side of handler registration
pub trait HandlerRegistry {
  fn register_handler(&self, handler: Arc<dyn TransactionEventHandler>) -> HandlerId;

  /// Returns false if `id` was not registered
  fn unregister_handler(&self, id: HandlerId) -> bool;
}

/// Mirrors committed transactions into the search index
#[derive(Debug)]
pub struct SearchSyncHandler {
  table: Arc<IndexSpecTable>,
  dispatcher: Dispatcher,
}

impl SearchSyncHandler {
  pub fn new(
    table: Arc<IndexSpecTable>,
    transport: Arc<dyn SearchTransport>,
    mode: DispatchMode,
  ) -> Self {
    Self {
      table,
      dispatcher: Dispatcher::new(transport, mode),
    }
  }

  pub fn table(&self) -> &IndexSpecTable {
    &self.table
  }

  pub fn dispatcher(&self) -> &Dispatcher {
    &self.dispatcher
  }

  pub fn set_dispatch_mode(&self, mode: DispatchMode) {
    self.dispatcher.set_mode(mode);
  }

  /// Translate a transaction, dropping its contribution on failure
  pub fn translate(&self, data: &dyn TransactionData) -> OperationSet {
    match translate(&self.table, data) {
      Ok(operations) => operations,
      Err(error) => {
        tracing::error!(error = %error, "failed to translate transaction for search index");
        OperationSet::new()
      }
    }
  }

  pub fn dispatch(&self, operations: OperationSet) -> DispatchStatus {
    self.dispatcher.dispatch(operations)
  }
}

impl TransactionEventHandler for SearchSyncHandler {
  fn before_commit(&self, data: &dyn TransactionData) -> OperationSet {
    self.translate(data)
  }

  fn after_commit(&self, operations: OperationSet) {
    self.dispatch(operations);
  }
}
