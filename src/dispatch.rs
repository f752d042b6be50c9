//! Post-commit dispatch of operation sets
//!
//! Packages one transaction's operations into a single bulk request and hands
//! it to the shared transport. Outcomes are only logged: nothing is retried and
//! nothing flows back into the already committed transaction.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::bulk::{BulkRequest, BulkResponse};
use crate::error::{Result, SearchSyncError};
use crate::merge::OperationSet;
use crate::transport::SearchTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
  /// Block the committing thread until the transport answers
  Sync,
  /// Return immediately; completion is logged on the transport's thread
  #[default]
  Async,
}

impl fmt::Display for DispatchMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let value = match self {
      DispatchMode::Sync => "sync",
      DispatchMode::Async => "async",
    };
    write!(f, "{value}")
  }
}

impl FromStr for DispatchMode {
  type Err = SearchSyncError;

  fn from_str(raw: &str) -> Result<Self> {
    match raw {
      "sync" => Ok(Self::Sync),
      "async" => Ok(Self::Async),
      _ => Err(SearchSyncError::InvalidConfig(format!(
        "invalid dispatch mode: {raw}"
      ))),
    }
  }
}

/// What happened to one dispatch call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchStatus {
  /// Nothing to send; the transport was not called
  Skipped,
  /// Handed to the transport; completion arrives out of band
  Submitted,
  /// Synchronous call answered by the transport
  Completed(BulkResponse),
  /// Synchronous call failed at the transport level
  Failed(String),
}

pub struct Dispatcher {
  transport: Arc<dyn SearchTransport>,
  use_async: AtomicBool,
}

impl fmt::Debug for Dispatcher {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Dispatcher")
      .field("mode", &self.mode())
      .finish_non_exhaustive()
  }
}

impl Dispatcher {
  pub fn new(transport: Arc<dyn SearchTransport>, mode: DispatchMode) -> Self {
    Self {
      transport,
      use_async: AtomicBool::new(mode == DispatchMode::Async),
    }
  }

  pub fn mode(&self) -> DispatchMode {
    if self.use_async.load(Ordering::Acquire) {
      DispatchMode::Async
    } else {
      DispatchMode::Sync
    }
  }

  pub fn set_mode(&self, mode: DispatchMode) {
    self
      .use_async
      .store(mode == DispatchMode::Async, Ordering::Release);
  }

  pub fn transport(&self) -> &Arc<dyn SearchTransport> {
    &self.transport
  }

  /// Send `operations` as one bulk request. Never fails.
  pub fn dispatch(&self, operations: OperationSet) -> DispatchStatus {
    if operations.is_empty() {
      return DispatchStatus::Skipped;
    }

    let request = BulkRequest::from(operations);
    let count = request.len();
    match self.mode() {
      DispatchMode::Async => {
        tracing::trace!(operations = count, "submitting bulk request");
        self
          .transport
          .execute_async(request, Box::new(move |result| log_completion(count, &result)));
        DispatchStatus::Submitted
      }
      DispatchMode::Sync => {
        let result = self.transport.execute(&request);
        log_completion(count, &result);
        match result {
          Ok(response) => DispatchStatus::Completed(response),
          Err(error) => DispatchStatus::Failed(error.to_string()),
        }
      }
    }
  }
}

/// Completion handler: records the outcome and nothing else
pub fn log_completion(operations: usize, result: &Result<BulkResponse>) {
  match result {
    Ok(response) if response.is_success() => {
      tracing::debug!(
        operations,
        took_ms = response.took_ms,
        "search index update succeeded"
      );
    }
    Ok(response) => {
      if let Some(error) = response.error.as_deref() {
        tracing::error!(operations, error, "search index update failed");
      }
      for item in response.failed_items() {
        tracing::error!(
          action = %item.kind,
          index = %item.index,
          id = %item.id,
          status = item.status,
          error = item.error.as_deref().unwrap_or("unknown"),
          "search index rejected operation"
        );
      }
    }
    Err(error) => {
      tracing::warn!(operations, error = %error, "problem updating search index");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::action::CandidateOperation;
  use crate::transport::memory::{MemoryFailure, MemoryTransport};
  use std::time::Duration;

  fn one_delete() -> OperationSet {
    let mut set = OperationSet::new();
    set.insert(CandidateOperation::delete("idx", "L", "1"));
    set
  }

  #[test]
  fn empty_set_never_reaches_transport() {
    let transport = Arc::new(MemoryTransport::new());
    let dispatcher = Dispatcher::new(transport.clone(), DispatchMode::Sync);
    assert_eq!(dispatcher.dispatch(OperationSet::new()), DispatchStatus::Skipped);
    dispatcher.set_mode(DispatchMode::Async);
    assert_eq!(dispatcher.dispatch(OperationSet::new()), DispatchStatus::Skipped);
    assert_eq!(transport.request_count(), 0);
  }

  #[test]
  fn sync_dispatch_reports_transport_outcome() {
    let transport = Arc::new(MemoryTransport::new());
    let dispatcher = Dispatcher::new(transport.clone(), DispatchMode::Sync);

    match dispatcher.dispatch(one_delete()) {
      DispatchStatus::Completed(response) => assert!(response.is_success()),
      other => panic!("unexpected status: {other:?}"),
    }

    transport.fail_with(Some(MemoryFailure::Transport("connection refused".to_string())));
    match dispatcher.dispatch(one_delete()) {
      DispatchStatus::Failed(message) => assert!(message.contains("connection refused")),
      other => panic!("unexpected status: {other:?}"),
    }
    assert_eq!(transport.request_count(), 2);
  }

  struct ChannelTransport {
    inner: MemoryTransport,
    done: crossbeam_channel::Sender<bool>,
  }

  impl SearchTransport for ChannelTransport {
    fn execute(&self, request: &BulkRequest) -> Result<BulkResponse> {
      self.inner.execute(request)
    }

    fn execute_async(&self, request: BulkRequest, on_complete: crate::transport::BulkCompletion) {
      let done = self.done.clone();
      self.inner.execute_async(
        request,
        Box::new(move |result| {
          let ok = result.is_ok();
          on_complete(result);
          let _ = done.send(ok);
        }),
      );
    }
  }

  #[test]
  fn async_dispatch_returns_before_completion() {
    let (done, completed) = crossbeam_channel::unbounded();
    let transport = Arc::new(ChannelTransport {
      inner: MemoryTransport::new(),
      done,
    });
    let dispatcher = Dispatcher::new(transport.clone(), DispatchMode::Async);

    assert_eq!(dispatcher.dispatch(one_delete()), DispatchStatus::Submitted);
    assert_eq!(completed.recv_timeout(Duration::from_secs(5)), Ok(true));

    transport
      .inner
      .fail_with(Some(MemoryFailure::Transport("timeout".to_string())));
    assert_eq!(dispatcher.dispatch(one_delete()), DispatchStatus::Submitted);
    assert_eq!(completed.recv_timeout(Duration::from_secs(5)), Ok(false));
    assert_eq!(transport.inner.request_count(), 2);
  }

  #[test]
  fn dispatch_mode_parses() {
    assert_eq!("sync".parse::<DispatchMode>().expect("parse"), DispatchMode::Sync);
    assert_eq!(DispatchMode::default().to_string(), "async");
    assert!("later".parse::<DispatchMode>().is_err());
  }
}
