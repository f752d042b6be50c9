//! In-memory transport that records bulk requests

use parking_lot::Mutex;

use super::{BulkCompletion, SearchTransport};
use crate::action::CandidateOperation;
use crate::bulk::{BulkRequest, BulkResponse};
use crate::error::{Result, SearchSyncError};

/// Failure injected into every subsequent request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryFailure {
  /// The whole request fails at the transport level
  Transport(String),
  /// The request goes through but every item is rejected
  RejectItems { status: u16, reason: String },
}

/// Records requests instead of sending them.
///
/// Async submissions are recorded before returning and complete on a fresh
/// thread.
#[derive(Debug, Default)]
pub struct MemoryTransport {
  requests: Mutex<Vec<BulkRequest>>,
  failure: Mutex<Option<MemoryFailure>>,
}

impl MemoryTransport {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn fail_with(&self, failure: Option<MemoryFailure>) {
    *self.failure.lock() = failure;
  }

  pub fn requests(&self) -> Vec<BulkRequest> {
    self.requests.lock().clone()
  }

  pub fn request_count(&self) -> usize {
    self.requests.lock().len()
  }

  /// Every operation received so far, across requests
  pub fn operations(&self) -> Vec<CandidateOperation> {
    self
      .requests
      .lock()
      .iter()
      .flat_map(|request| request.operations.iter().cloned())
      .collect()
  }

  pub fn clear(&self) {
    self.requests.lock().clear();
  }

  fn record(&self, request: &BulkRequest) -> Result<BulkResponse> {
    self.requests.lock().push(request.clone());

    let failure = self.failure.lock().clone();
    match failure {
      None => Ok(BulkResponse::acknowledge(request)),
      Some(MemoryFailure::Transport(message)) => Err(SearchSyncError::Transport(message)),
      Some(MemoryFailure::RejectItems { status, reason }) => {
        let mut response = BulkResponse::acknowledge(request);
        for item in &mut response.items {
          item.status = status;
          item.error = Some(reason.clone());
        }
        Ok(response)
      }
    }
  }
}

impl SearchTransport for MemoryTransport {
  fn execute(&self, request: &BulkRequest) -> Result<BulkResponse> {
    self.record(request)
  }

  fn execute_async(&self, request: BulkRequest, on_complete: BulkCompletion) {
    let result = self.record(&request);
    std::thread::spawn(move || on_complete(result));
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn injected_failures_apply_until_cleared() {
    let transport = MemoryTransport::new();
    let request = BulkRequest::new(vec![CandidateOperation::delete("idx", "L", "1")]);

    transport.fail_with(Some(MemoryFailure::Transport("down".to_string())));
    assert!(transport.execute(&request).is_err());

    transport.fail_with(Some(MemoryFailure::RejectItems {
      status: 400,
      reason: "mapper_parsing_exception".to_string(),
    }));
    let response = transport.execute(&request).expect("response");
    assert!(!response.is_success());

    transport.fail_with(None);
    assert!(transport.execute(&request).expect("response").is_success());
    assert_eq!(transport.request_count(), 3);
  }
}
