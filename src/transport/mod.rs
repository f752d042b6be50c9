//! Search transports that execute bulk requests.
//!
//! The engine only talks to [`SearchTransport`]. One instance is shared by
//! every committing thread, so implementations must be safe for concurrent
//! use.

pub mod http;
pub mod memory;

pub use http::HttpTransport;
pub use memory::MemoryTransport;

use crate::bulk::{BulkRequest, BulkResponse};
use crate::error::Result;

/// Callback invoked once an asynchronous bulk submission finishes.
///
/// Runs on whatever thread the transport completes on.
pub type BulkCompletion = Box<dyn FnOnce(Result<BulkResponse>) + Send + 'static>;

pub trait SearchTransport: Send + Sync {
  /// Execute a bulk request, blocking until the transport answers
  fn execute(&self, request: &BulkRequest) -> Result<BulkResponse>;

  /// Submit a bulk request and return immediately
  fn execute_async(&self, request: BulkRequest, on_complete: BulkCompletion);

  /// Release transport resources; called once on extension shutdown
  fn shutdown(&self) {}
}
