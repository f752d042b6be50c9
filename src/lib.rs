//! KiteDB search sync
//!
//! Mirrors graph transactions into an Elasticsearch-compatible search index.
//!
//! Each committing transaction is translated into a deduplicated
//! [`OperationSet`] (one index, update or delete per target index and node),
//! which is then shipped as a single `_bulk` request once the commit is final.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use kitedb_search::{MemoryGraph, MemoryTransport, SearchSyncConfig, SearchSyncExtension};
//!
//! # fn main() -> kitedb_search::Result<()> {
//! let graph = MemoryGraph::new();
//! let config = SearchSyncConfig::new("http://localhost:9200", "people:Person(name)")
//!   .index_all("nodes");
//! let extension = SearchSyncExtension::new(config);
//! extension.init_with_transport(&graph, Arc::new(MemoryTransport::new()))?;
//!
//! let mut tx = graph.begin();
//! let ann = tx.create_node(&["Person"]);
//! tx.set_property(ann, "name", "Ann")?;
//! tx.commit();
//!
//! extension.shutdown(&graph);
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod bulk;
pub mod config;
pub mod dispatch;
pub mod document;
pub mod error;
pub mod extension;
pub mod graph;
pub mod handler;
pub mod index_spec;
pub mod merge;
pub mod snapshot;
pub mod transport;
pub mod types;

pub use action::{CandidateOperation, ChangeCategory, OperationKey, OperationKind};
pub use bulk::{BulkItemOutcome, BulkRequest, BulkResponse};
pub use config::SearchSyncConfig;
pub use dispatch::{DispatchMode, DispatchStatus, Dispatcher};
pub use document::Document;
pub use error::{Result, SearchSyncError};
pub use extension::SearchSyncExtension;
pub use graph::{GraphTx, MemoryGraph};
pub use handler::{HandlerId, HandlerRegistry, SearchSyncHandler, TransactionEventHandler};
pub use index_spec::{IndexSpec, IndexSpecTable, CATCH_ALL_TYPE};
pub use merge::{translate, OperationSet};
pub use snapshot::{MutationSnapshot, TransactionData};
pub use transport::{HttpTransport, MemoryTransport, SearchTransport};
pub use types::{NodeId, NodeRecord, PropValue};
