//! End-to-end: graph transactions mirrored through the extension

use std::sync::Arc;
use std::time::Duration;

use kitedb_search::bulk::BulkRequest;
use kitedb_search::transport::memory::MemoryFailure;
use kitedb_search::transport::BulkCompletion;
use kitedb_search::{
  BulkResponse, CandidateOperation, DispatchMode, MemoryGraph, MemoryTransport, OperationKind,
  SearchSyncConfig, SearchSyncExtension, SearchTransport,
};

fn sync_config(spec: &str) -> SearchSyncConfig {
  SearchSyncConfig::new("http://localhost:9200", spec)
    .index_all("all")
    .include_id_field(false)
    .include_labels_field(false)
    .dispatch_mode(DispatchMode::Sync)
}

fn setup(config: SearchSyncConfig) -> (MemoryGraph, SearchSyncExtension, Arc<MemoryTransport>) {
  let graph = MemoryGraph::new();
  let extension = SearchSyncExtension::new(config);
  let transport = Arc::new(MemoryTransport::new());
  assert!(extension
    .init_with_transport(&graph, transport.clone())
    .expect("init"));
  (graph, extension, transport)
}

fn summary(ops: &[CandidateOperation]) -> Vec<(OperationKind, String, String)> {
  ops
    .iter()
    .map(|op| (op.kind, op.index.clone(), op.doc_type.clone()))
    .collect()
}

#[test]
fn create_then_remove_label_round_trip() {
  let (graph, extension, transport) = setup(sync_config("idx:Person(name)"));

  let mut tx = graph.begin();
  let ann = tx.create_node(&["Person"]);
  tx.set_property(ann, "name", "Ann").expect("set name");
  tx.set_property(ann, "age", 30).expect("set age");
  tx.commit();

  assert_eq!(transport.request_count(), 1);
  let created = transport.operations();
  assert_eq!(
    summary(&created),
    vec![
      (OperationKind::Index, "all".to_string(), "node".to_string()),
      (OperationKind::Index, "idx".to_string(), "Person".to_string()),
    ]
  );
  let body = created[1].body.as_ref().expect("body");
  assert_eq!(body.properties.len(), 1);
  let all_body = created[0].body.as_ref().expect("body");
  assert_eq!(all_body.properties.len(), 2);

  transport.clear();
  let mut tx = graph.begin();
  tx.remove_label(ann, "Person").expect("remove label");
  tx.commit();

  assert_eq!(
    summary(&transport.operations()),
    vec![
      (OperationKind::Delete, "all".to_string(), "node".to_string()),
      (OperationKind::Delete, "idx".to_string(), "Person".to_string()),
    ]
  );
  assert!(extension.shutdown(&graph));
}

#[test]
fn removing_a_property_sends_an_update() {
  let (graph, _extension, transport) = setup(sync_config("idx:Person"));

  let mut tx = graph.begin();
  let ann = tx.create_node(&["Person"]);
  tx.set_property(ann, "name", "Ann").expect("set name");
  tx.set_property(ann, "nick", "A").expect("set nick");
  tx.commit();
  transport.clear();

  let mut tx = graph.begin();
  tx.remove_property(ann, "nick").expect("remove");
  tx.commit();

  let ops = transport.operations();
  assert_eq!(ops.len(), 2);
  for op in &ops {
    assert_eq!(op.kind, OperationKind::Update);
    let body = op.body.as_ref().expect("body");
    assert!(body.properties.contains_key("name"));
    assert!(!body.properties.contains_key("nick"));
  }
}

#[test]
fn deleting_a_node_deletes_its_documents() {
  let (graph, _extension, transport) = setup(sync_config("idx:Person"));

  let mut tx = graph.begin();
  let ann = tx.create_node(&["Person"]);
  tx.set_property(ann, "name", "Ann").expect("set name");
  tx.commit();
  transport.clear();

  let mut tx = graph.begin();
  tx.delete_node(ann).expect("delete");
  tx.commit();

  let ops = transport.operations();
  assert_eq!(ops.len(), 2);
  assert!(ops.iter().all(|op| op.kind == OperationKind::Delete));
}

#[test]
fn rollback_and_empty_transactions_send_nothing() {
  let (graph, _extension, transport) = setup(sync_config("idx:Person"));

  let mut tx = graph.begin();
  tx.create_node(&["Person"]);
  tx.rollback();

  let tx = graph.begin();
  tx.commit();

  let mut tx = graph.begin();
  let temp = tx.create_node(&["Person"]);
  tx.delete_node(temp).expect("delete");
  tx.commit();

  assert_eq!(transport.request_count(), 0);
}

#[test]
fn transport_failure_does_not_affect_commit() {
  let (graph, _extension, transport) = setup(sync_config("idx:Person"));
  transport.fail_with(Some(MemoryFailure::Transport("connection refused".to_string())));

  let mut tx = graph.begin();
  let ann = tx.create_node(&["Person"]);
  tx.commit();

  assert!(graph.node(ann).is_some());
  assert_eq!(transport.request_count(), 1);
}

#[test]
fn invalid_spec_never_registers() {
  let graph = MemoryGraph::new();
  let extension = SearchSyncExtension::new(sync_config("idx:Person;idx:Person"));
  let transport = Arc::new(MemoryTransport::new());
  assert!(!extension
    .init_with_transport(&graph, transport.clone())
    .expect("init"));

  let mut tx = graph.begin();
  tx.create_node(&["Person"]);
  tx.commit();
  assert_eq!(transport.request_count(), 0);
}

#[test]
fn shutdown_stops_mirroring() {
  let (graph, extension, transport) = setup(sync_config("idx:Person"));
  assert!(extension.shutdown(&graph));

  let mut tx = graph.begin();
  tx.create_node(&["Person"]);
  tx.commit();
  assert_eq!(transport.request_count(), 0);
}

struct NotifyingTransport {
  inner: MemoryTransport,
  completed: crossbeam_channel::Sender<usize>,
}

impl SearchTransport for NotifyingTransport {
  fn execute(&self, request: &BulkRequest) -> kitedb_search::Result<BulkResponse> {
    self.inner.execute(request)
  }

  fn execute_async(&self, request: BulkRequest, on_complete: BulkCompletion) {
    let completed = self.completed.clone();
    let count = request.len();
    self.inner.execute_async(
      request,
      Box::new(move |result| {
        on_complete(result);
        let _ = completed.send(count);
      }),
    );
  }
}

#[test]
fn async_dispatch_completes_off_the_commit_path() {
  let (completed, done) = crossbeam_channel::unbounded();
  let transport = Arc::new(NotifyingTransport {
    inner: MemoryTransport::new(),
    completed,
  });
  let graph = MemoryGraph::new();
  let extension = SearchSyncExtension::new(
    sync_config("idx:Person").dispatch_mode(DispatchMode::Async),
  );
  assert!(extension
    .init_with_transport(&graph, transport.clone())
    .expect("init"));

  let mut tx = graph.begin();
  tx.create_node(&["Person"]);
  tx.commit();

  assert_eq!(done.recv_timeout(Duration::from_secs(5)), Ok(2));
  assert_eq!(transport.inner.request_count(), 1);
}
