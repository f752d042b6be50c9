//! Translation and bulk encoding microbenchmarks
//!
//! Run with: cargo bench --bench translate

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

extern crate kitedb_search;

use kitedb_search::{translate, BulkRequest, IndexSpecTable, MutationSnapshot, NodeRecord};

const SPEC: &str = "people:Person(name,email);staff:Employee;cities:City(name)";

fn create_snapshot(count: u64) -> MutationSnapshot {
  let mut snapshot = MutationSnapshot::new();
  for id in 0..count {
    let label = if id % 3 == 0 { "Employee" } else { "Person" };
    let node = NodeRecord::new(id)
      .with_label(label)
      .with_prop("name", format!("user{id}"))
      .with_prop("email", format!("user{id}@example.com"))
      .with_prop("age", (id % 90) as i64);
    snapshot = snapshot
      .with_node(node)
      .created(id)
      .label_assigned(id, label)
      .property_assigned(id, "name", format!("user{id}"))
      .property_assigned(id, "email", format!("user{id}@example.com"));
    if id % 5 == 0 {
      snapshot = snapshot.property_removed(id, "nickname");
    }
  }
  snapshot
}

fn bench_translate(c: &mut Criterion) {
  let mut group = c.benchmark_group("translate");
  group.sample_size(20);

  for &catch_all in [None, Some("nodes")].iter() {
    let table = IndexSpecTable::parse(SPEC, catch_all, true, true).expect("parse spec");
    let label = if catch_all.is_some() { "catch_all" } else { "specs_only" };

    for &count in [10u64, 100, 1_000].iter() {
      let snapshot = create_snapshot(count);
      group.throughput(Throughput::Elements(count));
      group.bench_with_input(BenchmarkId::new(label, count), &count, |bencher, _| {
        bencher.iter(|| {
          let ops = translate(&table, &snapshot).expect("translate");
          black_box(ops.len());
        });
      });
    }
  }

  group.finish();
}

fn bench_encode(c: &mut Criterion) {
  let mut group = c.benchmark_group("bulk_encode");
  group.sample_size(20);
  let table = IndexSpecTable::parse(SPEC, Some("nodes"), true, true).expect("parse spec");

  for &count in [100u64, 1_000].iter() {
    let request = BulkRequest::from(translate(&table, &create_snapshot(count)).expect("translate"));
    group.throughput(Throughput::Elements(request.len() as u64));
    group.bench_with_input(BenchmarkId::new("ndjson", count), &count, |bencher, _| {
      bencher.iter(|| black_box(request.to_ndjson(true).expect("encode")));
    });
  }

  group.finish();
}

criterion_group!(benches, bench_translate, bench_encode);
criterion_main!(benches);
