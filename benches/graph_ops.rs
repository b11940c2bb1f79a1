use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use gremlin_graph_db::storage::vertices_by_label;
use gremlin_graph_db::{parse_gremlin, GraphTraversalSource, MemoryStorage, SharedStorage, __};
use serde_json::json;
use std::sync::Arc;

fn empty_graph() -> SharedStorage {
    Arc::new(MemoryStorage::new("bench_graph"))
}

/// 1000 `person` vertices linked in a ring by `knows` edges
fn ring_graph() -> SharedStorage {
    let storage = empty_graph();
    for i in 0..1000 {
        storage
            .create_vertex(
                Some(format!("v{}", i).as_str()),
                "person",
                &[
                    ("name".into(), json!(format!("Person{}", i))),
                    ("age".into(), json!(20 + (i % 60))),
                ],
            )
            .unwrap();
    }
    for i in 0..1000 {
        storage
            .create_edge(
                None,
                "knows",
                &format!("v{}", i),
                &format!("v{}", (i + 1) % 1000),
                &[("weight".into(), json!(1.0))],
            )
            .unwrap();
    }
    storage
}

/// Benchmark creating vertices through the store
fn bench_create_vertices(c: &mut Criterion) {
    let mut group = c.benchmark_group("create_vertices");
    group.throughput(Throughput::Elements(1000));

    group.bench_function("batch_1000", |b| {
        b.iter_batched(
            empty_graph,
            |storage| {
                for i in 0..1000 {
                    storage
                        .create_vertex(
                            None,
                            "person",
                            &[("name".into(), json!(format!("Person{}", i)))],
                        )
                        .unwrap();
                }
                black_box(storage.vertex_count());
            },
            BatchSize::SmallInput,
        );
    });

    group.bench_function("add_v_traversal_1000", |b| {
        b.iter_batched(
            || GraphTraversalSource::new(empty_graph()),
            |g| {
                for i in 0..1000 {
                    g.add_v("person")
                        .property("name", format!("Person{}", i))
                        .iterate()
                        .unwrap();
                }
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

/// Benchmark scanning vertices by label
fn bench_scan_vertices(c: &mut Criterion) {
    let storage = ring_graph();

    c.bench_function("scan_1000_vertices", |b| {
        b.iter(|| {
            let count = vertices_by_label(&storage, "person").count();
            black_box(count);
        });
    });
}

/// Benchmark creating edges between existing vertices
fn bench_create_edges(c: &mut Criterion) {
    let mut group = c.benchmark_group("create_edges");
    group.throughput(Throughput::Elements(100));

    group.bench_function("add_e_traversal_100", |b| {
        b.iter_batched(
            || {
                let storage = empty_graph();
                for i in 0..100 {
                    storage
                        .create_vertex(Some(i.to_string().as_str()), "node", &[])
                        .unwrap();
                }
                GraphTraversalSource::new(storage)
            },
            |g| {
                for i in 0..100 {
                    let next = ((i + 1) % 100).to_string();
                    g.v(i.to_string())
                        .add_e("connects")
                        .to(__::v(next))
                        .property("weight", 1.0)
                        .iterate()
                        .unwrap();
                }
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

/// Benchmark read traversals
fn bench_traversals(c: &mut Criterion) {
    let g = GraphTraversalSource::new(ring_graph());

    c.bench_function("has_label_value_map", |b| {
        b.iter(|| {
            let maps = g.v(()).has_label("person").value_map(true).to_list().unwrap();
            black_box(maps.len());
        });
    });

    c.bench_function("two_hop_out", |b| {
        b.iter(|| {
            let names = g.v("v0").out("knows").out("knows").values("name").to_list().unwrap();
            black_box(names);
        });
    });

    c.bench_function("limit_short_circuits", |b| {
        b.iter(|| {
            let first = g.v(()).has("age", 42).limit(1).next().unwrap();
            black_box(first);
        });
    });
}

/// Benchmark parsing script text
fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse_add_edge_script", |b| {
        b.iter(|| {
            let script = parse_gremlin(black_box(
                "g.V('1').addE('knows').to(g.V('2')).property('since', 2023).next()",
            ))
            .unwrap();
            black_box(script);
        });
    });
}

criterion_group!(
    benches,
    bench_create_vertices,
    bench_scan_vertices,
    bench_create_edges,
    bench_traversals,
    bench_parse
);

criterion_main!(benches);
