//! Resolution performance benchmarks
//!
//! Measures following include chains of increasing depth, including marker
//! evaluation and conflict detection.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use reqfile_benchmarks::{criterion_config, manifest_chain};
use reqfile_resolver::{ResolveOptions, Resolver};

fn bench_include_chain(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("create runtime");
    let mut group = c.benchmark_group("resolve_chain");

    for depth in [1, 5, 20] {
        let (_dir, root) = manifest_chain(depth, 50);
        let resolver = Resolver::new(ResolveOptions {
            allow_conflicts: true,
            ..ResolveOptions::default()
        });

        group.bench_with_input(BenchmarkId::new("files", depth), &root, |b, root| {
            b.to_async(&runtime).iter(|| async {
                resolver.resolve(root).await.unwrap()
            });
        });
    }

    group.finish();
}

fn bench_load_graph(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("create runtime");
    let (_dir, root) = manifest_chain(20, 10);
    let resolver = Resolver::default();

    c.bench_function("load_graph_20_files", |b| {
        b.to_async(&runtime).iter(|| async {
            let (graph, _) = resolver.load_graph(&root).await.unwrap();
            graph.render_tree()
        });
    });
}

criterion_group! {
    name = benches;
    config = criterion_config();
    targets = bench_include_chain, bench_load_graph
}
criterion_main!(benches);
