//! Clustering benchmarks
//!
//! Compares grid-pruned adjacency against the all-pairs test and measures
//! a full reconcile pass at various body counts.
//!
//! Run with: cargo bench --bench clustering

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use stargazer::oracle::OfflineOracle;
use stargazer::sky::body::{BodyKind, BodyProfile, CelestialBody};
use stargazer::sky::constants::{constellation::PROXIMITY_THRESHOLD, map};
use stargazer::sky::{ConstellationRegistry, ConstellationSet, SpatialGraphBuilder};
use stargazer::util::vec2::Vec2;

/// Bodies scattered uniformly over the map
fn create_bodies(count: usize) -> Vec<CelestialBody> {
    let mut rng = rand::thread_rng();

    (0..count)
        .map(|i| {
            let position = Vec2::new(
                rng.gen_range(map::MIN..=map::MAX),
                rng.gen_range(map::MIN..=map::MAX),
            );
            CelestialBody::discover(
                position,
                BodyProfile {
                    name: format!("Body{}", i),
                    kind: BodyKind::Star,
                    description: String::new(),
                    distance_ly: 10.0,
                    color: "#ffffff".to_string(),
                    spectral: None,
                },
                chrono::Utc::now(),
            )
        })
        .collect()
}

/// Reference all-pairs adjacency count
fn brute_force_edges(bodies: &[CelestialBody]) -> usize {
    let mut edges = 0;
    for i in 0..bodies.len() {
        for j in (i + 1)..bodies.len() {
            if bodies[i].position.distance_to(bodies[j].position) < PROXIMITY_THRESHOLD {
                edges += 1;
            }
        }
    }
    edges
}

fn bench_adjacency(c: &mut Criterion) {
    let mut group = c.benchmark_group("adjacency");
    group.sample_size(50);
    let builder = SpatialGraphBuilder::new();

    for count in [50, 200, 500, 1000] {
        let bodies = create_bodies(count);

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("spatial_grid", count), &count, |b, _| {
            b.iter(|| black_box(builder.adjacency(black_box(&bodies))))
        });
        group.bench_with_input(BenchmarkId::new("all_pairs", count), &count, |b, _| {
            b.iter(|| black_box(brute_force_edges(black_box(&bodies))))
        });
    }

    group.finish();
}

fn bench_clusters(c: &mut Criterion) {
    let mut group = c.benchmark_group("clusters");
    let builder = SpatialGraphBuilder::new();

    for count in [50, 200, 500, 1000] {
        let bodies = create_bodies(count);

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| black_box(builder.clusters(black_box(&bodies))))
        });
    }

    group.finish();
}

/// Second pass over an already reconciled sky (no naming calls)
fn bench_steady_reconcile(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile_steady");
    group.sample_size(30);
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let registry = ConstellationRegistry::new(&OfflineOracle, std::time::Duration::from_millis(50));

    for count in [50, 200, 500] {
        let bodies = create_bodies(count);
        let settled = runtime
            .block_on(registry.reconcile(&bodies, ConstellationSet::new()))
            .constellations;

        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                let result = runtime.block_on(registry.reconcile(&bodies, settled.clone()));
                black_box(result.changes.len())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_adjacency, bench_clusters, bench_steady_reconcile);
criterion_main!(benches);
