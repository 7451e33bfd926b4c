//! Pool iteration benchmarks
//!
//! Run with: `cargo bench --package latch_core`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use latch_core::ecs::{tie, zip, Entity};
use latch_core::pool::{ComponentPool, DensePool, SaturatedPool, SparsePool};

const COUNTS: [u32; 2] = [10_000, 100_000];

#[derive(Clone, Copy)]
struct Position([f32; 3]);

#[derive(Clone, Copy)]
struct Velocity([f32; 3]);

fn fill<P: ComponentPool>(pool: &mut P, count: u32, stride: u32, value: impl Fn(u32) -> P::Component) {
    for i in (0..count).step_by(stride as usize) {
        pool.create(Entity::from_index(i), value(i))
            .map(drop)
            .unwrap_or_else(|err| panic!("seeding failed: {err}"));
    }
}

fn sum<P: ComponentPool<Component = Position>>(pool: &P) -> f32 {
    let window = pool.window();
    let view = pool.view(&window).unwrap_or_else(|err| panic!("{err}"));
    view.iter().map(|(_, p)| p.0[0]).sum()
}

fn bench_single_pool(c: &mut Criterion) {
    let mut group = c.benchmark_group("iterate_single");
    for count in COUNTS {
        let mut dense = DensePool::new();
        let mut sparse = SparsePool::new();
        let mut saturated = SaturatedPool::with_population(count as usize);
        let position = |i: u32| Position([i as f32; 3]);
        fill(&mut dense, count, 1, position);
        // Half-populated, as sparse and saturated pools are in practice.
        fill(&mut sparse, count, 2, position);
        fill(&mut saturated, count, 2, position);

        group.bench_with_input(BenchmarkId::new("dense", count), &dense, |b, pool| {
            b.iter(|| black_box(sum(pool)))
        });
        group.bench_with_input(BenchmarkId::new("sparse", count), &sparse, |b, pool| {
            b.iter(|| black_box(sum(pool)))
        });
        group.bench_with_input(BenchmarkId::new("saturated", count), &saturated, |b, pool| {
            b.iter(|| black_box(sum(pool)))
        });
    }
    group.finish();
}

fn bench_zipped(c: &mut Criterion) {
    let mut group = c.benchmark_group("iterate_zipped");
    for count in COUNTS {
        let mut positions = DensePool::new();
        let mut velocities = DensePool::new();
        let mut shuffled = DensePool::new();
        fill(&mut positions, count, 1, |i| Position([i as f32; 3]));
        fill(&mut velocities, count, 1, |_| Velocity([1.0; 3]));
        // Same membership, reversed insertion order: every lookup is keyed.
        for i in (0..count).rev() {
            shuffled
                .create(Entity::from_index(i), Velocity([1.0; 3]))
                .map(drop)
                .unwrap_or_else(|err| panic!("seeding failed: {err}"));
        }

        group.bench_function(BenchmarkId::new("dense_aligned", count), |b| {
            b.iter(|| {
                let (pw, vw) = (positions.window(), velocities.window());
                let members = (
                    positions.view(&pw).unwrap_or_else(|err| panic!("{err}")),
                    velocities.view(&vw).unwrap_or_else(|err| panic!("{err}")),
                );
                black_box(zip(members).map(|(_, (p, v))| p.0[0] + v.0[0]).sum::<f32>())
            })
        });
        group.bench_function(BenchmarkId::new("dense_keyed", count), |b| {
            b.iter(|| {
                let (pw, vw) = (positions.window(), shuffled.window());
                let members = (
                    positions.view(&pw).unwrap_or_else(|err| panic!("{err}")),
                    shuffled.view(&vw).unwrap_or_else(|err| panic!("{err}")),
                );
                black_box(zip(members).map(|(_, (p, v))| p.0[0] + v.0[0]).sum::<f32>())
            })
        });
        group.bench_function(BenchmarkId::new("dense_integrate", count), |b| {
            b.iter(|| {
                let (pw, vw) = (positions.window(), velocities.window());
                let members = (
                    positions.view_mut(&pw).unwrap_or_else(|err| panic!("{err}")),
                    velocities.view(&vw).unwrap_or_else(|err| panic!("{err}")),
                );
                tie(members).for_each(|_, (p, v)| {
                    for axis in 0..3 {
                        p.0[axis] += v.0[axis] * 0.016;
                    }
                });
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_single_pool, bench_zipped);
criterion_main!(benches);
