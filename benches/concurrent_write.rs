use criterion::measurement::WallTime;
use criterion::{
    criterion_group, criterion_main, Bencher, BenchmarkGroup, BenchmarkId, Criterion, SamplingMode,
};
use latchtree::LatchTree;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::thread;
use std::time::Duration;

const NUM_OPERATIONS: usize = 100_000;

fn pure_insert_benchmark(c: &mut BenchmarkGroup<'_, WallTime>, num_threads: usize) {
    c.bench_with_input(
        BenchmarkId::new("concurrent_pure_insert", num_threads),
        &num_threads,
        |b: &mut Bencher, &num_threads| {
            b.iter_custom(|iters| {
                let ops_per_thread = NUM_OPERATIONS / num_threads;
                let mut sum = Duration::ZERO;
                for _ in 0..iters {
                    let tree = LatchTree::<usize>::new();

                    let start = std::time::Instant::now();
                    thread::scope(|s| {
                        for thread_id in 0..num_threads {
                            let tree = &tree;
                            s.spawn(move || {
                                let mut rng = StdRng::seed_from_u64(thread_id as u64);
                                for _ in 0..ops_per_thread {
                                    tree.insert(rng.random_range(0..NUM_OPERATIONS));
                                }
                            });
                        }
                    });
                    sum += start.elapsed();
                    drop(tree);
                }
                println!(
                    "done - iters: {}, elapsed: {:?}, num_threads: {}",
                    iters, sum, num_threads
                );
                sum
            })
        },
    );
}

fn mixed_operations_benchmark(c: &mut BenchmarkGroup<'_, WallTime>, num_threads: usize) {
    c.bench_with_input(
        BenchmarkId::new("concurrent_mixed_operations", num_threads),
        &num_threads,
        |b: &mut Bencher, &num_threads| {
            b.iter_custom(|iters| {
                let ops_per_thread = NUM_OPERATIONS / num_threads;
                let mut sum = Duration::ZERO;
                for _ in 0..iters {
                    let tree = LatchTree::<usize>::new();
                    // pre-populate so removals and lookups have targets
                    let mut rng = StdRng::seed_from_u64(99);
                    for _ in 0..NUM_OPERATIONS / 2 {
                        tree.insert(rng.random_range(0..NUM_OPERATIONS));
                    }

                    let start = std::time::Instant::now();
                    thread::scope(|s| {
                        for thread_id in 0..num_threads {
                            let tree = &tree;
                            s.spawn(move || {
                                let mut rng = StdRng::seed_from_u64(thread_id as u64);
                                for _ in 0..ops_per_thread {
                                    let key = rng.random_range(0..NUM_OPERATIONS);
                                    match rng.random_range(0..4) {
                                        0 => tree.insert(key),
                                        1 => {
                                            let _ = tree.remove(&key);
                                        }
                                        _ => {
                                            let _ = tree.contains(&key);
                                        }
                                    }
                                }
                            });
                        }
                    });
                    sum += start.elapsed();
                    drop(tree);
                }
                println!(
                    "done - iters: {}, elapsed: {:?}, num_threads: {}",
                    iters, sum, num_threads
                );
                sum
            })
        },
    );
}

fn concurrent_write_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_write");
    group.sampling_mode(SamplingMode::Flat);
    group.sample_size(10);
    for num_threads in [1, 2, 4, 8] {
        pure_insert_benchmark(&mut group, num_threads);
        mixed_operations_benchmark(&mut group, num_threads);
    }
    group.finish();
}

criterion_group!(benches, concurrent_write_benchmark);
criterion_main!(benches);
