//! Split search and tree growth benchmarks.
//!
//! - Root split search over growing sample sizes
//! - Static-only vs static + dynamic candidates
//! - Sequential vs parallel candidate scoring

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use treeformer::data::{SamplingPolicy, State, StateHasher};
use treeformer::rng::HashedRng;
use treeformer::testing::synthetic_corpus;
use treeformer::training::{GrowerParams, SplitFinder, SplitParams, TrainingLogger, TreeGrower, Verbosity};
use treeformer::Parallelism;

// =============================================================================
// Configuration
// =============================================================================

fn bench_split_params() -> SplitParams {
    SplitParams {
        min_split_samples: 16,
        discover_limit: 8_192,
        search_limit: 65_536,
        ..Default::default()
    }
}

fn hasher() -> StateHasher {
    StateHasher::new(HashedRng::for_stream(42, 0).next_key())
}

// =============================================================================
// Split Search
// =============================================================================

fn bench_root_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("split/root");

    for n_sequences in [50, 200, 800] {
        let corpus = synthetic_corpus(n_sequences, 128, 7);
        let states: Vec<State<'_>> = SamplingPolicy::All.draw(&corpus, &mut HashedRng::for_stream(1, 0));
        group.throughput(Throughput::Elements(states.len() as u64));

        for (name, dynamic) in [("static", false), ("dynamic", true)] {
            let finder = SplitFinder::new(bench_split_params(), hasher(), Parallelism::Sequential);
            group.bench_with_input(BenchmarkId::new(name, states.len()), &states, |b, states| {
                b.iter(|| black_box(finder.find_optimal_node(states.clone(), 0, dynamic)))
            });
        }
    }

    group.finish();
}

fn bench_split_parallelism(c: &mut Criterion) {
    let mut group = c.benchmark_group("split/parallelism");
    let corpus = synthetic_corpus(400, 128, 9);
    let states: Vec<State<'_>> = SamplingPolicy::All.draw(&corpus, &mut HashedRng::for_stream(1, 0));
    group.throughput(Throughput::Elements(states.len() as u64));

    for parallelism in [Parallelism::Sequential, Parallelism::Parallel] {
        let finder = SplitFinder::new(bench_split_params(), hasher(), parallelism);
        group.bench_function(format!("{parallelism:?}"), |b| {
            b.iter(|| black_box(finder.find_optimal_node(states.clone(), 0, true)))
        });
    }

    group.finish();
}

// =============================================================================
// Tree Growth
// =============================================================================

fn bench_grow_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("grow");
    group.sample_size(10);
    let corpus = synthetic_corpus(200, 128, 11);
    let states: Vec<State<'_>> = SamplingPolicy::All.draw(&corpus, &mut HashedRng::for_stream(1, 0));
    let logger = TrainingLogger::new(Verbosity::Silent);

    for max_depth in [4, 8] {
        let params = GrowerParams {
            split: bench_split_params(),
            max_depth,
            min_dynamic_lookback_depth: 2,
        };
        let grower = TreeGrower::new(params, hasher(), Parallelism::Parallel);
        group.bench_with_input(BenchmarkId::new("max_depth", max_depth), &states, |b, states| {
            b.iter(|| black_box(grower.grow(states, &logger)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_root_split, bench_split_parallelism, bench_grow_tree);
criterion_main!(benches);
