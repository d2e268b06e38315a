//! End-to-end training behavior.

use std::num::NonZeroUsize;

use approx::assert_abs_diff_eq;

use treeformer::data::{Corpus, SamplingPolicy, State, StateHasher};
use treeformer::repr::{Predicate, PredicateKind};
use treeformer::testing::synthetic_corpus;
use treeformer::training::{SplitFinder, SplitParams, Verbosity};
use treeformer::{Parallelism, TreeformerConfig, TreeformerModel};

// =============================================================================
// Helpers
// =============================================================================

fn config(n_trees: usize, max_depth: usize, min_split: usize) -> TreeformerConfig {
    TreeformerConfig::builder()
        .n_trees(n_trees)
        .max_depth(max_depth)
        .min_split_samples(min_split)
        .min_dynamic_lookback_depth(2)
        .train_sampling(SamplingPolicy::All)
        .eval_sampling(SamplingPolicy::All)
        .verbosity(Verbosity::Silent)
        .n_threads(NonZeroUsize::new(2).unwrap())
        .build()
        .unwrap()
}

/// Sample A: token 1 then 7. Sample B: token 2 then 9.
fn two_sample_corpus() -> Corpus {
    let mut corpus = Corpus::new();
    corpus.push_pair(&[1], &[7]).unwrap();
    corpus.push_pair(&[2], &[9]).unwrap();
    corpus
}

// =============================================================================
// Two-sample separation
// =============================================================================

#[test]
fn two_sample_root_separates_perfectly() {
    let corpus = two_sample_corpus();
    let model = TreeformerModel::train(&corpus, config(1, 4, 2)).unwrap();
    let tree = &model.ensemble().trees()[0];
    let root = tree.node(tree.root());

    assert_ne!(root.predicate().kind(), PredicateKind::Dynamic);
    assert_eq!(root.predicate().lookback(), 0);
    assert!([1, 2].contains(&root.predicate().compare()));

    // Each branch holds exactly one class with certainty.
    let on_true = root.class_probs(true);
    let on_false = root.class_probs(false);
    assert_eq!(on_true.len(), 1);
    assert_eq!(on_false.len(), 1);
    assert_ne!(on_true.keys().next(), on_false.keys().next());
    assert_abs_diff_eq!(on_true.values().sum::<f64>(), 1.0, epsilon = 1e-12);

    assert_eq!(model.predict(&[1]).argmax(), Some(7));
    assert_eq!(model.predict(&[2]).argmax(), Some(9));
}

#[test]
fn two_sample_gain_is_positive() {
    let a = [1u16];
    let b = [2u16];
    let states = vec![State::new(&a, 7), State::new(&b, 9)];
    let params = SplitParams {
        min_split_samples: 2,
        ..Default::default()
    };
    let finder = SplitFinder::new(params, StateHasher::new([0u8; 32]), Parallelism::Sequential);
    let split = finder.find_optimal_node(states, 0, false).unwrap();
    assert!(split.gain > 0.0);
    assert_abs_diff_eq!(split.gain, std::f64::consts::LN_2, epsilon = 1e-12);
}

// =============================================================================
// Structural bounds
// =============================================================================

#[test]
fn no_node_at_or_below_max_depth() {
    let corpus = synthetic_corpus(30, 48, 21);
    for max_depth in [1, 2, 5] {
        let model = TreeformerModel::train(&corpus, config(2, max_depth, 4)).unwrap();
        for tree in model.ensemble().trees() {
            assert!(tree.depth() < max_depth);
            assert!(tree.validate().is_ok());
        }
    }
}

#[test]
fn split_above_minimum_gain_is_kept() {
    let corpus = synthetic_corpus(20, 40, 8);
    let states: Vec<State<'_>> = corpus.sequences().flat_map(|s| s.states()).collect();
    let params = SplitParams {
        min_split_samples: 4,
        min_information_gain: 0.05,
        ..Default::default()
    };
    let finder = SplitFinder::new(params, StateHasher::new([3u8; 32]), Parallelism::Parallel);
    let split = finder.find_optimal_node(states.clone(), 0, true).expect("split");
    assert!(split.gain > 0.05);
    let n_true = states.iter().filter(|s| split.predicate.evaluate(**s).0).count();
    assert!(n_true > 0 && n_true < states.len());
}

#[test]
fn split_at_or_below_minimum_gain_is_rejected() {
    let a = [1u16];
    let b = [2u16];
    let states = vec![State::new(&a, 7), State::new(&b, 9)];
    let find = |min_information_gain: f64| {
        let params = SplitParams {
            min_split_samples: 2,
            min_information_gain,
            ..Default::default()
        };
        SplitFinder::new(params, StateHasher::new([0u8; 32]), Parallelism::Sequential)
            .find_optimal_node(states.clone(), 0, false)
    };

    // The best available gain is ln 2.
    assert!(find(0.69).is_some());
    assert!(find(std::f64::consts::LN_2).is_none());
    assert!(find(0.7).is_none());
}

// =============================================================================
// Candidate ranking and search caps
// =============================================================================

/// Eight one-token histories. Candidates are `absolute(0, t)` only; by count
/// distance from the midpoint (4) they rank token 1, token 2, token 3, while
/// token 3 isolates the lone class 9 and has the highest gain.
fn uneven_split_states() -> Vec<State<'static>> {
    const ONE: &[u16] = &[1];
    const TWO: &[u16] = &[2];
    const THREE: &[u16] = &[3];
    vec![
        State::new(ONE, 7),
        State::new(ONE, 7),
        State::new(ONE, 7),
        State::new(ONE, 8),
        State::new(TWO, 7),
        State::new(TWO, 8),
        State::new(TWO, 8),
        State::new(THREE, 9),
    ]
}

fn capped_finder(static_search_iterations: usize, dynamic_search_iterations: usize) -> SplitFinder {
    let params = SplitParams {
        static_lookback_limit: 1,
        relative_lookback_limit: 0,
        min_split_samples: 2,
        min_information_gain: 0.0,
        static_search_iterations,
        dynamic_search_iterations,
        ..Default::default()
    };
    SplitFinder::new(params, StateHasher::new([4u8; 32]), Parallelism::Sequential)
}

#[test]
fn single_static_iteration_scores_only_the_nearest_to_midpoint() {
    let split = capped_finder(1, 0)
        .find_optimal_node(uneven_split_states(), 0, false)
        .expect("split");
    assert_eq!(split.predicate, Predicate::absolute(0, 1));
}

#[test]
fn better_candidate_outside_the_cap_is_never_returned() {
    let uncapped = capped_finder(256, 0)
        .find_optimal_node(uneven_split_states(), 0, false)
        .expect("split");
    assert_eq!(uncapped.predicate, Predicate::absolute(0, 3));

    let capped = capped_finder(2, 0)
        .find_optimal_node(uneven_split_states(), 0, false)
        .expect("split");
    assert_eq!(capped.predicate, Predicate::absolute(0, 1));
    assert!(capped.gain < uncapped.gain);
}

#[test]
fn zero_dynamic_iterations_disable_dynamic_candidates() {
    // Only the token two back separates the classes; S = 1 hides it from
    // absolute candidates.
    let a = [5u16, 0, 1];
    let b = [6u16, 0, 1];
    let states = vec![State::new(&a, 7), State::new(&b, 9)];

    assert!(capped_finder(256, 0).find_optimal_node(states.clone(), 0, true).is_none());
    let split = capped_finder(256, 1)
        .find_optimal_node(states, 0, true)
        .expect("split");
    assert_eq!(split.predicate.kind(), PredicateKind::Dynamic);
}

// =============================================================================
// Probabilities
// =============================================================================

#[test]
fn visited_tables_sum_to_one() {
    let corpus = synthetic_corpus(25, 40, 4);
    let model = TreeformerModel::train(&corpus, config(3, 6, 4)).unwrap();
    for tree in model.ensemble().trees() {
        for node in tree.nodes() {
            for branch in [false, true] {
                let table = node.class_probs(branch);
                if !table.is_empty() {
                    assert_abs_diff_eq!(table.values().sum::<f64>(), 1.0, epsilon = 1e-9);
                }
            }
        }
    }
}

#[test]
fn distribution_mass_matches_contributing_trees() {
    let corpus = synthetic_corpus(25, 40, 4);
    let model = TreeformerModel::train(&corpus, config(4, 6, 4)).unwrap();
    let seq = corpus.sequence(3);
    let dist = model.predict(&seq.tokens()[..seq.boundary() + 2]);
    assert_eq!(dist.n_trees, 4);
    assert_abs_diff_eq!(dist.total_mass(), dist.n_contributing as f64, epsilon = 1e-9);
}

#[test]
fn training_is_deterministic_per_seed() {
    let corpus = synthetic_corpus(20, 32, 6);
    let a = TreeformerModel::train(&corpus, config(3, 5, 4)).unwrap();
    let b = TreeformerModel::train(&corpus, config(3, 5, 4)).unwrap();
    assert_eq!(a.ensemble(), b.ensemble());
}
