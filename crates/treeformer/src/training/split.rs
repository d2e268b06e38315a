//! Stochastic information-gain split search.
//!
//! # Algorithm
//!
//! 1. Refuse to split fewer than `min_split_samples` states.
//! 2. If the sample exceeds either window, reorder it by keyed state hash so
//!    that every prefix is a reproducible random sub-sample.
//! 3. Over the first `discover_limit` states, count how many states propose
//!    each candidate predicate (static and, if enabled, dynamic).
//! 4. Rank candidates by how close their count is to half of the discovery
//!    window, so near-bisecting candidates are tried first. Keep at most
//!    `dynamic_search_iterations` dynamic and `static_search_iterations`
//!    static candidates.
//! 5. Score dynamic candidates, then static ones, over the first
//!    `search_limit` states. The impurity of a set is
//!    `H = Σ_c p_c · ln p_c` (≤ 0, 0 when pure), and
//!    `gain = w_t · H_t + w_f · H_f − H` with `w` the branch fractions.
//! 6. Return the first candidate, in that order, whose gain strictly beats
//!    the running best, starting at `min_information_gain`.
//!
//! Scoring may run in parallel; selection always walks the ranked order, so
//! the result does not depend on the thread count.

use rustc_hash::{FxHashMap, FxHashSet};

use super::candidates::CandidateGenerator;
use crate::data::{State, StateHasher};
use crate::repr::Predicate;
use crate::utils::Parallelism;

// =============================================================================
// SplitParams
// =============================================================================

/// Parameters for one split search.
#[derive(Clone, Debug, PartialEq)]
pub struct SplitParams {
    /// `S`: absolute offsets `0..S` are proposed.
    pub static_lookback_limit: usize,
    /// `R`: bound on relative deltas.
    pub relative_lookback_limit: usize,
    /// Fewer states than this are never split.
    pub min_split_samples: usize,
    /// Static candidates scored per search.
    pub static_search_iterations: usize,
    /// Dynamic candidates scored per search.
    pub dynamic_search_iterations: usize,
    /// States used to discover candidates.
    pub discover_limit: usize,
    /// States used to score candidates.
    pub search_limit: usize,
    /// A split must gain strictly more than this.
    pub min_information_gain: f64,
}

impl Default for SplitParams {
    fn default() -> Self {
        Self {
            static_lookback_limit: 3,
            relative_lookback_limit: 1,
            min_split_samples: 128,
            static_search_iterations: 256,
            dynamic_search_iterations: 4096,
            discover_limit: 65_536,
            search_limit: 1_048_576,
            min_information_gain: 0.002,
        }
    }
}

/// Chosen split.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SplitInfo {
    pub predicate: Predicate,
    pub gain: f64,
}

// =============================================================================
// Impurity
// =============================================================================

/// `Σ (c / n) · ln(c / n)` over non-zero counts.
#[inline]
fn impurity(counts: &[u64], n: u64) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / n;
            p * p.ln()
        })
        .sum()
}

/// Scoring window with dense class indices.
///
/// Parent impurity and branch weights come from the search window, not the
/// discovery window. Reported gains therefore describe the scored states; the
/// ranking that decides which candidates get scored is unaffected.
struct ScoringWindow<'s, 'a> {
    states: &'s [State<'a>],
    classes: Vec<u32>,
    n_classes: usize,
    base_impurity: f64,
}

impl<'s, 'a> ScoringWindow<'s, 'a> {
    fn new(states: &'s [State<'a>]) -> Self {
        let mut index: FxHashMap<u16, u32> = FxHashMap::default();
        let classes: Vec<u32> = states
            .iter()
            .map(|s| {
                let next = index.len() as u32;
                *index.entry(s.true_class()).or_insert(next)
            })
            .collect();
        let n_classes = index.len();

        let mut counts = vec![0u64; n_classes];
        for &c in &classes {
            counts[c as usize] += 1;
        }
        let base_impurity = impurity(&counts, states.len() as u64);

        Self {
            states,
            classes,
            n_classes,
            base_impurity,
        }
    }

    /// Gain of `predicate`, or `None` if it sends every state one way.
    fn gain(&self, predicate: &Predicate) -> Option<f64> {
        let mut on_true = vec![0u64; self.n_classes];
        let mut on_false = vec![0u64; self.n_classes];
        let mut n_true = 0u64;
        for (state, &c) in self.states.iter().zip(&self.classes) {
            if predicate.evaluate(*state).0 {
                on_true[c as usize] += 1;
                n_true += 1;
            } else {
                on_false[c as usize] += 1;
            }
        }
        let n = self.states.len() as u64;
        let n_false = n - n_true;
        if n_true == 0 || n_false == 0 {
            return None;
        }
        let w_true = n_true as f64 / n as f64;
        let w_false = n_false as f64 / n as f64;
        Some(
            impurity(&on_true, n_true) * w_true + impurity(&on_false, n_false) * w_false
                - self.base_impurity,
        )
    }
}

// =============================================================================
// SplitFinder
// =============================================================================

/// Finds the best predicate for a set of states.
#[derive(Clone, Debug)]
pub struct SplitFinder {
    params: SplitParams,
    generator: CandidateGenerator,
    hasher: StateHasher,
    parallelism: Parallelism,
}

impl SplitFinder {
    pub fn new(params: SplitParams, hasher: StateHasher, parallelism: Parallelism) -> Self {
        let generator =
            CandidateGenerator::new(params.static_lookback_limit, params.relative_lookback_limit);
        Self {
            params,
            generator,
            hasher,
            parallelism,
        }
    }

    pub fn params(&self) -> &SplitParams {
        &self.params
    }

    /// Search for the best split of `states`.
    ///
    /// `static_lookback` is the cursor baseline of the path leading here
    /// (see [`Tree::static_lookback`](crate::repr::Tree::static_lookback)).
    /// Returns `None` when no candidate beats `min_information_gain`.
    pub fn find_optimal_node(
        &self,
        mut states: Vec<State<'_>>,
        static_lookback: i32,
        dynamic: bool,
    ) -> Option<SplitInfo> {
        let n = states.len();
        if n == 0 || n < self.params.min_split_samples {
            return None;
        }
        if n > self.params.discover_limit || n > self.params.search_limit {
            self.hasher.shuffle(&mut states);
        }

        let discover = &states[..n.min(self.params.discover_limit)];
        let (dynamic_ranked, static_ranked) = self.discover(discover, static_lookback, dynamic);

        let mut candidates = dynamic_ranked;
        candidates.extend(static_ranked);
        if candidates.is_empty() {
            return None;
        }

        let window = ScoringWindow::new(&states[..n.min(self.params.search_limit)]);
        let gains = self
            .parallelism
            .maybe_par_map(&candidates, |predicate| window.gain(predicate));

        let mut best: Option<SplitInfo> = None;
        let mut best_gain = self.params.min_information_gain;
        for (predicate, gain) in candidates.into_iter().zip(gains) {
            if let Some(gain) = gain.filter(|&g| g > best_gain) {
                best_gain = gain;
                best = Some(SplitInfo { predicate, gain });
            }
        }
        best
    }

    /// Count candidates over the discovery window and rank each family.
    ///
    /// The midpoint is half the number of states actually counted, not half of
    /// `search_limit`. The two agree only when the discovery window is full at
    /// `search_limit / 2` states.
    fn discover(
        &self,
        states: &[State<'_>],
        static_lookback: i32,
        dynamic: bool,
    ) -> (Vec<Predicate>, Vec<Predicate>) {
        let mut static_counts: FxHashMap<Predicate, u64> = FxHashMap::default();
        let mut dynamic_counts: FxHashMap<Predicate, u64> = FxHashMap::default();
        let mut seen = FxHashSet::default();

        for state in states {
            self.generator.static_candidates(state, static_lookback, |p| {
                *static_counts.entry(p).or_insert(0) += 1;
            });
            if dynamic {
                self.generator.dynamic_candidates(state, &mut seen, |p| {
                    *dynamic_counts.entry(p).or_insert(0) += 1;
                });
            }
        }

        let midpoint = (states.len() / 2) as u64;
        (
            rank(dynamic_counts, midpoint, self.params.dynamic_search_iterations),
            rank(static_counts, midpoint, self.params.static_search_iterations),
        )
    }
}

/// Order by distance of count from `midpoint`, then by predicate; keep `limit`.
fn rank(counts: FxHashMap<Predicate, u64>, midpoint: u64, limit: usize) -> Vec<Predicate> {
    let mut ranked: Vec<(u64, Predicate)> = counts
        .into_iter()
        .map(|(p, count)| (count.abs_diff(midpoint), p))
        .collect();
    ranked.sort_unstable();
    ranked.truncate(limit);
    ranked.into_iter().map(|(_, p)| p).collect()
}
