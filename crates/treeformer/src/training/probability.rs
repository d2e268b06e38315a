//! Post-hoc class probability estimation.
//!
//! Each evaluation state is walked from the root exactly as at inference.
//! Every visited node counts the state's true class under the branch it
//! took. Counts live in a side table indexed by node id and are dropped once
//! the tables have been normalized into the tree.

use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::data::State;
use crate::repr::{ClassProbs, Tree};
use crate::utils::Parallelism;

/// States tallied per parallel task.
const CHUNK_SIZE: usize = 4096;

/// Per-node class counts, `[false, true]`.
type BranchCounts = [FxHashMap<u16, u64>; 2];

/// Side table of class counts for one tree.
struct CountTable {
    nodes: Vec<BranchCounts>,
}

impl CountTable {
    fn new(n_nodes: usize) -> Self {
        Self {
            nodes: (0..n_nodes).map(|_| Default::default()).collect(),
        }
    }

    fn tally(tree: &Tree, states: &[State<'_>]) -> Self {
        let mut table = Self::new(tree.n_nodes());
        for &state in states {
            table.record(tree, state);
        }
        table
    }

    fn record(&mut self, tree: &Tree, mut state: State<'_>) {
        let class = state.true_class();
        let mut node = tree.root();
        loop {
            let (branch, next) = tree.node(node).predicate().evaluate(state);
            *self.nodes[node as usize][branch as usize].entry(class).or_insert(0) += 1;
            state = next;
            match tree.node(node).child(branch) {
                Some(child) => node = child,
                None => break,
            }
        }
    }

    fn merge(mut self, other: Self) -> Self {
        for (mine, theirs) in self.nodes.iter_mut().zip(other.nodes) {
            for (dst, src) in mine.iter_mut().zip(theirs) {
                for (class, count) in src {
                    *dst.entry(class).or_insert(0) += count;
                }
            }
        }
        self
    }
}

fn normalize(counts: &FxHashMap<u16, u64>) -> ClassProbs {
    let total: u64 = counts.values().sum();
    if total == 0 {
        return ClassProbs::new();
    }
    let total = total as f64;
    counts
        .iter()
        .map(|(&class, &count)| (class, count as f64 / total))
        .collect()
}

/// Fill every node's class tables from `eval`.
///
/// Branches no evaluation state reached get empty tables. Returns the
/// number of non-empty tables written.
pub fn estimate_class_probs(tree: &mut Tree, eval: &[State<'_>], parallelism: Parallelism) -> usize {
    let counts = if parallelism.is_parallel() && eval.len() > CHUNK_SIZE {
        let shared: &Tree = tree;
        eval.par_chunks(CHUNK_SIZE)
            .map(|chunk| CountTable::tally(shared, chunk))
            .reduce(|| CountTable::new(shared.n_nodes()), CountTable::merge)
    } else {
        CountTable::tally(tree, eval)
    };

    let mut n_tables = 0;
    for (id, branches) in counts.nodes.iter().enumerate() {
        for (branch, branch_counts) in [false, true].into_iter().zip(branches) {
            let probs = normalize(branch_counts);
            if !probs.is_empty() {
                n_tables += 1;
            }
            tree.set_class_probs(id as u32, branch, probs);
        }
    }
    n_tables
}
