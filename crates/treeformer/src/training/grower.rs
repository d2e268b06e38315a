//! Breadth-first greedy tree growth.

use std::collections::VecDeque;

use super::logger::TrainingLogger;
use super::split::{SplitFinder, SplitParams};
use crate::data::{State, StateHasher};
use crate::repr::Tree;
use crate::utils::Parallelism;

/// Parameters for growing one tree.
#[derive(Clone, Debug, PartialEq)]
pub struct GrowerParams {
    pub split: SplitParams,
    /// No node is created at this depth or deeper. The root has depth 0.
    pub max_depth: usize,
    /// Dynamic candidates are searched for nodes at this depth or deeper.
    pub min_dynamic_lookback_depth: usize,
}

impl Default for GrowerParams {
    fn default() -> Self {
        Self {
            split: SplitParams::default(),
            max_depth: 32,
            min_dynamic_lookback_depth: 8,
        }
    }
}

/// Grows a tree by repeatedly splitting frontier branches.
pub struct TreeGrower {
    params: GrowerParams,
    finder: SplitFinder,
    parallelism: Parallelism,
}

impl TreeGrower {
    pub fn new(params: GrowerParams, hasher: StateHasher, parallelism: Parallelism) -> Self {
        let finder = SplitFinder::new(params.split.clone(), hasher, parallelism);
        Self {
            params,
            finder,
            parallelism,
        }
    }

    pub fn params(&self) -> &GrowerParams {
        &self.params
    }

    /// Grow a tree over `train`.
    ///
    /// Returns `None` if no root split qualifies.
    pub fn grow(&self, train: &[State<'_>], logger: &TrainingLogger) -> Option<Tree> {
        if self.params.max_depth == 0 {
            return None;
        }

        let root_dynamic = self.params.min_dynamic_lookback_depth == 0;
        let Some(root) = self.finder.find_optimal_node(train.to_vec(), 0, root_dynamic) else {
            logger.insufficient_data(train.len());
            return None;
        };

        let mut tree = Tree::new(root.predicate);
        logger.node_added(tree.root(), 0, &root.predicate, root.gain, 0);

        let mut queue = VecDeque::from([tree.root()]);
        while let Some(node) = queue.pop_front() {
            let mut trace = tree.path_to(node);
            let child_depth = trace.len() + 1;
            if child_depth >= self.params.max_depth {
                continue;
            }
            // Inclusive: a child exactly at the configured depth searches dynamically.
            let dynamic = child_depth >= self.params.min_dynamic_lookback_depth;

            trace.push((node, false));
            for branch in [false, true] {
                if let Some(last) = trace.last_mut() {
                    last.1 = branch;
                }
                let baseline = tree.static_lookback(&trace);
                let survivors = self
                    .parallelism
                    .maybe_par_filter_map(train, |state| tree.follow(&trace, *state));

                if let Some(split) = self.finder.find_optimal_node(survivors, baseline, dynamic) {
                    let child = tree.add_child(node, branch, split.predicate);
                    queue.push_back(child);
                    logger.node_added(child, child_depth, &split.predicate, split.gain, queue.len());
                }
            }
        }

        logger.tree_finished(tree.n_nodes(), tree.depth());
        Some(tree)
    }
}
