//! Training progress logging.
//!
//! Events go through `tracing`. Each worker gets its own [`TrainingLogger`]
//! value carrying the tree index, so concurrent trees stay distinguishable
//! without thread-local state.

use std::fmt::Display;

use crate::repr::{NodeId, Predicate};

/// How much training output to emit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Silent,
    #[default]
    Warning,
    Info,
    Debug,
}

/// Per-task training logger.
#[derive(Clone, Debug)]
pub struct TrainingLogger {
    verbosity: Verbosity,
    tree: Option<usize>,
}

impl TrainingLogger {
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            tree: None,
        }
    }

    /// Logger for one tree, sharing this logger's verbosity.
    pub fn for_tree(&self, tree_idx: usize) -> Self {
        Self {
            verbosity: self.verbosity,
            tree: Some(tree_idx),
        }
    }

    #[inline]
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    #[inline]
    fn enabled(&self, level: Verbosity) -> bool {
        self.verbosity >= level
    }

    pub fn start_training(&self, n_trees: usize, n_threads: usize) {
        if self.enabled(Verbosity::Info) {
            tracing::info!(n_trees, n_threads, "starting ensemble training");
        }
    }

    pub fn finish_training(&self, n_written: usize, n_skipped: usize) {
        if self.enabled(Verbosity::Info) {
            tracing::info!(n_written, n_skipped, "ensemble training finished");
        }
    }

    pub fn samples_drawn(&self, n_train: usize, n_eval: usize) {
        if self.enabled(Verbosity::Debug) {
            tracing::debug!(tree = self.tree, n_train, n_eval, "samples drawn");
        }
    }

    pub fn insufficient_data(&self, n_samples: usize) {
        if self.enabled(Verbosity::Warning) {
            tracing::warn!(tree = self.tree, n_samples, "not enough data to find a root split");
        }
    }

    pub fn node_added(&self, node: NodeId, depth: usize, predicate: &Predicate, gain: f64, queued: usize) {
        if self.enabled(Verbosity::Debug) {
            tracing::debug!(
                tree = self.tree,
                node,
                depth,
                kind = ?predicate.kind(),
                lookback = predicate.lookback(),
                compare = predicate.compare(),
                gain,
                queued,
                "added node"
            );
        }
    }

    pub fn tree_finished(&self, n_nodes: usize, depth: usize) {
        if self.enabled(Verbosity::Info) {
            tracing::info!(tree = self.tree, n_nodes, depth, "tree trained");
        }
    }

    pub fn probabilities_estimated(&self, n_samples: usize, n_tables: usize) {
        if self.enabled(Verbosity::Debug) {
            tracing::debug!(tree = self.tree, n_samples, n_tables, "class probabilities estimated");
        }
    }

    pub fn write_failed(&self, err: &dyn Display) {
        if self.enabled(Verbosity::Warning) {
            tracing::error!(tree = self.tree, %err, "failed to write tree");
        }
    }

    pub fn tree_failed(&self, err: &dyn Display) {
        if self.enabled(Verbosity::Warning) {
            tracing::error!(tree = self.tree, %err, "tree training failed");
        }
    }
}

impl Default for TrainingLogger {
    fn default() -> Self {
        Self::new(Verbosity::default())
    }
}
