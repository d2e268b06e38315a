//! Parallel ensemble training.
//!
//! Workers claim tree indices from a shared atomic counter until all trees
//! are taken, so slow trees never hold up a fixed partition. Each tree gets
//! its own random stream derived from the master seed and its index, which
//! makes the trained trees independent of scheduling. Finished trees go to a
//! single [`TreeSink`] behind a mutex.
//!
//! A panic while training one tree is caught and reported as
//! [`TrainError::TreePanicked`]. Trees already written stay in the sink.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::grower::{GrowerParams, TreeGrower};
use super::logger::{TrainingLogger, Verbosity};
use super::probability::estimate_class_probs;
use crate::data::{Corpus, SamplingPolicy, StateHasher};
use crate::persist::{TreeSink, VecSink, WriteError};
use crate::repr::{Ensemble, Tree};
use crate::rng::HashedRng;
use crate::utils::Parallelism;

// =============================================================================
// EnsembleParams
// =============================================================================

/// Parameters for ensemble training.
#[derive(Clone, Debug, PartialEq)]
pub struct EnsembleParams {
    /// Trees to attempt.
    pub n_trees: usize,
    /// Master seed; tree `i` uses stream `i` of it.
    pub seed: u64,
    /// Sample used to grow each tree.
    pub train_sampling: SamplingPolicy,
    /// Sample used to estimate each tree's class tables.
    pub eval_sampling: SamplingPolicy,
    pub grower: GrowerParams,
    pub verbosity: Verbosity,
}

impl Default for EnsembleParams {
    fn default() -> Self {
        Self {
            n_trees: 32,
            seed: 0,
            train_sampling: SamplingPolicy::default_train(),
            eval_sampling: SamplingPolicy::default_eval(),
            grower: GrowerParams::default(),
            verbosity: Verbosity::default(),
        }
    }
}

// =============================================================================
// Errors and summary
// =============================================================================

/// Ensemble training failure.
#[derive(Debug, thiserror::Error)]
pub enum TrainError {
    #[error("failed to write tree {tree_idx}: {source}")]
    Sink {
        tree_idx: usize,
        #[source]
        source: WriteError,
    },

    #[error("tree sink lock poisoned")]
    SinkPoisoned,

    #[error("training tree {tree_idx} panicked: {message}")]
    TreePanicked { tree_idx: usize, message: String },
}

/// Outcome counts of a training run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrainingSummary {
    pub n_requested: usize,
    /// Trees handed to the sink.
    pub n_written: usize,
    /// Trees that found no root split.
    pub n_skipped: usize,
}

/// Best-effort text of a panic payload.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

// =============================================================================
// EnsembleTrainer
// =============================================================================

/// Trains an ensemble of independent trees.
#[derive(Clone, Debug)]
pub struct EnsembleTrainer {
    params: EnsembleParams,
}

impl EnsembleTrainer {
    pub fn new(params: EnsembleParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &EnsembleParams {
        &self.params
    }

    /// Train tree `tree_idx` without touching any shared state.
    ///
    /// Returns `None` when the tree's training sample has no root split.
    pub fn train_tree(
        &self,
        corpus: &Corpus,
        tree_idx: usize,
        parallelism: Parallelism,
        logger: &TrainingLogger,
    ) -> Option<Tree> {
        let mut rng = HashedRng::for_stream(self.params.seed, tree_idx as u64);
        let hasher = StateHasher::new(rng.next_key());
        let train = self.params.train_sampling.draw(corpus, &mut rng);
        let eval = self.params.eval_sampling.draw(corpus, &mut rng);
        logger.samples_drawn(train.len(), eval.len());

        let grower = TreeGrower::new(self.params.grower.clone(), hasher, parallelism);
        let mut tree = grower.grow(&train, logger)?;
        let n_tables = estimate_class_probs(&mut tree, &eval, parallelism);
        logger.probabilities_estimated(eval.len(), n_tables);
        Some(tree)
    }

    /// Train every tree and stream the results into `sink`.
    ///
    /// The first failure, a sink error or a panicking tree, stops further
    /// claims; trees already in flight finish but are not written.
    pub fn train_into<S>(
        &self,
        corpus: &Corpus,
        sink: &mut S,
        parallelism: Parallelism,
    ) -> Result<TrainingSummary, TrainError>
    where
        S: TreeSink + ?Sized,
    {
        self.claim_trees(sink, parallelism, |tree_idx, logger| {
            self.train_tree(corpus, tree_idx, parallelism, logger)
        })
    }

    /// Worker loop shared by [`train_into`](Self::train_into): claim indices,
    /// run `train_one`, and hand finished trees to `sink`.
    fn claim_trees<S, F>(
        &self,
        sink: &mut S,
        parallelism: Parallelism,
        train_one: F,
    ) -> Result<TrainingSummary, TrainError>
    where
        S: TreeSink + ?Sized,
        F: Fn(usize, &TrainingLogger) -> Option<Tree> + Sync,
    {
        let n_trees = self.params.n_trees;
        let logger = TrainingLogger::new(self.params.verbosity);
        logger.start_training(n_trees, parallelism.n_workers());

        let next_tree = AtomicUsize::new(0);
        let n_written = AtomicUsize::new(0);
        let n_skipped = AtomicUsize::new(0);
        let failed = AtomicBool::new(false);
        let first_error: Mutex<Option<TrainError>> = Mutex::new(None);
        let sink = Mutex::new(sink);

        let record_failure = |err: TrainError| {
            failed.store(true, Ordering::Release);
            if let Ok(mut slot) = first_error.lock() {
                slot.get_or_insert(err);
            }
        };

        parallelism.for_each_worker(|_| {
            while !failed.load(Ordering::Acquire) {
                let tree_idx = next_tree.fetch_add(1, Ordering::Relaxed);
                if tree_idx >= n_trees {
                    break;
                }
                let tree_logger = logger.for_tree(tree_idx);
                let trained = panic::catch_unwind(AssertUnwindSafe(|| train_one(tree_idx, &tree_logger)));
                let tree = match trained {
                    Ok(Some(tree)) => tree,
                    Ok(None) => {
                        n_skipped.fetch_add(1, Ordering::Relaxed);
                        continue;
                    }
                    Err(payload) => {
                        let err = TrainError::TreePanicked {
                            tree_idx,
                            message: panic_message(payload.as_ref()),
                        };
                        tree_logger.tree_failed(&err);
                        record_failure(err);
                        break;
                    }
                };

                let written = match sink.lock() {
                    Ok(mut guard) if !failed.load(Ordering::Acquire) => guard
                        .write_tree(tree_idx, &tree)
                        .map_err(|source| TrainError::Sink { tree_idx, source }),
                    Ok(_) => break,
                    Err(_) => Err(TrainError::SinkPoisoned),
                };
                match written {
                    Ok(()) => {
                        n_written.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(err) => {
                        tree_logger.write_failed(&err);
                        record_failure(err);
                    }
                }
            }
        });

        if let Some(err) = first_error.into_inner().ok().flatten() {
            return Err(err);
        }

        let summary = TrainingSummary {
            n_requested: n_trees,
            n_written: n_written.into_inner(),
            n_skipped: n_skipped.into_inner(),
        };
        logger.finish_training(summary.n_written, summary.n_skipped);
        Ok(summary)
    }

    /// Train into memory.
    pub fn train(&self, corpus: &Corpus, parallelism: Parallelism) -> Result<Ensemble, TrainError> {
        let mut sink = VecSink::new();
        self.train_into(corpus, &mut sink, parallelism)?;
        Ok(sink.into_ensemble())
    }
}
