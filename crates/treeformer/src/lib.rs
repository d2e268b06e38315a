//! treeformer: decision-tree ensembles for next-token prediction.
//!
//! A tree routes a token history through binary predicates that look at
//! tokens a fixed, relative, or dynamically found distance back. Each branch
//! stores a distribution over the next token, and an ensemble sums the
//! distributions of its trees.
//!
//! # Key Types
//!
//! - [`TreeformerModel`] - High-level model with train/predict/generate
//! - [`TreeformerConfig`] - Configuration builder
//! - [`Corpus`] / [`State`] - Training data and the states trees see
//! - [`Tree`] / [`Ensemble`] - Trained structures
//!
//! # Training
//!
//! Use `TreeformerConfig::builder()` to configure, then `TreeformerModel::train()`.
//! See the [`model`] module for details. Large runs can stream trees to disk
//! through a [`persist::JsonArraySink`].

pub mod data;
pub mod inference;
pub mod model;
pub mod persist;
pub mod repr;
pub mod rng;
pub mod testing;
pub mod training;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

// High-level model types
pub use model::{ConfigError, TreeformerConfig, TreeformerModel};

// Data types
pub use data::{Corpus, CorpusError, SamplingPolicy, State};

// Trained structures
pub use inference::{Distribution, sample_next_token};
pub use repr::{Ensemble, Predicate, PredicateKind, Tree};

// Training
pub use training::{TrainError, TrainingSummary, Verbosity};

// Shared utilities
pub use utils::{Parallelism, run_with_threads};
