//! High-level model API.
//!
//! [`TreeformerModel`] wraps a trained [`Ensemble`] together with the
//! configuration that produced it, and offers training, prediction, text
//! generation, and persistence in one place.

mod config;

pub use config::{ConfigError, TreeformerConfig};

use std::path::Path;

use rand::Rng;

use crate::data::Corpus;
use crate::inference::{DEFAULT_SAMPLING_MASS, Distribution, sample_next_token};
use crate::persist::{ReadError, TreeSink, WriteError};
use crate::repr::Ensemble;
use crate::training::{EnsembleTrainer, TrainError, TrainingSummary};
use crate::utils::run_with_threads;

/// Trained ensemble plus its configuration.
#[derive(Debug, Clone)]
pub struct TreeformerModel {
    ensemble: Ensemble,
    config: TreeformerConfig,
}

impl TreeformerModel {
    /// Wrap an existing ensemble (e.g. one loaded from disk).
    pub fn from_ensemble(ensemble: Ensemble) -> Self {
        Self {
            ensemble,
            config: TreeformerConfig::default(),
        }
    }

    pub fn from_parts(ensemble: Ensemble, config: TreeformerConfig) -> Self {
        Self { ensemble, config }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn ensemble(&self) -> &Ensemble {
        &self.ensemble
    }

    pub fn config(&self) -> &TreeformerConfig {
        &self.config
    }

    // =========================================================================
    // Training
    // =========================================================================

    /// Train a model in memory on the configured thread pool.
    pub fn train(corpus: &Corpus, config: TreeformerConfig) -> Result<Self, TrainError> {
        let trainer = EnsembleTrainer::new(config.to_ensemble_params());
        let ensemble = run_with_threads(config.n_threads_or_auto(), |parallelism| {
            trainer.train(corpus, parallelism)
        })?;
        Ok(Self { ensemble, config })
    }

    /// Train and stream each finished tree into `sink` instead of keeping it.
    pub fn train_into<S>(
        corpus: &Corpus,
        config: &TreeformerConfig,
        sink: &mut S,
    ) -> Result<TrainingSummary, TrainError>
    where
        S: TreeSink + ?Sized,
    {
        let trainer = EnsembleTrainer::new(config.to_ensemble_params());
        run_with_threads(config.n_threads_or_auto(), |parallelism| {
            trainer.train_into(corpus, sink, parallelism)
        })
    }

    // =========================================================================
    // Prediction
    // =========================================================================

    /// Aggregated next-token distribution for `history`.
    pub fn predict(&self, history: &[u16]) -> Distribution {
        self.ensemble.predict_distribution(history)
    }

    /// Draw the next token for `history` with the default sampling mass.
    pub fn sample_next<R: Rng + ?Sized>(&self, history: &[u16], rng: &mut R) -> Option<u16> {
        sample_next_token(&self.predict(history), DEFAULT_SAMPLING_MASS, rng)
    }

    /// Extend `prompt` one sampled token at a time.
    ///
    /// Stops after `max_new_tokens`, when `stop_token` is drawn (it is not
    /// appended), or when no token can be drawn. Returns only the new tokens.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        prompt: &[u16],
        max_new_tokens: usize,
        stop_token: Option<u16>,
        rng: &mut R,
    ) -> Vec<u16> {
        let mut buffer = prompt.to_vec();
        for _ in 0..max_new_tokens {
            match self.sample_next(&buffer, rng) {
                Some(token) if Some(token) != stop_token => buffer.push(token),
                _ => break,
            }
        }
        buffer.split_off(prompt.len())
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Save the ensemble as a JSON array of trees.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), WriteError> {
        self.ensemble.save(path)
    }

    /// Load an ensemble saved by [`save`](Self::save) or streamed by the trainer.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ReadError> {
        Ok(Self::from_ensemble(Ensemble::load(path)?))
    }
}
