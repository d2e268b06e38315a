//! High-level training configuration with builder pattern.
//!
//! [`TreeformerConfig`] gathers every knob of ensemble training and uses the
//! `bon` crate for builder generation with validation at `build()`.
//!
//! # Example
//!
//! ```
//! use treeformer::model::TreeformerConfig;
//! use treeformer::data::SamplingPolicy;
//!
//! // All defaults
//! let config = TreeformerConfig::builder().build().unwrap();
//! assert_eq!(config.n_trees, 32);
//!
//! // Small, shallow ensemble over every position
//! let config = TreeformerConfig::builder()
//!     .n_trees(4)
//!     .max_depth(6)
//!     .train_sampling(SamplingPolicy::All)
//!     .build()
//!     .unwrap();
//! ```

use std::num::NonZeroUsize;

use bon::Builder;

use crate::data::SamplingPolicy;
use crate::persist::MAX_TREE_DEPTH;
use crate::training::{EnsembleParams, GrowerParams, SplitParams, Verbosity};

// =============================================================================
// ConfigError
// =============================================================================

/// Errors that can occur during configuration validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Number of trees must be at least 1.
    InvalidNTrees,
    /// Maximum depth must be in `1..=MAX_TREE_DEPTH + 1`.
    InvalidMaxDepth(usize),
    /// Windows must be non-empty and `discover_limit <= search_limit`.
    InvalidLimits { discover_limit: usize, search_limit: usize },
    /// Minimum gain must be finite and non-negative.
    InvalidMinGain(f64),
    /// Sampling stride or period must be non-zero.
    InvalidSampling { field: &'static str, policy: SamplingPolicy },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidNTrees => write!(f, "n_trees must be at least 1"),
            Self::InvalidMaxDepth(v) => write!(
                f,
                "max_depth must be between 1 and {}, got {}",
                MAX_TREE_DEPTH + 1,
                v
            ),
            Self::InvalidLimits {
                discover_limit,
                search_limit,
            } => write!(
                f,
                "need 0 < discover_limit <= search_limit, got {} and {}",
                discover_limit, search_limit
            ),
            Self::InvalidMinGain(v) => {
                write!(f, "min_information_gain must be finite and non-negative, got {}", v)
            }
            Self::InvalidSampling { field, policy } => {
                write!(f, "{} has a zero stride or period: {:?}", field, policy)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// =============================================================================
// TreeformerConfig
// =============================================================================

/// Configuration for training a treeformer ensemble.
///
/// Defaults target large corpora: three absolute offsets,
/// relative deltas of one, dynamic lookback from depth 8, depth capped at 32.
#[derive(Debug, Clone, Builder)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct TreeformerConfig {
    // === Ensemble ===
    /// Trees to train. Default: 32.
    #[builder(default = 32)]
    pub n_trees: usize,

    // === Candidate space ===
    /// Absolute offsets `0..S` are proposed. Default: 3.
    #[builder(default = 3)]
    pub static_lookback_limit: usize,

    /// Bound on relative deltas. Default: 1.
    #[builder(default = 1)]
    pub relative_lookback_limit: usize,

    // === Split search ===
    /// Static candidates scored per search. Default: 256.
    #[builder(default = 256)]
    pub static_search_iterations: usize,

    /// Dynamic candidates scored per search. Default: 4096.
    #[builder(default = 4096)]
    pub dynamic_search_iterations: usize,

    /// Fewer states than this are never split. Default: 128.
    #[builder(default = 128)]
    pub min_split_samples: usize,

    /// States used to score candidates. Default: 1 048 576.
    #[builder(default = 1_048_576)]
    pub search_limit: usize,

    /// States used to discover candidates. Default: 65 536.
    #[builder(default = 65_536)]
    pub discover_limit: usize,

    /// A split must gain strictly more than this. Default: 0.002.
    #[builder(default = 0.002)]
    pub min_information_gain: f64,

    // === Tree shape ===
    /// No node is created at this depth. Default: 32.
    #[builder(default = 32)]
    pub max_depth: usize,

    /// Dynamic candidates are searched from this depth on. Default: 8.
    #[builder(default = 8)]
    pub min_dynamic_lookback_depth: usize,

    // === Sampling ===
    /// Training sample policy. Default: random stride up to 256.
    #[builder(default = SamplingPolicy::default_train())]
    pub train_sampling: SamplingPolicy,

    /// Estimation sample policy. Default: one sequence in 256.
    #[builder(default = SamplingPolicy::default_eval())]
    pub eval_sampling: SamplingPolicy,

    // === Resource control ===
    /// Number of threads. `None` uses all available cores.
    pub n_threads: Option<NonZeroUsize>,

    // === Reproducibility ===
    /// Master seed. Default: 42.
    #[builder(default = 42)]
    pub seed: u64,

    // === Logging ===
    /// Verbosity level. Default: `Warning`.
    #[builder(default)]
    pub verbosity: Verbosity,
}

/// Custom finishing function that validates the config.
impl<S: treeformer_config_builder::IsComplete> TreeformerConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any parameter is invalid:
    /// - `n_trees == 0`, or `max_depth` outside `1..=MAX_TREE_DEPTH + 1`
    /// - an empty window, or `discover_limit > search_limit`
    /// - a negative or non-finite minimum gain
    /// - a zero sampling stride or period
    pub fn build(self) -> Result<TreeformerConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl TreeformerConfig {
    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.n_trees == 0 {
            return Err(ConfigError::InvalidNTrees);
        }
        if self.max_depth == 0 || self.max_depth > MAX_TREE_DEPTH + 1 {
            return Err(ConfigError::InvalidMaxDepth(self.max_depth));
        }
        if self.discover_limit == 0 || self.discover_limit > self.search_limit {
            return Err(ConfigError::InvalidLimits {
                discover_limit: self.discover_limit,
                search_limit: self.search_limit,
            });
        }
        if !self.min_information_gain.is_finite() || self.min_information_gain < 0.0 {
            return Err(ConfigError::InvalidMinGain(self.min_information_gain));
        }
        for (field, policy) in [
            ("train_sampling", self.train_sampling),
            ("eval_sampling", self.eval_sampling),
        ] {
            if !policy.is_valid() {
                return Err(ConfigError::InvalidSampling { field, policy });
            }
        }
        Ok(())
    }

    /// Thread count in `run_with_threads` terms (0 = all cores).
    pub fn n_threads_or_auto(&self) -> usize {
        self.n_threads.map_or(0, NonZeroUsize::get)
    }

    pub fn to_split_params(&self) -> SplitParams {
        SplitParams {
            static_lookback_limit: self.static_lookback_limit,
            relative_lookback_limit: self.relative_lookback_limit,
            min_split_samples: self.min_split_samples,
            static_search_iterations: self.static_search_iterations,
            dynamic_search_iterations: self.dynamic_search_iterations,
            discover_limit: self.discover_limit,
            search_limit: self.search_limit,
            min_information_gain: self.min_information_gain,
        }
    }

    pub fn to_grower_params(&self) -> GrowerParams {
        GrowerParams {
            split: self.to_split_params(),
            max_depth: self.max_depth,
            min_dynamic_lookback_depth: self.min_dynamic_lookback_depth,
        }
    }

    pub fn to_ensemble_params(&self) -> EnsembleParams {
        EnsembleParams {
            n_trees: self.n_trees,
            seed: self.seed,
            train_sampling: self.train_sampling,
            eval_sampling: self.eval_sampling,
            grower: self.to_grower_params(),
            verbosity: self.verbosity,
        }
    }
}

impl Default for TreeformerConfig {
    fn default() -> Self {
        Self::builder().build().expect("default config is valid")
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = TreeformerConfig::builder().build().unwrap();
        assert_eq!(config.n_trees, 32);
        assert_eq!(config.static_lookback_limit, 3);
        assert_eq!(config.relative_lookback_limit, 1);
        assert_eq!(config.max_depth, 32);
        assert_eq!(config.min_dynamic_lookback_depth, 8);
        assert_eq!(config.discover_limit, 65_536);
        assert_eq!(config.search_limit, 1_048_576);
        assert_eq!(config.train_sampling, SamplingPolicy::RandomStride { max_stride: 256 });
        assert_eq!(config.eval_sampling, SamplingPolicy::SequenceGate { period: 256 });
        assert_eq!(config.n_threads_or_auto(), 0);
    }

    #[test]
    fn test_defaults_match_mid_level_params() {
        let config = TreeformerConfig::default();
        assert_eq!(config.to_split_params(), SplitParams::default());
        assert_eq!(config.to_grower_params(), GrowerParams::default());
        let params = config.to_ensemble_params();
        assert_eq!(params.n_trees, 32);
        assert_eq!(params.seed, 42);
    }

    #[test]
    fn test_invalid_n_trees_zero() {
        let result = TreeformerConfig::builder().n_trees(0).build();
        assert!(matches!(result, Err(ConfigError::InvalidNTrees)));
    }

    #[test]
    fn test_invalid_max_depth() {
        let result = TreeformerConfig::builder().max_depth(0).build();
        assert!(matches!(result, Err(ConfigError::InvalidMaxDepth(0))));
        let result = TreeformerConfig::builder().max_depth(MAX_TREE_DEPTH + 2).build();
        assert!(matches!(result, Err(ConfigError::InvalidMaxDepth(_))));
        assert!(TreeformerConfig::builder().max_depth(MAX_TREE_DEPTH + 1).build().is_ok());
    }

    #[test]
    fn test_discover_limit_above_search_limit() {
        let result = TreeformerConfig::builder()
            .discover_limit(2048)
            .search_limit(1024)
            .build();
        assert_eq!(
            result.unwrap_err(),
            ConfigError::InvalidLimits {
                discover_limit: 2048,
                search_limit: 1024
            }
        );
    }

    #[test]
    fn test_invalid_min_gain() {
        let result = TreeformerConfig::builder().min_information_gain(f64::NAN).build();
        assert!(matches!(result, Err(ConfigError::InvalidMinGain(_))));
        let result = TreeformerConfig::builder().min_information_gain(-0.5).build();
        assert!(matches!(result, Err(ConfigError::InvalidMinGain(_))));
    }

    #[test]
    fn test_invalid_sampling() {
        let result = TreeformerConfig::builder()
            .eval_sampling(SamplingPolicy::SequenceGate { period: 0 })
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidSampling {
                field: "eval_sampling",
                ..
            })
        ));
    }

    #[test]
    fn test_n_threads() {
        let config = TreeformerConfig::builder()
            .n_threads(NonZeroUsize::new(3).unwrap())
            .build()
            .unwrap();
        assert_eq!(config.n_threads_or_auto(), 3);
    }
}
