//! Tree and ensemble training.
//!
//! Training flows bottom-up:
//!
//! - [`CandidateGenerator`] proposes predicates for a set of states
//! - [`SplitFinder`] scores them by information gain on a shuffled window
//! - [`TreeGrower`] grows one tree breadth-first from the best splits
//! - [`estimate_class_probs`] fills the grown tree's class tables
//! - [`EnsembleTrainer`] trains independent trees in parallel into a sink

mod candidates;
mod grower;
mod logger;
mod probability;
mod split;
mod trainer;

pub use candidates::CandidateGenerator;
pub use grower::{GrowerParams, TreeGrower};
pub use logger::{TrainingLogger, Verbosity};
pub use probability::estimate_class_probs;
pub use split::{SplitFinder, SplitInfo, SplitParams};
pub use trainer::{EnsembleParams, EnsembleTrainer, TrainError, TrainingSummary};
