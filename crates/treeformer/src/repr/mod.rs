//! Runtime model representation: predicates, trees, ensembles.

mod ensemble;
mod predicate;
mod tree;

pub use ensemble::Ensemble;
pub use predicate::{Predicate, PredicateKind};
pub use tree::{ClassProbs, Evaluation, Node, Tree, TreeValidationError, UNKNOWN_LOOKBACK};

/// Index of a node inside its tree's arena. The root is always 0.
pub type NodeId = u32;

/// One step of a root-to-node path: a node and the branch taken there.
pub type TraceStep = (NodeId, bool);
