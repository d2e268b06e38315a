//! Model persistence.
//!
//! Trees are stored as nested JSON node objects and ensembles as JSON arrays
//! of trees. [`schema`] holds the wire types, [`convert`] maps them to and
//! from the runtime arena, and [`sink`] streams trees out during training.

pub mod convert;
mod error;
pub mod schema;
mod sink;

pub use convert::{MAX_TREE_DEPTH, ensemble_to_schema, read_ensemble_json, write_ensemble_json};
pub use error::{ReadError, WriteError};
pub use schema::{ClassProbsSchema, EnsembleSchema, NodeSchema};
pub use sink::{JsonArraySink, TreeSink, VecSink};
