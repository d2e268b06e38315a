//! Corpus storage, training states, and sampling.

mod corpus;
mod sampling;
mod state;
mod state_hash;

pub use corpus::{Corpus, CorpusError, MIN_RECORD_TOKENS, Sequence};
pub use sampling::{DEFAULT_GATE_PERIOD, DEFAULT_MAX_STRIDE, SamplingPolicy};
pub use state::{INFERENCE_CLASS, State};
pub use state_hash::{HASHED_SUFFIX_TOKENS, StateHasher};
