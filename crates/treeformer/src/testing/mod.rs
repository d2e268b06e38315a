//! Test utilities shared by unit tests, integration tests, and benchmarks.

pub mod data;

pub use data::{SYNTHETIC_VOCAB, markov_tokens, synthetic_corpus};
