use rand::prelude::*;

use crate::data::Corpus;
use crate::rng::HashedRng;

/// Vocabulary of the synthetic token process.
pub const SYNTHETIC_VOCAB: u16 = 8;

/// Probability that the next token breaks the deterministic rule.
const JUMP_PROBABILITY: f64 = 0.1;

/// Generate `len` tokens of a simple Markov process.
///
/// The next token is `(prev * 3 + 1) % SYNTHETIC_VOCAB`, except for
/// occasional uniform jumps. A tree that looks one token back learns it.
pub fn markov_tokens(len: usize, rng: &mut impl Rng) -> Vec<u16> {
	let mut tokens = Vec::with_capacity(len);
	let mut prev = rng.gen_range(0..SYNTHETIC_VOCAB);
	for _ in 0..len {
		tokens.push(prev);
		prev = if rng.r#gen::<f64>() < JUMP_PROBABILITY {
			rng.gen_range(0..SYNTHETIC_VOCAB)
		} else {
			(prev * 3 + 1) % SYNTHETIC_VOCAB
		};
	}
	tokens
}

/// Build a corpus of `n_sequences` Markov sequences of `len` tokens each.
///
/// Each sequence gets a prompt of 1 to 4 tokens.
pub fn synthetic_corpus(n_sequences: usize, len: usize, seed: u64) -> Corpus {
	assert!(len >= 2, "sequences need at least two tokens");
	let mut rng = HashedRng::seed_from_u64(seed);
	let mut corpus = Corpus::new();
	for _ in 0..n_sequences {
		let tokens = markov_tokens(len, &mut rng);
		let boundary = rng.gen_range(1..=(len - 1).min(4));
		let (prompt, continuation) = tokens.split_at(boundary);
		corpus
			.push_pair(prompt, continuation)
			.expect("synthetic records are well formed");
	}
	corpus
}
