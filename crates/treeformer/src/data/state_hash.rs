//! Keyed hashing and total ordering of states.
//!
//! Reordering a sample by keyed hash gives a pseudo-random permutation that
//! is reproducible for a fixed key and independent of the sample's insertion
//! order. Taking a prefix of the reordered sample is then a random
//! sub-sample without a separate shuffle pass.

use std::cmp::Ordering;

use super::State;

/// Trailing history tokens that enter the hash.
///
/// Splits only read the last few tokens of a history, so a bounded suffix plus
/// the length already spreads states well. Ties fall back to a full content
/// comparison in [`StateHasher::compare`].
pub const HASHED_SUFFIX_TOKENS: usize = 64;

/// Keyed BLAKE3 hash over state contents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateHasher {
    key: [u8; 32],
}

impl StateHasher {
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// 64-bit keyed hash of `(lookback, true_class, len)` and the last
    /// [`HASHED_SUFFIX_TOKENS`] history tokens.
    pub fn hash64(&self, state: &State<'_>) -> u64 {
        let mut hasher = blake3::Hasher::new_keyed(&self.key);
        hasher.update(&state.lookback().to_le_bytes());
        hasher.update(&state.true_class().to_le_bytes());
        hasher.update(&(state.len() as u64).to_le_bytes());

        let history = state.history();
        let suffix = &history[history.len().saturating_sub(HASHED_SUFFIX_TOKENS)..];
        let mut buf = [0u8; HASHED_SUFFIX_TOKENS * 2];
        for (dst, token) in buf.chunks_exact_mut(2).zip(suffix) {
            dst.copy_from_slice(&token.to_le_bytes());
        }
        hasher.update(&buf[..suffix.len() * 2]);

        let mut out = [0u8; 8];
        out.copy_from_slice(&hasher.finalize().as_bytes()[..8]);
        u64::from_le_bytes(out)
    }

    /// Whether two states are the same for hashing purposes.
    #[inline]
    pub fn equivalent(&self, a: &State<'_>, b: &State<'_>) -> bool {
        a == b
    }

    /// Total order: by keyed hash, then by contents.
    pub fn compare(&self, a: &State<'_>, b: &State<'_>) -> Ordering {
        self.hash64(a)
            .cmp(&self.hash64(b))
            .then_with(|| a.cmp(b))
    }

    /// Sort `states` by [`compare`](Self::compare).
    pub fn shuffle(&self, states: &mut [State<'_>]) {
        states.sort_by_cached_key(|s| (self.hash64(s), *s));
    }
}
