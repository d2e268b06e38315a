//! Deterministic hashing-based random number generator.
//!
//! [`HashedRng`] keeps two 256-bit blocks and advances them by keying a
//! BLAKE3 hash of each block with the other:
//!
//! ```text
//! (v1, v2) := (H[v2](v1), H[v1](v2))
//! ```
//!
//! Output words are read from `v1`. The generator implements
//! [`RngCore`] and [`SeedableRng`], so the usual `rand` helpers such as
//! `gen_range` and `gen_ratio` work on it directly.

use rand::{Error, RngCore, SeedableRng};

const BLOCK: usize = 32;
const WORDS_PER_BLOCK: usize = BLOCK / 8;
const STREAM_CONTEXT: &str = "treeformer 2024 per-tree random stream";

/// Counter-style generator built on keyed BLAKE3.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HashedRng {
    v1: [u8; BLOCK],
    v2: [u8; BLOCK],
    /// Next unread 64-bit word of `v1`.
    word: usize,
}

impl HashedRng {
    /// Create a generator from its two raw blocks.
    pub fn from_blocks(v1: [u8; BLOCK], v2: [u8; BLOCK]) -> Self {
        Self { v1, v2, word: 0 }
    }

    /// Derive an independent stream from a master seed.
    ///
    /// The same `(seed, stream)` pair always yields the same sequence, and
    /// different stream indices yield unrelated sequences.
    pub fn for_stream(seed: u64, stream: u64) -> Self {
        let mut hasher = blake3::Hasher::new_derive_key(STREAM_CONTEXT);
        hasher.update(&seed.to_le_bytes());
        hasher.update(&stream.to_le_bytes());
        let v1 = *hasher.finalize().as_bytes();
        hasher.update(&[0xff]);
        let v2 = *hasher.finalize().as_bytes();
        Self::from_blocks(v1, v2)
    }

    /// Advance both blocks by one round.
    #[inline]
    pub fn step(&mut self) {
        let next_v1 = blake3::keyed_hash(&self.v2, &self.v1);
        let next_v2 = blake3::keyed_hash(&self.v1, &self.v2);
        self.v1 = *next_v1.as_bytes();
        self.v2 = *next_v2.as_bytes();
        self.word = 0;
    }

    /// Draw a fresh 256-bit key, e.g. for a [`StateHasher`](crate::data::StateHasher).
    pub fn next_key(&mut self) -> [u8; BLOCK] {
        let mut key = [0u8; BLOCK];
        self.fill_bytes(&mut key);
        key
    }
}

impl RngCore for HashedRng {
    #[inline]
    fn next_u32(&mut self) -> u32 {
        self.next_u64() as u32
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        if self.word == WORDS_PER_BLOCK {
            self.step();
        }
        let start = self.word * 8;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.v1[start..start + 8]);
        self.word += 1;
        u64::from_le_bytes(bytes)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let word = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&word[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for HashedRng {
    type Seed = [u8; BLOCK];

    fn from_seed(seed: Self::Seed) -> Self {
        let v2 = *blake3::hash(&seed).as_bytes();
        Self::from_blocks(seed, v2)
    }
}
