//! Policies for drawing training and evaluation states from a corpus.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{Corpus, State};
use crate::rng::HashedRng;

/// Default stride bound for training samples.
pub const DEFAULT_MAX_STRIDE: u32 = 256;

/// Default gate period for evaluation samples.
pub const DEFAULT_GATE_PERIOD: u32 = 256;

/// How states are drawn from a [`Corpus`].
///
/// Every drawn position `p` of a sequence becomes
/// `State { history: tokens[..p], true_class: tokens[p], lookback: 0 }`, for
/// `p` from the sequence's boundary to its last token.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingPolicy {
    /// Every continuation position of every sequence.
    #[default]
    All,
    /// Individual positions separated by a random stride in `1..=max_stride`.
    ///
    /// The remaining stride carries over sequence boundaries.
    RandomStride { max_stride: u32 },
    /// Whole sequences, each kept with probability `1 / period`.
    SequenceGate { period: u32 },
}

impl SamplingPolicy {
    /// Default policy for tree induction.
    pub const fn default_train() -> Self {
        SamplingPolicy::RandomStride {
            max_stride: DEFAULT_MAX_STRIDE,
        }
    }

    /// Default policy for probability estimation.
    pub const fn default_eval() -> Self {
        SamplingPolicy::SequenceGate {
            period: DEFAULT_GATE_PERIOD,
        }
    }

    /// Whether the policy parameters are usable (non-zero stride/period).
    pub fn is_valid(&self) -> bool {
        match *self {
            SamplingPolicy::All => true,
            SamplingPolicy::RandomStride { max_stride } => max_stride > 0,
            SamplingPolicy::SequenceGate { period } => period > 0,
        }
    }

    /// Draw states from `corpus`, consuming randomness from `rng`.
    pub fn draw<'a>(&self, corpus: &'a Corpus, rng: &mut HashedRng) -> Vec<State<'a>> {
        match *self {
            SamplingPolicy::All => corpus.sequences().flat_map(|seq| seq.states()).collect(),
            SamplingPolicy::RandomStride { max_stride } => {
                let max_stride = max_stride.max(1);
                let mut out = Vec::new();
                let mut skip = 0u32;
                for seq in corpus.sequences() {
                    for p in seq.boundary()..seq.tokens().len() {
                        if skip == 0 {
                            out.push(seq.state_at(p));
                            skip = rng.gen_range(0..max_stride);
                        } else {
                            skip -= 1;
                        }
                    }
                }
                out
            }
            SamplingPolicy::SequenceGate { period } => {
                let period = period.max(1);
                let mut out = Vec::new();
                for seq in corpus.sequences() {
                    if rng.gen_ratio(1, period) {
                        out.extend(seq.states());
                    }
                }
                out
            }
        }
    }
}
