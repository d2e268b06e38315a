//! Tokenized training corpus.
//!
//! Each record is stored as one owned buffer whose first element is the
//! *boundary*: the index (into the tokens that follow the header) of the
//! first continuation token. Positions before the boundary are prompt
//! context only; positions from the boundary on become training states.

use super::State;

/// Minimum number of tokens (excluding the header) in a usable record.
pub const MIN_RECORD_TOKENS: usize = 2;

/// Errors for records that cannot be used as training data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CorpusError {
    #[error("record has no boundary header")]
    MissingHeader,

    #[error("record has {len} tokens, need at least {min}")]
    TooShort { len: usize, min: usize },

    #[error("boundary {boundary} out of range for {len} tokens")]
    BoundaryOutOfRange { boundary: usize, len: usize },

    #[error("prompt of {len} tokens does not fit the u16 boundary header")]
    PromptTooLong { len: usize },
}

/// One record of a corpus: header plus tokens.
#[derive(Clone, Copy, Debug)]
pub struct Sequence<'a> {
    raw: &'a [u16],
}

impl<'a> Sequence<'a> {
    /// Tokens following the boundary header.
    #[inline]
    pub fn tokens(&self) -> &'a [u16] {
        &self.raw[1..]
    }

    /// Index of the first continuation token.
    #[inline]
    pub fn boundary(&self) -> usize {
        self.raw[0] as usize
    }

    /// Number of states this record contributes.
    #[inline]
    pub fn n_positions(&self) -> usize {
        self.tokens().len() - self.boundary()
    }

    /// The state predicting the token at `position`.
    #[inline]
    pub fn state_at(&self, position: usize) -> State<'a> {
        let tokens = self.tokens();
        State::new(&tokens[..position], tokens[position])
    }

    /// Every continuation position as a state.
    pub fn states(&self) -> impl Iterator<Item = State<'a>> + 'a + use<'a> {
        let seq = *self;
        (seq.boundary()..seq.tokens().len()).map(move |p| seq.state_at(p))
    }
}

/// Read-only collection of validated records.
///
/// Shared immutably across training workers.
#[derive(Clone, Debug, Default)]
pub struct Corpus {
    records: Vec<Box<[u16]>>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw records, skipping malformed ones.
    ///
    /// Skipped records are reported with a warning; they are never fatal.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = Vec<u16>>,
    {
        let mut corpus = Self::new();
        let mut skipped = 0usize;
        for (idx, record) in records.into_iter().enumerate() {
            if let Err(err) = corpus.push_record(record) {
                skipped += 1;
                tracing::warn!(record = idx, %err, "skipping malformed record");
            }
        }
        if skipped > 0 {
            tracing::info!(skipped, kept = corpus.len(), "corpus loaded with skipped records");
        }
        corpus
    }

    /// Validate and append a record whose element 0 is the boundary.
    pub fn push_record(&mut self, record: Vec<u16>) -> Result<(), CorpusError> {
        let (&boundary, tokens) = record.split_first().ok_or(CorpusError::MissingHeader)?;
        let boundary = boundary as usize;
        let len = tokens.len();
        if len < MIN_RECORD_TOKENS {
            return Err(CorpusError::TooShort {
                len,
                min: MIN_RECORD_TOKENS,
            });
        }
        if boundary == 0 || boundary >= len {
            return Err(CorpusError::BoundaryOutOfRange { boundary, len });
        }
        self.records.push(record.into_boxed_slice());
        Ok(())
    }

    /// Append a prompt/continuation pair, writing the header for it.
    pub fn push_pair(&mut self, prompt: &[u16], continuation: &[u16]) -> Result<(), CorpusError> {
        let boundary =
            u16::try_from(prompt.len()).map_err(|_| CorpusError::PromptTooLong { len: prompt.len() })?;
        let mut record = Vec::with_capacity(1 + prompt.len() + continuation.len());
        record.push(boundary);
        record.extend_from_slice(prompt);
        record.extend_from_slice(continuation);
        self.push_record(record)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn sequence(&self, idx: usize) -> Sequence<'_> {
        Sequence {
            raw: &self.records[idx],
        }
    }

    pub fn sequences(&self) -> impl Iterator<Item = Sequence<'_>> + '_ {
        self.records.iter().map(|raw| Sequence { raw })
    }

    /// Total number of states across all records.
    pub fn n_positions(&self) -> usize {
        self.sequences().map(|s| s.n_positions()).sum()
    }
}
