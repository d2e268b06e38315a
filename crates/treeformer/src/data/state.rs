//! The unit of training and inference input.

/// Target label used for states built at inference time.
pub const INFERENCE_CLASS: u16 = 0;

/// A token history, its target label, and a lookback cursor.
///
/// `history` borrows a slice of a larger owned buffer (usually a
/// [`Corpus`](super::Corpus) sequence) and is never copied. The cursor starts
/// at 0 and is only changed by predicate evaluation, which returns an updated
/// copy instead of mutating in place.
///
/// Equality and ordering compare history *contents*, so two states over the
/// same buffer with different slice lengths are different states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct State<'a> {
    history: &'a [u16],
    true_class: u16,
    lookback: i32,
}

impl<'a> State<'a> {
    /// Create a training state with a zeroed cursor.
    #[inline]
    pub fn new(history: &'a [u16], true_class: u16) -> Self {
        Self {
            history,
            true_class,
            lookback: 0,
        }
    }

    /// Create an inference state; the label is the [`INFERENCE_CLASS`] sentinel.
    #[inline]
    pub fn for_inference(history: &'a [u16]) -> Self {
        Self::new(history, INFERENCE_CLASS)
    }

    /// Copy of this state with the cursor replaced.
    #[inline]
    pub fn with_lookback(self, lookback: i32) -> Self {
        Self { lookback, ..self }
    }

    #[inline]
    pub fn history(&self) -> &'a [u16] {
        self.history
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.history.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    #[inline]
    pub fn true_class(&self) -> u16 {
        self.true_class
    }

    #[inline]
    pub fn lookback(&self) -> i32 {
        self.lookback
    }

    /// Token at `offset` positions before the end of the history.
    ///
    /// Offset 0 is the last token. Returns `None` for negative offsets and for
    /// offsets reaching past the start of the history.
    #[inline]
    pub fn token_back(&self, offset: i64) -> Option<u16> {
        if offset < 0 {
            return None;
        }
        let len = self.history.len() as i64;
        let idx = len - 1 - offset;
        if idx < 0 {
            None
        } else {
            Some(self.history[idx as usize])
        }
    }
}
