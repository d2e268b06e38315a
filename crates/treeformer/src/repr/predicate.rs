//! Node predicates: "does token X appear at offset Y".
//!
//! Three addressing modes locate the offset, counted backward from the end of
//! the history (offset 0 is the last token):
//!
//! - [`PredicateKind::Absolute`]: a fixed offset.
//! - [`PredicateKind::Relative`]: a fixed delta added to the state's cursor,
//!   i.e. relative to where the previous match on this path was found.
//! - [`PredicateKind::Dynamic`]: the most recent occurrence of the token
//!   strictly before the last position, wherever it is.
//!
//! A matching predicate moves the state's cursor to the match offset; a
//! failing one leaves the state untouched and takes the false branch.

use crate::data::State;

/// Offset addressing mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PredicateKind {
    Absolute,
    Relative,
    Dynamic,
}

/// A decision node's test.
///
/// Derives `Hash`/`Eq`/`Ord` so candidates can key count maps and be ranked
/// deterministically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Predicate {
    kind: PredicateKind,
    lookback: i32,
    compare: u16,
}

impl Predicate {
    /// Token `compare` at fixed offset `lookback` (must be non-negative).
    #[inline]
    pub fn absolute(lookback: i32, compare: u16) -> Self {
        debug_assert!(lookback >= 0, "absolute lookback must be non-negative");
        Self {
            kind: PredicateKind::Absolute,
            lookback,
            compare,
        }
    }

    /// Token `compare` at `lookback` positions from the state's cursor.
    #[inline]
    pub fn relative(lookback: i32, compare: u16) -> Self {
        Self {
            kind: PredicateKind::Relative,
            lookback,
            compare,
        }
    }

    /// Most recent occurrence of `compare` before the last token.
    #[inline]
    pub fn dynamic(compare: u16) -> Self {
        Self {
            kind: PredicateKind::Dynamic,
            lookback: 0,
            compare,
        }
    }

    /// Build from the persisted flag pair. The dynamic flag wins over the
    /// relative flag.
    pub fn from_flags(dynamic: bool, relative: bool, lookback: i32, compare: u16) -> Self {
        let kind = if dynamic {
            PredicateKind::Dynamic
        } else if relative {
            PredicateKind::Relative
        } else {
            PredicateKind::Absolute
        };
        Self {
            kind,
            lookback,
            compare,
        }
    }

    #[inline]
    pub fn kind(&self) -> PredicateKind {
        self.kind
    }

    #[inline]
    pub fn lookback(&self) -> i32 {
        self.lookback
    }

    #[inline]
    pub fn compare(&self) -> u16 {
        self.compare
    }

    #[inline]
    pub fn is_dynamic(&self) -> bool {
        self.kind == PredicateKind::Dynamic
    }

    #[inline]
    pub fn is_relative(&self) -> bool {
        self.kind == PredicateKind::Relative
    }

    /// Evaluate against `state`.
    ///
    /// Returns the branch taken and the state to carry on with: the updated
    /// state on a match, the input state unchanged otherwise.
    #[inline]
    pub fn evaluate<'a>(&self, state: State<'a>) -> (bool, State<'a>) {
        match self.kind {
            PredicateKind::Absolute => self.match_at(state, self.lookback as i64),
            PredicateKind::Relative => {
                self.match_at(state, self.lookback as i64 + state.lookback() as i64)
            }
            PredicateKind::Dynamic => {
                let history = state.history();
                let len = history.len();
                let scan_end = len.saturating_sub(1);
                match history[..scan_end].iter().rposition(|&t| t == self.compare) {
                    Some(i) => (true, state.with_lookback((len - i - 1) as i32)),
                    None => (false, state),
                }
            }
        }
    }

    #[inline]
    fn match_at<'a>(&self, state: State<'a>, offset: i64) -> (bool, State<'a>) {
        if state.token_back(offset) == Some(self.compare) {
            (true, state.with_lookback(offset as i32))
        } else {
            (false, state)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_reads_from_the_end() {
        let h = [10u16, 20, 30];
        let s = State::new(&h, 0);
        assert!(Predicate::absolute(0, 30).evaluate(s).0);
        assert!(!Predicate::absolute(0, 20).evaluate(s).0);
        let (hit, next) = Predicate::absolute(2, 10).evaluate(s);
        assert!(hit);
        assert_eq!(next.lookback(), 2);
        assert!(!Predicate::absolute(3, 10).evaluate(s).0);
    }

    #[test]
    fn relative_adds_cursor() {
        let h = [1u16, 2, 3, 4];
        let s = State::new(&h, 0).with_lookback(2);
        let (hit, next) = Predicate::relative(-1, 3).evaluate(s);
        assert!(hit);
        assert_eq!(next.lookback(), 1);

        let (hit, next) = Predicate::relative(-3, 4).evaluate(s);
        assert!(!hit);
        assert_eq!(next, s);
    }

    #[test]
    fn dynamic_skips_last_token() {
        let h = [5u16, 3, 5];
        let s = State::new(&h, 0);
        let (hit, next) = Predicate::dynamic(5).evaluate(s);
        assert!(hit);
        assert_eq!(next.lookback(), 2);

        let tail_only = [3u16, 5];
        assert!(!Predicate::dynamic(5).evaluate(State::new(&tail_only, 0)).0);
        assert!(!Predicate::dynamic(5).evaluate(State::new(&[], 0)).0);
    }

    #[test]
    fn dynamic_flag_wins() {
        let p = Predicate::from_flags(true, true, 4, 9);
        assert_eq!(p.kind(), PredicateKind::Dynamic);
        assert_eq!(Predicate::from_flags(false, true, -1, 9).kind(), PredicateKind::Relative);
        assert_eq!(Predicate::from_flags(false, false, 1, 9).kind(), PredicateKind::Absolute);
    }
}
