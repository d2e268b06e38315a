//! Candidate predicates proposed by a single state.
//!
//! Each state suggests the predicates it would satisfy. The generator only
//! emits; deduplication and counting across states belong to the caller.

use rustc_hash::FxHashSet;

use crate::data::State;
use crate::repr::{Predicate, UNKNOWN_LOOKBACK};

/// Proposes static and dynamic candidates for one state.
#[derive(Clone, Copy, Debug)]
pub struct CandidateGenerator {
    /// `S`: absolute offsets `0..S` are proposed.
    pub static_lookback_limit: usize,
    /// `R`: relative deltas reach at most `R` positions either way.
    pub relative_lookback_limit: usize,
}

impl CandidateGenerator {
    pub fn new(static_lookback_limit: usize, relative_lookback_limit: usize) -> Self {
        Self {
            static_lookback_limit,
            relative_lookback_limit,
        }
    }

    /// Emit relative then absolute candidates matching `state`.
    ///
    /// `static_lookback` is the cursor every state on this path is known to
    /// carry, or [`UNKNOWN_LOOKBACK`]. When known, relative deltas landing on
    /// an absolute offset below `S` are dropped as redundant.
    pub fn static_candidates(
        &self,
        state: &State<'_>,
        static_lookback: i32,
        mut emit: impl FnMut(Predicate),
    ) {
        let len = state.len() as i64;
        let cursor = state.lookback() as i64;
        let s_limit = self.static_lookback_limit as i64;
        let r_limit = self.relative_lookback_limit as i64;

        let start = 1 - (len - cursor).min(r_limit);
        let mut end = cursor.min(r_limit);
        if static_lookback != UNKNOWN_LOOKBACK {
            end = end.min(static_lookback as i64 - s_limit);
        }
        for delta in start..=end {
            if let Some(token) = state.token_back(cursor - delta) {
                emit(Predicate::relative(-delta as i32, token));
            }
        }

        for offset in 0..s_limit.min(len) {
            if let Some(token) = state.token_back(offset) {
                emit(Predicate::absolute(offset as i32, token));
            }
        }
    }

    /// Emit one dynamic candidate per distinct token in the history.
    ///
    /// `seen` is scratch space; it is cleared on entry.
    pub fn dynamic_candidates(
        &self,
        state: &State<'_>,
        seen: &mut FxHashSet<u16>,
        mut emit: impl FnMut(Predicate),
    ) {
        seen.clear();
        for &token in state.history() {
            if seen.insert(token) {
                emit(Predicate::dynamic(token));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::PredicateKind;

    fn collect_static(generator: &CandidateGenerator, state: &State<'_>, baseline: i32) -> Vec<Predicate> {
        let mut out = Vec::new();
        generator.static_candidates(state, baseline, |p| out.push(p));
        out
    }

    #[test]
    fn absolute_candidates_cover_first_offsets() {
        let h = [4u16, 5, 6, 7];
        let state = State::new(&h, 0);
        let generator = CandidateGenerator::new(3, 1);
        let out = collect_static(&generator, &state, 0);
        let absolute: Vec<_> = out
            .iter()
            .filter(|p| p.kind() == PredicateKind::Absolute)
            .copied()
            .collect();
        assert_eq!(
            absolute,
            vec![
                Predicate::absolute(0, 7),
                Predicate::absolute(1, 6),
                Predicate::absolute(2, 5)
            ]
        );
        // Cursor 0 with a known baseline yields no relative candidates.
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn short_history_limits_absolute() {
        let h = [9u16];
        let out = collect_static(&CandidateGenerator::new(3, 1), &State::new(&h, 0), 0);
        assert_eq!(out, vec![Predicate::absolute(0, 9)]);
    }

    #[test]
    fn relative_candidates_match_their_state() {
        let h = [1u16, 2, 3, 4, 5, 6];
        let state = State::new(&h, 0).with_lookback(3);
        let generator = CandidateGenerator::new(3, 2);
        let relative: Vec<_> = collect_static(&generator, &state, UNKNOWN_LOOKBACK)
            .into_iter()
            .filter(|p| p.kind() == PredicateKind::Relative)
            .collect();
        // Deltas -1..=2.
        assert_eq!(relative.len(), 4);
        for p in relative {
            assert!(p.evaluate(state).0, "{p:?} should match");
        }
    }

    #[test]
    fn known_baseline_drops_redundant_relatives() {
        let h = [1u16, 2, 3, 4, 5, 6];
        let state = State::new(&h, 0).with_lookback(4);
        let generator = CandidateGenerator::new(3, 2);
        let relative: Vec<_> = collect_static(&generator, &state, 4)
            .into_iter()
            .filter(|p| p.kind() == PredicateKind::Relative)
            .collect();
        // Deltas -1..=1: offsets 5, 4, 3, all at or beyond S.
        assert_eq!(relative.len(), 3);
        for p in &relative {
            let (hit, next) = p.evaluate(state);
            assert!(hit);
            assert!(next.lookback() >= 3);
        }
    }

    #[test]
    fn dynamic_candidates_are_distinct() {
        let h = [3u16, 1, 3, 2, 1];
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        CandidateGenerator::new(3, 1).dynamic_candidates(&State::new(&h, 0), &mut seen, |p| out.push(p));
        assert_eq!(
            out,
            vec![Predicate::dynamic(3), Predicate::dynamic(1), Predicate::dynamic(2)]
        );
    }
}
