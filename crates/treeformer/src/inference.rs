//! Ensemble output aggregation and next-token sampling.

use rand::Rng;

use crate::repr::ClassProbs;

/// Fraction of the aggregated mass the sampler draws from by default.
pub const DEFAULT_SAMPLING_MASS: f64 = 0.1;

/// Summed class tables of an ensemble for one history.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Distribution {
    /// Token id -> summed probability over contributing trees.
    pub probs: ClassProbs,
    /// Trees in the ensemble.
    pub n_trees: usize,
    /// Trees that produced a table for this history.
    pub n_contributing: usize,
}

impl Distribution {
    pub fn new(n_trees: usize) -> Self {
        Self {
            probs: ClassProbs::new(),
            n_trees,
            n_contributing: 0,
        }
    }

    /// Add one tree's table.
    pub fn accumulate(&mut self, table: &ClassProbs) {
        for (&token, &p) in table {
            *self.probs.entry(token).or_insert(0.0) += p;
        }
        self.n_contributing += 1;
    }

    /// Sum of all probabilities, equal to `n_contributing` up to rounding.
    pub fn total_mass(&self) -> f64 {
        self.probs.values().sum()
    }

    /// Tokens in descending probability; ties keep ascending token order.
    pub fn ranked(&self) -> Vec<(u16, f64)> {
        let mut ranked: Vec<_> = self.probs.iter().map(|(&t, &p)| (t, p)).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }

    /// The most probable token.
    pub fn argmax(&self) -> Option<u16> {
        self.ranked().first().map(|&(t, _)| t)
    }
}

/// Top-k weighted draw.
///
/// Draws a budget uniformly from `[0, n_trees * mass)`, then walks tokens in
/// descending probability, subtracting each token's probability until the
/// budget is spent. Returns the last token taken, or `None` if the budget was
/// zero or the distribution is empty.
pub fn sample_next_token<R: Rng + ?Sized>(dist: &Distribution, mass: f64, rng: &mut R) -> Option<u16> {
    let mut budget = rng.r#gen::<f64>() * (dist.n_trees as f64 * mass);
    let mut drawn = None;
    for (token, p) in dist.ranked() {
        if budget <= 0.0 {
            break;
        }
        drawn = Some(token);
        budget -= p;
    }
    drawn
}
