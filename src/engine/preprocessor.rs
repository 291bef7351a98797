use crate::butternut_assert_simple;
use crate::engine::sat::Trail;
use crate::engine::variables::Literal;

/// Root-level clause preprocessing applied before a permanent clause is attached.
#[derive(Debug, Copy, Clone)]
pub(crate) struct Preprocessor;

impl Preprocessor {
    /// Removes duplicate literals and literals falsified at the root. A tautological clause, or
    /// one satisfied at the root, is reduced to a unit clause containing a literal that is true
    /// at the root. An empty result means the clause is infeasible at the root.
    pub(crate) fn preprocess_clause(mut literals: Vec<Literal>, trail: &Trail) -> Vec<Literal> {
        butternut_assert_simple!(trail.is_at_the_root_level());

        literals.sort_unstable();
        literals.dedup();

        // after sorting, the two polarities of a variable are adjacent
        for window in literals.windows(2) {
            if window[0] == !window[1] {
                return vec![trail.true_literal];
            }
        }

        if let Some(&satisfied) = literals
            .iter()
            .find(|&&literal| trail.is_literal_assigned_true(literal))
        {
            return vec![satisfied];
        }

        literals.retain(|&literal| !trail.is_literal_assigned_false(literal));
        literals
    }
}
