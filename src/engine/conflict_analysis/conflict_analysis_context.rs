use crate::engine::cp::IntegerTrail;
use crate::engine::sat::BinaryImplicationGraph;
use crate::engine::sat::ClauseAllocator;
use crate::engine::sat::LiteralWatchers;
use crate::engine::sat::ReasonType;
use crate::engine::sat::Trail;
use crate::engine::variables::BooleanVariable;
use crate::engine::variables::Literal;

/// Bundles the solver components needed during conflict analysis, most importantly the lazy
/// reason computation.
#[derive(Debug)]
pub(crate) struct ConflictAnalysisContext<'a> {
    pub(crate) trail: &'a mut Trail,
    pub(crate) integer_trail: &'a IntegerTrail,
    pub(crate) binary_implication_graph: &'a BinaryImplicationGraph,
    pub(crate) literal_watchers: &'a LiteralWatchers,
    pub(crate) clause_allocator: &'a ClauseAllocator,
}

impl ConflictAnalysisContext<'_> {
    /// The reason of the variable's current assignment: a set of literals that were all false at
    /// the moment of the assignment and whose falsity entails it.
    ///
    /// Computed lazily: the `SameAs` chain is followed first, then the propagator named by the
    /// stored reason type is asked for the reason at that trail index, and the result is cached
    /// on the trail by flipping the type to `Cached`.
    pub(crate) fn get_reason(&mut self, variable: BooleanVariable) -> Vec<Literal> {
        let mut variable = variable;
        while let ReasonType::SameAs(reference) = self.trail.get_variable_reason_type(variable) {
            variable = reference;
        }

        match self.trail.get_variable_reason_type(variable) {
            ReasonType::Unit | ReasonType::Decision => vec![],
            ReasonType::Cached => self.trail.get_cached_reason(variable).to_vec(),
            computed => {
                let trail_index = self.trail.get_variable_trail_index(variable);
                let reason = match computed {
                    ReasonType::BinaryImplication => {
                        self.binary_implication_graph.reason_for(trail_index)
                    }
                    ReasonType::Clause => {
                        let propagated = self.trail.get_trail_entry(trail_index);
                        self.literal_watchers.reason_for(
                            trail_index,
                            propagated,
                            self.clause_allocator,
                        )
                    }
                    ReasonType::IntegerBounds => {
                        let mut reason = vec![];
                        self.integer_trail
                            .compute_literal_reason(trail_index, &mut reason);
                        reason
                    }
                    _ => unreachable!("the sentinels are handled above"),
                };

                self.trail.cache_reason(variable, reason.clone());
                reason
            }
        }
    }

    /// The literals of the current conflict, all of which are false.
    pub(crate) fn get_conflict_literals(&self) -> Vec<Literal> {
        match self.trail.get_failing_sat_clause() {
            Some(reference) => self.clause_allocator[reference]
                .get_literal_slice()
                .to_vec(),
            None => self.trail.get_conflict_literals().to_vec(),
        }
    }
}
