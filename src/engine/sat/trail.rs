use super::VariablesAssignment;
use crate::basic_types::ClauseReference;
use crate::basic_types::KeyedVec;
use crate::butternut_assert_moderate;
use crate::butternut_assert_simple;
use crate::engine::variables::BooleanVariable;
use crate::engine::variables::Literal;

/// The origin of a Boolean assignment, stored per variable while it is assigned.
///
/// The well-known sentinels (`Unit`, `Decision`, `SameAs`, `Cached`) are resolved by the
/// [`Trail`] itself; the remaining variants name the trail-level propagator that must be asked
/// for the reason. The set of such propagators is fixed, so a closed enum replaces an opaque
/// propagator id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ReasonType {
    /// The literal holds unconditionally; the reason is empty.
    Unit,
    /// The literal was a search decision; the reason is empty.
    Decision,
    /// The reason of this variable is the reason of the referenced variable.
    SameAs(BooleanVariable),
    /// Propagated by the [`BinaryImplicationGraph`](super::BinaryImplicationGraph).
    BinaryImplication,
    /// Propagated by a clause through the [`LiteralWatchers`](super::LiteralWatchers).
    Clause,
    /// Propagated by the [`IntegerTrail`](crate::engine::cp::IntegerTrail).
    IntegerBounds,
    /// The reason has been computed before and is stored on the trail; the pre-computation
    /// variant is kept in a parallel store so nothing is lost.
    Cached,
}

/// Bookkeeping for one assigned variable. Only valid while the variable is assigned; it is
/// overwritten wholesale by the next assignment of the same variable, which also implicitly
/// invalidates a cached reason.
#[derive(Clone, Copy, Debug)]
pub(crate) struct AssignmentInfo {
    pub(crate) level: u32,
    pub(crate) trail_index: u32,
    pub(crate) reason_type: ReasonType,
}

impl Default for AssignmentInfo {
    fn default() -> Self {
        AssignmentInfo {
            level: 0,
            trail_index: 0,
            reason_type: ReasonType::Unit,
        }
    }
}

/// The ordered stack of all Boolean assignments, both decisions and propagations.
///
/// Besides the assignment stack itself the trail owns the three-valued
/// [`VariablesAssignment`], the per-variable [`AssignmentInfo`], the lazily computed reason
/// cache, and the current conflict: either an owned vector of falsified literals written through
/// [`Trail::mutable_conflict`], or a reference to a falsified clause set through
/// [`Trail::set_failing_sat_clause`]. At most one of the two is ever set.
#[derive(Debug)]
pub(crate) struct Trail {
    assignment: VariablesAssignment,
    trail: Vec<Literal>,
    info: KeyedVec<BooleanVariable, AssignmentInfo>,
    /// Holds the pre-cache [`ReasonType`] of a variable whose current type is
    /// [`ReasonType::Cached`].
    original_reason_type: KeyedVec<BooleanVariable, ReasonType>,
    cached_reasons: KeyedVec<BooleanVariable, Vec<Literal>>,
    current_decision_level: usize,
    /// `trail_delimiters[i]` is the trail length at the moment decision level `i + 1` was
    /// created.
    trail_delimiters: Vec<usize>,
    conflict_literals: Vec<Literal>,
    failing_clause: Option<ClauseReference>,
    /// Scratch space so [`Trail::untrail`] can hand back the unassigned literals.
    last_untrailed: Vec<Literal>,
    /// Convenience literals fixed at the root, set up by the solver on construction.
    pub(crate) true_literal: Literal,
    pub(crate) false_literal: Literal,
}

impl Default for Trail {
    fn default() -> Self {
        let dummy_literal = Literal::u32_to_literal(0);
        Trail {
            assignment: VariablesAssignment::default(),
            trail: vec![],
            info: KeyedVec::default(),
            original_reason_type: KeyedVec::default(),
            cached_reasons: KeyedVec::default(),
            current_decision_level: 0,
            trail_delimiters: vec![],
            conflict_literals: vec![],
            failing_clause: None,
            last_untrailed: vec![],
            true_literal: dummy_literal,
            false_literal: !dummy_literal,
        }
    }
}

impl Trail {
    pub(crate) fn grow(&mut self) -> BooleanVariable {
        let variable = BooleanVariable::new(self.assignment.num_variables());

        self.assignment.grow();
        self.info.push(AssignmentInfo::default());
        self.original_reason_type.push(ReasonType::Unit);
        self.cached_reasons.push(vec![]);

        variable
    }

    pub(crate) fn num_variables(&self) -> u32 {
        self.assignment.num_variables()
    }

    pub(crate) fn num_trail_entries(&self) -> usize {
        self.trail.len()
    }

    pub(crate) fn get_trail_entry(&self, index: usize) -> Literal {
        self.trail[index]
    }

    pub(crate) fn get_decision_level(&self) -> usize {
        self.current_decision_level
    }

    pub(crate) fn is_at_the_root_level(&self) -> bool {
        self.current_decision_level == 0
    }

    pub(crate) fn increase_decision_level(&mut self) {
        self.current_decision_level += 1;
        self.trail_delimiters.push(self.trail.len());
    }

    pub(crate) fn is_literal_assigned_true(&self, literal: Literal) -> bool {
        self.assignment.is_literal_assigned_true(literal)
    }

    pub(crate) fn is_literal_assigned_false(&self, literal: Literal) -> bool {
        self.assignment.is_literal_assigned_false(literal)
    }

    pub(crate) fn is_literal_assigned(&self, literal: Literal) -> bool {
        self.assignment.is_literal_assigned(literal)
    }

    pub(crate) fn is_literal_unassigned(&self, literal: Literal) -> bool {
        self.assignment.is_literal_unassigned(literal)
    }

    pub(crate) fn is_variable_assigned(&self, variable: BooleanVariable) -> bool {
        self.assignment.is_variable_assigned(variable)
    }

    pub(crate) fn is_literal_root_assignment(&self, literal: Literal) -> bool {
        self.is_literal_assigned(literal)
            && self.get_variable_assignment_level(literal.get_variable()) == 0
    }

    pub(crate) fn get_variable_assignment_level(&self, variable: BooleanVariable) -> usize {
        butternut_assert_moderate!(self.is_variable_assigned(variable));
        self.info[variable].level as usize
    }

    pub(crate) fn get_literal_assignment_level(&self, literal: Literal) -> usize {
        self.get_variable_assignment_level(literal.get_variable())
    }

    pub(crate) fn get_variable_trail_index(&self, variable: BooleanVariable) -> usize {
        butternut_assert_moderate!(self.is_variable_assigned(variable));
        self.info[variable].trail_index as usize
    }

    pub(crate) fn get_variable_reason_type(&self, variable: BooleanVariable) -> ReasonType {
        butternut_assert_moderate!(self.is_variable_assigned(variable));
        self.info[variable].reason_type
    }

    /// Append `literal` to the trail with the given reason. The variable must be unassigned.
    pub(crate) fn enqueue(&mut self, literal: Literal, reason_type: ReasonType) {
        butternut_assert_simple!(
            self.is_literal_unassigned(literal),
            "cannot enqueue an assigned literal"
        );

        self.info[literal.get_variable()] = AssignmentInfo {
            level: self.current_decision_level as u32,
            trail_index: self.trail.len() as u32,
            reason_type,
        };
        self.assignment.make_literal_true(literal);
        self.trail.push(literal);
    }

    pub(crate) fn enqueue_with_unit_reason(&mut self, literal: Literal) {
        self.enqueue(literal, ReasonType::Unit);
    }

    /// The caller must have increased the decision level before enqueuing a search decision.
    pub(crate) fn enqueue_search_decision(&mut self, literal: Literal) {
        butternut_assert_simple!(
            self.current_decision_level > 0,
            "search decisions live above the root level"
        );
        self.enqueue(literal, ReasonType::Decision);
    }

    pub(crate) fn enqueue_with_same_reason_as(
        &mut self,
        literal: Literal,
        reference_variable: BooleanVariable,
    ) {
        butternut_assert_moderate!(self.is_variable_assigned(reference_variable));
        self.enqueue(literal, ReasonType::SameAs(reference_variable));
    }

    /// Enqueue a propagated literal. Returns false when the literal is already false, in which
    /// case nothing is recorded and the caller is responsible for reporting the conflict. An
    /// already-true literal is a no-op.
    pub(crate) fn enqueue_propagated(
        &mut self,
        literal: Literal,
        reason_type: ReasonType,
    ) -> bool {
        if self.is_literal_assigned_true(literal) {
            return true;
        }
        if self.is_literal_assigned_false(literal) {
            return false;
        }
        self.enqueue(literal, reason_type);
        true
    }

    /// Store the computed reason of `variable` and flip its type to [`ReasonType::Cached`]. The
    /// pre-cache type is preserved so debugging and untrail-time inspection can recover it.
    pub(crate) fn cache_reason(&mut self, variable: BooleanVariable, reason: Vec<Literal>) {
        butternut_assert_moderate!(
            self.info[variable].reason_type != ReasonType::Cached,
            "caching a reason twice"
        );

        self.original_reason_type[variable] = self.info[variable].reason_type;
        self.info[variable].reason_type = ReasonType::Cached;
        self.cached_reasons[variable] = reason;
    }

    pub(crate) fn get_cached_reason(&self, variable: BooleanVariable) -> &[Literal] {
        butternut_assert_moderate!(self.info[variable].reason_type == ReasonType::Cached);
        &self.cached_reasons[variable]
    }

    #[allow(unused, reason = "used by the debug checks")]
    pub(crate) fn get_original_reason_type(&self, variable: BooleanVariable) -> ReasonType {
        match self.info[variable].reason_type {
            ReasonType::Cached => self.original_reason_type[variable],
            other => other,
        }
    }

    /// Roll the trail back so that only levels `0..=target_level` remain; the returned iterator
    /// yields the unassigned literals in reverse assignment order.
    ///
    /// Cached reasons of unassigned variables need no explicit invalidation: the next
    /// assignment of such a variable overwrites its [`AssignmentInfo`].
    pub(crate) fn untrail(
        &mut self,
        target_level: usize,
    ) -> impl Iterator<Item = Literal> + '_ {
        butternut_assert_simple!(target_level < self.current_decision_level);

        let target_length = self.trail_delimiters[target_level];

        self.last_untrailed.clear();
        while self.trail.len() > target_length {
            let literal = self.trail.pop().unwrap();
            self.assignment.unassign_variable(literal.get_variable());
            self.last_untrailed.push(literal);
        }

        self.trail_delimiters.truncate(target_level);
        self.current_decision_level = target_level;

        self.last_untrailed.drain(..)
    }

    pub(crate) fn has_conflict(&self) -> bool {
        !self.conflict_literals.is_empty() || self.failing_clause.is_some()
    }

    /// The owned conflict vector; filled by propagators that explain their own conflicts.
    pub(crate) fn mutable_conflict(&mut self) -> &mut Vec<Literal> {
        butternut_assert_moderate!(
            self.failing_clause.is_none(),
            "a failing clause is already recorded"
        );
        &mut self.conflict_literals
    }

    pub(crate) fn set_failing_sat_clause(&mut self, clause_reference: ClauseReference) {
        butternut_assert_moderate!(
            !self.has_conflict(),
            "the conflict may only be set once per propagation"
        );
        self.failing_clause = Some(clause_reference);
    }

    pub(crate) fn get_failing_sat_clause(&self) -> Option<ClauseReference> {
        self.failing_clause
    }

    pub(crate) fn get_conflict_literals(&self) -> &[Literal] {
        &self.conflict_literals
    }

    pub(crate) fn clear_conflict(&mut self) {
        self.conflict_literals.clear();
        self.failing_clause = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trail_with_variables(num_variables: u32) -> (Trail, Vec<Literal>) {
        let mut trail = Trail::default();
        let literals = (0..num_variables)
            .map(|_| Literal::new(trail.grow(), true))
            .collect();
        (trail, literals)
    }

    #[test]
    fn trail_index_of_entry_i_equals_i() {
        let (mut trail, literals) = trail_with_variables(4);

        trail.enqueue_with_unit_reason(literals[2]);
        trail.enqueue_with_unit_reason(!literals[0]);
        trail.enqueue_with_unit_reason(literals[3]);

        for index in 0..trail.num_trail_entries() {
            let variable = trail.get_trail_entry(index).get_variable();
            assert_eq!(trail.get_variable_trail_index(variable), index);
        }
    }

    #[test]
    fn untrail_unassigns_in_reverse_order() {
        let (mut trail, literals) = trail_with_variables(3);

        trail.enqueue_with_unit_reason(literals[0]);
        trail.increase_decision_level();
        trail.enqueue_search_decision(literals[1]);
        trail.enqueue(literals[2], ReasonType::BinaryImplication);

        let unassigned: Vec<_> = trail.untrail(0).collect();
        assert_eq!(unassigned, vec![literals[2], literals[1]]);

        assert!(trail.is_literal_assigned_true(literals[0]));
        assert!(trail.is_literal_unassigned(literals[1]));
        assert!(trail.is_literal_unassigned(literals[2]));
        assert_eq!(trail.get_decision_level(), 0);
    }

    #[test]
    fn cached_reason_is_invalidated_by_reassignment() {
        let (mut trail, literals) = trail_with_variables(2);
        let variable = literals[1].get_variable();

        trail.increase_decision_level();
        trail.enqueue_search_decision(literals[0]);
        trail.enqueue(literals[1], ReasonType::BinaryImplication);

        trail.cache_reason(variable, vec![!literals[0]]);
        assert_eq!(trail.get_variable_reason_type(variable), ReasonType::Cached);
        assert_eq!(trail.get_cached_reason(variable), &[!literals[0]]);
        assert_eq!(
            trail.get_original_reason_type(variable),
            ReasonType::BinaryImplication
        );

        let _ = trail.untrail(0).count();
        trail.increase_decision_level();
        trail.enqueue_search_decision(literals[1]);

        assert_eq!(
            trail.get_variable_reason_type(variable),
            ReasonType::Decision
        );
    }

    #[test]
    fn conflict_is_either_owned_or_a_clause() {
        let (mut trail, literals) = trail_with_variables(2);

        assert!(!trail.has_conflict());
        trail.mutable_conflict().push(literals[0]);
        assert!(trail.has_conflict());
        assert_eq!(trail.get_conflict_literals(), &[literals[0]]);
        assert!(trail.get_failing_sat_clause().is_none());

        trail.clear_conflict();
        assert!(!trail.has_conflict());
    }
}
