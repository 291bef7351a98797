use super::IntegerEncoder;
use crate::basic_types::EmptyDomain;
use crate::basic_types::HashMap;
use crate::basic_types::KeyedVec;
use crate::butternut_assert_moderate;
use crate::butternut_assert_simple;
use crate::engine::sat::ReasonType;
use crate::engine::sat::Trail;
use crate::engine::variables::BooleanVariable;
use crate::engine::variables::IntegerLiteral;
use crate::engine::variables::IntegerValue;
use crate::engine::variables::IntegerVariable;
use crate::engine::variables::Literal;

/// The current state of one integer variable: its lower bound and the trail entry that
/// established it.
#[derive(Clone, Copy, Debug)]
struct VarInfo {
    current_bound: IntegerValue,
    current_trail_index: usize,
    /// The lower bound at creation time; used to canonicalise bound literals.
    initial_bound: IntegerValue,
}

/// One bound tightening. Entries whose `var` is `None` carry the reason of a Boolean literal
/// that the integer trail placed on the [`Trail`] and do not affect any bound.
///
/// The reason of an entry lives in two flat buffers; an entry only records where its slices
/// *start*, the ends are given by the next entry (or the buffer length for the top entry), so no
/// per-entry allocation is needed.
#[derive(Clone, Copy, Debug)]
pub(crate) struct TrailEntry {
    bound: IntegerValue,
    var: Option<IntegerVariable>,
    /// The index of the previous entry of the same variable; sentinels point at themselves.
    prev_trail_index: usize,
    literals_reason_start: usize,
    dependencies_start: usize,
}

/// The stack of integer bound tightenings, cross-referenced with the Boolean [`Trail`].
///
/// Only lower bounds are stored: the upper bound of `v` is the negation of the lower bound of
/// `v.negation()`. The first entry pushed for each variable is a sentinel carrying the root
/// bound. Reasons form a DAG: the `dependencies` of an entry are trail indices of the bound
/// facts it was derived from, and [`IntegerTrail::merge_reason_into`] flattens a set of such
/// indices into a conjunction of falsified literals for conflict analysis.
#[derive(Default, Debug)]
pub(crate) struct IntegerTrail {
    vars: KeyedVec<IntegerVariable, VarInfo>,
    trail: Vec<TrailEntry>,
    literals_reason_buffer: Vec<Literal>,
    dependencies_buffer: Vec<usize>,
    /// `trail_delimiters[i]` is the trail length at the moment decision level `i + 1` was
    /// created.
    trail_delimiters: Vec<usize>,
    current_decision_level: usize,
    /// For Boolean trail entries enqueued by this propagator, the integer trail entry holding
    /// their reason.
    boolean_trail_index_to_entry: HashMap<usize, usize>,
    /// For optional variables, the literal that must be false for the domain to be non-empty.
    is_empty_literals: KeyedVec<IntegerVariable, Option<Literal>>,
    /// The next Boolean trail entry to inspect when propagating associated literals into bounds.
    next_trail_position_to_propagate: usize,
}

impl IntegerTrail {
    /// Create a new integer variable with the given bounds. Allocates the variable and its
    /// negation, and pushes the two root-bound sentinels. May only be called at the root level.
    pub(crate) fn grow(
        &mut self,
        lower_bound: IntegerValue,
        upper_bound: IntegerValue,
    ) -> IntegerVariable {
        butternut_assert_simple!(
            self.current_decision_level == 0,
            "integer variables may only be created at the root level"
        );
        butternut_assert_simple!(lower_bound <= upper_bound, "inconsistent bounds");

        let var = IntegerVariable::new(self.vars.len() as u32);
        self.push_sentinel(lower_bound);
        self.push_sentinel(-upper_bound);

        var
    }

    fn push_sentinel(&mut self, bound: IntegerValue) {
        let trail_index = self.trail.len();
        let var = IntegerVariable::new(self.vars.len() as u32);
        self.vars.push(VarInfo {
            current_bound: bound,
            current_trail_index: trail_index,
            initial_bound: bound,
        });
        self.trail.push(TrailEntry {
            bound,
            var: Some(var),
            prev_trail_index: trail_index,
            literals_reason_start: self.literals_reason_buffer.len(),
            dependencies_start: self.dependencies_buffer.len(),
        });
        self.is_empty_literals.push(None);
    }

    pub(crate) fn num_integer_variables(&self) -> usize {
        self.vars.len()
    }

    pub(crate) fn num_trail_entries(&self) -> usize {
        self.trail.len()
    }

    pub(crate) fn get_entry_variable(&self, index: usize) -> Option<IntegerVariable> {
        self.trail[index].var
    }

    pub(crate) fn get_decision_level(&self) -> usize {
        self.current_decision_level
    }

    pub(crate) fn increase_decision_level(&mut self) {
        self.current_decision_level += 1;
        self.trail_delimiters.push(self.trail.len());
    }

    pub(crate) fn lower_bound(&self, var: IntegerVariable) -> IntegerValue {
        self.vars[var].current_bound
    }

    pub(crate) fn upper_bound(&self, var: IntegerVariable) -> IntegerValue {
        -self.vars[var.negation()].current_bound
    }

    pub(crate) fn initial_lower_bound(&self, var: IntegerVariable) -> IntegerValue {
        self.vars[var].initial_bound
    }

    pub(crate) fn initial_upper_bound(&self, var: IntegerVariable) -> IntegerValue {
        -self.vars[var.negation()].initial_bound
    }

    pub(crate) fn lower_bound_as_literal(&self, var: IntegerVariable) -> IntegerLiteral {
        IntegerLiteral::greater_or_equal(var, self.lower_bound(var))
    }

    pub(crate) fn upper_bound_as_literal(&self, var: IntegerVariable) -> IntegerLiteral {
        IntegerLiteral::greater_or_equal(var.negation(), self.vars[var.negation()].current_bound)
    }

    /// Register `is_present` as the presence literal of the variable (and of its negation): the
    /// domain of the variable may become empty without model-level failure as long as
    /// `!is_present` is then made true.
    pub(crate) fn mark_integer_variable_as_optional(
        &mut self,
        var: IntegerVariable,
        is_present: Literal,
    ) {
        butternut_assert_simple!(self.is_empty_literals[var].is_none());
        self.is_empty_literals[var] = Some(!is_present);
        self.is_empty_literals[var.negation()] = Some(!is_present);
    }

    pub(crate) fn get_is_empty_literal(&self, var: IntegerVariable) -> Option<Literal> {
        self.is_empty_literals[var]
    }

    /// Whether the variable is currently absent, i.e. its is-empty literal is true.
    pub(crate) fn is_ignored(&self, var: IntegerVariable, trail: &Trail) -> bool {
        self.is_empty_literals[var]
            .is_some_and(|literal| trail.is_literal_assigned_true(literal))
    }

    fn literals_reason(&self, entry_index: usize) -> &[Literal] {
        let start = self.trail[entry_index].literals_reason_start;
        let end = self
            .trail
            .get(entry_index + 1)
            .map_or(self.literals_reason_buffer.len(), |next| {
                next.literals_reason_start
            });
        &self.literals_reason_buffer[start..end]
    }

    fn dependencies(&self, entry_index: usize) -> &[usize] {
        let start = self.trail[entry_index].dependencies_start;
        let end = self
            .trail
            .get(entry_index + 1)
            .map_or(self.dependencies_buffer.len(), |next| {
                next.dependencies_start
            });
        &self.dependencies_buffer[start..end]
    }

    /// Walk the `prev_trail_index` chain of the literal's variable down to the earliest entry
    /// whose bound still entails the literal. `None` means the literal already holds at the
    /// root.
    pub(crate) fn find_lowest_trail_index_that_explain_bound(
        &self,
        integer_literal: IntegerLiteral,
    ) -> Option<usize> {
        let mut index = self.vars[integer_literal.var].current_trail_index;
        butternut_assert_moderate!(
            self.trail[index].bound >= integer_literal.bound,
            "only bounds that currently hold can be explained"
        );

        loop {
            let prev = self.trail[index].prev_trail_index;
            if prev == index {
                // the sentinel entails the literal: it holds at the root
                return None;
            }
            if self.trail[prev].bound >= integer_literal.bound {
                index = prev;
            } else {
                return Some(index);
            }
        }
    }

    /// Expand a set of trail indices into the conjunction of falsified literals that entails
    /// them, by an iterative depth-first traversal of the reason DAG.
    ///
    /// A per-variable map of the highest index queued so far lets a stronger reason on a
    /// variable subsume weaker ones, which also bounds the traversal: dependencies always point
    /// at strictly earlier entries. The output (including anything the caller already placed in
    /// `out`) is sorted and deduplicated.
    pub(crate) fn merge_reason_into(&self, indices: &[usize], out: &mut Vec<Literal>) {
        let mut highest: HashMap<IntegerVariable, usize> = HashMap::default();
        let mut stack: Vec<usize> = Vec::new();

        let enqueue = |highest: &mut HashMap<IntegerVariable, usize>,
                           stack: &mut Vec<usize>,
                           index: usize| {
            let entry = &self.trail[index];
            if entry.prev_trail_index == index {
                // a sentinel holds unconditionally
                return;
            }
            let var = entry.var.expect("dependencies refer to bound entries");
            if highest.get(&var).map_or(true, |&seen| index > seen) {
                let _ = highest.insert(var, index);
                stack.push(index);
            }
        };

        for &index in indices {
            enqueue(&mut highest, &mut stack, index);
        }

        while let Some(index) = stack.pop() {
            let var = self.trail[index].var.expect("only bound entries are queued");
            if highest[&var] != index {
                // a stronger bound on the same variable subsumes this one
                continue;
            }
            out.extend_from_slice(self.literals_reason(index));
            for position in 0..self.dependencies(index).len() {
                let dependency = self.dependencies(index)[position];
                enqueue(&mut highest, &mut stack, dependency);
            }
        }

        out.sort_unstable();
        out.dedup();
    }

    /// The reason of a Boolean literal this trail enqueued, as a conjunction of falsified
    /// literals.
    pub(crate) fn compute_literal_reason(
        &self,
        boolean_trail_index: usize,
        out: &mut Vec<Literal>,
    ) {
        let entry_index = self.boolean_trail_index_to_entry[&boolean_trail_index];
        out.extend_from_slice(self.literals_reason(entry_index));
        let dependencies: Vec<usize> = self.dependencies(entry_index).to_vec();
        self.merge_reason_into(&dependencies, out);
    }

    /// The full explanation of a bound fact that currently holds, as a conjunction of falsified
    /// literals; empty when the fact holds at the root.
    pub(crate) fn explain_integer_literal(&self, integer_literal: IntegerLiteral) -> Vec<Literal> {
        let mut out = vec![];
        if let Some(index) = self.find_lowest_trail_index_that_explain_bound(integer_literal) {
            self.merge_reason_into(&[index], &mut out);
        }
        out
    }

    /// Tighten the lower bound of `integer_literal.var` to `integer_literal.bound`.
    ///
    /// The reason is split in a Boolean part (`literal_reason`, falsified literals) and an
    /// integer part (`bound_reason`, bound facts that currently hold). On a crossed bound, a
    /// conflict is recorded on the trail for a non-optional variable, while an optional variable
    /// instead has its is-empty literal propagated to true. Fully encoded variables have their
    /// skipped value literals falsified and the bound strengthened to the next feasible value
    /// point.
    pub(crate) fn enqueue(
        &mut self,
        integer_literal: IntegerLiteral,
        literal_reason: &[Literal],
        bound_reason: &[IntegerLiteral],
        trail: &mut Trail,
        encoder: &IntegerEncoder,
    ) -> Result<(), EmptyDomain> {
        let var = integer_literal.var;
        let mut bound = integer_literal.bound;

        if bound <= self.lower_bound(var) {
            return Ok(());
        }

        // fully encoded variables can only take encoded values: skip forward to the next value
        // point whose literal is not yet falsified
        let mut literals_to_falsify: Vec<Literal> = vec![];
        if let Some(encoding) = encoder.get_full_encoding(var) {
            if let Some(&(value, _)) = encoding
                .iter()
                .find(|&&(value, literal)| {
                    value >= bound && !trail.is_literal_assigned_false(literal)
                })
            {
                if value > bound {
                    bound = value;
                }
            }
            literals_to_falsify.extend(
                encoding
                    .iter()
                    .take_while(|&&(value, _)| value < bound)
                    .filter(|&&(_, literal)| !trail.is_literal_assigned_false(literal))
                    .map(|&(_, literal)| literal),
            );
        }

        if bound > self.upper_bound(var) {
            return self.handle_crossed_bound(var, literal_reason, bound_reason, trail);
        }

        // the strongest existing associated literal implied by the new bound
        let associated = encoder
            .search_for_literal_at_or_before(IntegerLiteral::greater_or_equal(var, bound))
            .map(|(_, literal)| literal);
        if let Some(literal) = associated {
            if trail.is_literal_assigned_false(literal) {
                // the Boolean trail already knows the bound is impossible but the views have not
                // been synchronised yet
                let dependency_indices = self.collect_dependency_indices(bound_reason);
                let conflict = trail.mutable_conflict();
                conflict.extend_from_slice(literal_reason);
                conflict.push(literal);
                self.merge_reason_into(&dependency_indices, conflict);
                return Err(EmptyDomain);
            }
        }

        let literals_reason_start = self.literals_reason_buffer.len();
        self.literals_reason_buffer.extend_from_slice(literal_reason);
        let dependencies_start = self.dependencies_buffer.len();
        for &reason in bound_reason {
            if let Some(index) = self.find_lowest_trail_index_that_explain_bound(reason) {
                self.dependencies_buffer.push(index);
            }
        }

        let entry_index = self.trail.len();
        self.trail.push(TrailEntry {
            bound,
            var: Some(var),
            prev_trail_index: self.vars[var].current_trail_index,
            literals_reason_start,
            dependencies_start,
        });
        self.vars[var].current_bound = bound;
        self.vars[var].current_trail_index = entry_index;

        let mut same_reason_reference: Option<BooleanVariable> = None;
        if let Some(literal) = associated {
            if trail.is_literal_unassigned(literal) {
                trail.enqueue(literal, ReasonType::IntegerBounds);
                let _ = self
                    .boolean_trail_index_to_entry
                    .insert(trail.num_trail_entries() - 1, entry_index);
                same_reason_reference = Some(literal.get_variable());
            }
        }

        for value_literal in literals_to_falsify {
            // enqueuing the associated literal may already have falsified a value literal that
            // shares its Boolean variable
            if trail.is_literal_assigned_false(value_literal) {
                continue;
            }
            if trail.is_literal_assigned_true(value_literal) {
                // the variable was already fixed to a skipped value on the Boolean side
                let conflict = trail.mutable_conflict();
                conflict.extend_from_slice(literal_reason);
                conflict.push(!value_literal);
                let dependencies: Vec<usize> = self.dependencies(entry_index).to_vec();
                self.merge_reason_into(&dependencies, conflict);
                return Err(EmptyDomain);
            }

            match same_reason_reference {
                Some(reference) => {
                    trail.enqueue_with_same_reason_as(!value_literal, reference);
                }
                None => {
                    trail.enqueue(!value_literal, ReasonType::IntegerBounds);
                    let _ = self
                        .boolean_trail_index_to_entry
                        .insert(trail.num_trail_entries() - 1, entry_index);
                    same_reason_reference = Some(value_literal.get_variable());
                }
            }
        }

        Ok(())
    }

    fn handle_crossed_bound(
        &mut self,
        var: IntegerVariable,
        literal_reason: &[Literal],
        bound_reason: &[IntegerLiteral],
        trail: &mut Trail,
    ) -> Result<(), EmptyDomain> {
        let is_empty_literal = self.is_empty_literals[var];
        match is_empty_literal {
            Some(is_empty) if trail.is_literal_assigned_true(is_empty) => {
                // the variable is already absent; the tightening is vacuous
                Ok(())
            }
            Some(is_empty) if trail.is_literal_unassigned(is_empty) => {
                // the domain becomes formally empty, the variable is declared absent
                let mut extended = bound_reason.to_vec();
                extended.push(self.upper_bound_as_literal(var));
                self.enqueue_literal(is_empty, literal_reason, &extended, trail)
            }
            falsified_is_empty => {
                let mut dependency_indices = self.collect_dependency_indices(bound_reason);
                dependency_indices.push(self.vars[var.negation()].current_trail_index);

                let conflict = trail.mutable_conflict();
                conflict.extend_from_slice(literal_reason);
                if let Some(is_empty) = falsified_is_empty {
                    conflict.push(is_empty);
                }
                self.merge_reason_into(&dependency_indices, conflict);
                Err(EmptyDomain)
            }
        }
    }

    fn collect_dependency_indices(&self, bound_reason: &[IntegerLiteral]) -> Vec<usize> {
        bound_reason
            .iter()
            .filter_map(|&reason| self.find_lowest_trail_index_that_explain_bound(reason))
            .collect()
    }

    /// Place `literal` on the Boolean trail with the given reason, recorded in this trail's
    /// buffers. A false `literal` produces a conflict on the trail instead.
    pub(crate) fn enqueue_literal(
        &mut self,
        literal: Literal,
        literal_reason: &[Literal],
        bound_reason: &[IntegerLiteral],
        trail: &mut Trail,
    ) -> Result<(), EmptyDomain> {
        if trail.is_literal_assigned_true(literal) {
            return Ok(());
        }
        if trail.is_literal_assigned_false(literal) {
            let dependency_indices = self.collect_dependency_indices(bound_reason);
            let conflict = trail.mutable_conflict();
            conflict.extend_from_slice(literal_reason);
            conflict.push(literal);
            self.merge_reason_into(&dependency_indices, conflict);
            return Err(EmptyDomain);
        }

        let literals_reason_start = self.literals_reason_buffer.len();
        self.literals_reason_buffer.extend_from_slice(literal_reason);
        let dependencies_start = self.dependencies_buffer.len();
        for &reason in bound_reason {
            if let Some(index) = self.find_lowest_trail_index_that_explain_bound(reason) {
                self.dependencies_buffer.push(index);
            }
        }

        let entry_index = self.trail.len();
        self.trail.push(TrailEntry {
            bound: IntegerValue::ZERO,
            var: None,
            prev_trail_index: entry_index,
            literals_reason_start,
            dependencies_start,
        });
        trail.enqueue(literal, ReasonType::IntegerBounds);
        let _ = self
            .boolean_trail_index_to_entry
            .insert(trail.num_trail_entries() - 1, entry_index);

        Ok(())
    }

    /// Apply the integer meaning of newly assigned Boolean literals: a trail propagator in the
    /// scheduler sense, run as part of the Boolean propagation fixpoint.
    pub(crate) fn propagate(&mut self, trail: &mut Trail, encoder: &IntegerEncoder) -> bool {
        while self.next_trail_position_to_propagate < trail.num_trail_entries() {
            let literal = trail.get_trail_entry(self.next_trail_position_to_propagate);
            self.next_trail_position_to_propagate += 1;

            for position in 0..encoder.get_integer_literals_of(literal).len() {
                let integer_literal = encoder.get_integer_literals_of(literal)[position];
                if self
                    .enqueue(integer_literal, &[!literal], &[], trail, encoder)
                    .is_err()
                {
                    return false;
                }
            }
        }
        true
    }

    pub(crate) fn is_propagation_complete(&self, trail_size: usize) -> bool {
        self.next_trail_position_to_propagate == trail_size
    }

    /// Roll back to `target_level`, restoring bounds through the `prev_trail_index` chains and
    /// truncating the reason buffers.
    pub(crate) fn synchronise(&mut self, target_level: usize, boolean_trail_len: usize) {
        butternut_assert_simple!(target_level < self.current_decision_level);

        let target_length = self.trail_delimiters[target_level];
        if target_length < self.trail.len() {
            let literals_target = self.trail[target_length].literals_reason_start;
            let dependencies_target = self.trail[target_length].dependencies_start;

            for index in (target_length..self.trail.len()).rev() {
                let entry = self.trail[index];
                if let Some(var) = entry.var {
                    let prev = entry.prev_trail_index;
                    self.vars[var].current_trail_index = prev;
                    self.vars[var].current_bound = self.trail[prev].bound;
                }
            }

            self.trail.truncate(target_length);
            self.literals_reason_buffer.truncate(literals_target);
            self.dependencies_buffer.truncate(dependencies_target);
            self.boolean_trail_index_to_entry
                .retain(|&boolean_index, &mut entry| {
                    entry < target_length && boolean_index < boolean_trail_len
                });
        }

        self.trail_delimiters.truncate(target_level);
        self.current_decision_level = target_level;
        self.next_trail_position_to_propagate = self
            .next_trail_position_to_propagate
            .min(boolean_trail_len);
    }

    /// The level-zero state of all variables: a stream of `(var, bound)` pairs suffices to
    /// resume a model.
    pub(crate) fn level_zero_bounds(
        &self,
    ) -> impl Iterator<Item = (IntegerVariable, IntegerValue)> + '_ {
        butternut_assert_simple!(self.current_decision_level == 0);
        self.vars.keys().map(|var| {
            let bound = self.vars[&var].current_bound;
            (var, bound)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (IntegerTrail, Trail, IntegerEncoder) {
        (
            IntegerTrail::default(),
            Trail::default(),
            IntegerEncoder::default(),
        )
    }

    fn grow_var(
        integer_trail: &mut IntegerTrail,
        encoder: &mut IntegerEncoder,
        lb: i64,
        ub: i64,
    ) -> IntegerVariable {
        encoder.grow_integer_variable();
        integer_trail.grow(IntegerValue(lb), IntegerValue(ub))
    }

    #[test]
    fn bounds_follow_the_negation_pairing() {
        let (mut integer_trail, _, mut encoder) = setup();
        let x = grow_var(&mut integer_trail, &mut encoder, -2, 7);

        assert_eq!(integer_trail.lower_bound(x), IntegerValue(-2));
        assert_eq!(integer_trail.upper_bound(x), IntegerValue(7));
        assert_eq!(integer_trail.lower_bound(x.negation()), IntegerValue(-7));
        assert_eq!(integer_trail.upper_bound(x.negation()), IntegerValue(2));
    }

    #[test]
    fn bounds_are_monotone_within_a_level_and_restored_by_untrail() {
        let (mut integer_trail, mut trail, mut encoder) = setup();
        let x = grow_var(&mut integer_trail, &mut encoder, 0, 10);

        trail.increase_decision_level();
        integer_trail.increase_decision_level();

        let result = integer_trail.enqueue(
            IntegerLiteral::greater_or_equal(x, IntegerValue(3)),
            &[],
            &[],
            &mut trail,
            &encoder,
        );
        assert!(result.is_ok());
        // a weaker bound is a no-op
        let result = integer_trail.enqueue(
            IntegerLiteral::greater_or_equal(x, IntegerValue(2)),
            &[],
            &[],
            &mut trail,
            &encoder,
        );
        assert!(result.is_ok());
        assert_eq!(integer_trail.lower_bound(x), IntegerValue(3));

        let result = integer_trail.enqueue(
            IntegerLiteral::greater_or_equal(x, IntegerValue(6)),
            &[],
            &[],
            &mut trail,
            &encoder,
        );
        assert!(result.is_ok());
        assert_eq!(integer_trail.lower_bound(x), IntegerValue(6));

        integer_trail.synchronise(0, trail.num_trail_entries());
        assert_eq!(integer_trail.lower_bound(x), IntegerValue(0));
        assert_eq!(integer_trail.upper_bound(x), IntegerValue(10));
    }

    #[test]
    fn crossing_the_upper_bound_of_a_plain_variable_conflicts() {
        let (mut integer_trail, mut trail, mut encoder) = setup();
        let x = grow_var(&mut integer_trail, &mut encoder, 0, 4);

        trail.increase_decision_level();
        integer_trail.increase_decision_level();

        let result = integer_trail.enqueue(
            IntegerLiteral::greater_or_equal(x, IntegerValue(5)),
            &[],
            &[],
            &mut trail,
            &encoder,
        );
        assert_eq!(result, Err(EmptyDomain));
        assert!(trail.has_conflict());
    }

    #[test]
    fn crossing_an_optional_variable_sets_its_is_empty_literal() {
        let (mut integer_trail, mut trail, mut encoder) = setup();
        let x = grow_var(&mut integer_trail, &mut encoder, 0, 4);
        let is_present = Literal::new(trail.grow(), true);
        integer_trail.mark_integer_variable_as_optional(x, is_present);

        trail.increase_decision_level();
        integer_trail.increase_decision_level();

        let result = integer_trail.enqueue(
            IntegerLiteral::greater_or_equal(x, IntegerValue(9)),
            &[],
            &[],
            &mut trail,
            &encoder,
        );
        assert!(result.is_ok());
        assert!(trail.is_literal_assigned_true(!is_present));
        // the bound itself is not recorded
        assert_eq!(integer_trail.lower_bound(x), IntegerValue(0));
    }

    #[test]
    fn merge_reason_subsumes_weaker_bounds_of_the_same_variable() {
        let (mut integer_trail, mut trail, mut encoder) = setup();
        let x = grow_var(&mut integer_trail, &mut encoder, 0, 20);
        let y = grow_var(&mut integer_trail, &mut encoder, 0, 20);
        let a = Literal::new(trail.grow(), true);
        let b = Literal::new(trail.grow(), true);

        trail.increase_decision_level();
        integer_trail.increase_decision_level();
        trail.enqueue_search_decision(a);
        trail.enqueue_search_decision(b);

        // x >= 3 because of a, x >= 8 because of b
        let _ = integer_trail.enqueue(
            IntegerLiteral::greater_or_equal(x, IntegerValue(3)),
            &[!a],
            &[],
            &mut trail,
            &encoder,
        );
        let _ = integer_trail.enqueue(
            IntegerLiteral::greater_or_equal(x, IntegerValue(8)),
            &[!b],
            &[],
            &mut trail,
            &encoder,
        );
        // y >= 5 because of x >= 2, y >= 9 because of x >= 8
        let _ = integer_trail.enqueue(
            IntegerLiteral::greater_or_equal(y, IntegerValue(5)),
            &[],
            &[IntegerLiteral::greater_or_equal(x, IntegerValue(2))],
            &mut trail,
            &encoder,
        );
        let _ = integer_trail.enqueue(
            IntegerLiteral::greater_or_equal(y, IntegerValue(9)),
            &[],
            &[IntegerLiteral::greater_or_equal(x, IntegerValue(8))],
            &mut trail,
            &encoder,
        );

        // explaining y >= 9 needs x >= 8, which needs b; the weaker x-entry must be subsumed
        let reason =
            integer_trail.explain_integer_literal(IntegerLiteral::greater_or_equal(
                y,
                IntegerValue(9),
            ));
        assert_eq!(reason, vec![!b]);

        // explaining y >= 5 only needs the weaker x >= 2, which holds because of a
        let reason =
            integer_trail.explain_integer_literal(IntegerLiteral::greater_or_equal(
                y,
                IntegerValue(5),
            ));
        assert_eq!(reason, vec![!a]);
    }

    #[test]
    fn root_facts_have_empty_reasons() {
        let (mut integer_trail, _, mut encoder) = setup();
        let x = grow_var(&mut integer_trail, &mut encoder, 2, 9);

        let reason = integer_trail
            .explain_integer_literal(IntegerLiteral::greater_or_equal(x, IntegerValue(2)));
        assert!(reason.is_empty());
    }
}
