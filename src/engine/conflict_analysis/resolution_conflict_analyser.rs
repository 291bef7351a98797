use super::ConflictAnalysisContext;
use crate::basic_types::KeyedVec;
use crate::butternut_assert_moderate;
use crate::butternut_assert_simple;
use crate::engine::sat::ReasonType;
use crate::engine::variables::BooleanVariable;
use crate::engine::variables::Literal;

/// The outcome of clause learning.
#[derive(Clone, Default, Debug)]
pub(crate) struct ConflictAnalysisResult {
    /// The learned clause with the asserting literal at index 0 and the literal with the next
    /// highest decision level at index 1.
    pub(crate) learned_literals: Vec<Literal>,
    /// The decision level to backtrack to.
    pub(crate) backjump_level: usize,
}

/// Computes 1-UIP learned clauses by resolution over the reason DAG.
#[derive(Default, Debug)]
pub(crate) struct ResolutionConflictAnalyser {
    seen: KeyedVec<BooleanVariable, bool>,
}

impl ResolutionConflictAnalyser {
    /// Compute the 1-UIP clause for the current conflict. A unique implication point is the
    /// single literal of the current decision level left in the clause: resolving the conflict
    /// backwards along the trail replaces current-level literals by their reasons until exactly
    /// one remains.
    ///
    /// The learned clause contains falsified literals; after backtracking to the returned
    /// backjump level its asserting literal (index 0) becomes unit.
    pub(crate) fn compute_1uip(
        &mut self,
        context: &mut ConflictAnalysisContext,
    ) -> ConflictAnalysisResult {
        let current_level = context.trail.get_decision_level();
        butternut_assert_simple!(
            current_level > 0,
            "a root conflict means the model is infeasible, there is nothing to learn"
        );

        let conflict_literals = context.get_conflict_literals();
        butternut_assert_simple!(!conflict_literals.is_empty());

        self.seen.accomodate(
            BooleanVariable::new(context.trail.num_variables() - 1),
            false,
        );

        // literals of levels below the current one go straight into the learned clause
        let mut learned_below: Vec<Literal> = vec![];
        let mut num_current_level = 0;

        for &literal in &conflict_literals {
            self.mark(literal, context, &mut learned_below, &mut num_current_level);
        }
        butternut_assert_moderate!(
            num_current_level > 0,
            "a conflict always involves the current decision level"
        );

        let mut trail_index = context.trail.num_trail_entries();
        let asserting_literal = loop {
            trail_index -= 1;
            let trail_literal = context.trail.get_trail_entry(trail_index);
            let variable = trail_literal.get_variable();
            if !self.seen[variable] {
                continue;
            }

            if num_current_level == 1 {
                // the first unique implication point
                break !trail_literal;
            }

            self.seen[variable] = false;
            num_current_level -= 1;

            let reason = context.get_reason(variable);
            for &literal in &reason {
                self.mark(literal, context, &mut learned_below, &mut num_current_level);
            }
        };

        let mut learned_literals = Vec::with_capacity(learned_below.len() + 1);
        learned_literals.push(asserting_literal);
        learned_literals.extend(learned_below);

        // the literal with the highest level among the rest moves to index 1; its level is the
        // backjump level
        let mut backjump_level = 0;
        for index in 1..learned_literals.len() {
            let level = context
                .trail
                .get_literal_assignment_level(learned_literals[index]);
            if level > backjump_level {
                backjump_level = level;
                learned_literals.swap(1, index);
            }
        }

        for &literal in &learned_literals {
            self.seen[literal.get_variable()] = false;
        }

        ConflictAnalysisResult {
            learned_literals,
            backjump_level,
        }
    }

    /// The ordered set of search decisions whose joint assertion caused the current conflict:
    /// walk the reason DAG from the conflict and collect every decision encountered. Used for
    /// core extraction when solving under assumptions.
    pub(crate) fn compute_incompatible_decisions(
        &mut self,
        seed: &[Literal],
        context: &mut ConflictAnalysisContext,
    ) -> Vec<Literal> {
        let mut visited: Vec<BooleanVariable> = vec![];
        let mut stack: Vec<BooleanVariable> = vec![];
        let mut decisions: Vec<Literal> = vec![];

        for &literal in seed {
            let variable = literal.get_variable();
            self.seen.accomodate(variable, false);
            if !self.seen[variable] {
                self.seen[variable] = true;
                visited.push(variable);
                stack.push(variable);
            }
        }

        while let Some(variable) = stack.pop() {
            if context.trail.get_variable_assignment_level(variable) == 0 {
                continue;
            }

            if matches!(
                context.trail.get_variable_reason_type(variable),
                ReasonType::Decision
            ) {
                let trail_index = context.trail.get_variable_trail_index(variable);
                decisions.push(context.trail.get_trail_entry(trail_index));
                continue;
            }

            let reason = context.get_reason(variable);
            for &literal in &reason {
                let reason_variable = literal.get_variable();
                self.seen.accomodate(reason_variable, false);
                if !self.seen[reason_variable] {
                    self.seen[reason_variable] = true;
                    visited.push(reason_variable);
                    stack.push(reason_variable);
                }
            }
        }

        for variable in visited {
            self.seen[variable] = false;
        }

        decisions.sort_by_key(|&literal| context.trail.get_literal_assignment_level(literal));
        decisions
    }

    fn mark(
        &mut self,
        literal: Literal,
        context: &ConflictAnalysisContext,
        learned_below: &mut Vec<Literal>,
        num_current_level: &mut usize,
    ) {
        let variable = literal.get_variable();
        self.seen.accomodate(variable, false);
        if self.seen[variable] {
            return;
        }

        let level = context.trail.get_variable_assignment_level(variable);
        if level == 0 {
            // root-level facts hold unconditionally and are dropped from learned clauses
            return;
        }

        self.seen[variable] = true;
        if level == context.trail.get_decision_level() {
            *num_current_level += 1;
        } else {
            learned_below.push(literal);
        }
    }
}
