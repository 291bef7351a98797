#![cfg(any(test, doc))]
//! This module exposes helpers that aid testing of propagators. The [`TestSolver`] allows
//! setting up specific scenarios under which to test the various operations of a propagator.

use super::cp::propagation::Propagator;
use super::solver::ConstraintSatisfactionSolver;
use crate::basic_types::ConstraintOperationError;
use crate::engine::variables::IntegerLiteral;
use crate::engine::variables::IntegerValue;
use crate::engine::variables::IntegerVariable;
use crate::engine::variables::Literal;

/// A thin wrapper around the solver kernel which can be used to test propagators in isolation.
#[derive(Default, Debug)]
pub(crate) struct TestSolver {
    pub(crate) solver: ConstraintSatisfactionSolver,
}

#[allow(unused, reason = "not every helper is exercised by every test configuration")]
impl TestSolver {
    pub(crate) fn new_variable(&mut self, lower_bound: i64, upper_bound: i64) -> IntegerVariable {
        self.solver.create_new_integer_variable(
            IntegerValue(lower_bound),
            IntegerValue(upper_bound),
        )
    }

    pub(crate) fn new_literal(&mut self) -> Literal {
        Literal::new(self.solver.create_new_boolean_variable(), true)
    }

    /// Post the propagator; propagation runs to fixpoint immediately, and a root conflict is
    /// reported as an error.
    pub(crate) fn new_propagator(
        &mut self,
        propagator: impl Propagator + 'static,
    ) -> Result<(), ConstraintOperationError> {
        self.solver.add_propagator(propagator)
    }

    /// Run propagation to fixpoint; false signals a conflict.
    pub(crate) fn propagate(&mut self) -> bool {
        self.solver.propagate()
    }

    pub(crate) fn lower_bound(&self, var: IntegerVariable) -> i64 {
        self.solver.lower_bound(var).get()
    }

    pub(crate) fn upper_bound(&self, var: IntegerVariable) -> i64 {
        self.solver.upper_bound(var).get()
    }

    pub(crate) fn assert_bounds(&self, var: IntegerVariable, lb: i64, ub: i64) {
        let actual_lb = self.lower_bound(var);
        let actual_ub = self.upper_bound(var);

        assert_eq!(
            (lb, ub),
            (actual_lb, actual_ub),
            "the expected bounds [{lb}..{ub}] did not match the actual bounds [{actual_lb}..{actual_ub}]"
        );
    }

    /// Tighten the lower bound of `var` as an unexplained fact at the current level.
    pub(crate) fn increase_lower_bound(&mut self, var: IntegerVariable, value: i64) {
        let result = self.solver.integer_trail.enqueue(
            IntegerLiteral::greater_or_equal(var, IntegerValue(value)),
            &[],
            &[],
            &mut self.solver.trail,
            &self.solver.integer_encoder,
        );
        assert!(
            result.is_ok(),
            "increase_lower_bound caused an empty domain"
        );
    }

    pub(crate) fn decrease_upper_bound(&mut self, var: IntegerVariable, value: i64) {
        self.increase_lower_bound(var.negation(), -value);
    }

    /// Assign the literal as a search decision on a fresh decision level.
    pub(crate) fn set_literal(&mut self, literal: Literal, value: bool) {
        self.solver.declare_new_decision_level();
        self.solver
            .enqueue_search_decision(if value { literal } else { !literal });
    }

    pub(crate) fn is_literal_true(&self, literal: Literal) -> bool {
        self.solver.get_literal_value(literal) == Some(true)
    }

    pub(crate) fn is_literal_false(&self, literal: Literal) -> bool {
        self.solver.get_literal_value(literal) == Some(false)
    }

    /// The full explanation of a bound fact that currently holds, as falsified literals.
    pub(crate) fn get_reason_for_bound(&self, integer_literal: IntegerLiteral) -> Vec<Literal> {
        self.solver
            .integer_trail
            .explain_integer_literal(integer_literal)
    }
}
