use crate::branching::InputOrderBrancher;
use crate::engine::conflict_analysis::ConflictAnalysisContext;
use crate::engine::solver::CSPSolverExecutionFlag;
use crate::engine::solver::ConstraintSatisfactionSolver;
use crate::engine::termination::Indefinite;
use crate::engine::variables::IntegerLiteral;
use crate::engine::variables::IntegerValue;
use crate::engine::variables::Literal;
use crate::propagators::PrecedencesPropagator;
use crate::propagators::Task;
use crate::propagators::TimeTablePropagator;

fn reason_of(solver: &mut ConstraintSatisfactionSolver, literal: Literal) -> Vec<Literal> {
    let mut context = ConflictAnalysisContext {
        trail: &mut solver.trail,
        integer_trail: &solver.integer_trail,
        binary_implication_graph: &solver.binary_implication_graph,
        literal_watchers: &solver.literal_watchers,
        clause_allocator: &solver.clause_allocator,
    };
    context.get_reason(literal.get_variable())
}

#[test]
fn binary_unit_propagation_with_precise_reasons() {
    let mut solver = ConstraintSatisfactionSolver::default();
    let literals: Vec<Literal> = solver.new_literals().take(3).collect();
    let (a, b, c) = (literals[0], literals[1], literals[2]);

    solver.add_clause([a, b]).unwrap();
    solver.add_clause([!a, c]).unwrap();

    solver.declare_new_decision_level();
    solver.enqueue_search_decision(!a);
    assert!(solver.propagate());

    assert_eq!(solver.get_literal_value(b), Some(true));
    assert_eq!(solver.get_literal_value(c), None);

    // the reason of b is the falsified literal a
    assert_eq!(reason_of(&mut solver, b), vec![a]);
}

#[test]
fn two_watched_fallback_produces_a_full_reason() {
    let mut solver = ConstraintSatisfactionSolver::default();
    let literals: Vec<Literal> = solver.new_literals().take(4).collect();
    let (a, b, c, d) = (literals[0], literals[1], literals[2], literals[3]);

    solver.add_clause([a, b, c, d]).unwrap();

    solver.declare_new_decision_level();
    solver.enqueue_search_decision(!a);
    solver.enqueue_search_decision(!b);
    solver.enqueue_search_decision(!c);
    assert!(solver.propagate());

    assert_eq!(solver.get_literal_value(d), Some(true));

    let reason = reason_of(&mut solver, d);
    assert_eq!(reason.len(), 3);
    for literal in [a, b, c] {
        assert!(reason.contains(&literal));
    }
}

#[test]
fn integer_bound_propagation_explains_through_the_encoder() {
    let mut solver = ConstraintSatisfactionSolver::default();
    let x = solver.create_new_integer_variable(IntegerValue(0), IntegerValue(10));
    let y = solver.create_new_integer_variable(IntegerValue(0), IntegerValue(10));

    let mut precedences = PrecedencesPropagator::new();
    precedences.add_precedence_with_offset(x, y, IntegerValue(3));
    solver.add_propagator(precedences).unwrap();

    // x + 3 <= y already propagates at the root
    assert_eq!(solver.lower_bound(y), IntegerValue(3));
    assert_eq!(solver.upper_bound(x), IntegerValue(7));

    let x_ge_5 =
        solver.get_or_create_associated_literal(IntegerLiteral::greater_or_equal(
            x,
            IntegerValue(5),
        ));

    solver.declare_new_decision_level();
    solver.enqueue_search_decision(x_ge_5);
    assert!(solver.propagate());

    assert_eq!(solver.lower_bound(y), IntegerValue(8));
    assert_eq!(solver.upper_bound(x), IntegerValue(7));

    // the reason of [y >= 8] expands to the falsified literal ![x >= 5]
    let reason = solver
        .integer_trail
        .explain_integer_literal(IntegerLiteral::greater_or_equal(y, IntegerValue(8)));
    assert_eq!(reason, vec![!x_ge_5]);
}

#[test]
fn positive_cycle_at_level_zero_is_model_level_unsat() {
    let mut solver = ConstraintSatisfactionSolver::default();
    let a = solver.create_new_integer_variable(IntegerValue(0), IntegerValue(10));
    let b = solver.create_new_integer_variable(IntegerValue(0), IntegerValue(10));
    let c = solver.create_new_integer_variable(IntegerValue(0), IntegerValue(10));

    let mut precedences = PrecedencesPropagator::new();
    precedences.add_precedence_with_offset(a, b, IntegerValue(1));
    precedences.add_precedence_with_offset(b, c, IntegerValue(1));
    precedences.add_precedence_with_offset(c, a, IntegerValue(1));

    let result = solver.add_propagator(precedences);
    assert!(result.is_err());
    assert!(solver.is_infeasible());
}

#[test]
fn loose_windows_leave_the_cumulative_resource_untouched() {
    let mut solver = ConstraintSatisfactionSolver::default();
    let new_task = |solver: &mut ConstraintSatisfactionSolver| Task {
        start: solver.create_new_integer_variable(IntegerValue(0), IntegerValue(5)),
        end: solver.create_new_integer_variable(IntegerValue(3), IntegerValue(8)),
        duration: solver.create_new_integer_variable(IntegerValue(3), IntegerValue(3)),
        demand: solver.create_new_integer_variable(IntegerValue(1), IntegerValue(1)),
        presence: None,
    };
    let tasks: Vec<Task> = (0..3).map(|_| new_task(&mut solver)).collect();
    let capacity = solver.create_new_integer_variable(IntegerValue(2), IntegerValue(2));

    let starts: Vec<_> = tasks.iter().map(|task| task.start).collect();
    solver
        .add_propagator(TimeTablePropagator::new(tasks.into(), capacity))
        .unwrap();

    // no mandatory parts, hence no filtering
    for start in starts {
        assert_eq!(solver.lower_bound(start), IntegerValue(0));
        assert_eq!(solver.upper_bound(start), IntegerValue(5));
    }
}

#[test]
fn propagation_is_idempotent() {
    let mut solver = ConstraintSatisfactionSolver::default();
    let x = solver.create_new_integer_variable(IntegerValue(0), IntegerValue(10));
    let y = solver.create_new_integer_variable(IntegerValue(0), IntegerValue(10));

    let mut precedences = PrecedencesPropagator::new();
    precedences.add_precedence_with_offset(x, y, IntegerValue(2));
    solver.add_propagator(precedences).unwrap();

    assert!(solver.propagate());
    let boolean_entries = solver.trail.num_trail_entries();
    let integer_entries = solver.integer_trail.num_trail_entries();

    assert!(solver.propagate());
    assert_eq!(solver.trail.num_trail_entries(), boolean_entries);
    assert_eq!(solver.integer_trail.num_trail_entries(), integer_entries);
}

#[test]
fn searching_over_encoded_integers_respects_the_precedence() {
    let mut solver = ConstraintSatisfactionSolver::default();
    let x = solver.create_new_integer_variable(IntegerValue(0), IntegerValue(2));
    let y = solver.create_new_integer_variable(IntegerValue(0), IntegerValue(2));
    solver.fully_encode_variable(
        x,
        vec![IntegerValue(0), IntegerValue(1), IntegerValue(2)],
    );
    solver.fully_encode_variable(
        y,
        vec![IntegerValue(0), IntegerValue(1), IntegerValue(2)],
    );

    let mut precedences = PrecedencesPropagator::new();
    precedences.add_precedence_with_offset(x, y, IntegerValue(1));
    solver.add_propagator(precedences).unwrap();

    let mut brancher = InputOrderBrancher::default();
    let flag = solver.solve(&mut Indefinite, &mut brancher);
    assert_eq!(flag, CSPSolverExecutionFlag::Feasible);

    let x_value = solver.get_assigned_integer_value(x).unwrap();
    let y_value = solver.get_assigned_integer_value(y).unwrap();
    assert!(y_value >= x_value + IntegerValue(1));
}

#[test]
fn skipped_value_literals_share_the_reason_of_the_bound_literal() {
    let mut solver = ConstraintSatisfactionSolver::default();
    let x = solver.create_new_integer_variable(IntegerValue(0), IntegerValue(10));
    let y = solver.create_new_integer_variable(IntegerValue(0), IntegerValue(10));
    solver.fully_encode_variable(
        x,
        vec![IntegerValue(0), IntegerValue(4), IntegerValue(10)],
    );
    let y_ge_5 =
        solver.get_or_create_associated_literal(IntegerLiteral::greater_or_equal(
            y,
            IntegerValue(5),
        ));

    let mut precedences = PrecedencesPropagator::new();
    precedences.add_precedence_with_offset(y, x, IntegerValue(1));
    solver.add_propagator(precedences).unwrap();

    // y >= 0 already forces x >= 1, which skips to the value point 4
    assert_eq!(solver.lower_bound(x), IntegerValue(4));

    solver.declare_new_decision_level();
    solver.enqueue_search_decision(y_ge_5);
    assert!(solver.propagate());

    // x >= 6 skips over the falsified value point 4 up to the next value
    assert_eq!(solver.lower_bound(x), IntegerValue(10));

    let eq4 = solver.get_equality_literal(x, IntegerValue(4)).unwrap();
    assert_eq!(solver.get_literal_value(eq4), Some(false));

    // the falsified value literal shares the reason of the enqueued bound literal, which
    // expands to the decision that pushed y
    assert_eq!(reason_of(&mut solver, eq4), vec![!y_ge_5]);
}

#[test]
fn backtracking_restores_bounds_and_watch_invariants() {
    let mut solver = ConstraintSatisfactionSolver::default();
    let x = solver.create_new_integer_variable(IntegerValue(0), IntegerValue(10));
    let y = solver.create_new_integer_variable(IntegerValue(0), IntegerValue(10));

    let mut precedences = PrecedencesPropagator::new();
    precedences.add_precedence_with_offset(x, y, IntegerValue(3));
    solver.add_propagator(precedences).unwrap();

    let x_ge_5 =
        solver.get_or_create_associated_literal(IntegerLiteral::greater_or_equal(
            x,
            IntegerValue(5),
        ));
    let x_ge_2 =
        solver.get_or_create_associated_literal(IntegerLiteral::greater_or_equal(
            x,
            IntegerValue(2),
        ));

    solver.declare_new_decision_level();
    solver.enqueue_search_decision(x_ge_5);
    assert!(solver.propagate());
    assert_eq!(solver.lower_bound(y), IntegerValue(8));
    // the order implication [x >= 5] -> [x >= 2] fired as well
    assert_eq!(solver.get_literal_value(x_ge_2), Some(true));

    let mut brancher = InputOrderBrancher::default();
    solver.backtrack(0, &mut brancher);

    assert_eq!(solver.lower_bound(x), IntegerValue(0));
    assert_eq!(solver.lower_bound(y), IntegerValue(3));
    assert_eq!(solver.get_literal_value(x_ge_5), None);
    assert_eq!(solver.get_literal_value(x_ge_2), None);

    // propagation still works after the rollback
    solver.declare_new_decision_level();
    solver.enqueue_search_decision(x_ge_2);
    assert!(solver.propagate());
    assert_eq!(solver.lower_bound(y), IntegerValue(5));
}
