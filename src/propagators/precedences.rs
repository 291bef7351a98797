use std::collections::VecDeque;

use crate::basic_types::Explanation;
use crate::basic_types::KeyedVec;
use crate::basic_types::PropagationStatusCP;
use crate::basic_types::StorageKey;
use crate::butternut_assert_moderate;
use crate::engine::cp::domain_events::DomainEvents;
use crate::engine::cp::propagation::PropagationContext;
use crate::engine::cp::propagation::PropagationContextMut;
use crate::engine::cp::propagation::Propagator;
use crate::engine::cp::propagation::PropagatorInitialisationContext;
use crate::engine::variables::IntegerValue;
use crate::engine::variables::IntegerVariable;
use crate::engine::variables::Literal;

type ArcIndex = usize;

/// A precedence `tail + offset + val(offset_var) <= head`, conditional on `presence_literal`
/// being true (unconditional when absent).
#[derive(Clone, Copy, Debug)]
struct ArcInfo {
    tail_var: IntegerVariable,
    head_var: IntegerVariable,
    offset: IntegerValue,
    offset_var: Option<IntegerVariable>,
    presence_literal: Option<Literal>,
}

/// Incremental difference-logic propagation over an offset graph.
///
/// Every added precedence is stored twice: once on the variables and once on their negations,
/// so that propagating the lower bound of a variable doubles as propagating the upper bound of
/// its negation. Propagation is incremental Bellman-Ford seeded with the variables whose lower
/// bound changed since the last call; positive cycles are detected by disassembling the subtree
/// of the shortest-path parent tree that hangs below an updated node, in the style of Tarjan.
///
/// Arcs guarded by a presence literal stay *potential* until the literal becomes true, at which
/// point they move into the active arc lists; the moves are logged so that backtracking can
/// undo them in exact reverse order. A potential arc that can no longer hold has its presence
/// literal propagated to false.
#[derive(Default, Debug)]
pub struct PrecedencesPropagator {
    arcs: Vec<ArcInfo>,
    /// Active arcs, keyed by their tail.
    impacted_arcs: KeyedVec<IntegerVariable, Vec<ArcIndex>>,
    /// Arcs gated by a still-unassigned presence literal, keyed by their tail.
    impacted_potential_arcs: KeyedVec<IntegerVariable, Vec<ArcIndex>>,
    potential_arcs_given_literal: KeyedVec<Literal, Vec<ArcIndex>>,
    /// `(boolean trail index of the enabling literal, tail)` of every dynamic arc activation,
    /// popped in reverse on synchronisation.
    arc_log: Vec<(usize, IntegerVariable)>,
    bf_parent_arc_of: KeyedVec<IntegerVariable, Option<ArcIndex>>,
    bf_in_queue: KeyedVec<IntegerVariable, bool>,
    bf_queue: VecDeque<IntegerVariable>,
    next_boolean_trail_index: usize,
    next_integer_trail_index: usize,
}

// construction of the arc graph; all arcs are added before the propagator is posted
impl PrecedencesPropagator {
    pub fn new() -> PrecedencesPropagator {
        PrecedencesPropagator::default()
    }

    /// Add `before <= after`.
    pub fn add_precedence(&mut self, before: IntegerVariable, after: IntegerVariable) {
        self.add_precedence_with_offset(before, after, IntegerValue::ZERO);
    }

    /// Add `before + offset <= after`.
    pub fn add_precedence_with_offset(
        &mut self,
        before: IntegerVariable,
        after: IntegerVariable,
        offset: IntegerValue,
    ) {
        self.add_arc(before, after, offset, None, None);
    }

    /// Add `presence -> before + offset <= after`.
    pub fn add_conditional_precedence_with_offset(
        &mut self,
        before: IntegerVariable,
        after: IntegerVariable,
        offset: IntegerValue,
        presence: Literal,
    ) {
        self.add_arc(before, after, offset, None, Some(presence));
    }

    /// Add `before + offset + offset_var <= after`.
    pub fn add_precedence_with_offset_variable(
        &mut self,
        before: IntegerVariable,
        after: IntegerVariable,
        offset: IntegerValue,
        offset_var: IntegerVariable,
    ) {
        self.add_arc(before, after, offset, Some(offset_var), None);
    }

    fn add_arc(
        &mut self,
        tail_var: IntegerVariable,
        head_var: IntegerVariable,
        offset: IntegerValue,
        offset_var: Option<IntegerVariable>,
        presence_literal: Option<Literal>,
    ) {
        self.arcs.push(ArcInfo {
            tail_var,
            head_var,
            offset,
            offset_var,
            presence_literal,
        });
        // the mirror arc: -after + offset <= -before
        self.arcs.push(ArcInfo {
            tail_var: head_var.negation(),
            head_var: tail_var.negation(),
            offset,
            offset_var,
            presence_literal,
        });
    }

    fn accomodate(&mut self, var: IntegerVariable) {
        self.impacted_arcs.accomodate(var, vec![]);
        self.impacted_potential_arcs.accomodate(var, vec![]);
        self.bf_parent_arc_of.accomodate(var, None);
        self.bf_in_queue.accomodate(var, false);
    }

    fn active_arcs_of(&self, var: IntegerVariable) -> &[ArcIndex] {
        if (var.index() as usize) < self.impacted_arcs.len() {
            &self.impacted_arcs[var]
        } else {
            &[]
        }
    }
}

// the Bellman-Ford machinery
impl PrecedencesPropagator {
    fn enqueue_in_bf_queue(&mut self, var: IntegerVariable) {
        self.accomodate(var);
        if !self.bf_in_queue[var] {
            self.bf_in_queue[var] = true;
            self.bf_queue.push_back(var);
        }
    }

    /// Attempt to tighten the lower bound of the head of `arc_index`.
    fn propagate_arc(
        &mut self,
        arc_index: ArcIndex,
        context: &mut PropagationContextMut,
    ) -> PropagationStatusCP {
        let arc = self.arcs[arc_index];

        if let Some(presence) = arc.presence_literal {
            if !context.is_literal_true(presence) {
                return Ok(());
            }
        }

        // an absent tail constrains nothing, except a head sharing its presence
        if context.is_integer_variable_ignored(arc.tail_var)
            && context.get_is_empty_literal(arc.tail_var)
                != context.get_is_empty_literal(arc.head_var)
        {
            return Ok(());
        }

        let offset_contribution = arc
            .offset_var
            .map_or(IntegerValue::ZERO, |offset_var| context.lower_bound(offset_var));
        let candidate = context.lower_bound(arc.tail_var) + arc.offset + offset_contribution;

        if candidate <= context.lower_bound(arc.head_var) {
            return Ok(());
        }

        // updating the head would make it an ancestor of itself exactly when the tail already
        // derives its bound from the head: a positive cycle
        if self.subtree_contains(arc.head_var, arc.tail_var) {
            return Err(self
                .build_cycle_conflict(arc_index, context.as_readonly())
                .into());
        }

        let mut literals = vec![];
        if let Some(presence) = arc.presence_literal {
            literals.push(!presence);
        }
        if let Some(is_empty) = context.get_is_empty_literal(arc.tail_var) {
            if context.is_literal_false(is_empty) {
                literals.push(is_empty);
            }
        }
        let mut integer_literals = vec![context.lower_bound_as_literal(arc.tail_var)];
        if let Some(offset_var) = arc.offset_var {
            integer_literals.push(context.lower_bound_as_literal(offset_var));
        }

        context.set_lower_bound(
            arc.head_var,
            candidate,
            Explanation::new(literals, integer_literals),
        )?;

        self.accomodate(arc.head_var);
        self.bf_parent_arc_of[arc.head_var] = Some(arc_index);
        self.enqueue_in_bf_queue(arc.head_var);

        Ok(())
    }

    /// Walk the shortest-path tree below `root`; true when `target` is in the subtree.
    fn subtree_contains(&self, root: IntegerVariable, target: IntegerVariable) -> bool {
        if root == target {
            return true;
        }

        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            for &arc_index in self.active_arcs_of(node) {
                let head = self.arcs[arc_index].head_var;
                if (head.index() as usize) < self.bf_parent_arc_of.len()
                    && self.bf_parent_arc_of[head] == Some(arc_index)
                {
                    if head == target {
                        return true;
                    }
                    stack.push(head);
                }
            }
        }
        false
    }

    /// The conflict of a positive cycle: the presence literals and offset-variable bounds of the
    /// arcs along the cycle. An empty explanation means model-level infeasibility.
    fn build_cycle_conflict(
        &self,
        closing_arc_index: ArcIndex,
        context: PropagationContext,
    ) -> Explanation {
        let closing_arc = self.arcs[closing_arc_index];
        let mut literals = vec![];
        let mut integer_literals = vec![];

        let add_arc = |arc: ArcInfo,
                           literals: &mut Vec<Literal>,
                           integer_literals: &mut Vec<_>| {
            if let Some(presence) = arc.presence_literal {
                literals.push(!presence);
            }
            if let Some(offset_var) = arc.offset_var {
                integer_literals.push(context.lower_bound_as_literal(offset_var));
            }
        };

        add_arc(closing_arc, &mut literals, &mut integer_literals);

        let mut node = closing_arc.tail_var;
        while node != closing_arc.head_var {
            let arc_index =
                self.bf_parent_arc_of[node].expect("the tail derives its bound from the head");
            let arc = self.arcs[arc_index];
            add_arc(arc, &mut literals, &mut integer_literals);
            node = arc.tail_var;
        }

        Explanation::new(literals, integer_literals)
    }
}

impl Propagator for PrecedencesPropagator {
    fn name(&self) -> &str {
        "Precedences"
    }

    fn priority(&self) -> u32 {
        1
    }

    fn initialise_at_root(
        &mut self,
        context: &mut PropagatorInitialisationContext,
    ) -> Result<(), Explanation> {
        for arc_index in 0..self.arcs.len() {
            let arc = self.arcs[arc_index];
            self.accomodate(arc.tail_var);
            self.accomodate(arc.head_var);

            context.register(arc.tail_var, DomainEvents::LOWER_BOUND);
            if let Some(offset_var) = arc.offset_var {
                self.accomodate(offset_var);
                context.register(offset_var, DomainEvents::LOWER_BOUND);
            }

            match arc.presence_literal {
                None => self.impacted_arcs[arc.tail_var].push(arc_index),
                Some(presence) => {
                    if context.is_literal_true(presence) {
                        // enabled at the root, it will never be disabled again
                        self.impacted_arcs[arc.tail_var].push(arc_index);
                    } else if !context.is_literal_false(presence) {
                        self.impacted_potential_arcs[arc.tail_var].push(arc_index);
                        self.potential_arcs_given_literal
                            .accomodate(presence, vec![]);
                        self.potential_arcs_given_literal[presence].push(arc_index);
                        context.register_literal(presence);
                    }
                }
            }
        }

        Ok(())
    }

    fn propagate(&mut self, mut context: PropagationContextMut) -> PropagationStatusCP {
        let first_modified_index = self.next_integer_trail_index;

        // newly true presence literals enable their arcs; the activation is logged for untrail
        while self.next_boolean_trail_index < context.num_trail_entries() {
            let trail_index = self.next_boolean_trail_index;
            let literal = context.get_trail_entry(trail_index);
            self.next_boolean_trail_index += 1;

            if literal.index() >= self.potential_arcs_given_literal.len() {
                continue;
            }
            for position in 0..self.potential_arcs_given_literal[literal].len() {
                let arc_index = self.potential_arcs_given_literal[literal][position];
                let tail = self.arcs[arc_index].tail_var;
                self.accomodate(tail);
                self.impacted_arcs[tail].push(arc_index);
                self.arc_log.push((trail_index, tail));
                self.propagate_arc(arc_index, &mut context)?;
            }
        }

        // seed the queue with every variable whose lower bound changed since the last call
        while self.next_integer_trail_index < context.num_integer_trail_entries() {
            if let Some(var) =
                context.get_integer_trail_entry_variable(self.next_integer_trail_index)
            {
                self.enqueue_in_bf_queue(var);
            }
            self.next_integer_trail_index += 1;
        }

        // relaxation
        while let Some(node) = self.bf_queue.pop_front() {
            self.bf_in_queue[node] = false;
            for position in 0..self.active_arcs_of(node).len() {
                let arc_index = self.impacted_arcs[node][position];
                self.propagate_arc(arc_index, &mut context)?;
            }
        }

        // a potential arc that cannot hold anymore falsifies its presence literal
        for entry_index in first_modified_index..context.num_integer_trail_entries() {
            let Some(var) = context.get_integer_trail_entry_variable(entry_index) else {
                continue;
            };
            if (var.index() as usize) >= self.impacted_potential_arcs.len() {
                continue;
            }
            for position in 0..self.impacted_potential_arcs[var].len() {
                let arc_index = self.impacted_potential_arcs[var][position];
                let arc = self.arcs[arc_index];
                let presence = arc
                    .presence_literal
                    .expect("potential arcs are guarded by a presence literal");
                if context.is_literal_fixed(presence) {
                    continue;
                }

                let offset_contribution = arc
                    .offset_var
                    .map_or(IntegerValue::ZERO, |offset_var| {
                        context.lower_bound(offset_var)
                    });
                if context.lower_bound(arc.tail_var) + arc.offset + offset_contribution
                    > context.upper_bound(arc.head_var)
                {
                    let mut integer_literals = vec![
                        context.lower_bound_as_literal(arc.tail_var),
                        context.upper_bound_as_literal(arc.head_var),
                    ];
                    if let Some(offset_var) = arc.offset_var {
                        integer_literals.push(context.lower_bound_as_literal(offset_var));
                    }
                    context.assign_literal(
                        !presence,
                        Explanation::from_integer_literals(integer_literals),
                    )?;
                }
            }
        }
        self.next_integer_trail_index = context.num_integer_trail_entries();

        butternut_assert_moderate!(self.bf_queue.is_empty());
        Ok(())
    }

    fn synchronise(&mut self, context: PropagationContext) {
        let trail_size = context.num_trail_entries();

        while let Some(&(trail_index, var)) = self.arc_log.last() {
            if trail_index < trail_size {
                break;
            }
            let _ = self.impacted_arcs[var].pop();
            let _ = self.arc_log.pop();
        }

        self.next_boolean_trail_index = self.next_boolean_trail_index.min(trail_size);
        self.next_integer_trail_index = self
            .next_integer_trail_index
            .min(context.num_integer_trail_entries());

        self.bf_queue.clear();
        for in_queue in self.bf_in_queue.iter_mut() {
            *in_queue = false;
        }
        // the parent tree refers to bounds that are being rolled back
        for parent in self.bf_parent_arc_of.iter_mut() {
            *parent = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_helper::TestSolver;
    use crate::engine::variables::IntegerLiteral;

    #[test]
    fn offsets_propagate_both_bound_directions() {
        let mut solver = TestSolver::default();
        let x = solver.new_variable(0, 10);
        let y = solver.new_variable(0, 10);

        let mut propagator = PrecedencesPropagator::new();
        propagator.add_precedence_with_offset(x, y, IntegerValue(3));

        solver
            .new_propagator(propagator)
            .expect("no conflict at the root");

        // x + 3 <= y at the root
        solver.assert_bounds(x, 0, 7);
        solver.assert_bounds(y, 3, 10);

        solver.increase_lower_bound(x, 5);
        assert!(solver.propagate());
        solver.assert_bounds(y, 8, 10);
    }

    #[test]
    fn upper_bound_tightening_runs_through_the_mirror_arc() {
        let mut solver = TestSolver::default();
        let x = solver.new_variable(0, 20);
        let y = solver.new_variable(0, 20);

        let mut propagator = PrecedencesPropagator::new();
        propagator.add_precedence_with_offset(x, y, IntegerValue(4));

        solver
            .new_propagator(propagator)
            .expect("no conflict at the root");

        solver.decrease_upper_bound(y, 9);
        assert!(solver.propagate());
        solver.assert_bounds(x, 0, 5);
    }

    #[test]
    fn positive_cycle_at_the_root_is_model_level_unsat() {
        let mut solver = TestSolver::default();
        let a = solver.new_variable(0, 10);
        let b = solver.new_variable(0, 10);
        let c = solver.new_variable(0, 10);

        let mut propagator = PrecedencesPropagator::new();
        propagator.add_precedence_with_offset(a, b, IntegerValue(1));
        propagator.add_precedence_with_offset(b, c, IntegerValue(1));
        propagator.add_precedence_with_offset(c, a, IntegerValue(1));

        let _ = solver
            .new_propagator(propagator)
            .expect_err("the cycle has positive length");
    }

    #[test]
    fn zero_length_cycles_are_feasible() {
        let mut solver = TestSolver::default();
        let a = solver.new_variable(0, 10);
        let b = solver.new_variable(2, 10);

        let mut propagator = PrecedencesPropagator::new();
        propagator.add_precedence(a, b);
        propagator.add_precedence(b, a);

        solver
            .new_propagator(propagator)
            .expect("equality through two inequalities is fine");

        solver.assert_bounds(a, 2, 10);
        solver.assert_bounds(b, 2, 10);
    }

    #[test]
    fn variable_offsets_use_their_lower_bound() {
        let mut solver = TestSolver::default();
        let x = solver.new_variable(2, 10);
        let y = solver.new_variable(0, 20);
        let delta = solver.new_variable(3, 6);

        let mut propagator = PrecedencesPropagator::new();
        propagator.add_precedence_with_offset_variable(x, y, IntegerValue(1), delta);

        solver
            .new_propagator(propagator)
            .expect("no conflict at the root");

        // lb(y) >= lb(x) + 1 + lb(delta) = 6
        solver.assert_bounds(y, 6, 20);

        let reason = solver.get_reason_for_bound(IntegerLiteral::greater_or_equal(
            y,
            IntegerValue(6),
        ));
        // both facts hold at the root, so the reason is empty
        assert!(reason.is_empty());
    }

    #[test]
    fn impossible_conditional_arcs_falsify_their_presence() {
        let mut solver = TestSolver::default();
        let x = solver.new_variable(4, 10);
        let y = solver.new_variable(0, 6);
        let presence = solver.new_literal();

        let mut propagator = PrecedencesPropagator::new();
        propagator.add_conditional_precedence_with_offset(x, y, IntegerValue(5), presence);

        solver
            .new_propagator(propagator)
            .expect("no conflict at the root");

        // 4 + 5 > 6, the arc can never hold
        assert!(solver.is_literal_false(presence));
    }

    #[test]
    fn enabling_a_conditional_arc_propagates_it() {
        let mut solver = TestSolver::default();
        let x = solver.new_variable(2, 10);
        let y = solver.new_variable(0, 20);
        let presence = solver.new_literal();

        let mut propagator = PrecedencesPropagator::new();
        propagator.add_conditional_precedence_with_offset(x, y, IntegerValue(5), presence);

        solver
            .new_propagator(propagator)
            .expect("no conflict at the root");
        solver.assert_bounds(y, 0, 20);

        solver.set_literal(presence, true);
        assert!(solver.propagate());
        solver.assert_bounds(y, 7, 20);

        let reason = solver.get_reason_for_bound(IntegerLiteral::greater_or_equal(
            y,
            IntegerValue(7),
        ));
        assert_eq!(reason, vec![!presence]);
    }
}
