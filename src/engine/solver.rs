//! Houses the solver kernel which combines clause-driven (CDCL) search with lazy clause
//! generation propagation over integer variables.

use log::warn;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use super::conflict_analysis::ConflictAnalysisContext;
use super::conflict_analysis::ResolutionConflictAnalyser;
use super::cp::propagation::PropagationContext;
use super::cp::propagation::PropagationContextMut;
use super::cp::propagation::Propagator;
use super::cp::propagation::PropagatorId;
use super::cp::propagation::PropagatorInitialisationContext;
use super::cp::IntegerEncoder;
use super::cp::IntegerTrail;
use super::cp::PropagatorQueue;
use super::cp::WatchListCP;
use super::cp::WatchListPropositional;
use super::preprocessor::Preprocessor;
use super::sat::calculate_lbd;
use super::sat::BinaryImplicationGraph;
use super::sat::ClauseAllocator;
use super::sat::LiteralWatchers;
use super::sat::Trail;
use super::termination::TerminationCondition;
use crate::basic_types::statistic_logging::log_statistic;
use crate::basic_types::ConstraintOperationError;
use crate::basic_types::CumulativeMovingAverage;
use crate::basic_types::Explanation;
use crate::basic_types::Inconsistency;
use crate::basic_types::StorageKey;
use crate::branching::Brancher;
use crate::branching::SelectionContext;
use crate::butternut_assert_moderate;
use crate::butternut_assert_simple;
use crate::engine::variables::BooleanVariable;
use crate::engine::variables::IntegerLiteral;
use crate::engine::variables::IntegerValue;
use crate::engine::variables::IntegerVariable;
use crate::engine::variables::Literal;

/// The result of a search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CSPSolverExecutionFlag {
    /// A solution was found; it can be read back through the bound and literal accessors.
    Feasible,
    /// The model is unsatisfiable.
    Infeasible,
    /// The model is unsatisfiable under the given assumptions; see
    /// [`ConstraintSatisfactionSolver::get_last_incompatible_decisions`].
    InfeasibleUnderAssumptions,
    /// The termination condition triggered before the search concluded.
    Timeout,
}

/// Options which determine how the solver behaves.
#[derive(Debug)]
pub struct SolverOptions {
    /// A random generator used by branchers for randomised selection; passing it as an option
    /// allows seeding of the randomisation.
    pub random_generator: SmallRng,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            random_generator: SmallRng::seed_from_u64(42),
        }
    }
}

/// A solver kernel which attempts to find a solution to a constraint satisfaction problem using
/// a lazy clause generation approach.
///
/// The kernel maintains two cooperating trails: the Boolean [`Trail`] of literal assignments and
/// the [`IntegerTrail`] of bound tightenings, linked through the [`IntegerEncoder`]. Propagation
/// runs the trail-level propagators (binary implications, clauses, bound synchronisation) to a
/// fixpoint before every single step of a scheduled integer propagator, and conflicts are
/// analysed with 1-UIP resolution over the lazily computed reason DAG.
///
/// The branching layer drives the kernel through [`ConstraintSatisfactionSolver::solve`] with a
/// [`Brancher`], or manually through [`ConstraintSatisfactionSolver::declare_new_decision_level`],
/// [`ConstraintSatisfactionSolver::enqueue_search_decision`],
/// [`ConstraintSatisfactionSolver::propagate`] and [`ConstraintSatisfactionSolver::backtrack`].
pub struct ConstraintSatisfactionSolver {
    /// The solver continuously changes states during the search; the state helps track
    /// additional information and contributes to making the code clearer.
    pub(crate) state: CSPSolverState,
    pub(crate) trail: Trail,
    pub(crate) binary_implication_graph: BinaryImplicationGraph,
    pub(crate) literal_watchers: LiteralWatchers,
    pub(crate) clause_allocator: ClauseAllocator,
    pub(crate) integer_trail: IntegerTrail,
    pub(crate) integer_encoder: IntegerEncoder,
    /// Which propagators to wake on an integer bound change.
    watch_list_cp: WatchListCP,
    /// Which propagators to wake on a literal becoming true.
    watch_list_propositional: WatchListPropositional,
    propagator_queue: PropagatorQueue,
    cp_propagators: Vec<Box<dyn Propagator>>,
    propagator_priorities: Vec<u32>,
    conflict_analyser: ResolutionConflictAnalyser,
    /// Holds the assumptions when the solver is queried to solve under assumptions.
    assumptions: Vec<Literal>,
    /// The next integer trail entry that has not yet been turned into propagator wake-ups.
    next_integer_trail_index_to_notify: usize,
    /// The Boolean counterpart of the above.
    next_boolean_trail_index_to_notify: usize,
    counters: Counters,
    internal_parameters: SolverOptions,
}

impl Default for ConstraintSatisfactionSolver {
    fn default() -> Self {
        ConstraintSatisfactionSolver::new(SolverOptions::default())
    }
}

impl std::fmt::Debug for ConstraintSatisfactionSolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // the propagators are trait objects without a Debug bound
        f.debug_struct("ConstraintSatisfactionSolver")
            .field("state", &self.state)
            .field("assumptions", &self.assumptions)
            .field("trail", &self.trail)
            .field("integer_trail", &self.integer_trail)
            .field("num_propagators", &self.cp_propagators.len())
            .field("counters", &self.counters)
            .finish_non_exhaustive()
    }
}

// construction and variable creation
impl ConstraintSatisfactionSolver {
    pub fn new(solver_options: SolverOptions) -> Self {
        let mut solver = ConstraintSatisfactionSolver {
            state: CSPSolverState::default(),
            trail: Trail::default(),
            binary_implication_graph: BinaryImplicationGraph::default(),
            literal_watchers: LiteralWatchers::default(),
            clause_allocator: ClauseAllocator::default(),
            integer_trail: IntegerTrail::default(),
            integer_encoder: IntegerEncoder::default(),
            watch_list_cp: WatchListCP::default(),
            watch_list_propositional: WatchListPropositional::default(),
            propagator_queue: PropagatorQueue::new(5),
            cp_propagators: vec![],
            propagator_priorities: vec![],
            conflict_analyser: ResolutionConflictAnalyser::default(),
            assumptions: vec![],
            next_integer_trail_index_to_notify: 0,
            next_boolean_trail_index_to_notify: 0,
            counters: Counters::default(),
            internal_parameters: solver_options,
        };

        // a dummy variable set to true at the root: useful whenever a fact that is always true
        // needs to be expressed as a literal
        let root_variable = solver.create_new_boolean_variable();
        let true_literal = Literal::new(root_variable, true);
        solver.trail.true_literal = true_literal;
        solver.trail.false_literal = !true_literal;
        solver.trail.enqueue_with_unit_reason(true_literal);

        solver
    }

    pub fn create_new_boolean_variable(&mut self) -> BooleanVariable {
        let variable = self.trail.grow();
        self.binary_implication_graph.grow();
        self.literal_watchers.grow();
        self.watch_list_propositional.grow();
        self.integer_encoder.grow_boolean_variable();
        variable
    }

    /// Returns an infinite iterator of positive literals of new variables.
    pub fn new_literals(&mut self) -> impl Iterator<Item = Literal> + '_ {
        std::iter::from_fn(|| Some(self.create_new_boolean_variable()))
            .map(|variable| Literal::new(variable, true))
    }

    /// Create a new integer variable with the given bounds; only possible at the root level.
    pub fn create_new_integer_variable(
        &mut self,
        lower_bound: IntegerValue,
        upper_bound: IntegerValue,
    ) -> IntegerVariable {
        assert!(
            !self.state.is_inconsistent(),
            "variables cannot be created in an inconsistent state"
        );

        let var = self.integer_trail.grow(lower_bound, upper_bound);
        self.watch_list_cp.grow();
        self.watch_list_cp.grow();
        self.integer_encoder.grow_integer_variable();
        var
    }

    /// Declare the variable optional: its domain may become empty without model-level failure,
    /// provided `is_present` is then false.
    pub fn mark_integer_variable_as_optional(
        &mut self,
        var: IntegerVariable,
        is_present: Literal,
    ) {
        self.integer_trail
            .mark_integer_variable_as_optional(var, is_present);
    }

    pub fn get_true_literal(&self) -> Literal {
        self.trail.true_literal
    }

    pub fn get_false_literal(&self) -> Literal {
        self.trail.false_literal
    }
}

// encoder access
impl ConstraintSatisfactionSolver {
    /// Look up or create the literal meaning `integer_literal.var >= integer_literal.bound`.
    pub fn get_or_create_associated_literal(
        &mut self,
        integer_literal: IntegerLiteral,
    ) -> Literal {
        self.integer_encoder.get_or_create_associated_literal(
            integer_literal,
            &mut self.trail,
            &self.integer_trail,
            &mut self.binary_implication_graph,
            &mut self.literal_watchers,
            &mut self.watch_list_propositional,
        )
    }

    /// The associated literal of the greatest bound at or below the queried one, if any.
    pub fn search_for_literal_at_or_before(
        &self,
        integer_literal: IntegerLiteral,
    ) -> Option<Literal> {
        self.integer_encoder
            .search_for_literal_at_or_before(integer_literal)
            .map(|(_, literal)| literal)
    }

    /// Create the equality encoding of `var` over the given values; exactly one of the value
    /// literals will be true in any solution.
    pub fn fully_encode_variable(&mut self, var: IntegerVariable, values: Vec<IntegerValue>) {
        self.integer_encoder.fully_encode_variable(
            var,
            values,
            &mut self.trail,
            &mut self.integer_trail,
            &mut self.binary_implication_graph,
            &mut self.literal_watchers,
            &mut self.watch_list_propositional,
            &mut self.clause_allocator,
        );
        self.propagate_enqueued();
    }

    pub fn get_equality_literal(
        &self,
        var: IntegerVariable,
        value: IntegerValue,
    ) -> Option<Literal> {
        self.integer_encoder.get_equality_literal(var, value)
    }
}

// state inspection
impl ConstraintSatisfactionSolver {
    pub fn get_decision_level(&self) -> usize {
        butternut_assert_moderate!(
            self.trail.get_decision_level() == self.integer_trail.get_decision_level()
        );
        self.trail.get_decision_level()
    }

    pub fn lower_bound(&self, var: IntegerVariable) -> IntegerValue {
        self.integer_trail.lower_bound(var)
    }

    pub fn upper_bound(&self, var: IntegerVariable) -> IntegerValue {
        self.integer_trail.upper_bound(var)
    }

    pub fn lower_bound_as_literal(&self, var: IntegerVariable) -> IntegerLiteral {
        self.integer_trail.lower_bound_as_literal(var)
    }

    pub fn upper_bound_as_literal(&self, var: IntegerVariable) -> IntegerLiteral {
        self.integer_trail.upper_bound_as_literal(var)
    }

    /// The assigned value of the variable, or `None` when the domain is not a singleton.
    pub fn get_assigned_integer_value(&self, var: IntegerVariable) -> Option<IntegerValue> {
        let lower_bound = self.lower_bound(var);
        if lower_bound == self.upper_bound(var) {
            Some(lower_bound)
        } else {
            None
        }
    }

    /// The value of the literal, or `None` when it is unassigned.
    pub fn get_literal_value(&self, literal: Literal) -> Option<bool> {
        if self.trail.is_literal_assigned(literal) {
            Some(self.trail.is_literal_assigned_true(literal))
        } else {
            None
        }
    }

    pub fn is_infeasible(&self) -> bool {
        self.state.is_infeasible()
    }

    #[allow(unused, reason = "useful for debugging and state assertions")]
    pub(crate) fn is_conflicting(&self) -> bool {
        self.state.conflicting()
    }

    pub fn log_statistics(&self) {
        self.counters.log_statistics()
    }
}

// adding constraints
impl ConstraintSatisfactionSolver {
    /// Creates a clause from `literals` and adds it to the current formula. Unit clauses go
    /// directly onto the trail, binary clauses into the implication graph and longer clauses
    /// into the clause store.
    ///
    /// If the formula becomes trivially unsatisfiable, a [`ConstraintOperationError`] is
    /// returned, and subsequent calls to this method will always return an error.
    pub fn add_clause(
        &mut self,
        literals: impl IntoIterator<Item = Literal>,
    ) -> Result<(), ConstraintOperationError> {
        butternut_assert_simple!(self.trail.is_at_the_root_level());

        if self.state.is_infeasible() {
            return Err(ConstraintOperationError::InfeasibleState);
        }

        let literals: Vec<Literal> = literals.into_iter().collect();
        if literals.is_empty() {
            warn!("Adding empty clause, unusual!");
        }

        let literals = Preprocessor::preprocess_clause(literals, &self.trail);

        // infeasible at the root? Note the original clause is not recorded in this case
        if literals.is_empty() {
            self.state.declare_infeasible();
            return Err(ConstraintOperationError::InfeasibleClause);
        }

        match literals.len() {
            1 => {
                if self.trail.is_literal_assigned_false(literals[0]) {
                    self.state.declare_infeasible();
                    return Err(ConstraintOperationError::InfeasibleClause);
                }
                if self.trail.is_literal_unassigned(literals[0]) {
                    self.trail.enqueue_with_unit_reason(literals[0]);
                }
            }
            2 => self
                .binary_implication_graph
                .add_binary_clause(literals[0], literals[1]),
            _ => {
                let _ = self.literal_watchers.add_clause_unchecked(
                    literals,
                    false,
                    &mut self.clause_allocator,
                );
            }
        }

        self.propagate_enqueued();

        if self.state.conflicting() {
            self.state.declare_infeasible();
            return Err(ConstraintOperationError::InfeasibleClause);
        }

        Ok(())
    }

    /// Post a new propagator. If unsatisfiability can be determined immediately through
    /// propagation an error is returned, and the solver remains unusable.
    pub fn add_propagator(
        &mut self,
        propagator_to_add: impl Propagator + 'static,
    ) -> Result<(), ConstraintOperationError> {
        if self.state.is_inconsistent() {
            return Err(ConstraintOperationError::InfeasiblePropagator);
        }

        let new_propagator_id = PropagatorId(self.cp_propagators.len() as u32);
        self.propagator_priorities
            .push(propagator_to_add.priority());
        self.cp_propagators.push(Box::new(propagator_to_add));

        let new_propagator = &mut self.cp_propagators[new_propagator_id.index()];
        let mut initialisation_context = PropagatorInitialisationContext::new(
            &mut self.watch_list_cp,
            &mut self.watch_list_propositional,
            new_propagator_id,
            &self.trail,
            &self.integer_trail,
        );

        if new_propagator
            .initialise_at_root(&mut initialisation_context)
            .is_err()
        {
            self.state.declare_infeasible();
            return Err(ConstraintOperationError::InfeasiblePropagator);
        }

        let priority = self.propagator_priorities[new_propagator_id.index()];
        self.propagator_queue
            .enqueue_propagator(new_propagator_id, priority);

        self.propagate_enqueued();

        if self.state.no_conflict() {
            Ok(())
        } else {
            self.state.declare_infeasible();
            Err(ConstraintOperationError::InfeasiblePropagator)
        }
    }
}

// the propagation fixpoint
impl ConstraintSatisfactionSolver {
    /// Run propagation to fixpoint. Returns false when a conflict was found, in which case the
    /// conflict is latched on the trail and the solver state is conflicting.
    pub fn propagate(&mut self) -> bool {
        self.propagate_enqueued();
        self.state.no_conflict()
    }

    /// Main propagation loop: drain the trail-level propagators to a fixpoint (binary
    /// implications first, then clauses, then integer-bound synchronisation), then run a single
    /// scheduled integer propagator, and repeat until nothing is queued.
    pub(crate) fn propagate_enqueued(&mut self) {
        let num_trail_entries_old = self.integer_trail.num_trail_entries();

        loop {
            if !self.propagate_boolean_fixpoint() {
                self.state.declare_conflict();
                break;
            }

            self.notify_propagators();

            if self.propagator_queue.is_empty() {
                break;
            }

            let propagator_id = self.propagator_queue.pop();
            let status = {
                let context = PropagationContextMut::new(
                    &mut self.trail,
                    &mut self.integer_trail,
                    &self.integer_encoder,
                );
                self.cp_propagators[propagator_id.index()].propagate(context)
            };

            match status {
                Ok(()) => {
                    // the trail-level propagators go first before the next integer propagator,
                    // in line with propagating cheaper propagators before expensive ones
                }
                Err(Inconsistency::EmptyDomain) => {
                    butternut_assert_simple!(self.trail.has_conflict());
                    self.state.declare_conflict();
                    break;
                }
                Err(Inconsistency::Conflict(explanation)) => {
                    self.store_explained_conflict(explanation);
                    self.state.declare_conflict();
                    break;
                }
            }
        }

        self.counters.num_conflicts += self.state.conflicting() as u64;
        self.counters.num_propagations +=
            (self.integer_trail.num_trail_entries() - num_trail_entries_old) as u64;
    }

    fn propagate_boolean_fixpoint(&mut self) -> bool {
        loop {
            if !self.binary_implication_graph.propagate(&mut self.trail) {
                return false;
            }
            if !self
                .literal_watchers
                .propagate(&mut self.trail, &mut self.clause_allocator)
            {
                return false;
            }
            if !self
                .integer_trail
                .propagate(&mut self.trail, &self.integer_encoder)
            {
                return false;
            }

            let trail_size = self.trail.num_trail_entries();
            if self.binary_implication_graph.is_propagation_complete(trail_size)
                && self.literal_watchers.is_propagation_complete(trail_size)
                && self.integer_trail.is_propagation_complete(trail_size)
            {
                return true;
            }
        }
    }

    /// Turn trail changes since the last call into propagator wake-ups.
    fn notify_propagators(&mut self) {
        if self.watch_list_cp.is_watching_anything() {
            while self.next_integer_trail_index_to_notify < self.integer_trail.num_trail_entries()
            {
                if let Some(var) = self
                    .integer_trail
                    .get_entry_variable(self.next_integer_trail_index_to_notify)
                {
                    for &propagator_id in self.watch_list_cp.get_affected_propagators(var) {
                        self.propagator_queue.enqueue_propagator(
                            propagator_id,
                            self.propagator_priorities[propagator_id.index()],
                        );
                    }
                }
                self.next_integer_trail_index_to_notify += 1;
            }
        }

        if self.watch_list_propositional.is_watching_anything() {
            while self.next_boolean_trail_index_to_notify < self.trail.num_trail_entries() {
                let literal = self
                    .trail
                    .get_trail_entry(self.next_boolean_trail_index_to_notify);
                for &propagator_id in self
                    .watch_list_propositional
                    .get_affected_propagators(literal)
                {
                    self.propagator_queue.enqueue_propagator(
                        propagator_id,
                        self.propagator_priorities[propagator_id.index()],
                    );
                }
                self.next_boolean_trail_index_to_notify += 1;
            }
        }
    }

    fn store_explained_conflict(&mut self, explanation: Explanation) {
        let dependency_indices: Vec<usize> = explanation
            .integer_literals
            .iter()
            .filter_map(|&integer_literal| {
                self.integer_trail
                    .find_lowest_trail_index_that_explain_bound(integer_literal)
            })
            .collect();

        let conflict = self.trail.mutable_conflict();
        conflict.extend_from_slice(&explanation.literals);
        self.integer_trail
            .merge_reason_into(&dependency_indices, conflict);
    }
}

// search
impl ConstraintSatisfactionSolver {
    pub fn solve(
        &mut self,
        termination: &mut impl TerminationCondition,
        brancher: &mut impl Brancher,
    ) -> CSPSolverExecutionFlag {
        let dummy_assumptions: Vec<Literal> = vec![];
        self.solve_under_assumptions(&dummy_assumptions, termination, brancher)
    }

    pub fn solve_under_assumptions(
        &mut self,
        assumptions: &[Literal],
        termination: &mut impl TerminationCondition,
        brancher: &mut impl Brancher,
    ) -> CSPSolverExecutionFlag {
        if self.state.is_inconsistent() {
            return CSPSolverExecutionFlag::Infeasible;
        }

        self.state.declare_solving();
        assumptions.clone_into(&mut self.assumptions);

        self.solve_internal(termination, brancher)
    }

    fn solve_internal(
        &mut self,
        termination: &mut impl TerminationCondition,
        brancher: &mut impl Brancher,
    ) -> CSPSolverExecutionFlag {
        loop {
            if termination.should_stop() {
                self.state.declare_timeout();
                return CSPSolverExecutionFlag::Timeout;
            }

            self.propagate_enqueued();

            if self.state.no_conflict() {
                self.declare_new_decision_level();

                if let Err(flag) = self.enqueue_next_decision(brancher) {
                    return flag;
                }
            } else {
                if self.trail.is_at_the_root_level() {
                    self.state.declare_infeasible();
                    return CSPSolverExecutionFlag::Infeasible;
                }

                self.resolve_conflict(brancher);

                if self.state.is_infeasible() {
                    return CSPSolverExecutionFlag::Infeasible;
                }

                brancher.on_conflict();
            }
        }
    }

    fn enqueue_next_decision(
        &mut self,
        brancher: &mut impl Brancher,
    ) -> Result<(), CSPSolverExecutionFlag> {
        if let Some(assumption_literal) = self.peek_next_assumption_literal() {
            if self.enqueue_assumption_literal(assumption_literal) {
                Ok(())
            } else {
                Err(CSPSolverExecutionFlag::InfeasibleUnderAssumptions)
            }
        } else {
            let decision = {
                let mut selection_context = SelectionContext::new(
                    &self.trail,
                    &self.integer_trail,
                    &mut self.internal_parameters.random_generator,
                );
                brancher.next_decision(&mut selection_context)
            };

            match decision {
                Some(literal) => {
                    self.counters.num_decisions += 1;
                    self.trail.enqueue_search_decision(literal);
                    Ok(())
                }
                None => {
                    self.state.declare_solution_found();
                    Err(CSPSolverExecutionFlag::Feasible)
                }
            }
        }
    }

    /// Returns true if the assumption was successfully enqueued, and false otherwise.
    fn enqueue_assumption_literal(&mut self, assumption_literal: Literal) -> bool {
        // Case 1: the assumption is unassigned, assign it
        if self.trail.is_literal_unassigned(assumption_literal) {
            self.trail.enqueue_search_decision(assumption_literal);
            true
        // Case 2: the assumption is already true: by convention the i-th assumption is
        // assigned at decision level i+1, so the level was increased without a decision
        } else if self.trail.is_literal_assigned_true(assumption_literal) {
            true
        }
        // Case 3: the assumption is falsified by the previous assumptions
        else {
            self.state
                .declare_infeasible_under_assumptions(assumption_literal);
            false
        }
    }

    fn are_all_assumptions_assigned(&self) -> bool {
        self.trail.get_decision_level() > self.assumptions.len()
    }

    fn peek_next_assumption_literal(&self) -> Option<Literal> {
        if self.are_all_assumptions_assigned() {
            None
        } else {
            // the decision level was increased before this call, hence the minus one
            Some(self.assumptions[self.trail.get_decision_level() - 1])
        }
    }

    pub fn declare_new_decision_level(&mut self) {
        self.trail.increase_decision_level();
        self.integer_trail.increase_decision_level();
    }

    /// Enqueue a search decision; the caller must have increased the decision level through
    /// [`ConstraintSatisfactionSolver::declare_new_decision_level`].
    pub fn enqueue_search_decision(&mut self, literal: Literal) {
        self.counters.num_decisions += 1;
        self.trail.enqueue_search_decision(literal);
    }

    /// Roll back the trails and every propagator to `backtrack_level`.
    pub fn backtrack(&mut self, backtrack_level: usize, brancher: &mut impl Brancher) {
        butternut_assert_simple!(backtrack_level < self.get_decision_level());

        for literal in self.trail.untrail(backtrack_level) {
            brancher.on_unassign_literal(literal);
        }

        let trail_size = self.trail.num_trail_entries();
        self.literal_watchers.synchronise(trail_size);
        self.binary_implication_graph.synchronise(trail_size);
        self.integer_trail.synchronise(backtrack_level, trail_size);

        let context = PropagationContext::new(&self.trail, &self.integer_trail);
        for propagator in self.cp_propagators.iter_mut() {
            propagator.synchronise(context);
        }

        self.propagator_queue.clear();
        self.next_integer_trail_index_to_notify = self
            .next_integer_trail_index_to_notify
            .min(self.integer_trail.num_trail_entries());
        self.next_boolean_trail_index_to_notify =
            self.next_boolean_trail_index_to_notify.min(trail_size);
    }

    pub fn restore_state_at_root(&mut self, brancher: &mut impl Brancher) {
        if !self.trail.is_at_the_root_level() {
            self.backtrack(0, brancher);
            self.trail.clear_conflict();
            self.state.declare_ready();
        }
    }

    /// Learn a clause from the current conflict, backjump, and attach the learned clause. The
    /// learned clause asserts its unit literal immediately.
    fn resolve_conflict(&mut self, brancher: &mut impl Brancher) {
        butternut_assert_moderate!(self.state.conflicting());
        butternut_assert_simple!(!self.trail.is_at_the_root_level());

        let conflict_literals: Vec<Literal> = match self.trail.get_failing_sat_clause() {
            Some(reference) => self.clause_allocator[reference]
                .get_literal_slice()
                .to_vec(),
            None => self.trail.get_conflict_literals().to_vec(),
        };
        let max_conflict_level = conflict_literals
            .iter()
            .map(|&literal| self.trail.get_literal_assignment_level(literal))
            .max()
            .unwrap_or(0);

        // a conflict composed entirely of root-level facts means the model is infeasible
        // regardless of any decision
        if max_conflict_level == 0 {
            self.state.declare_infeasible();
            return;
        }

        // the conflict may sit strictly below the current level when an earlier conflict cut
        // the propagation of those levels short; it is still a conflict down there
        if max_conflict_level < self.get_decision_level() {
            self.backtrack(max_conflict_level, brancher);
        }

        let mut analysis = {
            let mut context = ConflictAnalysisContext {
                trail: &mut self.trail,
                integer_trail: &self.integer_trail,
                binary_implication_graph: &self.binary_implication_graph,
                literal_watchers: &self.literal_watchers,
                clause_allocator: &self.clause_allocator,
            };
            self.conflict_analyser.compute_1uip(&mut context)
        };

        self.counters
            .average_conflict_size
            .add_term(analysis.learned_literals.len() as u64);

        self.binary_implication_graph
            .minimize_clause(&self.trail, &mut analysis.learned_literals);

        // minimization may have removed the old second watcher: re-establish the backjump level
        // and the literal ordering
        let mut backjump_level = 0;
        for index in 1..analysis.learned_literals.len() {
            let level = self
                .trail
                .get_literal_assignment_level(analysis.learned_literals[index]);
            if level > backjump_level {
                backjump_level = level;
                analysis.learned_literals.swap(1, index);
            }
        }

        self.counters
            .average_learned_clause_length
            .add_term(analysis.learned_literals.len() as u64);
        self.counters
            .average_backtrack_amount
            .add_term((self.get_decision_level() - backjump_level) as u64);

        self.trail.clear_conflict();
        self.backtrack(backjump_level, brancher);

        let learned = analysis.learned_literals;
        match learned.len() {
            1 => {
                self.counters.num_unit_clauses_learned += 1;
                self.trail.enqueue_with_unit_reason(learned[0]);
            }
            2 => {
                self.binary_implication_graph.add_learned_binary_clause_and_enqueue(
                    learned[0],
                    learned[1],
                    &mut self.trail,
                );
            }
            _ => {
                let lbd = calculate_lbd(&learned, &self.trail);
                let reference = self.clause_allocator.create_clause(learned, true);
                self.clause_allocator[reference].set_lbd(lbd);
                let attached = self.literal_watchers.attach_and_enqueue_potential_unit_propagation(
                    reference,
                    &mut self.trail,
                    &mut self.clause_allocator,
                );
                butternut_assert_simple!(attached, "a learned clause always asserts");
            }
        }

        self.state.declare_solving();
    }

    /// The ordered set of decisions (in particular: assumptions) whose joint assertion caused
    /// the latched conflict or violated assumption; used for core extraction.
    pub fn get_last_incompatible_decisions(&mut self) -> Vec<Literal> {
        let seed: Vec<Literal> = if let Some(assumption) = self.state.get_violated_assumption() {
            vec![assumption]
        } else if self.state.conflicting() {
            let context = ConflictAnalysisContext {
                trail: &mut self.trail,
                integer_trail: &self.integer_trail,
                binary_implication_graph: &self.binary_implication_graph,
                literal_watchers: &self.literal_watchers,
                clause_allocator: &self.clause_allocator,
            };
            context.get_conflict_literals()
        } else {
            return vec![];
        };

        let mut context = ConflictAnalysisContext {
            trail: &mut self.trail,
            integer_trail: &self.integer_trail,
            binary_implication_graph: &self.binary_implication_graph,
            literal_watchers: &self.literal_watchers,
            clause_allocator: &self.clause_allocator,
        };
        let mut decisions = self
            .conflict_analyser
            .compute_incompatible_decisions(&seed, &mut context);

        if let Some(assumption) = self.state.get_violated_assumption() {
            decisions.push(assumption);
        }
        decisions
    }
}

/// Structure responsible for storing counters of the solving process.
#[derive(Default, Debug, Copy, Clone)]
pub(crate) struct Counters {
    pub(crate) num_decisions: u64,
    pub(crate) num_conflicts: u64,
    pub(crate) average_conflict_size: CumulativeMovingAverage,
    num_propagations: u64,
    num_unit_clauses_learned: u64,
    average_learned_clause_length: CumulativeMovingAverage,
    average_backtrack_amount: CumulativeMovingAverage,
}

impl Counters {
    fn log_statistics(&self) {
        log_statistic("numberOfDecisions", self.num_decisions);
        log_statistic("numberOfConflicts", self.num_conflicts);
        log_statistic(
            "averageSizeOfConflictExplanation",
            self.average_conflict_size.value(),
        );
        log_statistic("numberOfPropagations", self.num_propagations);
        log_statistic("numberOfLearnedUnitClauses", self.num_unit_clauses_learned);
        log_statistic(
            "averageLearnedClauseLength",
            self.average_learned_clause_length.value(),
        );
        log_statistic(
            "averageBacktrackAmount",
            self.average_backtrack_amount.value(),
        );
    }
}

#[derive(Default, Debug)]
enum CSPSolverStateInternal {
    #[default]
    Ready,
    Solving,
    ContainsSolution,
    Conflict,
    Infeasible,
    InfeasibleUnderAssumptions {
        violated_assumption: Literal,
    },
    Timeout,
}

#[derive(Default, Debug)]
pub(crate) struct CSPSolverState {
    internal_state: CSPSolverStateInternal,
}

impl CSPSolverState {
    #[allow(unused, reason = "useful for debugging and state assertions")]
    pub(crate) fn is_ready(&self) -> bool {
        matches!(self.internal_state, CSPSolverStateInternal::Ready)
    }

    pub(crate) fn no_conflict(&self) -> bool {
        !self.conflicting()
    }

    pub(crate) fn conflicting(&self) -> bool {
        matches!(self.internal_state, CSPSolverStateInternal::Conflict)
    }

    pub(crate) fn is_infeasible(&self) -> bool {
        matches!(self.internal_state, CSPSolverStateInternal::Infeasible)
    }

    /// Whether the state is conflicting, infeasible or infeasible under assumptions.
    pub(crate) fn is_inconsistent(&self) -> bool {
        self.conflicting() || self.is_infeasible() || self.is_infeasible_under_assumptions()
    }

    pub(crate) fn is_infeasible_under_assumptions(&self) -> bool {
        matches!(
            self.internal_state,
            CSPSolverStateInternal::InfeasibleUnderAssumptions { .. }
        )
    }

    pub(crate) fn get_violated_assumption(&self) -> Option<Literal> {
        if let CSPSolverStateInternal::InfeasibleUnderAssumptions {
            violated_assumption,
        } = self.internal_state
        {
            Some(violated_assumption)
        } else {
            None
        }
    }

    #[allow(unused, reason = "useful for debugging and state assertions")]
    pub(crate) fn has_solution(&self) -> bool {
        matches!(
            self.internal_state,
            CSPSolverStateInternal::ContainsSolution
        )
    }

    #[allow(unused, reason = "useful for debugging and state assertions")]
    pub(crate) fn timeout(&self) -> bool {
        matches!(self.internal_state, CSPSolverStateInternal::Timeout)
    }

    pub(crate) fn declare_ready(&mut self) {
        self.internal_state = CSPSolverStateInternal::Ready;
    }

    pub(crate) fn declare_solving(&mut self) {
        butternut_assert_simple!(!self.is_infeasible());
        self.internal_state = CSPSolverStateInternal::Solving;
    }

    fn declare_infeasible(&mut self) {
        self.internal_state = CSPSolverStateInternal::Infeasible;
    }

    fn declare_conflict(&mut self) {
        butternut_assert_simple!(!self.is_infeasible());
        self.internal_state = CSPSolverStateInternal::Conflict;
    }

    fn declare_solution_found(&mut self) {
        butternut_assert_simple!(!self.is_infeasible());
        self.internal_state = CSPSolverStateInternal::ContainsSolution;
    }

    fn declare_timeout(&mut self) {
        butternut_assert_simple!(!self.is_infeasible());
        self.internal_state = CSPSolverStateInternal::Timeout;
    }

    fn declare_infeasible_under_assumptions(&mut self, violated_assumption: Literal) {
        butternut_assert_simple!(!self.is_infeasible());
        self.internal_state = CSPSolverStateInternal::InfeasibleUnderAssumptions {
            violated_assumption,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::branching::InputOrderBrancher;
    use crate::engine::termination::Indefinite;

    #[test]
    fn unit_propagation_through_mixed_clause_sizes() {
        let mut solver = ConstraintSatisfactionSolver::default();
        let literals: Vec<Literal> = solver.new_literals().take(3).collect();
        let (a, b, c) = (literals[0], literals[1], literals[2]);

        let _ = solver.add_clause([a, b]).unwrap();
        let _ = solver.add_clause([!a, c]).unwrap();

        solver.declare_new_decision_level();
        solver.enqueue_search_decision(!a);
        assert!(solver.propagate());

        assert_eq!(solver.get_literal_value(b), Some(true));
        assert_eq!(solver.get_literal_value(c), None);
    }

    #[test]
    fn trivially_infeasible_formula_is_latched() {
        let mut solver = ConstraintSatisfactionSolver::default();
        let literals: Vec<Literal> = solver.new_literals().take(1).collect();
        let a = literals[0];

        let _ = solver.add_clause([a]).unwrap();
        let result = solver.add_clause([!a]);

        assert_eq!(result, Err(ConstraintOperationError::InfeasibleClause));
        assert!(solver.is_infeasible());

        // subsequent operations keep failing
        let result = solver.add_clause([a]);
        assert_eq!(result, Err(ConstraintOperationError::InfeasibleState));
    }

    #[test]
    fn solving_a_small_satisfiable_formula() {
        let mut solver = ConstraintSatisfactionSolver::default();
        let literals: Vec<Literal> = solver.new_literals().take(3).collect();
        let (a, b, c) = (literals[0], literals[1], literals[2]);

        let _ = solver.add_clause([a, b, c]).unwrap();
        let _ = solver.add_clause([!a, b]).unwrap();
        let _ = solver.add_clause([!b, c]).unwrap();

        let mut brancher = InputOrderBrancher::default();
        let flag = solver.solve(&mut Indefinite, &mut brancher);

        assert_eq!(flag, CSPSolverExecutionFlag::Feasible);
        // the model satisfies every clause
        let value = |l: Literal| solver.get_literal_value(l).unwrap();
        assert!(value(a) || value(b) || value(c));
        assert!(!value(a) || value(b));
        assert!(!value(b) || value(c));
    }

    #[test]
    fn solving_an_unsatisfiable_formula() {
        let mut solver = ConstraintSatisfactionSolver::default();
        let literals: Vec<Literal> = solver.new_literals().take(2).collect();
        let (a, b) = (literals[0], literals[1]);

        let _ = solver.add_clause([a, b]).unwrap();
        let _ = solver.add_clause([a, !b]).unwrap();
        let _ = solver.add_clause([!a, b]).unwrap();
        let _ = solver.add_clause([!a, !b]).unwrap();

        let mut brancher = InputOrderBrancher::default();
        let flag = solver.solve(&mut Indefinite, &mut brancher);

        assert_eq!(flag, CSPSolverExecutionFlag::Infeasible);
    }

    #[test]
    fn incompatible_assumptions_produce_a_core() {
        let mut solver = ConstraintSatisfactionSolver::default();
        let literals: Vec<Literal> = solver.new_literals().take(3).collect();
        let (a, b, c) = (literals[0], literals[1], literals[2]);

        // a /\ b implies !c
        let _ = solver.add_clause([!a, !b, !c]).unwrap();

        let mut brancher = InputOrderBrancher::default();
        let flag = solver.solve_under_assumptions(&[a, b, c], &mut Indefinite, &mut brancher);

        assert_eq!(flag, CSPSolverExecutionFlag::InfeasibleUnderAssumptions);
        let core = solver.get_last_incompatible_decisions();
        assert_eq!(core, vec![a, b, c]);
    }
}
