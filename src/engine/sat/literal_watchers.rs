use super::ClauseAllocator;
use super::Trail;
use crate::basic_types::ClauseReference;
use crate::basic_types::KeyedVec;
use crate::butternut_assert_moderate;
use crate::butternut_assert_simple;
use crate::engine::sat::trail::ReasonType;
use crate::engine::variables::Literal;

/// Two-watched-literal propagation over all clauses of size at least three.
///
/// Binary clauses are handled by the
/// [`BinaryImplicationGraph`](super::BinaryImplicationGraph) and unit clauses live directly on
/// the trail, so every clause seen here keeps its two watchers in literal positions 0 and 1.
/// Each watcher entry carries a blocking literal (the other watched literal at the time the
/// watcher was created); when the blocking literal is true the clause is satisfied and its
/// memory is never touched.
#[derive(Default, Debug)]
pub(crate) struct LiteralWatchers {
    watch_lists: KeyedVec<Literal, Vec<ClauseWatcher>>,
    next_position_on_trail_to_propagate: usize,
    /// For a trail entry propagated by a clause, the clause that propagated it.
    reasons: KeyedVec<usize, Option<ClauseReference>>,
    /// Literals whose watch lists contain lazily detached clauses.
    needs_cleaning: Vec<Literal>,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct ClauseWatcher {
    blocking_literal: Literal,
    clause_reference: ClauseReference,
}

impl LiteralWatchers {
    pub(crate) fn grow(&mut self) {
        // one watch list per polarity
        self.watch_lists.push(vec![]);
        self.watch_lists.push(vec![]);
    }

    /// Allocate a clause and watch its first two literals. The caller must make sure that
    /// watching positions 0 and 1 upholds the watcher invariant; for clauses whose literals may
    /// already be assigned, use [`LiteralWatchers::attach_and_enqueue_potential_unit_propagation`].
    pub(crate) fn add_clause_unchecked(
        &mut self,
        literals: Vec<Literal>,
        is_learned: bool,
        clause_allocator: &mut ClauseAllocator,
    ) -> ClauseReference {
        butternut_assert_moderate!(literals.len() >= 3);

        let clause_reference = clause_allocator.create_clause(literals, is_learned);
        let clause = clause_allocator.get_mutable_clause(clause_reference);
        clause.set_attached(true);

        let literal0 = clause[0];
        let literal1 = clause[1];
        self.watch_lists[literal0].push(ClauseWatcher {
            blocking_literal: literal1,
            clause_reference,
        });
        self.watch_lists[literal1].push(ClauseWatcher {
            blocking_literal: literal0,
            clause_reference,
        });

        clause_reference
    }

    /// Attach a freshly created clause whose literals may be partially assigned.
    ///
    /// Two non-false literals are selected as watchers. When only a single non-false literal
    /// exists the false literal with the highest decision level becomes the second watcher,
    /// which is what keeps the watcher invariant intact while backtracking, and the remaining
    /// literal is propagated. Returns false when every literal is false, in which case the
    /// clause is recorded as the failing clause on the trail.
    pub(crate) fn attach_and_enqueue_potential_unit_propagation(
        &mut self,
        clause_reference: ClauseReference,
        trail: &mut Trail,
        clause_allocator: &mut ClauseAllocator,
    ) -> bool {
        let clause = clause_allocator.get_mutable_clause(clause_reference);
        let num_literals = clause.len();

        let mut num_nonfalse: u32 = 0;
        for i in 0..num_literals {
            if !trail.is_literal_assigned_false(clause[i]) {
                // move the non-false literal into the next watched position
                let destination = num_nonfalse.min(1);
                let swapped = clause[i];
                clause[i] = clause[destination];
                clause[destination] = swapped;
                num_nonfalse += 1;

                if num_nonfalse == 2 {
                    break;
                }
            }
        }

        if num_nonfalse == 0 {
            trail.set_failing_sat_clause(clause_reference);
            return false;
        }

        if num_nonfalse == 1 {
            // the second watcher becomes the false literal with the highest decision level
            let mut best = 1;
            for i in 2..num_literals {
                if trail.get_literal_assignment_level(clause[i])
                    > trail.get_literal_assignment_level(clause[best])
                {
                    best = i;
                }
            }
            let swapped = clause[best];
            clause[best] = clause[1];
            clause[1] = swapped;
        }

        clause.set_attached(true);
        let literal0 = clause[0];
        let literal1 = clause[1];
        self.watch_lists[literal0].push(ClauseWatcher {
            blocking_literal: literal1,
            clause_reference,
        });
        self.watch_lists[literal1].push(ClauseWatcher {
            blocking_literal: literal0,
            clause_reference,
        });

        if num_nonfalse == 1 && trail.is_literal_unassigned(literal0) {
            let success = trail.enqueue_propagated(literal0, ReasonType::Clause);
            butternut_assert_simple!(success);
            self.reasons
                .accomodate(trail.num_trail_entries() - 1, None);
            self.reasons[trail.num_trail_entries() - 1] = Some(clause_reference);
        }

        true
    }

    /// Propagate all trail entries that have not been inspected yet. On conflict the failing
    /// clause is recorded on the trail and false is returned.
    pub(crate) fn propagate(
        &mut self,
        trail: &mut Trail,
        clause_allocator: &mut ClauseAllocator,
    ) -> bool {
        // this function is implemented as one long function: it is a performance hotspot and
        // splitting it degrades the generated code
        while self.next_position_on_trail_to_propagate < trail.num_trail_entries() {
            let true_literal = trail.get_trail_entry(self.next_position_on_trail_to_propagate);
            butternut_assert_moderate!(trail.is_literal_assigned_true(true_literal));

            // effectively remove all watches from this true_literal, then go through the previous
            // watches one by one and insert them as indicated (some might be placed back). If a
            // conflict takes place, put back the remaining watchers and report the conflict.
            if self.watch_lists[!true_literal].is_empty() {
                self.next_position_on_trail_to_propagate += 1;
                continue;
            }

            let mut end_index: usize = 0;
            let mut current_index: usize = 0;
            while current_index < self.watch_lists[!true_literal].len() {
                // inspect the blocking literal first: when it is true the clause is satisfied and
                // there is no need to touch the clause memory at all
                let blocking_literal =
                    self.watch_lists[!true_literal][current_index].blocking_literal;
                if trail.is_literal_assigned_true(blocking_literal) {
                    self.watch_lists[!true_literal][end_index] =
                        self.watch_lists[!true_literal][current_index];
                    current_index += 1;
                    end_index += 1;
                    continue;
                }

                let watched_clause_reference =
                    self.watch_lists[!true_literal][current_index].clause_reference;
                let watched_clause = clause_allocator.get_mutable_clause(watched_clause_reference);

                // lazily detached clauses are swept out of the list as a side effect
                if !watched_clause.is_attached() {
                    current_index += 1;
                    continue;
                }

                // place the falsified literal at position 1 for simplicity
                if watched_clause[0] == !true_literal {
                    watched_clause[0] = watched_clause[1];
                    watched_clause[1] = !true_literal;
                }

                // check the other watched literal to see if the clause is already satisfied
                if trail.is_literal_assigned_true(watched_clause[0]) {
                    // take the true literal as the new blocking literal
                    self.watch_lists[!true_literal][current_index].blocking_literal =
                        watched_clause[0];
                    self.watch_lists[!true_literal][end_index] =
                        self.watch_lists[!true_literal][current_index];
                    current_index += 1;
                    end_index += 1;
                    continue;
                }

                // look for another non-falsified literal to replace the watcher; start from
                // index 2 since the watched literals are skipped
                let mut found_new_watch = false;
                for i in 2..watched_clause.len() {
                    if !trail.is_literal_assigned_false(watched_clause[i]) {
                        watched_clause[1] = watched_clause[i];
                        watched_clause[i] = !true_literal;

                        self.watch_lists[watched_clause[1]].push(ClauseWatcher {
                            blocking_literal: watched_clause[0],
                            clause_reference: watched_clause_reference,
                        });

                        found_new_watch = true;
                        break;
                    }
                }

                if found_new_watch {
                    // the clause is now watched elsewhere; only the current index moves forward
                    current_index += 1;
                    continue;
                }

                // keep the current watch for this literal
                self.watch_lists[!true_literal][end_index] =
                    self.watch_lists[!true_literal][current_index];
                end_index += 1;
                current_index += 1;

                // at this point the non-watched literals and literal 1 are all false: either
                // literal 0 is unassigned and propagates, or it is false and the clause fails
                if !trail.enqueue_propagated(watched_clause[0], ReasonType::Clause) {
                    // conflict: copy back the unscanned watcher suffix so that propagation can
                    // restart cleanly after the conflict is analysed
                    while current_index < self.watch_lists[!true_literal].len() {
                        self.watch_lists[!true_literal][end_index] =
                            self.watch_lists[!true_literal][current_index];
                        current_index += 1;
                        end_index += 1;
                    }
                    self.watch_lists[!true_literal].truncate(end_index);
                    trail.set_failing_sat_clause(watched_clause_reference);
                    return false;
                }

                let trail_index = trail.num_trail_entries() - 1;
                self.reasons.accomodate(trail_index, None);
                self.reasons[trail_index] = Some(watched_clause_reference);
            }
            self.watch_lists[!true_literal].truncate(end_index);
            self.next_position_on_trail_to_propagate += 1;
        }

        true
    }

    pub(crate) fn synchronise(&mut self, trail_size: usize) {
        butternut_assert_simple!(self.next_position_on_trail_to_propagate >= trail_size);
        self.next_position_on_trail_to_propagate = trail_size;
    }

    pub(crate) fn is_propagation_complete(&self, trail_size: usize) -> bool {
        self.next_position_on_trail_to_propagate == trail_size
    }

    /// The reason of a clause propagation: the falsified literals of the propagating clause.
    pub(crate) fn reason_for(
        &self,
        trail_index: usize,
        propagated_literal: Literal,
        clause_allocator: &ClauseAllocator,
    ) -> Vec<Literal> {
        let clause_reference =
            self.reasons[trail_index].expect("the entry was propagated by a clause");

        clause_allocator[clause_reference]
            .get_literal_slice()
            .iter()
            .copied()
            .filter(|&literal| literal != propagated_literal)
            .collect()
    }

    /// Mark the clause as detached so it no longer participates in propagation; the watcher
    /// entries themselves are removed by [`LiteralWatchers::clean_up_watchers`] or swept
    /// incrementally during propagation.
    pub(crate) fn lazy_detach(
        &mut self,
        clause_reference: ClauseReference,
        clause_allocator: &mut ClauseAllocator,
    ) {
        let clause = clause_allocator.get_mutable_clause(clause_reference);
        butternut_assert_simple!(clause.is_attached());
        clause.set_attached(false);

        for position in [0, 1] {
            let watched = clause[position];
            if !self.needs_cleaning.contains(&watched) {
                self.needs_cleaning.push(watched);
            }
        }
    }

    pub(crate) fn clean_up_watchers(&mut self, clause_allocator: &ClauseAllocator) {
        for literal in self.needs_cleaning.drain(..) {
            self.watch_lists[literal]
                .retain(|watcher| clause_allocator[watcher.clause_reference].is_attached());
        }
    }
}
