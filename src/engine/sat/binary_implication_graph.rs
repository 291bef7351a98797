use super::Trail;
use crate::basic_types::KeyedVec;
use crate::butternut_assert_moderate;
use crate::butternut_assert_simple;
use crate::engine::sat::trail::ReasonType;
use crate::engine::variables::Literal;

/// Dedicated propagation of binary clauses.
///
/// The clause `a \/ b` is stored as the two implications `!a -> b` and `!b -> a`:
/// `implications[l]` holds every literal entailed by `l` being true. Keeping binary clauses out
/// of the clause store makes their propagation a single vector scan and enables the
/// self-subsumption minimization of learned clauses.
#[derive(Default, Debug)]
pub(crate) struct BinaryImplicationGraph {
    implications: KeyedVec<Literal, Vec<Literal>>,
    next_position_on_trail_to_propagate: usize,
    /// For a trail entry propagated by a binary clause, the falsified other literal.
    reasons: KeyedVec<usize, Option<Literal>>,
    /// Scratch marker per literal used by the clause minimization.
    is_marked: KeyedVec<Literal, bool>,
}

impl BinaryImplicationGraph {
    pub(crate) fn grow(&mut self) {
        // once per polarity
        self.implications.push(vec![]);
        self.implications.push(vec![]);
        self.is_marked.push(false);
        self.is_marked.push(false);
    }

    /// Add the clause `a \/ b`.
    pub(crate) fn add_binary_clause(&mut self, a: Literal, b: Literal) {
        butternut_assert_simple!(a != b, "a binary clause has two distinct literals");
        self.implications[!a].push(b);
        self.implications[!b].push(a);
    }

    /// Add the implication `lhs -> rhs`, i.e. the clause `!lhs \/ rhs`.
    pub(crate) fn add_implication(&mut self, lhs: Literal, rhs: Literal) {
        self.add_binary_clause(!lhs, rhs);
    }

    /// Propagate all trail entries that have not been inspected yet. On conflict the two-literal
    /// failing clause is written to the trail and false is returned.
    pub(crate) fn propagate(&mut self, trail: &mut Trail) -> bool {
        while self.next_position_on_trail_to_propagate < trail.num_trail_entries() {
            let true_literal = trail.get_trail_entry(self.next_position_on_trail_to_propagate);
            butternut_assert_moderate!(trail.is_literal_assigned_true(true_literal));

            for i in 0..self.implications[true_literal].len() {
                let implied = self.implications[true_literal][i];

                if trail.is_literal_assigned_true(implied) {
                    continue;
                }
                if trail.is_literal_assigned_false(implied) {
                    // the clause {!true_literal, implied} is falsified
                    let conflict = trail.mutable_conflict();
                    conflict.push(!true_literal);
                    conflict.push(implied);
                    return false;
                }

                trail.enqueue(implied, ReasonType::BinaryImplication);
                let trail_index = trail.num_trail_entries() - 1;
                self.reasons.accomodate(trail_index, None);
                self.reasons[trail_index] = Some(!true_literal);
            }

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

    /// Record the learned binary clause `{asserting, other}` and propagate `asserting`, with
    /// `other` as its reason.
    pub(crate) fn add_learned_binary_clause_and_enqueue(
        &mut self,
        asserting: Literal,
        other: Literal,
        trail: &mut Trail,
    ) {
        butternut_assert_simple!(trail.is_literal_unassigned(asserting));
        butternut_assert_simple!(trail.is_literal_assigned_false(other));

        self.add_binary_clause(asserting, other);
        trail.enqueue(asserting, ReasonType::BinaryImplication);
        let trail_index = trail.num_trail_entries() - 1;
        self.reasons.accomodate(trail_index, None);
        self.reasons[trail_index] = Some(other);
    }

    pub(crate) fn reason_for(&self, trail_index: usize) -> Vec<Literal> {
        vec![self.reasons[trail_index].expect("the entry was propagated by a binary clause")]
    }

    /// Self-subsumption minimization of a learned clause.
    ///
    /// A literal `p` of the clause (the asserting literal at position 0 excluded) is redundant
    /// when some still-present clause literal `q` with `p -> q` in the graph exists at a level
    /// no higher than `p`'s: then `!q -> !p`, and `!q` is already part of the reason. Removed
    /// literals are unmarked immediately, which breaks same-level implication cycles: the result
    /// is deterministic but not necessarily optimal.
    pub(crate) fn minimize_clause(&mut self, trail: &Trail, clause: &mut Vec<Literal>) {
        for &literal in clause.iter() {
            self.is_marked[literal] = true;
        }

        let mut kept = 1;
        for i in 1..clause.len() {
            let p = clause[i];
            let p_level = trail.get_literal_assignment_level(p);

            let redundant = self.implications[p].iter().any(|&q| {
                q != p
                    && self.is_marked[q]
                    && trail.is_literal_assigned_false(q)
                    && trail.get_literal_assignment_level(q) <= p_level
            });

            if redundant {
                self.is_marked[p] = false;
            } else {
                clause[kept] = p;
                kept += 1;
            }
        }
        clause.truncate(kept);

        for &literal in clause.iter() {
            self.is_marked[literal] = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::variables::Literal;

    fn setup(num_variables: u32) -> (BinaryImplicationGraph, Trail, Vec<Literal>) {
        let mut graph = BinaryImplicationGraph::default();
        let mut trail = Trail::default();
        let literals = (0..num_variables)
            .map(|_| {
                let variable = trail.grow();
                graph.grow();
                Literal::new(variable, true)
            })
            .collect();
        (graph, trail, literals)
    }

    #[test]
    fn deciding_a_false_propagates_b() {
        let (mut graph, mut trail, literals) = setup(3);
        let (a, b, c) = (literals[0], literals[1], literals[2]);

        // {a \/ b} and {!a \/ c}
        graph.add_binary_clause(a, b);
        graph.add_binary_clause(!a, c);

        trail.increase_decision_level();
        trail.enqueue_search_decision(!a);

        assert!(graph.propagate(&mut trail));
        assert!(trail.is_literal_assigned_true(b));
        assert!(trail.is_literal_unassigned(c));

        let trail_index = trail.get_variable_trail_index(b.get_variable());
        assert_eq!(graph.reason_for(trail_index), vec![a]);
    }

    #[test]
    fn contradicting_implications_conflict() {
        let (mut graph, mut trail, literals) = setup(2);
        let (a, b) = (literals[0], literals[1]);

        graph.add_implication(a, b);

        trail.increase_decision_level();
        trail.enqueue_search_decision(!b);
        trail.enqueue_search_decision(a);

        assert!(!graph.propagate(&mut trail));
        let conflict = trail.get_conflict_literals();
        assert!(conflict.contains(&!a));
        assert!(conflict.contains(&b));
    }

    #[test]
    fn implied_literal_is_removed_from_learned_clause() {
        let (mut graph, mut trail, literals) = setup(4);
        let (a, b, c, uip) = (literals[0], literals[1], literals[2], literals[3]);

        // b -> a stores !b in the implications of !a: with !b in the clause, !a is redundant
        graph.add_implication(b, a);

        trail.increase_decision_level();
        trail.enqueue_search_decision(a);
        trail.enqueue_search_decision(b);
        trail.enqueue_search_decision(c);

        let mut clause = vec![!uip, !a, !b, !c];
        graph.minimize_clause(&trail, &mut clause);

        assert_eq!(clause, vec![!uip, !b, !c]);
    }

    #[test]
    fn same_level_cycles_keep_one_literal() {
        let (mut graph, mut trail, literals) = setup(3);
        let (a, b, uip) = (literals[0], literals[1], literals[2]);

        // !a <-> !b as a two-literal cycle
        graph.add_implication(!a, !b);
        graph.add_implication(!b, !a);

        trail.increase_decision_level();
        trail.enqueue_search_decision(a);
        trail.enqueue_search_decision(b);

        let mut clause = vec![!uip, !a, !b];
        graph.minimize_clause(&trail, &mut clause);

        // exactly one element of the cycle survives
        assert_eq!(clause.len(), 2);
        assert_eq!(clause[0], !uip);
    }
}
