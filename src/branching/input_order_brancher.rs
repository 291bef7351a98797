use super::Brancher;
use super::SelectionContext;
use crate::engine::variables::BooleanVariable;
use crate::engine::variables::Literal;

/// Branches on the first unassigned Boolean variable in creation order, assigning it false
/// first. Falsifying a bound literal `[x >= k]` shrinks the domain from above, which makes this
/// the in-domain-min strategy for encoded integer variables.
#[derive(Default, Debug, Clone, Copy)]
pub struct InputOrderBrancher {
    /// Variables below this index were assigned when last inspected; cleared on backtracking.
    next_candidate: u32,
}

impl Brancher for InputOrderBrancher {
    fn next_decision(&mut self, context: &mut SelectionContext) -> Option<Literal> {
        while self.next_candidate < context.num_boolean_variables() {
            let variable = BooleanVariable::new(self.next_candidate);
            if !context.is_variable_assigned(variable) {
                return Some(Literal::new(variable, false));
            }
            self.next_candidate += 1;
        }
        None
    }

    fn on_unassign_literal(&mut self, literal: Literal) {
        self.next_candidate = self.next_candidate.min(literal.get_variable().index());
    }
}
