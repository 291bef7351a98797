use super::TerminationCondition;

/// A [`TerminationCondition`] that never halts the solver.
#[derive(Clone, Copy, Debug)]
pub struct Indefinite;

impl TerminationCondition for Indefinite {
    fn should_stop(&mut self) -> bool {
        false
    }
}
