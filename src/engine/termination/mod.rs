mod indefinite;
mod time_budget;

pub use indefinite::Indefinite;
pub use time_budget::TimeBudget;

/// The interface for determining when the solver should give up looking for solutions. The
/// condition is checked between decisions; propagators themselves are never interrupted.
pub trait TerminationCondition {
    /// Returns `true` when the solver should stop.
    fn should_stop(&mut self) -> bool;
}
