use super::PropagationContext;
use super::PropagationContextMut;
use super::PropagatorInitialisationContext;
use crate::basic_types::Explanation;
use crate::basic_types::PropagationStatusCP;

/// All integer propagators implement the [`Propagator`] trait. The trail-level propagators (the
/// binary implication graph, the clausal propagation and the integer trail itself) are treated
/// specially for efficiency and conflict analysis.
pub trait Propagator {
    /// Return the name of the propagator; a convenience method used for printing.
    fn name(&self) -> &str;

    /// The scheduling priority: propagators with a lower priority run first, equal priorities
    /// run in first-in-first-out order.
    fn priority(&self) -> u32 {
        0
    }

    /// Initialise the propagator without propagating: detect root-level inconsistencies and
    /// subscribe to the variables and literals whose changes should wake the propagator. Called
    /// exactly once, before any call to [`Propagator::propagate`].
    fn initialise_at_root(
        &mut self,
        context: &mut PropagatorInitialisationContext,
    ) -> Result<(), Explanation>;

    /// Extend the current partial assignment with inferred bound changes, or report an
    /// [`Inconsistency`](crate::basic_types::Inconsistency).
    ///
    /// A propagator must be idempotent but is not required to reach its own fixpoint in one
    /// call: the scheduler calls it again as long as new changes occur.
    fn propagate(&mut self, context: PropagationContextMut) -> PropagationStatusCP;

    /// Called after the solver has backtracked, so incremental state (trail cursors, reversible
    /// structures) can be wound back.
    fn synchronise(&mut self, _context: PropagationContext) {}
}
