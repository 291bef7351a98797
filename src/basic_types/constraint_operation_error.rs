use thiserror::Error;

/// Errors related to adding constraints to the solver.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOperationError {
    /// The added clause makes the formula trivially unsatisfiable.
    #[error("Adding clause failed because it is infeasible at the root")]
    InfeasibleClause,
    /// The added propagator detects unsatisfiability at the root.
    #[error("Adding propagator failed because it is infeasible at the root")]
    InfeasiblePropagator,
    /// The solver was already in an infeasible state.
    #[error("Operation failed because the solver is in an infeasible state")]
    InfeasibleState,
}
