//! # Butternut
//! Butternut is a hybrid CDCL SAT / lazy clause generation (LCG
//! [\[1\]](https://people.eng.unimelb.edu.au/pstuckey/papers/cp09-lc.pdf)) constraint
//! propagation core: a backtracking search kernel that maintains a monotonic assignment stack
//! over Boolean literals and over the bounds of integer variables, and coordinates cooperating
//! propagators that explain their propagations precisely enough to drive 1-UIP clause learning
//! (see \[2\]).
//!
//! The kernel ships with:
//! * two-watched-literal clausal propagation and a dedicated binary implication graph with
//!   learned-clause minimization;
//! * an [`IntegerEncoder`]-backed integer trail which links bound facts `[x >= k]` to Boolean
//!   literals on demand and traverses its reason DAG lazily during conflict analysis;
//! * a difference-logic [`PrecedencesPropagator`] (incremental Bellman-Ford with
//!   Tarjan-style positive-cycle detection over an offset graph);
//! * a cumulative [`TimeTablePropagator`] with profile-based filtering and support for
//!   optional tasks.
//!
//! Branching heuristics, restart policies, file formats and proof logging are deliberately
//! outside the kernel; their contracts are the [`Brancher`](branching::Brancher) and
//! [`TerminationCondition`](termination::TerminationCondition) traits and the literal/bound
//! accessors of the [`ConstraintSatisfactionSolver`].
//!
//! # Bibliography
//! \[1\] T. Feydy and P. J. Stuckey, ‘Lazy clause generation reengineered’, in International
//! Conference on Principles and Practice of Constraint Programming, 2009, pp. 352–366.
//!
//! \[2\] J. Marques-Silva, I. Lynce, and S. Malik, ‘Conflict-driven clause learning SAT
//! solvers’, in Handbook of satisfiability, IOS press, 2021
//!
//! [`IntegerEncoder`]: crate::engine::cp::IntegerEncoder
//! [`PrecedencesPropagator`]: crate::propagators::PrecedencesPropagator
//! [`TimeTablePropagator`]: crate::propagators::TimeTablePropagator

pub mod asserts;
pub(crate) mod basic_types;
pub mod branching;
pub(crate) mod engine;
pub mod propagators;

#[cfg(test)]
pub(crate) mod tests;

pub use basic_types::statistic_logging;
pub use basic_types::ConstraintOperationError;
pub use basic_types::EmptyDomain;
pub use basic_types::Explanation;
pub use basic_types::Inconsistency;
pub use engine::solver::CSPSolverExecutionFlag;
pub use engine::solver::ConstraintSatisfactionSolver;
pub use engine::solver::SolverOptions;

pub mod variables {
    pub use crate::engine::variables::BooleanVariable;
    pub use crate::engine::variables::IntegerLiteral;
    pub use crate::engine::variables::IntegerValue;
    pub use crate::engine::variables::IntegerVariable;
    pub use crate::engine::variables::Literal;
}

pub mod termination {
    pub use crate::engine::termination::Indefinite;
    pub use crate::engine::termination::TerminationCondition;
    pub use crate::engine::termination::TimeBudget;
}

/// The interface for propagator authors.
pub mod propagation {
    pub use crate::basic_types::PropagationStatusCP;
    pub use crate::engine::cp::domain_events::DomainEvents;
    pub use crate::engine::cp::domain_events::IntDomainEvent;
    pub use crate::engine::cp::propagation::PropagationContext;
    pub use crate::engine::cp::propagation::PropagationContextMut;
    pub use crate::engine::cp::propagation::Propagator;
    pub use crate::engine::cp::propagation::PropagatorInitialisationContext;
}
