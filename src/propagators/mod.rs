//! Contains the integer propagator implementations that ship with the solver kernel.
//!
//! See [`crate::propagation`] for the interface propagators implement.

pub(crate) mod cumulative;
pub(crate) mod precedences;

pub use cumulative::Task;
pub use cumulative::TimeTablePropagator;
pub use precedences::PrecedencesPropagator;
