//! The interface between the solver kernel and the branching layer, together with a trivial
//! input-order brancher. Sophisticated variable and value selection heuristics live outside the
//! kernel; this module states the contract they implement.

mod brancher;
mod input_order_brancher;
mod selection_context;

pub use brancher::Brancher;
pub use input_order_brancher::InputOrderBrancher;
pub use selection_context::SelectionContext;
