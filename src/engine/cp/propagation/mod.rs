pub(crate) mod propagation_context;
pub(crate) mod propagator;
pub(crate) mod propagator_id;
pub(crate) mod propagator_initialisation_context;

pub use propagation_context::PropagationContext;
pub use propagation_context::PropagationContextMut;
pub use propagator::Propagator;
pub(crate) use propagator_id::PropagatorId;
pub use propagator_initialisation_context::PropagatorInitialisationContext;
