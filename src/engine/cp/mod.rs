pub(crate) mod domain_events;
mod integer_encoder;
mod integer_trail;
pub(crate) mod propagation;
mod propagator_queue;
mod watch_list_cp;
mod watch_list_propositional;

pub(crate) use integer_encoder::IntegerEncoder;
pub(crate) use integer_trail::IntegerTrail;
pub(crate) use propagator_queue::PropagatorQueue;
pub(crate) use watch_list_cp::WatchListCP;
pub(crate) use watch_list_propositional::WatchListPropositional;
