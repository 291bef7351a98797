use super::PropagationContext;
use super::PropagatorId;
use crate::engine::cp::domain_events::DomainEvents;
use crate::engine::cp::domain_events::IntDomainEvent;
use crate::engine::cp::IntegerTrail;
use crate::engine::cp::WatchListCP;
use crate::engine::cp::WatchListPropositional;
use crate::engine::sat::Trail;
use crate::engine::variables::IntegerValue;
use crate::engine::variables::IntegerVariable;
use crate::engine::variables::Literal;

/// [`PropagatorInitialisationContext`] is used when propagators are initialised after creation:
/// it is how a propagator subscribes to domain changes of variables and to literal assignments,
/// and it gives read access to the current bounds.
#[derive(Debug)]
pub struct PropagatorInitialisationContext<'a> {
    watch_list_cp: &'a mut WatchListCP,
    watch_list_propositional: &'a mut WatchListPropositional,
    propagator_id: PropagatorId,
    context: PropagationContext<'a>,
}

impl PropagatorInitialisationContext<'_> {
    pub(crate) fn new<'a>(
        watch_list_cp: &'a mut WatchListCP,
        watch_list_propositional: &'a mut WatchListPropositional,
        propagator_id: PropagatorId,
        trail: &'a Trail,
        integer_trail: &'a IntegerTrail,
    ) -> PropagatorInitialisationContext<'a> {
        PropagatorInitialisationContext {
            watch_list_cp,
            watch_list_propositional,
            propagator_id,
            context: PropagationContext::new(trail, integer_trail),
        }
    }

    /// Subscribes the propagator to the given [`DomainEvents`] on `var`.
    pub fn register(&mut self, var: IntegerVariable, domain_events: DomainEvents) {
        for event in domain_events.get_int_events() {
            match event {
                IntDomainEvent::LowerBound => {
                    self.watch_list_cp.watch_lower_bound(var, self.propagator_id)
                }
                IntDomainEvent::UpperBound => {
                    self.watch_list_cp.watch_upper_bound(var, self.propagator_id)
                }
            }
        }
    }

    /// Subscribes the propagator to `literal` becoming true.
    pub fn register_literal(&mut self, literal: Literal) {
        self.watch_list_propositional
            .watch_literal(literal, self.propagator_id);
    }

    pub fn lower_bound(&self, var: IntegerVariable) -> IntegerValue {
        self.context.lower_bound(var)
    }

    pub fn upper_bound(&self, var: IntegerVariable) -> IntegerValue {
        self.context.upper_bound(var)
    }

    pub fn is_literal_true(&self, literal: Literal) -> bool {
        self.context.is_literal_true(literal)
    }

    pub fn is_literal_false(&self, literal: Literal) -> bool {
        self.context.is_literal_false(literal)
    }

    pub fn get_is_empty_literal(&self, var: IntegerVariable) -> Option<Literal> {
        self.context.get_is_empty_literal(var)
    }
}
