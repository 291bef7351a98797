use enumset::enum_set;
use enumset::EnumSet;
use enumset::EnumSetType;

/// A description of the kinds of events that can happen on an integer variable.
#[derive(Debug, EnumSetType)]
pub enum IntDomainEvent {
    /// Event where an (integer) variable domain tightens the lower bound.
    LowerBound,
    /// Event where an (integer) variable domain tightens the upper bound.
    UpperBound,
}

/// A wrapper for the domain events a propagator subscribes to during initialisation.
#[derive(Debug, Copy, Clone)]
pub struct DomainEvents {
    int_events: EnumSet<IntDomainEvent>,
}

impl DomainEvents {
    /// Both the lower-bound and upper-bound events.
    pub const BOUNDS: DomainEvents = DomainEvents {
        int_events: enum_set!(IntDomainEvent::LowerBound | IntDomainEvent::UpperBound),
    };
    /// The lower-bound event.
    pub const LOWER_BOUND: DomainEvents = DomainEvents {
        int_events: enum_set!(IntDomainEvent::LowerBound),
    };
    /// The upper-bound event.
    pub const UPPER_BOUND: DomainEvents = DomainEvents {
        int_events: enum_set!(IntDomainEvent::UpperBound),
    };

    pub(crate) fn get_int_events(&self) -> EnumSet<IntDomainEvent> {
        self.int_events
    }
}
