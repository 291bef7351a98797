use super::propagation::PropagatorId;
use crate::basic_types::KeyedVec;
use crate::engine::variables::IntegerVariable;

/// Contains information on which propagator to notify upon integer events, i.e. the lower bound
/// of a variable increasing.
///
/// Because variables come in negation pairs, a subscription to the *upper bound* of `x` is
/// stored as a subscription to the lower bound of `x.negation()`; the notification side then
/// only ever deals with lower-bound changes.
#[derive(Default, Debug)]
pub(crate) struct WatchListCP {
    watchers: KeyedVec<IntegerVariable, Vec<PropagatorId>>,
    is_watching_anything: bool,
}

impl WatchListCP {
    pub(crate) fn grow(&mut self) {
        self.watchers.push(vec![]);
    }

    pub(crate) fn is_watching_anything(&self) -> bool {
        self.is_watching_anything
    }

    pub(crate) fn watch_lower_bound(&mut self, variable: IntegerVariable, propagator: PropagatorId) {
        self.is_watching_anything = true;
        let watchers = &mut self.watchers[variable];
        if !watchers.contains(&propagator) {
            watchers.push(propagator);
        }
    }

    pub(crate) fn watch_upper_bound(&mut self, variable: IntegerVariable, propagator: PropagatorId) {
        self.watch_lower_bound(variable.negation(), propagator);
    }

    /// The propagators to wake when the lower bound of `variable` has increased.
    pub(crate) fn get_affected_propagators(&self, variable: IntegerVariable) -> &[PropagatorId] {
        &self.watchers[variable]
    }
}
