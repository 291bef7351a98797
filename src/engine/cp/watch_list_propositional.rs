use super::propagation::PropagatorId;
use crate::basic_types::KeyedVec;
use crate::engine::variables::Literal;

/// Contains information on which propagator to notify upon literal assignment. Not to be
/// confused with the watch lists of the [`LiteralWatchers`].
///
/// [`LiteralWatchers`]: crate::engine::sat::LiteralWatchers
#[derive(Default, Debug)]
pub(crate) struct WatchListPropositional {
    watchers: KeyedVec<Literal, Vec<PropagatorId>>,
    is_watching_anything: bool,
}

impl WatchListPropositional {
    pub(crate) fn grow(&mut self) {
        // one list per polarity
        self.watchers.push(vec![]);
        self.watchers.push(vec![]);
    }

    pub(crate) fn is_watching_anything(&self) -> bool {
        self.is_watching_anything
    }

    /// Subscribe the propagator to `literal` becoming true.
    pub(crate) fn watch_literal(&mut self, literal: Literal, propagator: PropagatorId) {
        self.is_watching_anything = true;
        let watchers = &mut self.watchers[literal];
        if !watchers.contains(&propagator) {
            watchers.push(propagator);
        }
    }

    pub(crate) fn get_affected_propagators(&self, literal: Literal) -> &[PropagatorId] {
        &self.watchers[literal]
    }
}
