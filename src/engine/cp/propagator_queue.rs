use std::collections::VecDeque;

use super::propagation::PropagatorId;
use crate::basic_types::HashSet;
use crate::butternut_assert_moderate;
use crate::butternut_assert_simple;

/// Dictates the order in which propagators are called to propagate: lower priorities run first,
/// and propagators of equal priority run in first-in-first-out order. A propagator is assumed
/// idempotent and is never queued twice.
#[derive(Debug)]
pub(crate) struct PropagatorQueue {
    queues: Vec<VecDeque<PropagatorId>>,
    present_propagators: HashSet<PropagatorId>,
}

impl PropagatorQueue {
    pub(crate) fn new(num_priority_levels: u32) -> PropagatorQueue {
        PropagatorQueue {
            queues: (0..num_priority_levels).map(|_| VecDeque::new()).collect(),
            present_propagators: HashSet::default(),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.present_propagators.is_empty()
    }

    pub(crate) fn enqueue_propagator(&mut self, propagator_id: PropagatorId, priority: u32) {
        butternut_assert_moderate!((priority as usize) < self.queues.len());

        if self.present_propagators.insert(propagator_id) {
            self.queues[priority as usize].push_back(propagator_id);
        }
    }

    pub(crate) fn pop(&mut self) -> PropagatorId {
        butternut_assert_simple!(!self.is_empty());

        let propagator_id = self
            .queues
            .iter_mut()
            .find_map(|queue| queue.pop_front())
            .expect("a propagator is present");
        let _ = self.present_propagators.remove(&propagator_id);
        propagator_id
    }

    pub(crate) fn clear(&mut self) {
        for queue in self.queues.iter_mut() {
            queue.clear();
        }
        self.present_propagators.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priorities_run_before_fifo_order() {
        let mut queue = PropagatorQueue::new(3);

        queue.enqueue_propagator(PropagatorId(4), 2);
        queue.enqueue_propagator(PropagatorId(1), 0);
        queue.enqueue_propagator(PropagatorId(2), 0);
        // re-queueing has no effect
        queue.enqueue_propagator(PropagatorId(1), 0);

        assert_eq!(queue.pop(), PropagatorId(1));
        assert_eq!(queue.pop(), PropagatorId(2));
        assert_eq!(queue.pop(), PropagatorId(4));
        assert!(queue.is_empty());
    }
}
