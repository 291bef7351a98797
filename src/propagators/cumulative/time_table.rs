use crate::basic_types::Explanation;
use crate::basic_types::Inconsistency;
use crate::basic_types::PropagationStatusCP;
use crate::engine::cp::domain_events::DomainEvents;
use crate::engine::cp::propagation::PropagationContextMut;
use crate::engine::cp::propagation::Propagator;
use crate::engine::cp::propagation::PropagatorInitialisationContext;
use crate::engine::variables::IntegerValue;
use crate::engine::variables::IntegerVariable;
use crate::engine::variables::Literal;

/// One task sharing the cumulative resource. The task runs over `[start, end)` using `demand`
/// units of the resource; an optional task only does so when its presence literal is true.
#[derive(Clone, Copy, Debug)]
pub struct Task {
    pub start: IntegerVariable,
    pub end: IntegerVariable,
    pub duration: IntegerVariable,
    pub demand: IntegerVariable,
    pub presence: Option<Literal>,
}

/// A maximal time range with constant aggregated mandatory demand. Within a profile the
/// rectangles are disjoint, contiguous, sorted by start, and have non-negative heights.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ProfileRectangle {
    start: IntegerValue,
    end: IntegerValue,
    height: IntegerValue,
}

/// Timetable filtering for the cumulative constraint: at every time point the demands of the
/// simultaneously running present tasks must fit in the capacity.
///
/// Each call rebuilds the profile of *mandatory parts* `[ub(start), lb(end))`, raises the
/// capacity lower bound to the profile maximum, and sweeps every task over the profile: the
/// start is pushed right past rectangles the task cannot fit on top of, the end symmetrically
/// left, until the profile is stable. Tasks with an undetermined presence are excluded from the
/// profile but still filtered; when filtering would push such a task out of its own window, its
/// presence literal is falsified instead.
#[derive(Debug)]
pub struct TimeTablePropagator {
    tasks: Box<[Task]>,
    capacity: IntegerVariable,
}

impl TimeTablePropagator {
    pub fn new(tasks: Box<[Task]>, capacity: IntegerVariable) -> Self {
        TimeTablePropagator { tasks, capacity }
    }

    /// Whether the task certainly occupies its mandatory part: it is present, really consumes
    /// the resource, and its time window is tight enough to overlap itself.
    fn contributes_to_profile(&self, task_index: usize, context: &PropagationContextMut) -> bool {
        let task = self.tasks[task_index];
        if let Some(presence) = task.presence {
            if !context.is_literal_true(presence) {
                return false;
            }
        }
        context.lower_bound(task.demand) > IntegerValue::ZERO
            && context.lower_bound(task.duration) > IntegerValue::ZERO
            && context.upper_bound(task.start) < context.lower_bound(task.end)
    }

    fn build_profile(&self, context: &PropagationContextMut) -> Vec<ProfileRectangle> {
        let mut events: Vec<(IntegerValue, IntegerValue)> = vec![];
        for task_index in 0..self.tasks.len() {
            if !self.contributes_to_profile(task_index, context) {
                continue;
            }
            let task = self.tasks[task_index];
            let demand = context.lower_bound(task.demand);
            events.push((context.upper_bound(task.start), demand));
            events.push((context.lower_bound(task.end), -demand));
        }
        events.sort_by_key(|&(time, _)| time);

        let mut profile = vec![];
        let mut height = IntegerValue::ZERO;
        let mut previous_time: Option<IntegerValue> = None;
        let mut index = 0;
        while index < events.len() {
            let time = events[index].0;
            if let Some(previous) = previous_time {
                if previous < time {
                    profile.push(ProfileRectangle {
                        start: previous,
                        end: time,
                        height,
                    });
                }
            }
            while index < events.len() && events[index].0 == time {
                height = height + events[index].1;
                index += 1;
            }
            previous_time = Some(time);
        }
        profile
    }

    /// Add the mandatory parts overlapping `[from, to)` to the explanation: the bounds that
    /// pin each overlapping task onto that range, along with its presence.
    fn add_profile_to_explanation(
        &self,
        from: IntegerValue,
        to: IntegerValue,
        exclude: Option<usize>,
        context: &PropagationContextMut,
        explanation: &mut Explanation,
    ) {
        for task_index in 0..self.tasks.len() {
            if Some(task_index) == exclude || !self.contributes_to_profile(task_index, context) {
                continue;
            }
            let task = self.tasks[task_index];
            let mandatory_start = context.upper_bound(task.start);
            let mandatory_end = context.lower_bound(task.end);
            if mandatory_start < to && mandatory_end > from {
                if let Some(presence) = task.presence {
                    explanation.add(!presence);
                }
                explanation.add_integer_literal(context.upper_bound_as_literal(task.start));
                explanation.add_integer_literal(context.lower_bound_as_literal(task.end));
                explanation.add_integer_literal(context.lower_bound_as_literal(task.demand));
            }
        }
    }

    /// The explanation of a filtering step on `task_index` caused by `reason_rectangles`.
    fn push_explanation(
        &self,
        task_index: usize,
        reason_rectangles: &[(IntegerValue, IntegerValue)],
        context: &PropagationContextMut,
    ) -> Explanation {
        let task = self.tasks[task_index];
        let mut explanation = Explanation::default();
        for &(from, to) in reason_rectangles {
            self.add_profile_to_explanation(from, to, Some(task_index), context, &mut explanation);
        }
        explanation.add_integer_literal(context.lower_bound_as_literal(task.duration));
        explanation.add_integer_literal(context.lower_bound_as_literal(task.demand));
        explanation.add_integer_literal(context.upper_bound_as_literal(self.capacity));
        explanation
    }

    /// The demand the task itself contributes to a profile rectangle.
    fn own_contribution(
        &self,
        task_index: usize,
        rectangle: ProfileRectangle,
        context: &PropagationContextMut,
    ) -> IntegerValue {
        if !self.contributes_to_profile(task_index, context) {
            return IntegerValue::ZERO;
        }
        let task = self.tasks[task_index];
        // rectangle boundaries are mandatory part endpoints, so overlap is all-or-nothing
        if context.upper_bound(task.start) <= rectangle.start
            && context.lower_bound(task.end) >= rectangle.end
        {
            context.lower_bound(task.demand)
        } else {
            IntegerValue::ZERO
        }
    }

    fn filter_task(
        &self,
        task_index: usize,
        profile: &[ProfileRectangle],
        context: &mut PropagationContextMut,
    ) -> Result<bool, Inconsistency> {
        let task = self.tasks[task_index];
        let mut changed = false;

        if let Some(presence) = task.presence {
            if context.is_literal_false(presence) {
                return Ok(false);
            }
        }
        let duration = context.lower_bound(task.duration);
        let demand = context.lower_bound(task.demand);
        if duration <= IntegerValue::ZERO || demand <= IntegerValue::ZERO {
            return Ok(false);
        }
        let capacity_bound = context.upper_bound(self.capacity);

        // sweep from the left, pushing the start past conflicting rectangles
        let mut new_start = context.lower_bound(task.start);
        let mut reason_rectangles: Vec<(IntegerValue, IntegerValue)> = vec![];
        for &rectangle in profile {
            if rectangle.start >= new_start + duration {
                break;
            }
            if rectangle.end <= new_start {
                continue;
            }
            let own = self.own_contribution(task_index, rectangle, context);
            if demand + rectangle.height - own > capacity_bound {
                new_start = rectangle.end;
                reason_rectangles.push((rectangle.start, rectangle.end));
            }
        }

        if new_start > context.lower_bound(task.start) {
            let explanation = self.push_explanation(task_index, &reason_rectangles, context);
            match task.presence {
                Some(presence)
                    if !context.is_literal_fixed(presence)
                        && new_start + duration > context.upper_bound(task.end) =>
                {
                    // the push leaves no room in the task's own window: the task is absent
                    context.assign_literal(!presence, explanation)?;
                    return Ok(true);
                }
                _ => {
                    let mut end_explanation = explanation.clone();
                    end_explanation
                        .add_integer_literal(context.lower_bound_as_literal(task.start));
                    context.set_lower_bound(task.start, new_start, explanation)?;
                    context.set_lower_bound(task.end, new_start + duration, end_explanation)?;
                    changed = true;
                }
            }
        }

        // the symmetric sweep from the right, pushing the end leftwards
        let mut new_end = context.upper_bound(task.end);
        let mut reason_rectangles: Vec<(IntegerValue, IntegerValue)> = vec![];
        for &rectangle in profile.iter().rev() {
            if rectangle.end <= new_end - duration {
                break;
            }
            if rectangle.start >= new_end {
                continue;
            }
            let own = self.own_contribution(task_index, rectangle, context);
            if demand + rectangle.height - own > capacity_bound {
                new_end = rectangle.start;
                reason_rectangles.push((rectangle.start, rectangle.end));
            }
        }

        if new_end < context.upper_bound(task.end) {
            let explanation = self.push_explanation(task_index, &reason_rectangles, context);
            match task.presence {
                Some(presence)
                    if !context.is_literal_fixed(presence)
                        && new_end - duration < context.lower_bound(task.start) =>
                {
                    context.assign_literal(!presence, explanation)?;
                    return Ok(true);
                }
                _ => {
                    let mut start_explanation = explanation.clone();
                    start_explanation
                        .add_integer_literal(context.upper_bound_as_literal(task.end));
                    context.set_upper_bound(task.end, new_end, explanation)?;
                    context.set_upper_bound(task.start, new_end - duration, start_explanation)?;
                    changed = true;
                }
            }
        }

        Ok(changed)
    }
}

impl Propagator for TimeTablePropagator {
    fn name(&self) -> &str {
        "TimeTable"
    }

    fn priority(&self) -> u32 {
        2
    }

    fn initialise_at_root(
        &mut self,
        context: &mut PropagatorInitialisationContext,
    ) -> Result<(), Explanation> {
        for task in self.tasks.iter() {
            context.register(task.start, DomainEvents::BOUNDS);
            context.register(task.end, DomainEvents::BOUNDS);
            context.register(task.duration, DomainEvents::LOWER_BOUND);
            context.register(task.demand, DomainEvents::LOWER_BOUND);
            if let Some(presence) = task.presence {
                context.register_literal(presence);
            }
        }
        context.register(self.capacity, DomainEvents::UPPER_BOUND);

        Ok(())
    }

    fn propagate(&mut self, mut context: PropagationContextMut) -> PropagationStatusCP {
        loop {
            let profile = self.build_profile(&context);
            let mut changed = false;

            if let Some(&peak) = profile.iter().max_by_key(|rectangle| rectangle.height) {
                if peak.height > context.lower_bound(self.capacity) {
                    let mut explanation = Explanation::default();
                    self.add_profile_to_explanation(
                        peak.start,
                        peak.end,
                        None,
                        &context,
                        &mut explanation,
                    );
                    context.set_lower_bound(self.capacity, peak.height, explanation)?;
                    changed = true;
                }
            }

            for task_index in 0..self.tasks.len() {
                changed |= self.filter_task(task_index, &profile, &mut context)?;
            }

            if !changed {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_helper::TestSolver;

    struct TaskSpec {
        start: (i64, i64),
        duration: i64,
        demand: i64,
        presence: Option<Literal>,
    }

    fn build_tasks(solver: &mut TestSolver, specs: &[TaskSpec]) -> Box<[Task]> {
        specs
            .iter()
            .map(|spec| {
                let (start_lb, start_ub) = spec.start;
                Task {
                    start: solver.new_variable(start_lb, start_ub),
                    end: solver.new_variable(start_lb + spec.duration, start_ub + spec.duration),
                    duration: solver.new_variable(spec.duration, spec.duration),
                    demand: solver.new_variable(spec.demand, spec.demand),
                    presence: spec.presence,
                }
            })
            .collect()
    }

    /// A test case based on Example 4.3 from "Improving Scheduling by Learning -
    /// Andreas Schutt (2011)".
    #[test]
    fn time_table_updates_lower_bound() {
        let mut solver = TestSolver::default();
        let specs = [
            TaskSpec { start: (0, 1), duration: 2, demand: 1, presence: None },
            TaskSpec { start: (2, 3), duration: 6, demand: 2, presence: None },
            TaskSpec { start: (8, 9), duration: 2, demand: 4, presence: None },
            TaskSpec { start: (0, 2), duration: 2, demand: 2, presence: None },
            TaskSpec { start: (2, 4), duration: 5, demand: 2, presence: None },
            TaskSpec { start: (0, 14), duration: 6, demand: 2, presence: None },
        ];
        let tasks = build_tasks(&mut solver, &specs);
        let f_start = tasks[5].start;
        let capacity = solver.new_variable(5, 5);

        solver
            .new_propagator(TimeTablePropagator::new(tasks, capacity))
            .expect("Expected no conflict to occur");

        assert_eq!(solver.lower_bound(f_start), 10);
    }

    #[test]
    fn time_table_updates_upper_bound() {
        let mut solver = TestSolver::default();
        let specs = [
            TaskSpec { start: (6, 6), duration: 4, demand: 1, presence: None },
            TaskSpec { start: (1, 8), duration: 3, demand: 1, presence: None },
        ];
        let tasks = build_tasks(&mut solver, &specs);
        let s1 = tasks[0].start;
        let s2 = tasks[1].start;
        let capacity = solver.new_variable(1, 1);

        solver
            .new_propagator(TimeTablePropagator::new(tasks, capacity))
            .expect("Expected no conflict to occur");

        // the mandatory part [6, 10) of the first task pushes the second out of it
        assert_eq!(solver.lower_bound(s1), 6);
        assert_eq!(solver.upper_bound(s1), 6);
        assert_eq!(solver.lower_bound(s2), 1);
        assert_eq!(solver.upper_bound(s2), 3);
    }

    #[test]
    fn time_table_detects_conflict() {
        let mut solver = TestSolver::default();
        let specs = [
            TaskSpec { start: (1, 3), duration: 4, demand: 1, presence: None },
            TaskSpec { start: (3, 4), duration: 2, demand: 1, presence: None },
        ];
        let tasks = build_tasks(&mut solver, &specs);
        let capacity = solver.new_variable(1, 1);

        let _ = solver
            .new_propagator(TimeTablePropagator::new(tasks, capacity))
            .expect_err("Expected conflict to be detected");
    }

    #[test]
    fn profile_peak_raises_the_capacity_lower_bound() {
        let mut solver = TestSolver::default();
        let specs = [
            TaskSpec { start: (2, 2), duration: 3, demand: 2, presence: None },
            TaskSpec { start: (3, 3), duration: 3, demand: 1, presence: None },
        ];
        let tasks = build_tasks(&mut solver, &specs);
        let capacity = solver.new_variable(0, 10);

        solver
            .new_propagator(TimeTablePropagator::new(tasks, capacity))
            .expect("Expected no conflict to occur");

        // the two mandatory parts overlap in [3, 5)
        assert_eq!(solver.lower_bound(capacity), 3);
    }

    #[test]
    fn tasks_are_pushed_past_a_saturating_mandatory_part() {
        let mut solver = TestSolver::default();
        let presence = None;
        let specs = [
            TaskSpec { start: (0, 10), duration: 3, demand: 1, presence },
            TaskSpec { start: (0, 10), duration: 3, demand: 1, presence },
            TaskSpec { start: (1, 2), duration: 3, demand: 2, presence },
        ];
        let tasks = build_tasks(&mut solver, &specs);
        let first = tasks[0].start;
        let second = tasks[1].start;
        let capacity = solver.new_variable(2, 2);

        solver
            .new_propagator(TimeTablePropagator::new(tasks, capacity))
            .expect("Expected no conflict to occur");

        // task 2 certainly runs over [2, 4) at full remaining capacity, so the unit tasks
        // cannot overlap it and are pushed past its mandatory part
        assert_eq!(solver.lower_bound(first), 4);
        assert_eq!(solver.lower_bound(second), 4);
    }

    #[test]
    fn undetermined_optional_tasks_are_filtered_but_build_no_profile() {
        let mut solver = TestSolver::default();
        let presence = solver.new_literal();
        let specs = [
            TaskSpec { start: (2, 2), duration: 4, demand: 2, presence: None },
            TaskSpec { start: (2, 3), duration: 2, demand: 1, presence: Some(presence) },
        ];
        let tasks = build_tasks(&mut solver, &specs);
        let optional_start = tasks[1].start;
        let capacity = solver.new_variable(2, 2);

        solver
            .new_propagator(TimeTablePropagator::new(tasks, capacity))
            .expect("Expected no conflict to occur");

        // the optional task cannot fit anywhere in its window next to the mandatory part of
        // the first task, so its presence is falsified instead of its bounds
        assert!(solver.is_literal_false(presence));
        // and its bounds are untouched
        assert_eq!(solver.lower_bound(optional_start), 2);
        assert_eq!(solver.upper_bound(optional_start), 3);
    }
}
