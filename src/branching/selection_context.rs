use rand::rngs::SmallRng;

use crate::engine::cp::IntegerTrail;
use crate::engine::sat::Trail;
use crate::engine::variables::BooleanVariable;
use crate::engine::variables::IntegerValue;
use crate::engine::variables::IntegerVariable;
use crate::engine::variables::Literal;

/// The read view handed to a [`Brancher`](super::Brancher) when it selects the next decision,
/// together with the solver-owned random generator for randomised selectors.
#[derive(Debug)]
pub struct SelectionContext<'a> {
    trail: &'a Trail,
    integer_trail: &'a IntegerTrail,
    random_generator: &'a mut SmallRng,
}

impl<'a> SelectionContext<'a> {
    pub(crate) fn new(
        trail: &'a Trail,
        integer_trail: &'a IntegerTrail,
        random_generator: &'a mut SmallRng,
    ) -> Self {
        SelectionContext {
            trail,
            integer_trail,
            random_generator,
        }
    }

    pub fn num_boolean_variables(&self) -> u32 {
        self.trail.num_variables()
    }

    pub fn is_variable_assigned(&self, variable: BooleanVariable) -> bool {
        self.trail.is_variable_assigned(variable)
    }

    pub fn is_literal_assigned(&self, literal: Literal) -> bool {
        self.trail.is_literal_assigned(literal)
    }

    pub fn lower_bound(&self, var: IntegerVariable) -> IntegerValue {
        self.integer_trail.lower_bound(var)
    }

    pub fn upper_bound(&self, var: IntegerVariable) -> IntegerValue {
        self.integer_trail.upper_bound(var)
    }

    pub fn random_generator(&mut self) -> &mut SmallRng {
        self.random_generator
    }
}
