use crate::basic_types::EmptyDomain;
use crate::basic_types::Explanation;
use crate::engine::cp::IntegerEncoder;
use crate::engine::cp::IntegerTrail;
use crate::engine::sat::Trail;
use crate::engine::variables::IntegerLiteral;
use crate::engine::variables::IntegerValue;
use crate::engine::variables::IntegerVariable;
use crate::engine::variables::Literal;

/// [`PropagationContext`] is passed to propagators to query the current state: variable bounds,
/// literal values, and the two trails (propagators that propagate incrementally walk the trails
/// through their own cursors).
///
/// Note that the context is the only point of communication between a propagator and the solver
/// during propagation.
#[derive(Clone, Copy, Debug)]
pub struct PropagationContext<'a> {
    pub(crate) trail: &'a Trail,
    pub(crate) integer_trail: &'a IntegerTrail,
}

impl<'a> PropagationContext<'a> {
    pub(crate) fn new(trail: &'a Trail, integer_trail: &'a IntegerTrail) -> Self {
        PropagationContext {
            trail,
            integer_trail,
        }
    }
}

macro_rules! read_methods {
    () => {
        pub fn lower_bound(&self, var: IntegerVariable) -> IntegerValue {
            self.integer_trail.lower_bound(var)
        }

        pub fn upper_bound(&self, var: IntegerVariable) -> IntegerValue {
            self.integer_trail.upper_bound(var)
        }

        pub fn is_fixed(&self, var: IntegerVariable) -> bool {
            self.lower_bound(var) == self.upper_bound(var)
        }

        pub fn lower_bound_as_literal(&self, var: IntegerVariable) -> IntegerLiteral {
            self.integer_trail.lower_bound_as_literal(var)
        }

        pub fn upper_bound_as_literal(&self, var: IntegerVariable) -> IntegerLiteral {
            self.integer_trail.upper_bound_as_literal(var)
        }

        pub fn is_literal_true(&self, literal: Literal) -> bool {
            self.trail.is_literal_assigned_true(literal)
        }

        pub fn is_literal_false(&self, literal: Literal) -> bool {
            self.trail.is_literal_assigned_false(literal)
        }

        pub fn is_literal_fixed(&self, literal: Literal) -> bool {
            self.trail.is_literal_assigned(literal)
        }

        /// Whether the optional variable is currently declared absent.
        pub fn is_integer_variable_ignored(&self, var: IntegerVariable) -> bool {
            self.integer_trail.is_ignored(var, self.trail)
        }

        pub fn get_is_empty_literal(&self, var: IntegerVariable) -> Option<Literal> {
            self.integer_trail.get_is_empty_literal(var)
        }

        pub fn num_trail_entries(&self) -> usize {
            self.trail.num_trail_entries()
        }

        pub fn get_trail_entry(&self, index: usize) -> Literal {
            self.trail.get_trail_entry(index)
        }

        pub fn num_integer_trail_entries(&self) -> usize {
            self.integer_trail.num_trail_entries()
        }

        pub fn get_integer_trail_entry_variable(
            &self,
            index: usize,
        ) -> Option<IntegerVariable> {
            self.integer_trail.get_entry_variable(index)
        }
    };
}

impl PropagationContext<'_> {
    read_methods!();
}

/// The mutable counterpart of [`PropagationContext`] through which propagators tighten bounds
/// and assign literals, always together with an [`Explanation`].
#[derive(Debug)]
pub struct PropagationContextMut<'a> {
    pub(crate) trail: &'a mut Trail,
    pub(crate) integer_trail: &'a mut IntegerTrail,
    pub(crate) encoder: &'a IntegerEncoder,
}

impl<'a> PropagationContextMut<'a> {
    pub(crate) fn new(
        trail: &'a mut Trail,
        integer_trail: &'a mut IntegerTrail,
        encoder: &'a IntegerEncoder,
    ) -> Self {
        PropagationContextMut {
            trail,
            integer_trail,
            encoder,
        }
    }

    pub fn as_readonly(&self) -> PropagationContext<'_> {
        PropagationContext {
            trail: self.trail,
            integer_trail: self.integer_trail,
        }
    }

    read_methods!();

    pub fn set_lower_bound(
        &mut self,
        var: IntegerVariable,
        bound: IntegerValue,
        explanation: Explanation,
    ) -> Result<(), EmptyDomain> {
        self.integer_trail.enqueue(
            IntegerLiteral::greater_or_equal(var, bound),
            &explanation.literals,
            &explanation.integer_literals,
            self.trail,
            self.encoder,
        )
    }

    pub fn set_upper_bound(
        &mut self,
        var: IntegerVariable,
        bound: IntegerValue,
        explanation: Explanation,
    ) -> Result<(), EmptyDomain> {
        self.set_lower_bound(var.negation(), -bound, explanation)
    }

    /// Make `literal` true with the given explanation.
    pub fn assign_literal(
        &mut self,
        literal: Literal,
        explanation: Explanation,
    ) -> Result<(), EmptyDomain> {
        self.integer_trail.enqueue_literal(
            literal,
            &explanation.literals,
            &explanation.integer_literals,
            self.trail,
        )
    }
}
