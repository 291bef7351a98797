use std::collections::BTreeMap;
use std::ops::Bound::Excluded;
use std::ops::Bound::Unbounded;

use super::IntegerTrail;
use crate::basic_types::KeyedVec;
use crate::basic_types::StorageKey;
use crate::butternut_assert_eq_simple;
use crate::butternut_assert_simple;
use crate::engine::cp::WatchListPropositional;
use crate::engine::sat::BinaryImplicationGraph;
use crate::engine::sat::ClauseAllocator;
use crate::engine::sat::LiteralWatchers;
use crate::engine::sat::Trail;
use crate::engine::variables::IntegerLiteral;
use crate::engine::variables::IntegerValue;
use crate::engine::variables::IntegerVariable;
use crate::engine::variables::Literal;

/// Links integer bound facts to Boolean literals.
///
/// For every variable an ordered map `bound -> literal` holds the *associated literals*: the
/// literal of `(v, k)` is true exactly when `v >= k`. Literals are created on demand
/// ([`IntegerEncoder::get_or_create_associated_literal`], the lazy clause generation encoding)
/// and kept consistent with each other through order implications in the binary implication
/// graph: the literal of a larger bound implies the literal of every smaller one. Each
/// association is mirrored onto the negated variable, reusing the negated literal with the
/// negated bound.
///
/// A variable may additionally be *fully encoded* over an explicit value list, creating one
/// equality literal per value and the clauses that make exactly one of them true.
#[derive(Default, Debug)]
pub(crate) struct IntegerEncoder {
    associated_literals: KeyedVec<IntegerVariable, BTreeMap<IntegerValue, Literal>>,
    /// The integer facts entailed by a literal becoming true; usually one or two entries.
    literal_to_integer_literals: KeyedVec<Literal, Vec<IntegerLiteral>>,
    /// For each fully encoded variable, the ordered `(value, equality literal)` pairs.
    full_encodings: KeyedVec<IntegerVariable, Option<Vec<(IntegerValue, Literal)>>>,
}

impl IntegerEncoder {
    /// Register storage for a freshly created variable pair.
    pub(crate) fn grow_integer_variable(&mut self) {
        self.associated_literals.push(BTreeMap::new());
        self.associated_literals.push(BTreeMap::new());
        self.full_encodings.push(None);
        self.full_encodings.push(None);
    }

    /// Register storage for a freshly created Boolean variable.
    pub(crate) fn grow_boolean_variable(&mut self) {
        self.literal_to_integer_literals.push(vec![]);
        self.literal_to_integer_literals.push(vec![]);
    }

    pub(crate) fn get_integer_literals_of(&self, literal: Literal) -> &[IntegerLiteral] {
        if literal.index() < self.literal_to_integer_literals.len() {
            &self.literal_to_integer_literals[literal]
        } else {
            &[]
        }
    }

    /// The associated literal of the greatest bound at or below the queried one, if any.
    pub(crate) fn search_for_literal_at_or_before(
        &self,
        integer_literal: IntegerLiteral,
    ) -> Option<(IntegerValue, Literal)> {
        self.associated_literals[integer_literal.var]
            .range(..=integer_literal.bound)
            .next_back()
            .map(|(&value, &literal)| (value, literal))
    }

    pub(crate) fn is_fully_encoded(&self, var: IntegerVariable) -> bool {
        self.full_encodings[var].is_some()
    }

    pub(crate) fn get_full_encoding(
        &self,
        var: IntegerVariable,
    ) -> Option<&[(IntegerValue, Literal)]> {
        self.full_encodings[var].as_deref()
    }

    /// The literal representing `var == value` of a fully encoded variable.
    pub(crate) fn get_equality_literal(
        &self,
        var: IntegerVariable,
        value: IntegerValue,
    ) -> Option<Literal> {
        self.full_encodings[var].as_ref().and_then(|encoding| {
            encoding
                .iter()
                .find(|&&(encoded_value, _)| encoded_value == value)
                .map(|&(_, literal)| literal)
        })
    }

    /// Look up or create the literal meaning `integer_literal.var >= integer_literal.bound`.
    ///
    /// Bounds outside the initial domain normalise to the root true/false literals. A fresh
    /// literal receives order implications towards its nearest neighbours, and the association
    /// is mirrored onto the negated variable. Literals are only created at the root level.
    #[allow(clippy::too_many_arguments, reason = "mirrors the solver component structure")]
    pub(crate) fn get_or_create_associated_literal(
        &mut self,
        integer_literal: IntegerLiteral,
        trail: &mut Trail,
        integer_trail: &IntegerTrail,
        binary_implication_graph: &mut BinaryImplicationGraph,
        literal_watchers: &mut LiteralWatchers,
        watch_list_propositional: &mut WatchListPropositional,
    ) -> Literal {
        butternut_assert_simple!(
            trail.is_at_the_root_level(),
            "associated literals are created at the root level"
        );

        let var = integer_literal.var;
        let bound = integer_literal.bound;

        if bound <= integer_trail.initial_lower_bound(var) {
            return trail.true_literal;
        }
        if bound > integer_trail.initial_upper_bound(var) {
            return trail.false_literal;
        }
        if let Some(&literal) = self.associated_literals[var].get(&bound) {
            return literal;
        }

        let literal = self.create_boolean_variable(
            trail,
            binary_implication_graph,
            literal_watchers,
            watch_list_propositional,
        );
        self.associate_literal(literal, integer_literal, binary_implication_graph);

        // level-zero tightenings that happened since variable creation must be reflected
        if integer_trail.lower_bound(var) >= bound {
            trail.enqueue_with_unit_reason(literal);
        } else if integer_trail.upper_bound(var) < bound {
            trail.enqueue_with_unit_reason(!literal);
        }

        literal
    }

    fn create_boolean_variable(
        &mut self,
        trail: &mut Trail,
        binary_implication_graph: &mut BinaryImplicationGraph,
        literal_watchers: &mut LiteralWatchers,
        watch_list_propositional: &mut WatchListPropositional,
    ) -> Literal {
        let variable = trail.grow();
        binary_implication_graph.grow();
        literal_watchers.grow();
        watch_list_propositional.grow();
        self.grow_boolean_variable();

        Literal::new(variable, true)
    }

    fn associate_literal(
        &mut self,
        literal: Literal,
        integer_literal: IntegerLiteral,
        binary_implication_graph: &mut BinaryImplicationGraph,
    ) {
        let var = integer_literal.var;
        let bound = integer_literal.bound;

        // order implications with the nearest neighbours: literal(after) -> literal and
        // literal -> literal(before). The mirrored map needs no clauses of its own, the
        // mirrored implications are these very same clauses.
        let after = self.associated_literals[var]
            .range((Excluded(bound), Unbounded))
            .next()
            .map(|(_, &after)| after);
        let before = self.associated_literals[var]
            .range((Unbounded, Excluded(bound)))
            .next_back()
            .map(|(_, &before)| before);

        if let Some(after) = after {
            binary_implication_graph.add_implication(after, literal);
        }
        if let Some(before) = before {
            binary_implication_graph.add_implication(literal, before);
        }

        let _ = self.associated_literals[var].insert(bound, literal);
        let _ = self.associated_literals[var.negation()]
            .insert(IntegerValue::ONE - bound, !literal);

        self.literal_to_integer_literals[literal].push(integer_literal);
        self.literal_to_integer_literals[!literal].push(integer_literal.negation());
    }

    /// Create the equality encoding of `var` over the given values and assert that exactly one
    /// of them holds.
    ///
    /// With exactly two values a single Boolean and its negation serve as the two equality
    /// literals; otherwise each inner value receives a fresh Boolean linked to the associated
    /// bound literals, and an at-least-one clause ranges over all equality literals. The
    /// encoding is mirrored onto the negated variable with the value list reversed and negated.
    ///
    /// Encoding fewer than two values, values outside the current domain, or a variable that is
    /// already fully encoded is a precondition violation.
    #[allow(clippy::too_many_arguments, reason = "mirrors the solver component structure")]
    pub(crate) fn fully_encode_variable(
        &mut self,
        var: IntegerVariable,
        values: Vec<IntegerValue>,
        trail: &mut Trail,
        integer_trail: &mut IntegerTrail,
        binary_implication_graph: &mut BinaryImplicationGraph,
        literal_watchers: &mut LiteralWatchers,
        watch_list_propositional: &mut WatchListPropositional,
        clause_allocator: &mut ClauseAllocator,
    ) {
        butternut_assert_simple!(trail.is_at_the_root_level());
        butternut_assert_simple!(
            !self.is_fully_encoded(var),
            "re-encoding a fully encoded variable is not supported"
        );

        let mut values = values;
        values.sort_unstable();
        values.dedup();

        butternut_assert_simple!(
            values.len() >= 2,
            "fully encoding fewer than two values is not meaningful"
        );
        butternut_assert_simple!(
            *values.first().unwrap() >= integer_trail.lower_bound(var)
                && *values.last().unwrap() <= integer_trail.upper_bound(var),
            "encoded values must lie within the current domain"
        );

        let first = *values.first().unwrap();
        let last = *values.last().unwrap();

        // restrict the domain to the encoded range
        integer_trail
            .enqueue(
                IntegerLiteral::greater_or_equal(var, first),
                &[],
                &[],
                trail,
                self,
            )
            .expect("the value range is within the domain");
        integer_trail
            .enqueue(
                IntegerLiteral::greater_or_equal(var.negation(), -last),
                &[],
                &[],
                trail,
                self,
            )
            .expect("the value range is within the domain");

        let mut equality_literals: Vec<(IntegerValue, Literal)> = Vec::with_capacity(values.len());

        if values.len() == 2 {
            // a single Boolean and its negation
            let ge_last = self.get_or_create_associated_literal(
                IntegerLiteral::greater_or_equal(var, last),
                trail,
                integer_trail,
                binary_implication_graph,
                literal_watchers,
                watch_list_propositional,
            );
            equality_literals.push((first, !ge_last));
            equality_literals.push((last, ge_last));
        } else {
            let ge_after_first = self.get_or_create_associated_literal(
                IntegerLiteral::greater_or_equal(var, first + IntegerValue::ONE),
                trail,
                integer_trail,
                binary_implication_graph,
                literal_watchers,
                watch_list_propositional,
            );
            equality_literals.push((first, !ge_after_first));

            for &value in &values[1..values.len() - 1] {
                let ge_value = self.get_or_create_associated_literal(
                    IntegerLiteral::greater_or_equal(var, value),
                    trail,
                    integer_trail,
                    binary_implication_graph,
                    literal_watchers,
                    watch_list_propositional,
                );
                let ge_next = self.get_or_create_associated_literal(
                    IntegerLiteral::greater_or_equal(var, value + IntegerValue::ONE),
                    trail,
                    integer_trail,
                    binary_implication_graph,
                    literal_watchers,
                    watch_list_propositional,
                );

                let equality = self.create_boolean_variable(
                    trail,
                    binary_implication_graph,
                    literal_watchers,
                    watch_list_propositional,
                );

                // [var == value] -> [var >= value] and [var == value] -> ![var >= value + 1]
                binary_implication_graph.add_implication(equality, ge_value);
                binary_implication_graph.add_implication(equality, !ge_next);
                // [var >= value] /\ ![var >= value + 1] -> [var == value]
                let _ = literal_watchers.add_clause_unchecked(
                    vec![!ge_value, ge_next, equality],
                    false,
                    clause_allocator,
                );

                self.literal_to_integer_literals[equality]
                    .push(IntegerLiteral::greater_or_equal(var, value));
                self.literal_to_integer_literals[equality]
                    .push(IntegerLiteral::greater_or_equal(var.negation(), -value));

                equality_literals.push((value, equality));
            }

            let ge_last = self.get_or_create_associated_literal(
                IntegerLiteral::greater_or_equal(var, last),
                trail,
                integer_trail,
                binary_implication_graph,
                literal_watchers,
                watch_list_propositional,
            );
            equality_literals.push((last, ge_last));

            // at least one value must be taken
            let at_least_one: Vec<Literal> = equality_literals
                .iter()
                .map(|&(_, literal)| literal)
                .collect();
            let _ =
                literal_watchers.add_clause_unchecked(at_least_one, false, clause_allocator);
        }

        butternut_assert_eq_simple!(equality_literals.len(), values.len());

        let mirrored: Vec<(IntegerValue, Literal)> = equality_literals
            .iter()
            .rev()
            .map(|&(value, literal)| (-value, literal))
            .collect();

        self.full_encodings[var] = Some(equality_literals);
        self.full_encodings[var.negation()] = Some(mirrored);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Setup {
        encoder: IntegerEncoder,
        trail: Trail,
        integer_trail: IntegerTrail,
        binary: BinaryImplicationGraph,
        watchers: LiteralWatchers,
        watch_list_propositional: WatchListPropositional,
        allocator: ClauseAllocator,
    }

    impl Setup {
        fn new() -> Setup {
            let mut setup = Setup {
                encoder: IntegerEncoder::default(),
                trail: Trail::default(),
                integer_trail: IntegerTrail::default(),
                binary: BinaryImplicationGraph::default(),
                watchers: LiteralWatchers::default(),
                watch_list_propositional: WatchListPropositional::default(),
                allocator: ClauseAllocator::default(),
            };
            // the root true literal
            let variable = setup.trail.grow();
            setup.binary.grow();
            setup.watchers.grow();
            setup.watch_list_propositional.grow();
            setup.encoder.grow_boolean_variable();
            let true_literal = Literal::new(variable, true);
            setup.trail.true_literal = true_literal;
            setup.trail.false_literal = !true_literal;
            setup.trail.enqueue_with_unit_reason(true_literal);
            setup
        }

        fn new_variable(&mut self, lb: i64, ub: i64) -> IntegerVariable {
            self.encoder.grow_integer_variable();
            self.integer_trail
                .grow(IntegerValue(lb), IntegerValue(ub))
        }

        fn associated(&mut self, var: IntegerVariable, bound: i64) -> Literal {
            self.encoder.get_or_create_associated_literal(
                IntegerLiteral::greater_or_equal(var, IntegerValue(bound)),
                &mut self.trail,
                &self.integer_trail,
                &mut self.binary,
                &mut self.watchers,
                &mut self.watch_list_propositional,
            )
        }
    }

    #[test]
    fn out_of_domain_bounds_normalise_to_the_root_literals() {
        let mut s = Setup::new();
        let x = s.new_variable(0, 10);

        assert_eq!(s.associated(x, -2), s.trail.true_literal);
        assert_eq!(s.associated(x, 0), s.trail.true_literal);
        assert_eq!(s.associated(x, 11), s.trail.false_literal);
    }

    #[test]
    fn associated_literals_are_mirrored_onto_the_negation() {
        let mut s = Setup::new();
        let x = s.new_variable(0, 10);

        let ge5 = s.associated(x, 5);
        // [x >= 5] negated is [-x >= -4], i.e. x <= 4
        let mirrored = s
            .encoder
            .search_for_literal_at_or_before(IntegerLiteral::greater_or_equal(
                x.negation(),
                IntegerValue(-4),
            ))
            .unwrap();
        assert_eq!(mirrored, (IntegerValue(-4), !ge5));
    }

    #[test]
    fn order_implications_connect_neighbouring_bounds() {
        let mut s = Setup::new();
        let x = s.new_variable(0, 10);

        let ge3 = s.associated(x, 3);
        let ge7 = s.associated(x, 7);
        // created out of order on purpose
        let ge5 = s.associated(x, 5);

        s.trail.increase_decision_level();
        s.trail.enqueue_search_decision(ge5);
        assert!(s.binary.propagate(&mut s.trail));

        // [x >= 5] -> [x >= 3], but not [x >= 7]
        assert!(s.trail.is_literal_assigned_true(ge3));
        assert!(s.trail.is_literal_unassigned(ge7));
    }

    #[test]
    fn search_returns_the_strongest_literal_at_or_before() {
        let mut s = Setup::new();
        let x = s.new_variable(0, 10);

        let ge3 = s.associated(x, 3);
        let _ge7 = s.associated(x, 7);

        let result = s
            .encoder
            .search_for_literal_at_or_before(IntegerLiteral::greater_or_equal(
                x,
                IntegerValue(6),
            ));
        assert_eq!(result, Some((IntegerValue(3), ge3)));

        let result = s
            .encoder
            .search_for_literal_at_or_before(IntegerLiteral::greater_or_equal(
                x,
                IntegerValue(2),
            ));
        assert_eq!(result, None);
    }

    #[test]
    fn two_value_encoding_reuses_a_single_boolean() {
        let mut s = Setup::new();
        let x = s.new_variable(0, 5);
        let Setup {
            encoder,
            trail,
            integer_trail,
            binary,
            watchers,
            watch_list_propositional,
            allocator,
        } = &mut s;

        encoder.fully_encode_variable(
            x,
            vec![IntegerValue(0), IntegerValue(5)],
            trail,
            integer_trail,
            binary,
            watchers,
            watch_list_propositional,
            allocator,
        );

        let eq0 = encoder.get_equality_literal(x, IntegerValue(0)).unwrap();
        let eq5 = encoder.get_equality_literal(x, IntegerValue(5)).unwrap();
        assert_eq!(eq0, !eq5);
    }

    #[test]
    fn enqueue_skips_over_falsified_value_points() {
        let mut s = Setup::new();
        let x = s.new_variable(0, 10);
        {
            let Setup {
                encoder,
                trail,
                integer_trail,
                binary,
                watchers,
                watch_list_propositional,
                allocator,
            } = &mut s;

            encoder.fully_encode_variable(
                x,
                vec![IntegerValue(0), IntegerValue(4), IntegerValue(10)],
                trail,
                integer_trail,
                binary,
                watchers,
                watch_list_propositional,
                allocator,
            );
        }

        s.trail.increase_decision_level();
        s.integer_trail.increase_decision_level();

        // x >= 5 crosses the value point 4; the bound strengthens to the next value 10
        let result = s.integer_trail.enqueue(
            IntegerLiteral::greater_or_equal(x, IntegerValue(5)),
            &[],
            &[],
            &mut s.trail,
            &s.encoder,
        );
        assert!(result.is_ok());
        assert_eq!(s.integer_trail.lower_bound(x), IntegerValue(10));

        // the skipped value literals are falsified
        let eq0 = s.encoder.get_equality_literal(x, IntegerValue(0)).unwrap();
        let eq4 = s.encoder.get_equality_literal(x, IntegerValue(4)).unwrap();
        assert!(s.trail.is_literal_assigned_false(eq0));
        assert!(s.trail.is_literal_assigned_false(eq4));
    }
}
