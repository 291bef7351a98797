use super::SatClause;
use crate::basic_types::ClauseReference;
use crate::butternut_assert_advanced;
use crate::butternut_assert_moderate;
use crate::butternut_assert_simple;
use crate::engine::variables::Literal;

/// Arena-style owner of all clauses. Every clause is referred to by a stable
/// [`ClauseReference`]; references of deleted clauses are recycled.
#[derive(Default, Debug)]
pub(crate) struct ClauseAllocator {
    allocated_clauses: Vec<SatClause>,
    deleted_clause_references: Vec<ClauseReference>,
}

impl ClauseAllocator {
    pub(crate) fn create_clause(
        &mut self,
        literals: Vec<Literal>,
        is_learned: bool,
    ) -> ClauseReference {
        butternut_assert_simple!(literals.len() >= 2);

        if self.deleted_clause_references.is_empty() {
            // we keep clause reference id zero as the null value, never to be allocated at that
            // position
            let clause_reference = ClauseReference::create_allocated_clause_reference(
                self.allocated_clauses.len() as u32 + 1,
            );

            self.allocated_clauses
                .push(SatClause::new(literals, is_learned));

            clause_reference
        } else {
            // reuse a clause reference from the deleted clause pool
            let clause_reference = self.deleted_clause_references.pop().unwrap();
            self.allocated_clauses[clause_reference.get_code() as usize - 1] =
                SatClause::new(literals, is_learned);

            clause_reference
        }
    }

    pub(crate) fn get_mutable_clause(
        &mut self,
        clause_reference: ClauseReference,
    ) -> &mut SatClause {
        // -1 since clause ids go from one, and not zero
        &mut self.allocated_clauses[clause_reference.get_code() as usize - 1]
    }

    pub(crate) fn get_clause(&self, clause_reference: ClauseReference) -> &SatClause {
        &self.allocated_clauses[clause_reference.get_code() as usize - 1]
    }

    pub(crate) fn delete_clause(&mut self, clause_reference: ClauseReference) {
        butternut_assert_moderate!(
            clause_reference.get_code() - 1 < self.allocated_clauses.len() as u32
        );
        butternut_assert_moderate!(
            !self.get_clause(clause_reference).is_deleted(),
            "cannot delete an already deleted clause"
        );
        butternut_assert_advanced!(
            !self.deleted_clause_references.contains(&clause_reference),
            "the id of the deleted clause is already in the recycling pool"
        );

        self.get_mutable_clause(clause_reference).mark_deleted();
        self.deleted_clause_references.push(clause_reference);
    }
}

impl std::ops::Index<ClauseReference> for ClauseAllocator {
    type Output = SatClause;
    fn index(&self, clause_reference: ClauseReference) -> &SatClause {
        self.get_clause(clause_reference)
    }
}

impl std::ops::IndexMut<ClauseReference> for ClauseAllocator {
    fn index_mut(&mut self, clause_reference: ClauseReference) -> &mut SatClause {
        self.get_mutable_clause(clause_reference)
    }
}

impl std::fmt::Display for ClauseAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let clauses_string = &self
            .allocated_clauses
            .iter()
            .fold(String::new(), |acc, clause| format!("{acc}{clause}\n"));

        let num_clauses = self.allocated_clauses.len();
        write!(f, "Num clauses: {num_clauses}\n{clauses_string}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::variables::BooleanVariable;

    fn literals(codes: &[u32]) -> Vec<Literal> {
        codes
            .iter()
            .map(|&index| Literal::new(BooleanVariable::new(index), true))
            .collect()
    }

    #[test]
    fn deleted_references_are_recycled() {
        let mut allocator = ClauseAllocator::default();

        let first = allocator.create_clause(literals(&[0, 1, 2]), false);
        let second = allocator.create_clause(literals(&[3, 4]), true);

        allocator.delete_clause(first);
        assert!(allocator[first].is_deleted());

        let recycled = allocator.create_clause(literals(&[5, 6]), false);
        assert_eq!(recycled, first);
        assert!(!allocator[recycled].is_deleted());
        assert_eq!(allocator[second].get_literal_slice(), &literals(&[3, 4])[..]);
    }
}
