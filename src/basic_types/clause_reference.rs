use std::num::NonZero;

use super::StorageKey;

/// A stable handle to a clause stored in the [`ClauseAllocator`].
///
/// Code zero is reserved as the null value, never to be allocated.
///
/// [`ClauseAllocator`]: crate::engine::sat::ClauseAllocator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct ClauseReference {
    code: NonZero<u32>,
}

impl ClauseReference {
    pub(crate) fn create_allocated_clause_reference(code: u32) -> Self {
        ClauseReference {
            code: NonZero::new(code).expect("clause reference codes start at one"),
        }
    }

    pub(crate) fn get_code(self) -> u32 {
        self.code.get()
    }
}

impl StorageKey for ClauseReference {
    fn index(&self) -> usize {
        self.code.index()
    }

    fn create_from_index(index: usize) -> Self {
        ClauseReference {
            code: NonZero::create_from_index(index),
        }
    }
}

impl std::fmt::Display for ClauseReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "clause#{}", self.code)
    }
}
