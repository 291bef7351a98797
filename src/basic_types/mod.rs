mod clause_reference;
mod constraint_operation_error;
mod explanation;
mod keyed_vec;
mod moving_averages;
pub mod statistic_logging;

pub(crate) use clause_reference::ClauseReference;
pub use constraint_operation_error::ConstraintOperationError;
pub use explanation::EmptyDomain;
pub use explanation::Explanation;
pub use explanation::Inconsistency;
pub use explanation::PropagationStatusCP;
pub(crate) use keyed_vec::KeyedVec;
pub(crate) use keyed_vec::StorageKey;
pub(crate) use moving_averages::CumulativeMovingAverage;

/// Hashing the same data structures with the same method should be deterministic across runs,
/// which is why the Fowler-Noll-Vo hashers are used throughout the solver.
pub(crate) type HashMap<K, V> = fnv::FnvHashMap<K, V>;
#[allow(unused, reason = "part of the deterministic hashing convention")]
pub(crate) type HashSet<K> = fnv::FnvHashSet<K>;
