//! Small helpers shared between modules.
use itertools::Itertools;

/// Check that the elements of a slice are sorted in ascending order with no duplicates.
pub fn is_sorted_and_unique<T: PartialOrd>(values: &[T]) -> bool {
    values.iter().tuple_windows().all(|(a, b)| a < b)
}
