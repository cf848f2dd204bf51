//! Linear and binary search over slices.
//!
//! Binary search requires input sorted by the same key it searches on. The
//! precondition is asserted in debug builds only.

use std::cmp::Ordering;

/// Index of the first element matching `predicate`, scanning front to back.
pub fn linear_search_by<T, F>(data: &[T], predicate: F) -> Option<usize>
where
    F: Fn(&T) -> bool,
{
    for (index, item) in data.iter().enumerate() {
        if predicate(item) {
            return Some(index);
        }
    }
    None
}

/// Index of the first element whose key equals `target`.
pub fn linear_search_by_key<T, K, F>(data: &[T], target: &K, key: F) -> Option<usize>
where
    K: PartialEq,
    F: Fn(&T) -> K,
{
    linear_search_by(data, |item| key(item) == *target)
}

/// Binary search driven by `compare`, which reports how an element compares
/// to the target (`Less` means the element sorts before it).
///
/// Returns the index of some matching element when duplicates exist.
pub fn binary_search_by<T, F>(sorted: &[T], compare: F) -> Option<usize>
where
    F: Fn(&T) -> Ordering,
{
    debug_assert!(
        sorted.windows(2).all(|w| compare(&w[0]) <= compare(&w[1])),
        "binary_search_by called on input not sorted by the compared key"
    );

    let mut low = 0;
    let mut high = sorted.len();

    while low < high {
        let mid = low + (high - low) / 2;
        match compare(&sorted[mid]) {
            Ordering::Equal => return Some(mid),
            Ordering::Less => low = mid + 1,
            Ordering::Greater => high = mid,
        }
    }
    None
}

/// Binary search for an element whose key equals `target`.
pub fn binary_search_by_key<T, K, F>(sorted: &[T], target: &K, key: F) -> Option<usize>
where
    K: Ord,
    F: Fn(&T) -> K,
{
    binary_search_by(sorted, |item| key(item).cmp(target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::sort::merge_sort_by_key;
    use proptest::prelude::*;

    #[test]
    fn test_linear_search_returns_first_match() {
        let data = vec![4, 7, 7, 1];
        assert_eq!(linear_search_by_key(&data, &7, |x| *x), Some(1));
        assert_eq!(linear_search_by_key(&data, &9, |x| *x), None);
    }

    #[test]
    fn test_linear_search_empty() {
        let data: Vec<i32> = vec![];
        assert_eq!(linear_search_by(&data, |_| true), None);
    }

    #[test]
    fn test_binary_search_hits_and_misses() {
        let data = vec![1, 3, 5, 7, 9, 11];
        assert_eq!(binary_search_by_key(&data, &1, |x| *x), Some(0));
        assert_eq!(binary_search_by_key(&data, &11, |x| *x), Some(5));
        assert_eq!(binary_search_by_key(&data, &7, |x| *x), Some(3));
        assert_eq!(binary_search_by_key(&data, &4, |x| *x), None);
        assert_eq!(binary_search_by_key(&data, &0, |x| *x), None);
        assert_eq!(binary_search_by_key(&data, &12, |x| *x), None);
    }

    #[test]
    fn test_binary_search_by_string_key() {
        let ids = vec!["s1".to_string(), "s2".to_string(), "s9".to_string()];
        assert_eq!(binary_search_by(&ids, |id| id.as_str().cmp("s2")), Some(1));
        assert_eq!(binary_search_by(&ids, |id| id.as_str().cmp("s5")), None);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "not sorted")]
    fn test_binary_search_rejects_unsorted_in_debug() {
        let data = vec![5, 1, 3];
        let _ = binary_search_by_key(&data, &3, |x| *x);
    }

    proptest! {
        #[test]
        fn prop_binary_search_agrees_with_linear(
            data in prop::collection::vec(0u16..64, 0..120),
            target in 0u16..70,
        ) {
            let sorted = merge_sort_by_key(&data, |x| *x);
            let binary = binary_search_by_key(&sorted, &target, |x| *x);
            let linear = linear_search_by_key(&sorted, &target, |x| *x);

            prop_assert_eq!(binary.is_some(), linear.is_some());
            if let Some(i) = binary {
                prop_assert_eq!(sorted[i], target);
            }
        }
    }
}
