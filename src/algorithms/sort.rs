//! Stable comparison sorts returning a new, ordered `Vec`.
//!
//! Both sorts leave the input untouched and agree on every input: elements
//! that compare equal keep their original relative order.

use std::cmp::Ordering;

/// Merge sort with a caller-supplied comparator. O(n log n) time, O(n) space.
pub fn merge_sort_by<T, F>(data: &[T], compare: F) -> Vec<T>
where
    T: Clone,
    F: Fn(&T, &T) -> Ordering,
{
    merge_sort_inner(data, &compare)
}

/// Merge sort ordering elements by ascending `key(element)`.
pub fn merge_sort_by_key<T, K, F>(data: &[T], key: F) -> Vec<T>
where
    T: Clone,
    K: Ord,
    F: Fn(&T) -> K,
{
    merge_sort_by(data, |a, b| key(a).cmp(&key(b)))
}

fn merge_sort_inner<T, F>(data: &[T], compare: &F) -> Vec<T>
where
    T: Clone,
    F: Fn(&T, &T) -> Ordering,
{
    if data.len() <= 1 {
        return data.to_vec();
    }

    let mid = data.len() / 2;
    let left = merge_sort_inner(&data[..mid], compare);
    let right = merge_sort_inner(&data[mid..], compare);

    merge(left, right, compare)
}

fn merge<T, F>(left: Vec<T>, right: Vec<T>, compare: &F) -> Vec<T>
where
    F: Fn(&T, &T) -> Ordering,
{
    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();

    loop {
        // Ties go to the left half so equal elements keep their input order.
        let take_right = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => compare(l, r) == Ordering::Greater,
            _ => break,
        };
        let next = if take_right { right.next() } else { left.next() };
        merged.extend(next);
    }

    merged.extend(left);
    merged.extend(right);
    merged
}

/// Insertion sort into a fresh output vector. O(n²); meant for small groups.
pub fn insertion_sort_by<T, F>(data: &[T], compare: F) -> Vec<T>
where
    T: Clone,
    F: Fn(&T, &T) -> Ordering,
{
    let mut placed: Vec<T> = Vec::with_capacity(data.len());

    for item in data {
        let mut pos = placed.len();
        while pos > 0 && compare(&placed[pos - 1], item) == Ordering::Greater {
            pos -= 1;
        }
        placed.insert(pos, item.clone());
    }

    placed
}

/// Insertion sort ordering elements by ascending `key(element)`.
pub fn insertion_sort_by_key<T, K, F>(data: &[T], key: F) -> Vec<T>
where
    T: Clone,
    K: Ord,
    F: Fn(&T) -> K,
{
    insertion_sort_by(data, |a, b| key(a).cmp(&key(b)))
}

/// Returns `true` when every adjacent pair satisfies `compare(a, b) != Greater`.
pub fn is_sorted_by<T, F>(data: &[T], compare: F) -> bool
where
    F: Fn(&T, &T) -> Ordering,
{
    data.windows(2)
        .all(|w| compare(&w[0], &w[1]) != Ordering::Greater)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_merge_sort_empty_and_single() {
        let empty: Vec<u32> = vec![];
        assert!(merge_sort_by_key(&empty, |x| *x).is_empty());
        assert_eq!(merge_sort_by_key(&[7], |x| *x), vec![7]);
    }

    #[test]
    fn test_merge_sort_orders_ascending() {
        let data = vec![5, 3, 9, 1, 3, 0];
        assert_eq!(merge_sort_by_key(&data, |x| *x), vec![0, 1, 3, 3, 5, 9]);
    }

    #[test]
    fn test_merge_sort_does_not_mutate_input() {
        let data = vec![3, 1, 2];
        let _ = merge_sort_by_key(&data, |x| *x);
        assert_eq!(data, vec![3, 1, 2]);
    }

    #[test]
    fn test_descending_comparator_keeps_ties_in_order() {
        let data = vec![("a", 2), ("b", 5), ("c", 2), ("d", 5)];
        let sorted = merge_sort_by(&data, |x, y| y.1.cmp(&x.1));
        let names: Vec<_> = sorted.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn test_insertion_sort_small_input() {
        let data = vec!["pear", "fig", "apple", "kiwi"];
        let sorted = insertion_sort_by_key(&data, |s| s.len());
        assert_eq!(sorted, vec!["fig", "pear", "kiwi", "apple"]);
    }

    #[test]
    fn test_is_sorted_by() {
        assert!(is_sorted_by(&[1, 2, 2, 3], |a, b| a.cmp(b)));
        assert!(!is_sorted_by(&[2, 1], |a, b| a.cmp(b)));
        assert!(is_sorted_by::<u8, _>(&[], |a, b| a.cmp(b)));
    }

    proptest! {
        #[test]
        fn prop_merge_sort_is_ordered_permutation(data in prop::collection::vec(0u8..16, 0..200)) {
            let sorted = merge_sort_by_key(&data, |x| *x);
            prop_assert!(is_sorted_by(&sorted, |a, b| a.cmp(b)));

            let mut expected = data.clone();
            expected.sort();
            prop_assert_eq!(sorted, expected);
        }

        #[test]
        fn prop_merge_sort_is_stable(keys in prop::collection::vec(0u8..8, 0..200)) {
            let tagged: Vec<(u8, usize)> = keys.iter().copied().zip(0..).collect();
            let sorted = merge_sort_by_key(&tagged, |(k, _)| *k);
            for w in sorted.windows(2) {
                if w[0].0 == w[1].0 {
                    prop_assert!(w[0].1 < w[1].1);
                }
            }
        }

        #[test]
        fn prop_insertion_sort_matches_merge_sort(keys in prop::collection::vec(0u8..8, 0..80)) {
            let tagged: Vec<(u8, usize)> = keys.iter().copied().zip(0..).collect();
            let merged = merge_sort_by_key(&tagged, |(k, _)| *k);
            let inserted = insertion_sort_by_key(&tagged, |(k, _)| *k);
            prop_assert_eq!(merged, inserted);
        }
    }
}
