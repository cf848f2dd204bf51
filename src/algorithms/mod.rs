//! Hand-written ordering and lookup primitives.
//!
//! Ranking and reference-table lookups go through these instead of the
//! standard library so ordering and tie-breaking stay under our control.

pub mod search;
pub mod sort;

pub use search::{binary_search_by, binary_search_by_key, linear_search_by, linear_search_by_key};
pub use sort::{
    insertion_sort_by, insertion_sort_by_key, is_sorted_by, merge_sort_by, merge_sort_by_key,
};
