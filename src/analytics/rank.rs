//! Top-K selection over aggregated groups.
//!
//! Ranking goes through the stable sorts in [`crate::algorithms`], so groups
//! with equal ordering values keep the first-seen order the aggregator
//! produced.

use std::cmp::Ordering;

use crate::algorithms::{insertion_sort_by, merge_sort_by};
use crate::analytics::aggregate::GroupStat;

/// Group counts at or below this are ranked with insertion sort.
pub const INSERTION_SORT_CUTOFF: usize = 16;

/// Groups in rank order, at most `k` long.
pub type RankedList = Vec<GroupStat>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderBy {
    CountDesc,
    SumDesc,
    /// Natural key order, for chronological listings.
    KeyAsc,
}

impl OrderBy {
    pub fn compare(&self, a: &GroupStat, b: &GroupStat) -> Ordering {
        match self {
            OrderBy::CountDesc => b.count.cmp(&a.count),
            OrderBy::SumDesc => b.sum.total_cmp(&a.sum),
            OrderBy::KeyAsc => a.key.cmp(&b.key),
        }
    }
}

/// Returns every group in rank order.
pub fn rank(groups: &[GroupStat], order: OrderBy) -> RankedList {
    if groups.len() <= INSERTION_SORT_CUTOFF {
        insertion_sort_by(groups, |a, b| order.compare(a, b))
    } else {
        merge_sort_by(groups, |a, b| order.compare(a, b))
    }
}

/// Returns the first `k` groups in rank order, or all of them when there are
/// fewer than `k`.
pub fn top_k(groups: &[GroupStat], k: usize, order: OrderBy) -> RankedList {
    let mut ranked = rank(groups, order);
    ranked.truncate(k);
    ranked
}
