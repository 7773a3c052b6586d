//! Ordered collections backing the price-level containers
//!
//! - BalancedTreeSet: top-down red-black tree with upsert semantics and cached extremes
//! - DedupBinaryHeap: array heap that refuses duplicates (O(n) add/remove)
//!
//! Both take their ordering from a `KeyOrder` value instead of `Ord`, so the
//! same key type (a packed u64) can be sorted ascending for asks and
//! descending for bids while comparing only part of its bits.

use std::cmp::Ordering;

pub mod balanced_tree;
pub mod dedup_heap;

pub use balanced_tree::BalancedTreeSet;
pub use dedup_heap::{CapacityError, DedupBinaryHeap};

/// Injected comparator. Two keys comparing `Equal` are the same element.
pub trait KeyOrder<T> {
    fn compare(&self, a: &T, b: &T) -> Ordering;
}

/// Ordering by `Ord`.
#[derive(Clone, Copy, Debug, Default)]
pub struct NaturalOrder;

impl<T: Ord> KeyOrder<T> for NaturalOrder {
    #[inline]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        a.cmp(b)
    }
}

/// Reversed `Ord`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReverseOrder;

impl<T: Ord> KeyOrder<T> for ReverseOrder {
    #[inline]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        b.cmp(a)
    }
}
