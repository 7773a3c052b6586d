//! Shared utilities used across all layers
//!
//! This module contains:
//! - Bit packing of (price tick, quantity tick) pairs
//! - Ordered collections (balanced tree, dedup heap)
//! - The left-right concurrency cell
//! - Metrics

pub mod bits;
pub mod collections;
pub mod concurrency;
pub mod metrics;

// Re-export commonly used types
pub use bits::{pack, unpack_high, unpack_low, PackedKey};
pub use collections::{BalancedTreeSet, CapacityError, DedupBinaryHeap, KeyOrder};
pub use concurrency::ConcurrentReadWriteCell;
