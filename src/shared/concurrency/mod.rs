//! Concurrency primitives
//!
//! - ConcurrentReadWriteCell: left-right double buffer, wait-free readers,
//!   one serialized writer

pub mod left_right;

pub use left_right::ConcurrentReadWriteCell;
