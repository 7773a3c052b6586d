//! Domain Layer - OrderBook Module
//!
//! ## Implementations
//! - `PackedOrderBook`: packed (price tick, quantity tick) keys in a red-black tree,
//!   O(log n) update, O(1) best price
//! - `HeapOrderBook`: the same keys in a duplicate-free binary heap, for comparison
//! - `ReferenceOrderBook`: plain `BTreeMap<Decimal, Decimal>`, the correctness baseline
//! - `ThreadSafeOrderBook`: lock-free readers over left-right cells, one writer at a time
//!
//! ## Trait Abstraction
//! The `OrderBook` trait gives all of them one interface; `LevelContainer` is the
//! per-side storage the registry and the thread-safe book are generic over.

pub mod containers;
pub mod registry;
pub mod thread_safe;
pub mod traits;

pub use containers::{HeapLevels, MapLevels, PriceTickOrder, TreeLevels, DEFAULT_HEAP_CAPACITY};
pub use registry::{HeapOrderBook, OrderBookRegistry, PackedOrderBook, ReferenceOrderBook, SymbolBook};
pub use thread_safe::ThreadSafeOrderBook;
pub use traits::{LevelChange, LevelContainer, OrderBook};
