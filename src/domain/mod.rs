//! Domain Layer - Core Business Logic
//!
//! Symbol-keyed order books maintained from snapshot + diff events.
//! No I/O here; events come in already parsed.
//!
//! ## Modules
//! - `events`: snapshot / update DTOs and price levels
//! - `scale`: decimal <-> integer tick conversion
//! - `error`: `BookError`
//! - `orderbook`: the `OrderBook` trait and its implementations

pub mod error;
pub mod events;
pub mod orderbook;
pub mod scale;

// Re-export key types
pub use error::BookError;
pub use events::{PriceLevel, Side, SnapshotEvent, UpdateEvent};
pub use orderbook::{
    HeapOrderBook, OrderBook, PackedOrderBook, ReferenceOrderBook, ThreadSafeOrderBook,
};
pub use scale::{TickScale, DEFAULT_SCALE_FACTOR};
