//! ThreadSafeOrderBook - 多读者 + 串行写者的订单簿
//!
//! 每个交易对的每一侧放在一个 `ConcurrentReadWriteCell` 里：读者不加锁，
//! 写者把同一组变更先后应用到两份副本上。交易对映射本身用 `DashMap`，
//! 初始化的"检查并插入"在分片锁内完成，所以并发初始化同一交易对只有一个成功，
//! 失败方已构建好的副本直接丢弃。
//!
//! 同一侧的两份副本从同一初始状态出发、按同一顺序应用同一组变更，因此始终一致。

use super::containers::TreeLevels;
use super::traits::{apply_changes, encode_levels, LevelContainer, OrderBook};
use crate::domain::error::BookError;
use crate::domain::events::{PriceLevel, Side, SnapshotEvent, UpdateEvent};
use crate::domain::scale::TickScale;
use crate::shared::concurrency::ConcurrentReadWriteCell;
use crate::shared::metrics::METRICS;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, trace, warn};

struct SymbolCells<C> {
    bids: ConcurrentReadWriteCell<C>,
    asks: ConcurrentReadWriteCell<C>,
}

impl<C> SymbolCells<C> {
    fn side(&self, side: Side) -> &ConcurrentReadWriteCell<C> {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }
}

pub struct ThreadSafeOrderBook<C = TreeLevels> {
    books: DashMap<String, Arc<SymbolCells<C>>>,
    scale: TickScale,
}

impl<C: LevelContainer + Send + Sync> ThreadSafeOrderBook<C> {
    pub fn new() -> Self {
        Self::with_scale(TickScale::default())
    }

    pub fn with_scale(scale: TickScale) -> Self {
        Self {
            books: DashMap::new(),
            scale,
        }
    }

    pub fn scale(&self) -> TickScale {
        self.scale
    }

    pub fn is_initialized(&self, symbol: &str) -> bool {
        self.books.contains_key(symbol)
    }

    /// 取出交易对的 cell，不持有分片锁
    fn cells(&self, symbol: &str) -> Option<Arc<SymbolCells<C>>> {
        self.books.get(symbol).map(|entry| Arc::clone(entry.value()))
    }

    pub fn initialize(&self, symbol: &str, snapshot: &SnapshotEvent) -> Result<(), BookError> {
        let already_initialized = || {
            warn!(symbol, "rejected snapshot for an already initialized symbol");
            BookError::AlreadyInitialized {
                symbol: symbol.to_owned(),
            }
            .recorded()
        };

        if self.books.contains_key(symbol) {
            return Err(already_initialized());
        }

        let scale = self.scale;
        let bids = encode_levels::<C>(scale, &snapshot.bids).map_err(BookError::recorded)?;
        let asks = encode_levels::<C>(scale, &snapshot.asks).map_err(BookError::recorded)?;

        // 尚未发布，没有读者，两份副本各应用一次
        let cells = SymbolCells {
            bids: ConcurrentReadWriteCell::new(|| C::for_side(Side::Bid, scale)),
            asks: ConcurrentReadWriteCell::new(|| C::for_side(Side::Ask, scale)),
        };
        cells
            .bids
            .write(|levels| apply_changes(levels, &bids))
            .map_err(BookError::recorded)?;
        cells
            .asks
            .write(|levels| apply_changes(levels, &asks))
            .map_err(BookError::recorded)?;

        match self.books.entry(symbol.to_owned()) {
            Entry::Occupied(_) => Err(already_initialized()),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(cells));
                debug!(symbol, bids = bids.len(), asks = asks.len(), "order book initialized");
                METRICS.snapshots_total.inc();
                Ok(())
            }
        }
    }

    pub fn update(&self, event: &UpdateEvent) -> Result<bool, BookError> {
        let Some(cells) = self.cells(&event.symbol) else {
            warn!(symbol = %event.symbol, "ignored update for an uninitialized symbol");
            METRICS.updates_total.with_label_values(&["ignored"]).inc();
            return Ok(false);
        };

        let bids = encode_levels::<C>(self.scale, &event.bids).map_err(BookError::recorded)?;
        let asks = encode_levels::<C>(self.scale, &event.asks).map_err(BookError::recorded)?;

        cells
            .bids
            .write(|levels| apply_changes(levels, &bids))
            .map_err(BookError::recorded)?;
        cells
            .asks
            .write(|levels| apply_changes(levels, &asks))
            .map_err(BookError::recorded)?;

        trace!(
            symbol = %event.symbol,
            bid_changes = bids.len(),
            ask_changes = asks.len(),
            "update applied"
        );
        METRICS.updates_total.with_label_values(&["applied"]).inc();
        Ok(true)
    }

    /// 正在进行的读取持有 `Arc`，读完后副本才释放
    pub fn clear(&self, symbol: &str) {
        if self.books.remove(symbol).is_some() {
            debug!(symbol, "order book cleared");
            METRICS.clears_total.inc();
        }
    }

    pub fn ordered_bids(&self, symbol: &str) -> Vec<PriceLevel> {
        self.ordered(symbol, Side::Bid)
    }

    pub fn ordered_asks(&self, symbol: &str) -> Vec<PriceLevel> {
        self.ordered(symbol, Side::Ask)
    }

    pub fn best_bid_price(&self, symbol: &str) -> Result<Option<Decimal>, BookError> {
        self.best_price(symbol, Side::Bid)
    }

    pub fn best_ask_price(&self, symbol: &str) -> Result<Option<Decimal>, BookError> {
        self.best_price(symbol, Side::Ask)
    }

    fn ordered(&self, symbol: &str, side: Side) -> Vec<PriceLevel> {
        self.cells(symbol)
            .map(|cells| cells.side(side).read(|levels| levels.ordered_levels()))
            .unwrap_or_default()
    }

    fn best_price(&self, symbol: &str, side: Side) -> Result<Option<Decimal>, BookError> {
        let cells = self.cells(symbol).ok_or_else(|| {
            BookError::NotInitialized {
                symbol: symbol.to_owned(),
            }
            .recorded()
        })?;
        Ok(cells.side(side).read(|levels| levels.best_price()))
    }
}

impl<C: LevelContainer + Send + Sync> Default for ThreadSafeOrderBook<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: LevelContainer + Send + Sync> OrderBook for ThreadSafeOrderBook<C> {
    fn initialize(&mut self, symbol: &str, snapshot: &SnapshotEvent) -> Result<(), BookError> {
        ThreadSafeOrderBook::initialize(&*self, symbol, snapshot)
    }

    fn update(&mut self, event: &UpdateEvent) -> Result<bool, BookError> {
        ThreadSafeOrderBook::update(&*self, event)
    }

    fn clear(&mut self, symbol: &str) {
        ThreadSafeOrderBook::clear(&*self, symbol)
    }

    fn ordered_bids(&self, symbol: &str) -> Vec<PriceLevel> {
        ThreadSafeOrderBook::ordered_bids(self, symbol)
    }

    fn ordered_asks(&self, symbol: &str) -> Vec<PriceLevel> {
        ThreadSafeOrderBook::ordered_asks(self, symbol)
    }

    fn best_bid_price(&self, symbol: &str) -> Result<Option<Decimal>, BookError> {
        ThreadSafeOrderBook::best_bid_price(self, symbol)
    }

    fn best_ask_price(&self, symbol: &str) -> Result<Option<Decimal>, BookError> {
        ThreadSafeOrderBook::best_ask_price(self, symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::orderbook::containers::HeapLevels;
    use rust_decimal_macros::dec;
    use std::thread;

    fn snapshot() -> SnapshotEvent {
        SnapshotEvent::new(
            vec![PriceLevel::new(dec!(0.0030), dec!(99))],
            vec![PriceLevel::new(dec!(0.0032), dec!(14.9))],
        )
    }

    #[test]
    fn test_shared_reference_api() {
        let book: ThreadSafeOrderBook = ThreadSafeOrderBook::new();
        book.initialize("X", &snapshot()).unwrap();

        let event = UpdateEvent::new(
            "X",
            vec![PriceLevel::new(dec!(0.0031), dec!(1))],
            vec![PriceLevel::new(dec!(0.0032), dec!(0))],
        );
        assert_eq!(book.update(&event), Ok(true));
        assert_eq!(book.best_bid_price("X"), Ok(Some(dec!(0.0031))));
        assert_eq!(book.best_ask_price("X"), Ok(None));
        assert_eq!(book.ordered_bids("X").len(), 2);

        book.clear("X");
        assert!(!book.is_initialized("X"));
        assert!(book.best_bid_price("X").is_err());
        assert_eq!(book.update(&event), Ok(false));
    }

    #[test]
    fn test_concurrent_initialize_has_one_winner() {
        let book: Arc<ThreadSafeOrderBook<HeapLevels>> = Arc::new(ThreadSafeOrderBook::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let book = Arc::clone(&book);
                thread::spawn(move || book.initialize("BNBBTC", &snapshot()).is_ok())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&won| won)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(book.best_bid_price("BNBBTC"), Ok(Some(dec!(0.0030))));
    }

    #[test]
    fn test_failed_update_leaves_book_unchanged() {
        let book: ThreadSafeOrderBook = ThreadSafeOrderBook::new();
        book.initialize("X", &snapshot()).unwrap();
        let event = UpdateEvent::new(
            "X",
            vec![PriceLevel::new(dec!(0.0030), dec!(0))],
            vec![PriceLevel::new(dec!(300000), dec!(1))],
        );
        assert!(book.update(&event).is_err());
        assert_eq!(book.best_bid_price("X"), Ok(Some(dec!(0.0030))));
    }

    #[test]
    fn test_trait_object_dispatch() {
        let mut book: Box<dyn OrderBook> = Box::new(ThreadSafeOrderBook::<TreeLevels>::new());
        book.initialize("X", &snapshot()).unwrap();
        assert_eq!(book.spread("X"), Ok(Some(dec!(0.0002))));
    }
}
