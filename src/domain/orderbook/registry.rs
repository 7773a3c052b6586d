//! 单线程订单簿注册表：交易对 -> (买盘, 卖盘)
//!
//! 状态机：Absent --initialize--> Present --clear--> Absent。
//! update 只对 Present 生效，对 Absent 静默忽略。

use super::containers::{HeapLevels, MapLevels, TreeLevels};
use super::traits::{apply_changes, encode_levels, LevelContainer, OrderBook};
use crate::domain::error::BookError;
use crate::domain::events::{PriceLevel, Side, SnapshotEvent, UpdateEvent};
use crate::domain::scale::TickScale;
use crate::shared::metrics::METRICS;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, trace, warn};

/// 生产实现：红黑树 + 打包键
pub type PackedOrderBook = OrderBookRegistry<TreeLevels>;

/// 基准对比：去重二叉堆 + 打包键
pub type HeapOrderBook = OrderBookRegistry<HeapLevels>;

/// 正确性基准：BTreeMap<Decimal, Decimal>
pub type ReferenceOrderBook = OrderBookRegistry<MapLevels>;

/// 一个交易对的两侧
pub struct SymbolBook<C> {
    bids: C,
    asks: C,
}

impl<C: LevelContainer> SymbolBook<C> {
    fn new(scale: TickScale) -> Self {
        Self {
            bids: C::for_side(Side::Bid, scale),
            asks: C::for_side(Side::Ask, scale),
        }
    }

    pub fn bids(&self) -> &C {
        &self.bids
    }

    pub fn asks(&self) -> &C {
        &self.asks
    }

    pub fn side(&self, side: Side) -> &C {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }
}

pub struct OrderBookRegistry<C> {
    books: HashMap<String, SymbolBook<C>>,
    scale: TickScale,
}

impl<C: LevelContainer> OrderBookRegistry<C> {
    pub fn new() -> Self {
        Self::with_scale(TickScale::default())
    }

    pub fn with_scale(scale: TickScale) -> Self {
        Self {
            books: HashMap::new(),
            scale,
        }
    }

    pub fn scale(&self) -> TickScale {
        self.scale
    }

    pub fn is_initialized(&self, symbol: &str) -> bool {
        self.books.contains_key(symbol)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.books.keys().map(String::as_str)
    }

    pub fn book(&self, symbol: &str) -> Option<&SymbolBook<C>> {
        self.books.get(symbol)
    }

    fn best_price(&self, symbol: &str, side: Side) -> Result<Option<Decimal>, BookError> {
        match self.books.get(symbol) {
            Some(book) => Ok(book.side(side).best_price()),
            None => Err(BookError::NotInitialized {
                symbol: symbol.to_owned(),
            }
            .recorded()),
        }
    }

    fn ordered(&self, symbol: &str, side: Side) -> Vec<PriceLevel> {
        self.books
            .get(symbol)
            .map(|book| book.side(side).ordered_levels())
            .unwrap_or_default()
    }
}

impl<C: LevelContainer> Default for OrderBookRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: LevelContainer> OrderBook for OrderBookRegistry<C> {
    fn initialize(&mut self, symbol: &str, snapshot: &SnapshotEvent) -> Result<(), BookError> {
        if self.books.contains_key(symbol) {
            warn!(symbol, "rejected snapshot for an already initialized symbol");
            return Err(BookError::AlreadyInitialized {
                symbol: symbol.to_owned(),
            }
            .recorded());
        }

        let bids = encode_levels::<C>(self.scale, &snapshot.bids).map_err(BookError::recorded)?;
        let asks = encode_levels::<C>(self.scale, &snapshot.asks).map_err(BookError::recorded)?;

        let mut book = SymbolBook::<C>::new(self.scale);
        apply_changes(&mut book.bids, &bids).map_err(BookError::recorded)?;
        apply_changes(&mut book.asks, &asks).map_err(BookError::recorded)?;

        debug!(
            symbol,
            bids = book.bids.len(),
            asks = book.asks.len(),
            "order book initialized"
        );
        METRICS.snapshots_total.inc();
        self.books.insert(symbol.to_owned(), book);
        Ok(())
    }

    fn update(&mut self, event: &UpdateEvent) -> Result<bool, BookError> {
        let scale = self.scale;
        let Some(book) = self.books.get_mut(&event.symbol) else {
            warn!(symbol = %event.symbol, "ignored update for an uninitialized symbol");
            METRICS.updates_total.with_label_values(&["ignored"]).inc();
            return Ok(false);
        };

        // 先整体编码，保证要么全部应用要么都不应用
        let bids = encode_levels::<C>(scale, &event.bids).map_err(BookError::recorded)?;
        let asks = encode_levels::<C>(scale, &event.asks).map_err(BookError::recorded)?;

        apply_changes(&mut book.bids, &bids).map_err(BookError::recorded)?;
        apply_changes(&mut book.asks, &asks).map_err(BookError::recorded)?;

        trace!(
            symbol = %event.symbol,
            bid_changes = bids.len(),
            ask_changes = asks.len(),
            "update applied"
        );
        METRICS.updates_total.with_label_values(&["applied"]).inc();
        Ok(true)
    }

    fn clear(&mut self, symbol: &str) {
        if self.books.remove(symbol).is_some() {
            debug!(symbol, "order book cleared");
            METRICS.clears_total.inc();
        }
    }

    fn ordered_bids(&self, symbol: &str) -> Vec<PriceLevel> {
        self.ordered(symbol, Side::Bid)
    }

    fn ordered_asks(&self, symbol: &str) -> Vec<PriceLevel> {
        self.ordered(symbol, Side::Ask)
    }

    fn best_bid_price(&self, symbol: &str) -> Result<Option<Decimal>, BookError> {
        self.best_price(symbol, Side::Bid)
    }

    fn best_ask_price(&self, symbol: &str) -> Result<Option<Decimal>, BookError> {
        self.best_price(symbol, Side::Ask)
    }
}
