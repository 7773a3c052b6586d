//! OrderBook Trait - Domain Layer Abstraction
//!
//! Two seams:
//! - `OrderBook`: the symbol-keyed book contract (initialize / update / clear / queries),
//!   implemented by the single-threaded registry and by the thread-safe book so the same
//!   contract tests run against every variant.
//! - `LevelContainer`: one side of one symbol's book. The container decides how a
//!   `PriceLevel` is encoded (packed u64 or raw decimals) and which collection holds it.
//!
//! ## Example
//! ```rust
//! use price_point_book::domain::orderbook::{OrderBook, PackedOrderBook};
//! use price_point_book::domain::events::{PriceLevel, SnapshotEvent};
//! use rust_decimal::Decimal;
//!
//! let mut book = PackedOrderBook::new();
//! let snapshot = SnapshotEvent::new(
//!     vec![PriceLevel::new(Decimal::new(30, 4), Decimal::from(99))],
//!     vec![],
//! );
//! book.initialize("BNBBTC", &snapshot).unwrap();
//! assert_eq!(book.best_bid_price("BNBBTC").unwrap(), Some(Decimal::new(30, 4)));
//! ```

use crate::domain::error::BookError;
use crate::domain::events::{PriceLevel, Side, SnapshotEvent, UpdateEvent};
use crate::domain::scale::TickScale;
use rust_decimal::Decimal;

/// Core OrderBook trait
pub trait OrderBook {
    /// 用快照建立交易对的订单簿
    ///
    /// # 返回
    /// * `Err(AlreadyInitialized)` 交易对已存在（需先 `clear`）
    /// * `Err(EncodingOverflow)` 价格或数量超出tick范围，此时不创建任何状态
    fn initialize(&mut self, symbol: &str, snapshot: &SnapshotEvent) -> Result<(), BookError>;

    /// 应用增量更新。数量为0删除价位，否则插入或覆盖。
    ///
    /// # 返回
    /// * `Ok(true)` 已应用
    /// * `Ok(false)` 交易对未初始化，静默忽略
    fn update(&mut self, event: &UpdateEvent) -> Result<bool, BookError>;

    /// 丢弃交易对的全部状态，交易对不存在时无操作
    fn clear(&mut self, symbol: &str);

    /// 买盘，价格降序。交易对不存在时为空
    fn ordered_bids(&self, symbol: &str) -> Vec<PriceLevel>;

    /// 卖盘，价格升序。交易对不存在时为空
    fn ordered_asks(&self, symbol: &str) -> Vec<PriceLevel>;

    /// 最高买价
    ///
    /// # 返回
    /// * `Err(NotInitialized)` 交易对不存在
    /// * `Ok(None)` 买盘为空
    fn best_bid_price(&self, symbol: &str) -> Result<Option<Decimal>, BookError>;

    /// 最低卖价，语义同 `best_bid_price`
    fn best_ask_price(&self, symbol: &str) -> Result<Option<Decimal>, BookError>;

    /// Gets the current spread (best_ask - best_bid)
    ///
    /// `None` if either side is empty.
    fn spread(&self, symbol: &str) -> Result<Option<Decimal>, BookError> {
        let bid = self.best_bid_price(symbol)?;
        let ask = self.best_ask_price(symbol)?;
        Ok(match (bid, ask) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        })
    }
}

/// 单个价位的变更，已完成编码
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelChange<K> {
    Upsert(K),
    Remove(K),
}

/// One side (bids or asks) of one symbol's book.
pub trait LevelContainer: Sized {
    type Key: Copy + std::fmt::Debug + Send + Sync;

    /// Empty container ordered best-first for `side`.
    fn for_side(side: Side, scale: TickScale) -> Self;

    /// Encodes a level without touching any container, so a whole event can be
    /// validated before the first change is applied.
    fn encode(scale: TickScale, level: &PriceLevel) -> Result<LevelChange<Self::Key>, BookError>;

    fn apply(&mut self, change: LevelChange<Self::Key>) -> Result<(), BookError>;

    /// Best price first.
    fn ordered_levels(&self) -> Vec<PriceLevel>;

    fn best_price(&self) -> Option<Decimal>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 编码一组价位，任何一个失败则整体失败
pub fn encode_levels<C: LevelContainer>(
    scale: TickScale,
    levels: &[PriceLevel],
) -> Result<Vec<LevelChange<C::Key>>, BookError> {
    levels.iter().map(|level| C::encode(scale, level)).collect()
}

/// 按顺序应用，后出现的同价位覆盖先出现的
pub fn apply_changes<C: LevelContainer>(
    container: &mut C,
    changes: &[LevelChange<C::Key>],
) -> Result<(), BookError> {
    for &change in changes {
        container.apply(change)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    // Mock implementation for testing
    struct MockOrderBook {
        best_bid: Option<Decimal>,
        best_ask: Option<Decimal>,
    }

    impl OrderBook for MockOrderBook {
        fn initialize(&mut self, _symbol: &str, _snapshot: &SnapshotEvent) -> Result<(), BookError> {
            Ok(())
        }

        fn update(&mut self, _event: &UpdateEvent) -> Result<bool, BookError> {
            Ok(false)
        }

        fn clear(&mut self, _symbol: &str) {}

        fn ordered_bids(&self, _symbol: &str) -> Vec<PriceLevel> {
            Vec::new()
        }

        fn ordered_asks(&self, _symbol: &str) -> Vec<PriceLevel> {
            Vec::new()
        }

        fn best_bid_price(&self, _symbol: &str) -> Result<Option<Decimal>, BookError> {
            Ok(self.best_bid)
        }

        fn best_ask_price(&self, symbol: &str) -> Result<Option<Decimal>, BookError> {
            if symbol.is_empty() {
                return Err(BookError::NotInitialized { symbol: symbol.into() });
            }
            Ok(self.best_ask)
        }
    }

    #[test]
    fn test_trait_spread_calculation() {
        let mock = MockOrderBook {
            best_bid: Some(dec!(0.0028)),
            best_ask: Some(dec!(0.0030)),
        };

        assert_eq!(mock.spread("X"), Ok(Some(dec!(0.0002))));
    }

    #[test]
    fn test_trait_empty_side() {
        let mock = MockOrderBook {
            best_bid: Some(dec!(1)),
            best_ask: None,
        };

        assert_eq!(mock.spread("X"), Ok(None));
    }

    #[test]
    fn test_trait_spread_propagates_error() {
        let mock = MockOrderBook {
            best_bid: None,
            best_ask: None,
        };

        assert!(matches!(mock.spread(""), Err(BookError::NotInitialized { .. })));
    }
}
