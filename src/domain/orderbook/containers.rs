//! Price-level containers
//!
//! - `TreeLevels`: packed keys in a `BalancedTreeSet`, best price from the cached minimum
//! - `HeapLevels`: packed keys in a `DedupBinaryHeap`, best price from the root
//! - `MapLevels`: raw decimals in a `BTreeMap`, the correctness baseline
//!
//! Packed keys compare by the price tick only, so re-quoting a price replaces the
//! stored key (and with it the quantity) instead of adding a second entry.

use super::traits::{LevelChange, LevelContainer};
use crate::domain::error::BookError;
use crate::domain::events::{PriceLevel, Side};
use crate::domain::scale::TickScale;
use crate::shared::bits::{unpack_high, unpack_low, PackedKey};
use crate::shared::collections::{BalancedTreeSet, DedupBinaryHeap, KeyOrder};
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// 每侧堆的初始容量
pub const DEFAULT_HEAP_CAPACITY: usize = 2048;

/// 只比较价格tick；买盘降序，卖盘升序，因此两侧的"最小"元素都是最优价
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceTickOrder {
    side: Side,
}

impl PriceTickOrder {
    pub fn for_side(side: Side) -> Self {
        Self { side }
    }
}

impl KeyOrder<PackedKey> for PriceTickOrder {
    #[inline]
    fn compare(&self, a: &PackedKey, b: &PackedKey) -> Ordering {
        let ord = unpack_high(*a).cmp(&unpack_high(*b));
        match self.side {
            Side::Bid => ord.reverse(),
            Side::Ask => ord,
        }
    }
}

/// 数量tick为0（包括舍入后为0）即删除
fn packed_change(scale: TickScale, level: &PriceLevel) -> Result<LevelChange<PackedKey>, BookError> {
    let key = scale.encode(level)?;
    Ok(if unpack_low(key) == 0 {
        LevelChange::Remove(key)
    } else {
        LevelChange::Upsert(key)
    })
}

pub struct TreeLevels {
    levels: BalancedTreeSet<PackedKey, PriceTickOrder>,
    scale: TickScale,
}

impl LevelContainer for TreeLevels {
    type Key = PackedKey;

    fn for_side(side: Side, scale: TickScale) -> Self {
        Self {
            levels: BalancedTreeSet::new(PriceTickOrder::for_side(side)),
            scale,
        }
    }

    fn encode(scale: TickScale, level: &PriceLevel) -> Result<LevelChange<PackedKey>, BookError> {
        packed_change(scale, level)
    }

    fn apply(&mut self, change: LevelChange<PackedKey>) -> Result<(), BookError> {
        match change {
            LevelChange::Upsert(key) => {
                self.levels.insert(key);
            }
            LevelChange::Remove(key) => {
                self.levels.remove(&key);
            }
        }
        Ok(())
    }

    fn ordered_levels(&self) -> Vec<PriceLevel> {
        self.levels.iter().map(|&key| self.scale.decode(key)).collect()
    }

    fn best_price(&self) -> Option<Decimal> {
        self.levels.min().map(|&key| self.scale.decode_price(key))
    }

    fn len(&self) -> usize {
        self.levels.len()
    }
}

pub struct HeapLevels {
    levels: DedupBinaryHeap<PackedKey, PriceTickOrder>,
    scale: TickScale,
}

impl HeapLevels {
    pub fn with_capacity(side: Side, scale: TickScale, capacity: usize) -> Self {
        Self {
            levels: DedupBinaryHeap::with_capacity(capacity, PriceTickOrder::for_side(side)),
            scale,
        }
    }

    pub fn capacity(&self) -> usize {
        self.levels.capacity()
    }
}

impl LevelContainer for HeapLevels {
    type Key = PackedKey;

    fn for_side(side: Side, scale: TickScale) -> Self {
        Self::with_capacity(side, scale, DEFAULT_HEAP_CAPACITY)
    }

    fn encode(scale: TickScale, level: &PriceLevel) -> Result<LevelChange<PackedKey>, BookError> {
        packed_change(scale, level)
    }

    fn apply(&mut self, change: LevelChange<PackedKey>) -> Result<(), BookError> {
        match change {
            LevelChange::Upsert(key) => {
                self.levels.push(key)?;
            }
            LevelChange::Remove(key) => {
                self.levels.remove(&key);
            }
        }
        Ok(())
    }

    fn ordered_levels(&self) -> Vec<PriceLevel> {
        self.levels
            .ordered_elements()
            .into_iter()
            .map(|key| self.scale.decode(key))
            .collect()
    }

    fn best_price(&self) -> Option<Decimal> {
        self.levels.peek().map(|&key| self.scale.decode_price(key))
    }

    fn len(&self) -> usize {
        self.levels.len()
    }
}

/// 不做tick换算，价格和数量按原值保存
pub struct MapLevels {
    levels: BTreeMap<Decimal, Decimal>,
    side: Side,
}

impl LevelContainer for MapLevels {
    type Key = PriceLevel;

    fn for_side(side: Side, _scale: TickScale) -> Self {
        Self {
            levels: BTreeMap::new(),
            side,
        }
    }

    fn encode(_scale: TickScale, level: &PriceLevel) -> Result<LevelChange<PriceLevel>, BookError> {
        Ok(if level.quantity.is_zero() {
            LevelChange::Remove(*level)
        } else {
            LevelChange::Upsert(*level)
        })
    }

    fn apply(&mut self, change: LevelChange<PriceLevel>) -> Result<(), BookError> {
        match change {
            LevelChange::Upsert(level) => {
                self.levels.insert(level.price, level.quantity);
            }
            LevelChange::Remove(level) => {
                self.levels.remove(&level.price);
            }
        }
        Ok(())
    }

    fn ordered_levels(&self) -> Vec<PriceLevel> {
        let to_level = |(&price, &quantity): (&Decimal, &Decimal)| PriceLevel::new(price, quantity);
        match self.side {
            Side::Bid => self.levels.iter().rev().map(to_level).collect(),
            Side::Ask => self.levels.iter().map(to_level).collect(),
        }
    }

    fn best_price(&self) -> Option<Decimal> {
        let best = match self.side {
            Side::Bid => self.levels.last_key_value(),
            Side::Ask => self.levels.first_key_value(),
        };
        best.map(|(&price, _)| price)
    }

    fn len(&self) -> usize {
        self.levels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::orderbook::traits::apply_changes;
    use crate::domain::orderbook::traits::encode_levels;
    use crate::shared::bits::pack;
    use rust_decimal_macros::dec;

    fn levels(pairs: &[(Decimal, Decimal)]) -> Vec<PriceLevel> {
        pairs.iter().map(|&p| PriceLevel::from(p)).collect()
    }

    fn filled<C: LevelContainer>(side: Side, pairs: &[(Decimal, Decimal)]) -> C {
        let scale = TickScale::default();
        let mut container = C::for_side(side, scale);
        let changes = encode_levels::<C>(scale, &levels(pairs)).unwrap();
        apply_changes(&mut container, &changes).unwrap();
        container
    }

    #[test]
    fn test_price_tick_order() {
        let bid = PriceTickOrder::for_side(Side::Bid);
        let ask = PriceTickOrder::for_side(Side::Ask);
        let low = pack(28, 5);
        let high = pack(30, 1);
        assert_eq!(ask.compare(&low, &high), Ordering::Less);
        assert_eq!(bid.compare(&low, &high), Ordering::Greater);
        // 数量不参与比较
        assert_eq!(ask.compare(&pack(30, 1), &pack(30, 99)), Ordering::Equal);
    }

    #[test]
    fn test_quantity_rounding_to_zero_removes() {
        let scale = TickScale::default();
        let change = TreeLevels::encode(scale, &PriceLevel::new(dec!(1), dec!(0.00004))).unwrap();
        assert_eq!(change, LevelChange::Remove(pack(10_000, 0)));

        // 基准实现按原值判断，不会删除
        let change = MapLevels::encode(scale, &PriceLevel::new(dec!(1), dec!(0.00004))).unwrap();
        assert!(matches!(change, LevelChange::Upsert(_)));
    }

    fn check_bids<C: LevelContainer>() {
        let bids: C = filled(
            Side::Bid,
            &[(dec!(0.0028), dec!(9.3)), (dec!(0.0030), dec!(99)), (dec!(0.0029), dec!(1))],
        );
        assert_eq!(bids.len(), 3);
        assert_eq!(bids.best_price(), Some(dec!(0.0030)));
        let prices: Vec<_> = bids.ordered_levels().iter().map(|l| l.price).collect();
        assert_eq!(prices, vec![dec!(0.0030), dec!(0.0029), dec!(0.0028)]);
    }

    fn check_asks_with_overwrite<C: LevelContainer>() {
        let asks: C = filled(
            Side::Ask,
            &[
                (dec!(0.0026), dec!(100)),
                (dec!(0.0024), dec!(14.9)),
                (dec!(0.0026), dec!(5)),
                (dec!(0.0025), dec!(0)),
            ],
        );
        assert_eq!(asks.best_price(), Some(dec!(0.0024)));
        assert_eq!(
            asks.ordered_levels(),
            vec![
                PriceLevel::new(dec!(0.0024), dec!(14.9)),
                PriceLevel::new(dec!(0.0026), dec!(5)),
            ]
        );
    }

    fn check_empty<C: LevelContainer>() {
        let asks = C::for_side(Side::Ask, TickScale::default());
        assert!(asks.is_empty());
        assert_eq!(asks.best_price(), None);
        assert!(asks.ordered_levels().is_empty());
    }

    #[test]
    fn test_tree_levels() {
        check_bids::<TreeLevels>();
        check_asks_with_overwrite::<TreeLevels>();
        check_empty::<TreeLevels>();
    }

    #[test]
    fn test_heap_levels() {
        check_bids::<HeapLevels>();
        check_asks_with_overwrite::<HeapLevels>();
        check_empty::<HeapLevels>();
        assert_eq!(HeapLevels::for_side(Side::Bid, TickScale::default()).capacity(), DEFAULT_HEAP_CAPACITY);
    }

    #[test]
    fn test_map_levels() {
        check_bids::<MapLevels>();
        check_asks_with_overwrite::<MapLevels>();
        check_empty::<MapLevels>();
    }

    #[test]
    fn test_heap_capacity_error_surfaces() {
        let scale = TickScale::default();
        let mut heap = HeapLevels {
            levels: DedupBinaryHeap::with_limits(1, 2, PriceTickOrder::for_side(Side::Ask)),
            scale,
        };
        let changes = encode_levels::<HeapLevels>(
            scale,
            &levels(&[(dec!(1), dec!(1)), (dec!(2), dec!(1)), (dec!(3), dec!(1))]),
        )
        .unwrap();
        let err = apply_changes(&mut heap, &changes).unwrap_err();
        assert_eq!(err.kind(), "capacity");
    }
}
