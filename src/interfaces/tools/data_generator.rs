//! 合成行情数据
//!
//! 快照：从 0.0002 开始、步长 0.00001 的 N 个连续价位，买卖两侧价位相同，数量随机。
//! 增量：每个事件先从"仍可用"的价位里随机删除一批（数量为0，删除后不再使用），
//! 再从剩余价位里随机挑一批重新报价（数量非0）。同一个种子生成的数据完全相同。

use crate::domain::events::{PriceLevel, SnapshotEvent, UpdateEvent};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

/// 价格小数位数，步长为 1e-5
const PRICE_DECIMALS: u32 = 5;

/// 起始价格 0.0002 = 20 * 1e-5
const START_PRICE_UNITS: i64 = 20;

/// 数量保留8位小数；下限 0.0001 保证在默认比例因子下不会舍入成0
const QUANTITY_DECIMALS: u32 = 8;
const QUANTITY_UNITS: std::ops::RangeInclusive<i64> = 10_000..=99_999_999;

pub struct DataGenerator {
    levels: usize,
    seed: u64,
}

impl DataGenerator {
    pub fn new(levels: usize, seed: u64) -> Self {
        Self { levels, seed }
    }

    pub fn levels(&self) -> usize {
        self.levels
    }

    /// 第 index 个价位
    pub fn price_at(index: usize) -> Decimal {
        Decimal::new(START_PRICE_UNITS + index as i64, PRICE_DECIMALS)
    }

    /// 按比例换算价位个数，四舍五入
    pub fn count_for_ratio(&self, ratio: f64) -> usize {
        (self.levels as f64 * ratio).round() as usize
    }

    pub fn snapshot(&self) -> SnapshotEvent {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut bids = Vec::with_capacity(self.levels);
        let mut asks = Vec::with_capacity(self.levels);

        for i in 0..self.levels {
            let price = Self::price_at(i);
            bids.push(PriceLevel::new(price, random_quantity(&mut rng)));
            asks.push(PriceLevel::new(price, random_quantity(&mut rng)));
        }

        SnapshotEvent::new(bids, asks)
    }

    /// # 参数
    /// * `count` - 事件个数
    /// * `to_update` - 每个事件重新报价的价位数
    /// * `to_remove` - 每个事件删除的价位数
    pub fn updates(
        &self,
        symbol: &str,
        count: usize,
        to_update: usize,
        to_remove: usize,
    ) -> Vec<UpdateEvent> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut available: Vec<Decimal> = (0..self.levels).map(Self::price_at).collect();
        let mut events = Vec::with_capacity(count);

        for _ in 0..count {
            let mut bids = Vec::with_capacity(to_update + to_remove);
            let mut asks = Vec::with_capacity(to_update + to_remove);

            available.shuffle(&mut rng);
            let keep = available.len().saturating_sub(to_remove);
            for price in available.split_off(keep) {
                bids.push(PriceLevel::new(price, Decimal::ZERO));
                asks.push(PriceLevel::new(price, Decimal::ZERO));
            }

            let chosen: Vec<Decimal> = available
                .choose_multiple(&mut rng, to_update)
                .copied()
                .collect();
            for price in chosen {
                let quantity = random_quantity(&mut rng);
                bids.push(PriceLevel::new(price, quantity));
                asks.push(PriceLevel::new(price, quantity));
            }

            events.push(UpdateEvent::new(symbol, bids, asks));
        }

        events
    }
}

fn random_quantity(rng: &mut StdRng) -> Decimal {
    Decimal::new(rng.gen_range(QUANTITY_UNITS), QUANTITY_DECIMALS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashSet;

    #[test]
    fn test_snapshot_prices() {
        let snapshot = DataGenerator::new(4, 42).snapshot();
        let prices: Vec<_> = snapshot.bids.iter().map(|l| l.price).collect();
        assert_eq!(prices, vec![dec!(0.0002), dec!(0.00021), dec!(0.00022), dec!(0.00023)]);
        assert_eq!(snapshot.asks.len(), 4);
        assert!(snapshot.bids.iter().all(|l| l.quantity >= dec!(0.0001)));
    }

    #[test]
    fn test_same_seed_same_data() {
        let a = DataGenerator::new(64, 7);
        let b = DataGenerator::new(64, 7);
        assert_eq!(a.snapshot(), b.snapshot());
        assert_eq!(a.updates("X", 10, 8, 2), b.updates("X", 10, 8, 2));
        assert_ne!(a.snapshot(), DataGenerator::new(64, 8).snapshot());
    }

    #[test]
    fn test_removed_prices_are_not_reused() {
        let generator = DataGenerator::new(32, 42);
        let events = generator.updates("X", 10, 4, 2);
        let mut removed = HashSet::new();

        for event in &events {
            assert_eq!(event.symbol, "X");
            for level in &event.bids {
                if level.quantity.is_zero() {
                    assert!(removed.insert(level.price), "price removed twice");
                } else {
                    assert!(!removed.contains(&level.price), "removed price re-quoted");
                }
            }
        }
        assert_eq!(removed.len(), 20);
    }

    #[test]
    fn test_exhausted_prices() {
        let events = DataGenerator::new(4, 1).updates("X", 3, 2, 3);
        assert_eq!(events[0].bids.iter().filter(|l| l.quantity.is_zero()).count(), 3);
        assert_eq!(events[0].bids.len(), 4);
        // 第二个事件只剩一个价位可删，没有可更新的
        assert_eq!(events[1].bids.len(), 1);
        assert!(events[2].bids.is_empty());
    }

    #[test]
    fn test_count_for_ratio() {
        let generator = DataGenerator::new(1024, 42);
        assert_eq!(generator.count_for_ratio(0.25), 256);
        assert_eq!(generator.count_for_ratio(0.0625), 64);
    }
}
