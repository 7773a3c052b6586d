//! 十进制价格/数量 与 整数tick 的换算
//!
//! tick = round(value * scale_factor)，四舍六入五成双（银行家舍入）。
//! 整个订单簿共用一个比例因子，不区分交易对的最小变动价位。

use super::error::BookError;
use super::events::PriceLevel;
use crate::shared::bits::{pack, unpack_high, unpack_low, PackedKey};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// 默认比例因子：保留4位小数
pub const DEFAULT_SCALE_FACTOR: u32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickScale {
    factor: u32,
}

impl TickScale {
    pub fn new(factor: u32) -> Self {
        assert!(factor > 0, "Scale factor must be positive");
        Self { factor }
    }

    pub fn factor(&self) -> u32 {
        self.factor
    }

    /// 换算成tick，超出 i32 范围返回 `EncodingOverflow`
    pub fn to_ticks(&self, value: Decimal) -> Result<i32, BookError> {
        value
            .checked_mul(Decimal::from(self.factor))
            .map(|scaled| scaled.round())
            .and_then(|ticks| ticks.to_i32())
            .ok_or(BookError::EncodingOverflow {
                value,
                factor: self.factor,
            })
    }

    pub fn from_ticks(&self, ticks: i32) -> Decimal {
        Decimal::from(ticks) / Decimal::from(self.factor)
    }

    /// 价格tick放高32位，数量tick放低32位
    pub fn encode(&self, level: &PriceLevel) -> Result<PackedKey, BookError> {
        let price = self.to_ticks(level.price)?;
        let quantity = self.to_ticks(level.quantity)?;
        Ok(pack(price, quantity))
    }

    pub fn decode(&self, key: PackedKey) -> PriceLevel {
        PriceLevel::new(self.from_ticks(unpack_high(key)), self.from_ticks(unpack_low(key)))
    }

    /// 只解出价格
    pub fn decode_price(&self, key: PackedKey) -> Decimal {
        self.from_ticks(unpack_high(key))
    }
}

impl Default for TickScale {
    fn default() -> Self {
        Self::new(DEFAULT_SCALE_FACTOR)
    }
}
