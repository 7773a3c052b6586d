//! 64位打包 - 把 (价格tick, 数量tick) 两个i32存进一个u64
//!
//! 布局：
//! ```text
//!  63            32 31             0
//! +----------------+----------------+
//! |   price ticks  | quantity ticks |
//! +----------------+----------------+
//! ```
//!
//! 容器里只存标量，不分配元组/对象，缓存更友好。
//! 排序比较器只看高32位，所以同一价格的两个key被视为"同一个元素"。
//!
//! 这里不做范围检查：调用方必须保证两个分量都在 i32 范围内
//! （见 `domain::scale::TickScale::to_ticks`，它负责溢出检测）。

/// 打包后的价格层
pub type PackedKey = u64;

const LOW_MASK: u64 = 0xFFFF_FFFF;

/// `high` 占 bit 32-63，`low` 占 bit 0-31
#[inline]
pub const fn pack(high: i32, low: i32) -> PackedKey {
    ((high as u32 as u64) << 32) | (low as u32 as u64)
}

/// 取高32位（价格tick）
#[inline]
pub const fn unpack_high(packed: PackedKey) -> i32 {
    (packed >> 32) as u32 as i32
}

/// 取低32位（数量tick）
#[inline]
pub const fn unpack_low(packed: PackedKey) -> i32 {
    (packed & LOW_MASK) as u32 as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_layout() {
        let packed = pack(30, 990_000);
        assert_eq!(packed >> 32, 30);
        assert_eq!(packed & LOW_MASK, 990_000);
        assert_eq!(unpack_high(packed), 30);
        assert_eq!(unpack_low(packed), 990_000);
    }

    #[test]
    fn test_negative_components_survive() {
        // 低位为负数时不能污染高位
        let packed = pack(7, -1);
        assert_eq!(unpack_high(packed), 7);
        assert_eq!(unpack_low(packed), -1);

        let packed = pack(-42, 5);
        assert_eq!(unpack_high(packed), -42);
        assert_eq!(unpack_low(packed), 5);
    }

    #[test]
    fn test_extremes() {
        for (hi, lo) in [(i32::MAX, i32::MIN), (i32::MIN, i32::MAX), (0, 0)] {
            let packed = pack(hi, lo);
            assert_eq!(unpack_high(packed), hi);
            assert_eq!(unpack_low(packed), lo);
        }
    }
}
