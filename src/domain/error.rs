//! Order book errors
//!
//! All failures propagate synchronously; the caller owns recovery
//! (typically clearing the symbol and re-fetching a snapshot).

use crate::shared::collections::CapacityError;
use crate::shared::metrics::METRICS;
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookError {
    /// `initialize` on a symbol that is already present; `clear` it first
    #[error("order book already initialized for symbol {symbol}; clear it before re-initializing")]
    AlreadyInitialized { symbol: String },

    /// best-price query on a symbol that was never initialized
    #[error("no order book initialized for symbol {symbol}")]
    NotInitialized { symbol: String },

    /// scaled price or quantity does not fit in a signed 32-bit tick
    #[error("{value} does not fit a 32-bit tick at scale factor {factor}")]
    EncodingOverflow { value: Decimal, factor: u32 },

    #[error(transparent)]
    Capacity(#[from] CapacityError),
}

impl BookError {
    /// 指标标签
    pub fn kind(&self) -> &'static str {
        match self {
            BookError::AlreadyInitialized { .. } => "already_initialized",
            BookError::NotInitialized { .. } => "not_initialized",
            BookError::EncodingOverflow { .. } => "encoding_overflow",
            BookError::Capacity(_) => "capacity",
        }
    }

    /// 计入错误指标后原样返回，配合 `map_err` 使用
    pub(crate) fn recorded(self) -> Self {
        METRICS.errors_total.with_label_values(&[self.kind()]).inc();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_messages() {
        let err = BookError::AlreadyInitialized { symbol: "BNBBTC".into() };
        assert!(err.to_string().contains("BNBBTC"));
        assert_eq!(err.kind(), "already_initialized");

        let err = BookError::EncodingOverflow { value: dec!(300000), factor: 10_000 };
        assert_eq!(err.to_string(), "300000 does not fit a 32-bit tick at scale factor 10000");
    }

    #[test]
    fn test_capacity_converts() {
        let err: BookError = CapacityError { requested: 5, max: 4 }.into();
        assert_eq!(err.kind(), "capacity");
        assert!(err.to_string().contains("maximum is 4"));
    }
}
