//! Inbound market-data events
//!
//! Shapes follow the exchange depth feed: a snapshot carries `bids`/`asks`
//! as `["price", "quantity"]` string pairs, a diff update additionally
//! carries the symbol (`s`) and names its sides `b`/`a`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 买卖方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Bid => "bid",
            Side::Ask => "ask",
        }
    }
}

/// 价格层 (price, aggregate quantity)。数量为0表示删除该价位。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(Decimal, Decimal)", into = "(Decimal, Decimal)")]
pub struct PriceLevel {
    pub price: Decimal,
    pub quantity: Decimal,
}

impl PriceLevel {
    pub fn new(price: Decimal, quantity: Decimal) -> Self {
        Self { price, quantity }
    }
}

impl From<(Decimal, Decimal)> for PriceLevel {
    fn from((price, quantity): (Decimal, Decimal)) -> Self {
        Self { price, quantity }
    }
}

impl From<PriceLevel> for (Decimal, Decimal) {
    fn from(level: PriceLevel) -> Self {
        (level.price, level.quantity)
    }
}

/// 深度快照。交易所的快照不带交易对，交易对由调用方在 `initialize` 时给出。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEvent {
    #[serde(default)]
    pub bids: Vec<PriceLevel>,
    #[serde(default)]
    pub asks: Vec<PriceLevel>,
}

impl SnapshotEvent {
    pub fn new(bids: Vec<PriceLevel>, asks: Vec<PriceLevel>) -> Self {
        Self { bids, asks }
    }
}

/// 增量更新，按顺序应用：先 bids 后 asks，同一价位后出现的覆盖先出现的
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateEvent {
    #[serde(alias = "s")]
    pub symbol: String,
    #[serde(default, alias = "b")]
    pub bids: Vec<PriceLevel>,
    #[serde(default, alias = "a")]
    pub asks: Vec<PriceLevel>,
}

impl UpdateEvent {
    pub fn new(symbol: impl Into<String>, bids: Vec<PriceLevel>, asks: Vec<PriceLevel>) -> Self {
        Self {
            symbol: symbol.into(),
            bids,
            asks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_snapshot_from_exchange_json() {
        let json = r#"{
            "lastUpdateId": 1027024,
            "bids": [["0.0030", "99"], ["0.0028", "9.3"]],
            "asks": [["0.0024", "14.90000000"]]
        }"#;
        let snapshot: SnapshotEvent = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.bids.len(), 2);
        assert_eq!(snapshot.bids[0], PriceLevel::new(dec!(0.0030), dec!(99)));
        assert_eq!(snapshot.asks[0].quantity, dec!(14.9));
    }

    #[test]
    fn test_diff_update_aliases() {
        let json = r#"{
            "e": "depthUpdate",
            "E": 123456789,
            "s": "BNBBTC",
            "U": 157,
            "u": 160,
            "b": [["0.0024", "10"]],
            "a": [["0.0026", "100"], ["0.0028", "0"]]
        }"#;
        let update: UpdateEvent = serde_json::from_str(json).unwrap();
        assert_eq!(update.symbol, "BNBBTC");
        assert_eq!(update.bids, vec![PriceLevel::new(dec!(0.0024), dec!(10))]);
        assert_eq!(update.asks[1].quantity, dec!(0));
    }

    #[test]
    fn test_update_round_trips_through_own_format() {
        let update = UpdateEvent::new("X", vec![PriceLevel::new(dec!(30), dec!(0))], vec![]);
        let json = serde_json::to_string(&update).unwrap();
        assert!(json.contains(r#""symbol":"X""#));
        let back: UpdateEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, update);
    }
}
