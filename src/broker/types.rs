// Wire types for the brokerage REST API

use chrono::{ DateTime, Utc };
use serde::{ Deserialize, Serialize };
use std::fmt;

/// Monetary fields arrive as JSON strings ("102433.21")
pub mod string_as_f64 {
    use serde::{ Deserialize, Deserializer, Serializer };

    pub fn serialize<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
        where S: Serializer
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
        where D: Deserializer<'de>
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<f64>().map_err(serde::de::Error::custom)
    }
}

/// Optional monetary string fields (null, missing or empty -> None)
pub mod opt_string_as_f64 {
    use serde::{ Deserialize, Deserializer, Serializer };

    pub fn serialize<S>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
        where S: Serializer
    {
        match value {
            Some(v) => serializer.serialize_some(&v.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
        where D: Deserializer<'de>
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) if s.is_empty() => Ok(None),
            Some(s) => s.parse::<f64>().map(Some).map_err(serde::de::Error::custom),
        }
    }
}

/// Trading account snapshot (GET /v2/account)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub status: String,
    #[serde(with = "string_as_f64")]
    pub buying_power: f64,
    #[serde(with = "string_as_f64")]
    pub cash: f64,
    #[serde(with = "string_as_f64")]
    pub equity: f64,
    pub currency: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }

    pub fn opposite(&self) -> OrderSide {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Broker order lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    DoneForDay,
    Canceled,
    Expired,
    Replaced,
    PendingCancel,
    PendingReplace,
    Accepted,
    PendingNew,
    Stopped,
    Rejected,
    Suspended,
    Calculated,
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    /// Fully executed
    pub fn is_fill(&self) -> bool {
        matches!(self, OrderStatus::Filled)
    }

    /// Dead without a fill; the order will never execute
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            OrderStatus::Canceled |
                OrderStatus::Expired |
                OrderStatus::Rejected |
                OrderStatus::Suspended |
                OrderStatus::Stopped
        )
    }

    /// No further updates expected from the broker
    pub fn is_terminal(&self) -> bool {
        self.is_fill() ||
            self.is_failure() ||
            matches!(self, OrderStatus::DoneForDay | OrderStatus::Replaced)
    }
}

/// An order as reported by the trading API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub client_order_id: String,
    pub symbol: String,
    #[serde(with = "string_as_f64")]
    pub qty: f64,
    pub side: OrderSide,
    #[serde(rename = "type")]
    pub order_type: String,
    pub time_in_force: String,
    pub status: OrderStatus,
    #[serde(with = "string_as_f64")]
    pub filled_qty: f64,
    #[serde(default, with = "opt_string_as_f64")]
    pub filled_avg_price: Option<f64>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub filled_at: Option<DateTime<Utc>>,
}

/// Normalized latest-trade quote
///
/// `price` is None when no trade exists yet or the feed returned a
/// non-finite / non-positive value.
#[derive(Debug, Clone)]
pub struct Quote {
    pub symbol: String,
    pub price: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// One OHLCV bar from the data API (short wire field names)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Bar {
    pub t: DateTime<Utc>,
    pub o: f64,
    pub h: f64,
    pub l: f64,
    pub c: f64,
    pub v: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BarsResponse {
    pub bars: Option<Vec<Bar>>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LatestTradeResponse {
    pub trade: Option<LatestTrade>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LatestTrade {
    #[serde(rename = "t")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(rename = "p")]
    pub price: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_parses_monetary_strings() {
        let json =
            r#"{
            "id": "a1b2",
            "status": "ACTIVE",
            "buying_power": "200000.50",
            "cash": "100000.25",
            "equity": "100000.25",
            "currency": "USD"
        }"#;

        let account: Account = serde_json::from_str(json).unwrap();
        assert_eq!(account.buying_power, 200000.50);
        assert_eq!(account.cash, 100000.25);
        assert_eq!(account.status, "ACTIVE");
    }

    #[test]
    fn test_order_parses_wire_format() {
        let json =
            r#"{
            "id": "904837e3-3b76-47ec-b432-046db621571b",
            "client_order_id": "7f960315-2b46-4fc8-b2f5-835f26a2bc12",
            "symbol": "SPY",
            "qty": "2",
            "side": "buy",
            "type": "market",
            "time_in_force": "day",
            "status": "partially_filled",
            "filled_qty": "1",
            "filled_avg_price": "532.17",
            "submitted_at": "2024-06-03T14:30:02.123456Z",
            "filled_at": null
        }"#;

        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.qty, 2.0);
        assert_eq!(order.filled_qty, 1.0);
        assert_eq!(order.filled_avg_price, Some(532.17));
        assert_eq!(order.status, OrderStatus::PartiallyFilled);
        assert_eq!(order.side, OrderSide::Buy);
        assert!(order.filled_at.is_none());
    }

    #[test]
    fn test_order_missing_fill_price() {
        let json =
            r#"{
            "id": "x",
            "client_order_id": "y",
            "symbol": "SPY",
            "qty": "1",
            "side": "sell",
            "type": "market",
            "time_in_force": "day",
            "status": "new",
            "filled_qty": "0"
        }"#;

        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.filled_avg_price, None);
        assert!(!order.status.is_terminal());
    }

    #[test]
    fn test_status_classification() {
        assert!(OrderStatus::Filled.is_fill());
        assert!(OrderStatus::Filled.is_terminal());
        assert!(OrderStatus::Rejected.is_failure());
        assert!(OrderStatus::Rejected.is_terminal());
        assert!(!OrderStatus::PartiallyFilled.is_terminal());
        assert!(!OrderStatus::PendingNew.is_terminal());
        assert!(!OrderStatus::Accepted.is_failure());
    }

    #[test]
    fn test_unknown_status_survives_parsing() {
        let status: OrderStatus = serde_json::from_str("\"accepted_for_bidding\"").unwrap();
        assert_eq!(status, OrderStatus::Unknown);
        assert!(!status.is_terminal());
    }

    #[test]
    fn test_bar_accepts_integer_volume() {
        let json = r#"{"t":"2024-06-03T14:30:00Z","o":530.0,"h":531.2,"l":529.8,"c":531.0,"v":182034}"#;
        let bar: Bar = serde_json::from_str(json).unwrap();
        assert_eq!(bar.v, 182034.0);
        assert_eq!(bar.c, 531.0);
    }

    #[test]
    fn test_side_opposite() {
        assert_eq!(OrderSide::Buy.opposite(), OrderSide::Sell);
        assert_eq!(OrderSide::Sell.opposite(), OrderSide::Buy);
    }
}
