//! Broker order records (§3: "Broker order").

use rust_decimal::Decimal;

use crate::domain::types::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKind {
    Limit,
    Market,
    Stop,
}

/// A broker-side order as returned by the exchange API port. The `id` may be
/// replaced after a price update (`updateOrderPrice` can hand back a new
/// id) — callers track orders by session+tag, never by id alone.
#[derive(Debug, Clone)]
pub struct BrokerOrder {
    pub id: String,
    pub kind: OrderKind,
    pub symbol: String,
    pub side: Side,
    pub amount: Decimal,
    pub price: Option<Decimal>,
}

/// Terminal/ongoing state of a broker order, as returned by `order(orderId)`.
#[derive(Debug, Clone)]
pub struct OrderState {
    pub id: String,
    pub amount: Decimal,
    pub remaining: Decimal,
    pub executed: Decimal,
    pub is_filled: bool,
    pub is_open: bool,
}
