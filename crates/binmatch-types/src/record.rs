//! The atomic unit of persistence for one accepted order.
//!
//! Everything a single `place_order` changes is captured in one
//! [`MatchRecord`] so the store can commit it in a single transaction.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{MarketStatsUpdate, Order, OrderId, OrderStatus, Position, Trade};

/// Fill applied to a resting maker order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderFill {
    pub order_id: OrderId,
    pub filled_delta: Decimal,
    pub new_status: OrderStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// The incoming order in its post-match state (insert or upsert).
    pub taker: Order,
    pub maker_fills: Vec<OrderFill>,
    pub trades: Vec<Trade>,
    /// Final state of every position touched by the trades.
    pub positions: Vec<Position>,
    /// `None` when nothing matched.
    pub market_stats: Option<MarketStatsUpdate>,
}
