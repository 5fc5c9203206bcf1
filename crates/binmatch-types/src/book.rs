//! Read-only views of an order book.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{MarketId, Order, OrderId, UserId};

/// One resting order as exposed to readers of the book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookEntry {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub price: Decimal,
    pub remaining_size: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<&Order> for BookEntry {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id,
            user_id: order.user_id,
            price: order.limit_price(),
            remaining_size: order.remaining_size,
            created_at: order.created_at,
        }
    }
}

/// Full snapshot of both sides, each best-price-first then oldest-first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub market_id: MarketId,
    pub yes: Vec<BookEntry>,
    pub no: Vec<BookEntry>,
}

impl BookSnapshot {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.yes.is_empty() && self.no.is_empty()
    }
}

/// Aggregated size at one price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthLevel {
    pub price: Decimal,
    pub size: Decimal,
    pub orders: usize,
}
