//! Results returned to callers of the matching core.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{OrderId, OrderStatus, Trade};

/// Outcome of a successful `place_order`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillSummary {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub total_matched: Decimal,
    pub remaining_size: Decimal,
    /// Size-weighted taker price over all fills, `None` if nothing matched.
    pub avg_execution_price: Option<Decimal>,
    pub trades: Vec<Trade>,
}

impl FillSummary {
    /// Build a summary from the trades executed for one taker order.
    #[must_use]
    pub fn from_trades(
        order_id: OrderId,
        status: OrderStatus,
        remaining_size: Decimal,
        trades: Vec<Trade>,
    ) -> Self {
        let total_matched: Decimal = trades.iter().map(|t| t.size).sum();
        let avg_execution_price = if total_matched.is_zero() {
            None
        } else {
            let notional: Decimal = trades.iter().map(Trade::notional).sum();
            Some(notional / total_matched)
        };
        Self {
            order_id,
            status,
            total_matched,
            remaining_size,
            avg_execution_price,
            trades,
        }
    }

    #[must_use]
    pub fn is_resting(&self) -> bool {
        self.status == OrderStatus::Active
    }
}

/// Non-error results of `cancel_order`.
///
/// Cancelling another user's order is an error (`Forbidden`), not a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelOutcome {
    /// The order was resting and is now cancelled.
    Cancelled,
    /// No such order; treated as an idempotent no-op.
    NotFound,
    /// The order was already filled or cancelled; nothing changed.
    AlreadyTerminal,
}

impl std::fmt::Display for CancelOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::AlreadyTerminal => write!(f, "ALREADY_TERMINAL"),
        }
    }
}
