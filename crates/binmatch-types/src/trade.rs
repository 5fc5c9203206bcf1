//! Trade types produced by the matching core.
//!
//! A [`Trade`] is the immutable record of one fill between an incoming
//! (taker) order and a resting (maker) order on the complementary outcome.
//! `price` is what the taker paid for `outcome`; the maker bought the
//! opposite outcome at `1 - price`, its own resting price.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{MarketId, OrderId, Outcome, TradeId, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Deterministic from the taker order ID and fill sequence.
    pub id: TradeId,
    pub market_id: MarketId,
    /// The resting (maker) order.
    pub maker_order_id: OrderId,
    /// The incoming (taker) order. Optional in the stored model; always
    /// set for trades produced by this core.
    pub taker_order_id: Option<OrderId>,
    pub maker_user_id: UserId,
    pub taker_user_id: UserId,
    /// The outcome the taker bought.
    pub outcome: Outcome,
    /// Taker execution price, in `(0, 1)`.
    pub price: Decimal,
    /// Shares exchanged.
    pub size: Decimal,
    /// Flat platform fee on the taker notional.
    pub fee: Decimal,
    pub maker_fee: Decimal,
    pub taker_fee: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Trade {
    /// The outcome the maker received.
    #[must_use]
    pub fn maker_outcome(&self) -> Outcome {
        self.outcome.opposite()
    }

    /// The maker's effective price (its resting limit).
    #[must_use]
    pub fn maker_price(&self) -> Decimal {
        Decimal::ONE - self.price
    }

    /// Taker notional = price × size.
    #[must_use]
    pub fn notional(&self) -> Decimal {
        self.price * self.size
    }

    /// Maker notional = (1 − price) × size.
    #[must_use]
    pub fn maker_notional(&self) -> Decimal {
        self.maker_price() * self.size
    }

    /// Trade price expressed as the YES price.
    #[must_use]
    pub fn yes_price(&self) -> Decimal {
        self.outcome.yes_price(self.price)
    }
}

impl std::fmt::Display for Trade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Trade[{}] {} {} {} @ {} (maker {} @ {})",
            self.id,
            self.market_id,
            self.outcome,
            self.size,
            self.price,
            self.maker_outcome(),
            self.maker_price(),
        )
    }
}
