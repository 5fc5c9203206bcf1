//! Order types for the binmatch matching core.
//!
//! Every order buys shares of one [`Outcome`]. A YES order resting at `p`
//! is liquidity for NO takers at `1 - p`, and vice versa.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{MarketId, OrderId, UserId};

/// The binary side of a market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Outcome {
    Yes,
    No,
}

impl Outcome {
    /// The complementary outcome.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Yes => Self::No,
            Self::No => Self::Yes,
        }
    }

    /// Convert a price quoted for this outcome into YES terms.
    #[must_use]
    pub fn yes_price(self, price: Decimal) -> Decimal {
        match self {
            Self::Yes => price,
            Self::No => Decimal::ONE - price,
        }
    }
}

impl From<bool> for Outcome {
    fn from(yes: bool) -> Self {
        if yes { Self::Yes } else { Self::No }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Yes => write!(f, "YES"),
            Self::No => write!(f, "NO"),
        }
    }
}

/// The type of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum OrderType {
    Limit,
    Market,
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Limit => write!(f, "LIMIT"),
            Self::Market => write!(f, "MARKET"),
        }
    }
}

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum OrderStatus {
    Active,
    Filled,
    Cancelled,
}

impl OrderStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Filled | Self::Cancelled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Filled => write!(f, "FILLED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// What a caller submits to `place_order`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub user_id: UserId,
    pub market_id: MarketId,
    pub outcome: Outcome,
    pub order_type: OrderType,
    /// Limit price. Ignored for market orders.
    pub price: Option<Decimal>,
    pub size: Decimal,
}

impl OrderRequest {
    #[must_use]
    pub fn limit(
        user_id: UserId,
        market_id: MarketId,
        outcome: Outcome,
        price: Decimal,
        size: Decimal,
    ) -> Self {
        Self {
            user_id,
            market_id,
            outcome,
            order_type: OrderType::Limit,
            price: Some(price),
            size,
        }
    }

    #[must_use]
    pub fn market(user_id: UserId, market_id: MarketId, outcome: Outcome, size: Decimal) -> Self {
        Self {
            user_id,
            market_id,
            outcome,
            order_type: OrderType::Market,
            price: None,
            size,
        }
    }
}

/// Core order struct.
///
/// Invariant: `filled_size + remaining_size == original_size`, and an
/// `Active` order always has `remaining_size > 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub market_id: MarketId,
    pub outcome: Outcome,
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub price: Option<Decimal>,
    pub original_size: Decimal,
    pub filled_size: Decimal,
    pub remaining_size: Decimal,
    /// Per-market arrival sequence, tie-breaker for equal timestamps.
    pub sequence: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Build a fresh, unfilled order from a request.
    #[must_use]
    pub fn from_request(request: &OrderRequest, sequence: u64, now: DateTime<Utc>) -> Self {
        let price = match request.order_type {
            OrderType::Limit => request.price,
            OrderType::Market => None,
        };
        Self {
            id: OrderId::new(),
            user_id: request.user_id,
            market_id: request.market_id,
            outcome: request.outcome,
            order_type: request.order_type,
            status: OrderStatus::Active,
            price,
            original_size: request.size,
            filled_size: Decimal::ZERO,
            remaining_size: request.size,
            sequence,
            created_at: now,
            updated_at: now,
        }
    }

    /// Limit price, or zero for market orders.
    #[must_use]
    pub fn limit_price(&self) -> Decimal {
        self.price.unwrap_or(Decimal::ZERO)
    }

    /// Whether a resting order on the opposite outcome at `resting_price`
    /// is acceptable to this order as a taker.
    ///
    /// The taker pays `1 - resting_price`, which must not exceed its limit.
    /// Market orders accept any resting price.
    #[must_use]
    pub fn accepts_resting_price(&self, resting_price: Decimal) -> bool {
        match self.order_type {
            OrderType::Market => true,
            OrderType::Limit => resting_price + self.limit_price() >= Decimal::ONE,
        }
    }

    /// Record a fill of `size` shares.
    ///
    /// Callers must never pass more than `remaining_size`.
    pub fn fill(&mut self, size: Decimal, now: DateTime<Utc>) {
        debug_assert!(size > Decimal::ZERO && size <= self.remaining_size);
        self.filled_size += size;
        self.remaining_size -= size;
        if self.remaining_size.is_zero() {
            self.status = OrderStatus::Filled;
        }
        self.updated_at = now;
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) {
        self.status = OrderStatus::Cancelled;
        self.updated_at = now;
    }

    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.remaining_size.is_zero()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == OrderStatus::Active
    }

    /// Checks the size bookkeeping invariants.
    #[must_use]
    pub fn sizes_consistent(&self) -> bool {
        self.filled_size.checked_add(self.remaining_size) == Some(self.original_size)
            && !self.remaining_size.is_sign_negative()
            && !self.filled_size.is_sign_negative()
            && (self.status != OrderStatus::Active || self.remaining_size > Decimal::ZERO)
    }

    #[must_use]
    pub fn fill_ratio(&self) -> Decimal {
        if self.original_size.is_zero() {
            Decimal::ZERO
        } else {
            self.filled_size / self.original_size
        }
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Order {
    pub fn dummy_limit(outcome: Outcome, price: Decimal, size: Decimal) -> Self {
        Self::dummy_limit_in(MarketId::from_bytes([1; 16]), outcome, price, size)
    }

    pub fn dummy_limit_in(
        market_id: MarketId,
        outcome: Outcome,
        price: Decimal,
        size: Decimal,
    ) -> Self {
        let request = OrderRequest::limit(UserId::new(), market_id, outcome, price, size);
        Self::from_request(&request, 0, Utc::now())
    }

    pub fn dummy_market(outcome: Outcome, size: Decimal) -> Self {
        let request =
            OrderRequest::market(UserId::new(), MarketId::from_bytes([1; 16]), outcome, size);
        Self::from_request(&request, 0, Utc::now())
    }
}
