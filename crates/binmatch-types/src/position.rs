//! Weighted-average-cost share positions.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{BinmatchError, MarketId, Outcome, Result, UserId};

/// A user's holding of one outcome in one market.
///
/// Invariant: `total_cost == shares * avg_price` within rounding, and
/// `shares >= 0`. Positions are never deleted; a zero-share row is history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub user_id: UserId,
    pub market_id: MarketId,
    pub outcome: Outcome,
    pub shares: Decimal,
    pub avg_price: Decimal,
    pub total_cost: Decimal,
}

impl Position {
    /// A position opened by a first fill.
    #[must_use]
    pub fn opened(
        user_id: UserId,
        market_id: MarketId,
        outcome: Outcome,
        size: Decimal,
        price: Decimal,
    ) -> Self {
        Self {
            user_id,
            market_id,
            outcome,
            shares: size,
            avg_price: price,
            total_cost: size * price,
        }
    }

    /// Add `size` shares bought at `price`, re-averaging the cost basis.
    /// Leaves the position untouched if the totals would overflow.
    pub fn add(&mut self, size: Decimal, price: Decimal) -> Result<()> {
        let shares = self
            .shares
            .checked_add(size)
            .ok_or_else(|| BinmatchError::overflow("position shares"))?;
        let total_cost = size
            .checked_mul(price)
            .and_then(|cost| self.total_cost.checked_add(cost))
            .ok_or_else(|| BinmatchError::overflow("position cost"))?;
        self.shares = shares;
        self.total_cost = total_cost;
        if !shares.is_zero() {
            self.avg_price = total_cost / shares;
        }
        Ok(())
    }

    /// Key identifying this position within its market.
    #[must_use]
    pub fn key(&self) -> (UserId, Outcome) {
        (self.user_id, self.outcome)
    }
}
