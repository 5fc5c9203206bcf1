//! Market reference data and the statistics the core writes back.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{BinmatchError, MarketId, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketStatus {
    Active,
    Resolved,
    Cancelled,
}

impl std::fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Resolved => write!(f, "RESOLVED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// A binary-outcome market as seen by the matching core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub id: MarketId,
    pub status: MarketStatus,
    pub end_date: DateTime<Utc>,
    /// YES price of the most recent trade, if any.
    pub last_traded_price: Option<Decimal>,
    pub total_volume: Decimal,
    pub yes_volume: Decimal,
    pub no_volume: Decimal,
    pub yes_price: Decimal,
    pub no_price: Decimal,
}

impl Market {
    /// A fresh active market priced at the uninformed 50/50 prior.
    #[must_use]
    pub fn new(id: MarketId, end_date: DateTime<Utc>) -> Self {
        let half = Decimal::new(5, 1);
        Self {
            id,
            status: MarketStatus::Active,
            end_date,
            last_traded_price: None,
            total_volume: Decimal::ZERO,
            yes_volume: Decimal::ZERO,
            no_volume: Decimal::ZERO,
            yes_price: half,
            no_price: half,
        }
    }

    /// Fold a statistics update into this market. On overflow nothing is
    /// changed.
    pub fn apply_stats(&mut self, stats: &MarketStatsUpdate) -> Result<()> {
        let add = |total: Decimal, delta: Decimal, what: &str| {
            total
                .checked_add(delta)
                .ok_or_else(|| BinmatchError::overflow(what))
        };
        let total_volume = add(self.total_volume, stats.volume_delta, "market volume")?;
        let yes_volume = add(self.yes_volume, stats.yes_volume_delta, "market yes volume")?;
        let no_volume = add(self.no_volume, stats.no_volume_delta, "market no volume")?;

        self.total_volume = total_volume;
        self.yes_volume = yes_volume;
        self.no_volume = no_volume;
        self.last_traded_price = Some(stats.last_traded_price);
        self.yes_price = stats.yes_price;
        self.no_price = stats.no_price;
        Ok(())
    }
}

/// Aggregate statistics produced by one accepted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketStatsUpdate {
    pub market_id: MarketId,
    /// Shares matched (each matched share is one unit of collateral).
    pub volume_delta: Decimal,
    /// Notional spent on YES across both legs.
    pub yes_volume_delta: Decimal,
    /// Notional spent on NO across both legs.
    pub no_volume_delta: Decimal,
    /// YES price of the last fill.
    pub last_traded_price: Decimal,
    /// Oracle price after the match.
    pub yes_price: Decimal,
    pub no_price: Decimal,
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn apply_stats_accumulates() {
        let mut market = Market::new(MarketId::new(), Utc::now() + Duration::days(1));
        let stats = stats_for(&market);
        market.apply_stats(&stats).unwrap();
        market.apply_stats(&stats).unwrap();
        assert_eq!(market.total_volume, Decimal::new(20, 0));
        assert_eq!(market.yes_volume, Decimal::new(12, 0));
        assert_eq!(market.last_traded_price, Some(Decimal::new(60, 2)));
    }

    #[test]
    fn apply_stats_overflow_changes_nothing() {
        let mut market = Market::new(MarketId::new(), Utc::now() + Duration::days(1));
        market.no_volume = Decimal::MAX;
        let before = market.clone();
        assert!(matches!(
            market.apply_stats(&stats_for(&market)),
            Err(BinmatchError::Internal(_))
        ));
        assert_eq!(market, before);
    }

    fn stats_for(market: &Market) -> MarketStatsUpdate {
        MarketStatsUpdate {
            market_id: market.id,
            volume_delta: Decimal::new(10, 0),
            yes_volume_delta: Decimal::new(6, 0),
            no_volume_delta: Decimal::new(4, 0),
            last_traded_price: Decimal::new(60, 2),
            yes_price: Decimal::new(5, 1),
            no_price: Decimal::new(5, 1),
        }
    }
}
