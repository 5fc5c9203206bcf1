//! Startup rehydration of books and ledgers from the store.
//!
//! Resting orders are replayed oldest first, `(created_at, sequence, id)`,
//! so each price level comes back in its original time priority. Rows that
//! cannot rest (wrong type, bad sizes, unknown market) are skipped and
//! counted, never fatal.

use std::collections::BTreeMap;
use std::sync::Arc;

use binmatch_matchcore::{OrderBook, PositionLedger};
use binmatch_types::{Market, MarketId, Order, OrderType, Result};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::gateway::PersistenceGateway;

/// Totals from one load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub markets: usize,
    pub orders: usize,
    pub skipped: usize,
    pub positions: usize,
}

/// A market ready to hand to its actor.
#[derive(Debug)]
pub struct LoadedMarket {
    pub market: Market,
    pub book: OrderBook,
    pub ledger: PositionLedger,
    /// First sequence number for new orders.
    pub next_sequence: u64,
}

pub struct BookLoader {
    gateway: Arc<dyn PersistenceGateway>,
}

impl BookLoader {
    #[must_use]
    pub fn new(gateway: Arc<dyn PersistenceGateway>) -> Self {
        Self { gateway }
    }

    /// Load every market that has resting orders.
    pub async fn load(&self) -> Result<(Vec<LoadedMarket>, LoadReport)> {
        let mut report = LoadReport::default();
        let mut by_market: BTreeMap<MarketId, Vec<Order>> = BTreeMap::new();

        for order in self.gateway.load_active_orders().await? {
            if admit(&order, &mut report) {
                by_market.entry(order.market_id).or_default().push(order);
            }
        }

        let mut loaded = Vec::with_capacity(by_market.len());
        for (market_id, orders) in by_market {
            let Some(market) = self.gateway.get_market(market_id).await? else {
                tracing::warn!(
                    market_id = %market_id,
                    orders = orders.len(),
                    "skipping orders for unknown market"
                );
                report.skipped += orders.len();
                continue;
            };
            loaded.push(self.load_market(market, orders, &mut report).await?);
        }

        report.markets = loaded.len();
        tracing::info!(
            markets = report.markets,
            orders = report.orders,
            skipped = report.skipped,
            positions = report.positions,
            "order books rehydrated"
        );
        Ok((loaded, report))
    }

    /// Rebuild one market from the store, for a market first addressed
    /// after startup or one whose actor has stopped. `None` if the store
    /// does not know the market.
    pub async fn load_one(
        &self,
        market_id: MarketId,
    ) -> Result<Option<(LoadedMarket, LoadReport)>> {
        let Some(market) = self.gateway.get_market(market_id).await? else {
            return Ok(None);
        };
        let mut report = LoadReport::default();
        let orders: Vec<Order> = self
            .gateway
            .load_active_orders()
            .await?
            .into_iter()
            .filter(|order| order.market_id == market_id && admit(order, &mut report))
            .collect();

        let loaded = self.load_market(market, orders, &mut report).await?;
        report.markets = 1;
        Ok(Some((loaded, report)))
    }

    /// Build the book and ledger of a single market from its stored orders.
    pub async fn load_market(
        &self,
        market: Market,
        mut orders: Vec<Order>,
        report: &mut LoadReport,
    ) -> Result<LoadedMarket> {
        orders.sort_by(|a, b| {
            (a.created_at, a.sequence, a.id).cmp(&(b.created_at, b.sequence, b.id))
        });

        let mut book = OrderBook::new(market.id);
        let mut next_sequence = 0;
        for order in orders {
            let order_id = order.id;
            let sequence = order.sequence;
            match book.insert(order) {
                Ok(()) => {
                    report.orders += 1;
                    next_sequence = next_sequence.max(sequence + 1);
                }
                Err(err) => {
                    tracing::warn!(order_id = %order_id, error = %err, "skipping stored order");
                    report.skipped += 1;
                }
            }
        }

        let mut ledger = PositionLedger::new(market.id);
        report.positions += ledger.load(self.gateway.load_positions(market.id).await?);

        Ok(LoadedMarket {
            market,
            book,
            ledger,
            next_sequence,
        })
    }
}

/// `true` if `order` can go back on the book; otherwise logs and counts it.
fn admit(order: &Order, report: &mut LoadReport) -> bool {
    if restable(order) {
        return true;
    }
    tracing::warn!(
        order_id = %order.id,
        market_id = %order.market_id,
        status = %order.status,
        remaining = %order.remaining_size,
        "skipping stored order that cannot rest"
    );
    report.skipped += 1;
    false
}

fn restable(order: &Order) -> bool {
    order.is_active()
        && order.order_type == OrderType::Limit
        && order.remaining_size > Decimal::ZERO
        && order.sizes_consistent()
        && order
            .price
            .is_some_and(|p| p > Decimal::ZERO && p < Decimal::ONE)
}
