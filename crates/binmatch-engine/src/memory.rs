//! In-memory [`PersistenceGateway`].
//!
//! Holds markets, orders, trades and positions behind one async mutex.
//! `record_match` checks the whole record against the live state before
//! writing any of it, so a failed write leaves nothing behind. Trade ids
//! are checked for reuse, which makes replaying the same match an error
//! instead of a double booking.
//!
//! Failure injection (`fail_next_records`, `fail_next_cancels`) lets tests
//! exercise the engine's rollback path.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use binmatch_types::{
    BinmatchError, Market, MarketId, MatchRecord, Order, OrderId, OrderStatus, Outcome, Position,
    Result, Trade, TradeId, UserId,
};
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use crate::gateway::PersistenceGateway;

#[derive(Debug, Default)]
struct State {
    markets: HashMap<MarketId, Market>,
    orders: HashMap<OrderId, Order>,
    trades: Vec<Trade>,
    trade_ids: HashSet<TradeId>,
    positions: HashMap<(MarketId, UserId, Outcome), Position>,
}

impl State {
    /// Check `record` against the current state and return the maker
    /// orders and market as they will be after it applies. Reads only.
    fn stage(&self, record: &MatchRecord) -> Result<(HashMap<OrderId, Order>, Option<Market>)> {
        let now = record.taker.updated_at;

        let mut makers = HashMap::with_capacity(record.maker_fills.len());
        for fill in &record.maker_fills {
            let maker = match makers.entry(fill.order_id) {
                Entry::Occupied(staged) => staged.into_mut(),
                Entry::Vacant(slot) => {
                    let stored = self.orders.get(&fill.order_id).ok_or_else(|| {
                        BinmatchError::persistence(format!(
                            "maker order {} not stored",
                            fill.order_id
                        ))
                    })?;
                    slot.insert(stored.clone())
                }
            };
            if !maker.is_active() || fill.filled_delta > maker.remaining_size {
                return Err(BinmatchError::persistence(format!(
                    "maker order {} cannot absorb fill of {}",
                    fill.order_id, fill.filled_delta
                )));
            }
            maker.fill(fill.filled_delta, now);
            if maker.status != fill.new_status {
                return Err(BinmatchError::persistence(format!(
                    "maker order {} status {} disagrees with {}",
                    fill.order_id, maker.status, fill.new_status
                )));
            }
        }

        let mut fresh = HashSet::with_capacity(record.trades.len());
        for trade in &record.trades {
            if self.trade_ids.contains(&trade.id) || !fresh.insert(trade.id) {
                return Err(BinmatchError::persistence(format!(
                    "trade {} already recorded",
                    trade.id
                )));
            }
        }

        let market = match &record.market_stats {
            Some(stats) => {
                let mut market = self.markets.get(&stats.market_id).cloned().ok_or_else(|| {
                    BinmatchError::persistence(format!("market {} not stored", stats.market_id))
                })?;
                market
                    .apply_stats(stats)
                    .map_err(|err| BinmatchError::persistence(err.to_string()))?;
                Some(market)
            }
            None => None,
        };

        Ok((makers, market))
    }

    /// Write a record staged by [`State::stage`]. Cannot fail.
    fn commit(
        &mut self,
        record: &MatchRecord,
        makers: HashMap<OrderId, Order>,
        market: Option<Market>,
    ) {
        self.orders.extend(makers);
        for trade in &record.trades {
            self.trade_ids.insert(trade.id);
            self.trades.push(trade.clone());
        }
        for position in &record.positions {
            self.positions.insert(
                (position.market_id, position.user_id, position.outcome),
                position.clone(),
            );
        }
        if let Some(market) = market {
            self.markets.insert(market.id, market);
        }
        self.orders.insert(record.taker.id, record.taker.clone());
    }
}

/// A [`PersistenceGateway`] backed by process memory.
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    state: Mutex<State>,
    fail_records: AtomicUsize,
    fail_cancels: AtomicUsize,
    record_calls: AtomicUsize,
}

impl InMemoryGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store or replace a market.
    pub async fn add_market(&self, market: Market) {
        self.state.lock().await.markets.insert(market.id, market);
    }

    /// Store an order as-is, e.g. to seed a book before startup.
    pub async fn insert_order(&self, order: Order) {
        self.state.lock().await.orders.insert(order.id, order);
    }

    pub async fn insert_position(&self, position: Position) {
        self.state.lock().await.positions.insert(
            (position.market_id, position.user_id, position.outcome),
            position,
        );
    }

    /// Make the next `n` calls to `record_match` fail without writing.
    pub fn fail_next_records(&self, n: usize) {
        self.fail_records.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` calls to `cancel_order` fail without writing.
    pub fn fail_next_cancels(&self, n: usize) {
        self.fail_cancels.store(n, Ordering::SeqCst);
    }

    /// Number of `record_match` calls received, including failed ones.
    pub fn record_calls(&self) -> usize {
        self.record_calls.load(Ordering::SeqCst)
    }

    pub async fn market(&self, market_id: MarketId) -> Option<Market> {
        self.state.lock().await.markets.get(&market_id).cloned()
    }

    pub async fn order(&self, order_id: OrderId) -> Option<Order> {
        self.state.lock().await.orders.get(&order_id).cloned()
    }

    /// Every recorded trade, in recording order.
    pub async fn trades(&self) -> Vec<Trade> {
        self.state.lock().await.trades.clone()
    }

    pub async fn position(
        &self,
        market_id: MarketId,
        user_id: UserId,
        outcome: Outcome,
    ) -> Option<Position> {
        self.state
            .lock()
            .await
            .positions
            .get(&(market_id, user_id, outcome))
            .cloned()
    }

    pub async fn position_count(&self) -> usize {
        self.state.lock().await.positions.len()
    }

    /// Atomically take one unit from a failure budget.
    fn take_failure(budget: &AtomicUsize) -> bool {
        budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl PersistenceGateway for InMemoryGateway {
    async fn get_market(&self, market_id: MarketId) -> Result<Option<Market>> {
        Ok(self.market(market_id).await)
    }

    async fn load_active_orders(&self) -> Result<Vec<Order>> {
        let state = self.state.lock().await;
        Ok(state
            .orders
            .values()
            .filter(|o| o.status == OrderStatus::Active && o.remaining_size > Decimal::ZERO)
            .cloned()
            .collect())
    }

    async fn load_positions(&self, market_id: MarketId) -> Result<Vec<Position>> {
        let state = self.state.lock().await;
        Ok(state
            .positions
            .values()
            .filter(|p| p.market_id == market_id)
            .cloned()
            .collect())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.order(order_id).await)
    }

    async fn record_match(&self, record: &MatchRecord) -> Result<()> {
        self.record_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.fail_records) {
            return Err(BinmatchError::persistence("injected record_match failure"));
        }

        let mut state = self.state.lock().await;
        let (makers, market) = state.stage(record)?;
        state.commit(record, makers, market);
        Ok(())
    }

    async fn cancel_order(&self, order_id: OrderId) -> Result<()> {
        if Self::take_failure(&self.fail_cancels) {
            return Err(BinmatchError::persistence("injected cancel_order failure"));
        }

        let mut state = self.state.lock().await;
        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or(BinmatchError::OrderNotFound(order_id))?;
        if order.status.is_terminal() {
            return Ok(());
        }
        order.cancel(chrono::Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use binmatch_types::*;
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use super::*;

    fn market() -> Market {
        Market::new(MarketId::from_bytes([1; 16]), Utc::now() + Duration::days(1))
    }

    #[tokio::test]
    async fn active_orders_exclude_terminal() {
        let gw = InMemoryGateway::new();
        let live = Order::dummy_limit(Outcome::Yes, Decimal::new(60, 2), Decimal::TEN);
        let mut done = Order::dummy_limit(Outcome::No, Decimal::new(30, 2), Decimal::TEN);
        done.cancel(Utc::now());
        gw.insert_order(live.clone()).await;
        gw.insert_order(done).await;

        let loaded = gw.load_active_orders().await.unwrap();
        assert_eq!(loaded, vec![live]);
    }

    #[tokio::test]
    async fn failed_record_writes_nothing() {
        let gw = InMemoryGateway::new();
        gw.add_market(market()).await;
        let taker = Order::dummy_limit(Outcome::Yes, Decimal::new(60, 2), Decimal::TEN);
        let record = MatchRecord {
            taker: taker.clone(),
            maker_fills: vec![OrderFill {
                order_id: OrderId::new(),
                filled_delta: Decimal::ONE,
                new_status: OrderStatus::Active,
            }],
            trades: vec![],
            positions: vec![],
            market_stats: None,
        };

        let err = gw.record_match(&record).await.unwrap_err();
        assert!(matches!(err, BinmatchError::PersistenceFailure { .. }));
        assert!(gw.order(taker.id).await.is_none(), "taker must not be half-written");
    }

    #[tokio::test]
    async fn late_rejection_leaves_earlier_parts_unwritten() {
        let gw = InMemoryGateway::new();
        gw.add_market(market()).await;
        let maker = Order::dummy_limit(Outcome::Yes, Decimal::new(60, 2), Decimal::TEN);
        gw.insert_order(maker.clone()).await;
        let taker = Order::dummy_limit(Outcome::No, Decimal::new(40, 2), Decimal::new(4, 0));

        // The first fill is fine; the second names an order the store never saw.
        let record = MatchRecord {
            taker: taker.clone(),
            maker_fills: vec![
                OrderFill {
                    order_id: maker.id,
                    filled_delta: Decimal::new(4, 0),
                    new_status: OrderStatus::Active,
                },
                OrderFill {
                    order_id: OrderId::new(),
                    filled_delta: Decimal::ONE,
                    new_status: OrderStatus::Filled,
                },
            ],
            trades: vec![],
            positions: vec![Position::opened(
                taker.user_id,
                taker.market_id,
                Outcome::No,
                Decimal::new(4, 0),
                Decimal::new(40, 2),
            )],
            market_stats: None,
        };

        assert!(gw.record_match(&record).await.is_err());
        assert_eq!(gw.order(maker.id).await.unwrap().remaining_size, Decimal::TEN);
        assert!(gw.order(taker.id).await.is_none());
        assert_eq!(gw.position_count().await, 0);
    }

    #[tokio::test]
    async fn repeated_fill_of_one_maker_is_cumulative() {
        let gw = InMemoryGateway::new();
        let maker = Order::dummy_limit(Outcome::Yes, Decimal::new(60, 2), Decimal::new(5, 0));
        gw.insert_order(maker.clone()).await;
        let fill = |delta: i64, status| OrderFill {
            order_id: maker.id,
            filled_delta: Decimal::new(delta, 0),
            new_status: status,
        };
        let record = |fills| MatchRecord {
            taker: Order::dummy_limit(Outcome::No, Decimal::new(40, 2), Decimal::new(6, 0)),
            maker_fills: fills,
            trades: vec![],
            positions: vec![],
            market_stats: None,
        };

        // 3 + 3 exceeds the 5 left even though each fill alone fits.
        let over = record(vec![fill(3, OrderStatus::Active), fill(3, OrderStatus::Filled)]);
        assert!(gw.record_match(&over).await.is_err());
        assert_eq!(gw.order(maker.id).await.unwrap().remaining_size, Decimal::new(5, 0));

        let exact = record(vec![fill(3, OrderStatus::Active), fill(2, OrderStatus::Filled)]);
        gw.record_match(&exact).await.unwrap();
        assert_eq!(gw.order(maker.id).await.unwrap().status, OrderStatus::Filled);
    }

    #[tokio::test]
    async fn injected_failures_are_consumed() {
        let gw = InMemoryGateway::new();
        gw.fail_next_records(1);
        let record = MatchRecord {
            taker: Order::dummy_limit(Outcome::Yes, Decimal::new(60, 2), Decimal::TEN),
            maker_fills: vec![],
            trades: vec![],
            positions: vec![],
            market_stats: None,
        };
        assert!(gw.record_match(&record).await.is_err());
        assert!(gw.record_match(&record).await.is_ok());
        assert_eq!(gw.record_calls(), 2);
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let gw = InMemoryGateway::new();
        let order = Order::dummy_limit(Outcome::Yes, Decimal::new(60, 2), Decimal::TEN);
        gw.insert_order(order.clone()).await;
        gw.cancel_order(order.id).await.unwrap();
        gw.cancel_order(order.id).await.unwrap();
        assert_eq!(gw.order(order.id).await.unwrap().status, OrderStatus::Cancelled);
        assert!(matches!(
            gw.cancel_order(OrderId::new()).await,
            Err(BinmatchError::OrderNotFound(_))
        ));
    }
}
