//! Durable storage seam for the matching core.
//!
//! The [`PersistenceGateway`] trait is everything the engine needs from a
//! store. A SQL-backed implementation lives outside this workspace;
//! [`crate::memory::InMemoryGateway`] ships for tests and embedding.

use async_trait::async_trait;
use binmatch_types::{Market, MarketId, MatchRecord, Order, OrderId, Position, Result};

/// Store consumed by the engine.
///
/// Implementors map their own failures into
/// [`binmatch_types::BinmatchError::PersistenceFailure`].
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Market reference data, `None` if the market does not exist.
    async fn get_market(&self, market_id: MarketId) -> Result<Option<Market>>;

    /// Every order with status `Active` and `remaining_size > 0`.
    async fn load_active_orders(&self) -> Result<Vec<Order>>;

    /// All stored positions of one market.
    async fn load_positions(&self, market_id: MarketId) -> Result<Vec<Position>>;

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Persist everything one accepted order changed, all or nothing:
    /// taker upsert, maker fills, trades, position upserts and market
    /// statistics.
    async fn record_match(&self, record: &MatchRecord) -> Result<()>;

    /// Mark a resting order cancelled.
    async fn cancel_order(&self, order_id: OrderId) -> Result<()>;
}
