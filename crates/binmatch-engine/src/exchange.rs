//! Public entry point: a registry of market actors.
//!
//! [`Exchange::start`] rehydrates every book before it returns, so no
//! order can be accepted ahead of the orders that were resting at
//! shutdown. Markets without resting orders get their actor the first
//! time they are addressed.

use std::collections::HashMap;
use std::sync::Arc;

use binmatch_types::{
    BinmatchError, BookSnapshot, CancelOutcome, EngineConfig, FillSummary, MarketId, OrderId,
    OrderRequest, Outcome, Position, Result, UserId,
};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, RwLock, broadcast};
use tokio::task::JoinHandle;

use crate::actor::{MarketActor, MarketHandle};
use crate::events::{EngineEvent, EventBus};
use crate::gateway::PersistenceGateway;
use crate::loader::{BookLoader, LoadReport, LoadedMarket};

pub struct Exchange {
    gateway: Arc<dyn PersistenceGateway>,
    config: Arc<EngineConfig>,
    loader: BookLoader,
    markets: RwLock<HashMap<MarketId, MarketHandle>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    events: EventBus,
    load_report: LoadReport,
}

impl Exchange {
    /// Validate `config`, rehydrate all books and start their actors.
    pub async fn start(
        gateway: Arc<dyn PersistenceGateway>,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let events = EventBus::new(config.event_buffer);
        let loader = BookLoader::new(Arc::clone(&gateway));
        let (loaded, load_report) = loader.load().await?;

        let exchange = Self {
            gateway,
            config,
            loader,
            markets: RwLock::new(HashMap::new()),
            tasks: Mutex::new(Vec::new()),
            events,
            load_report,
        };
        {
            let mut markets = exchange.markets.write().await;
            for lm in loaded {
                let market_id = lm.market.id;
                let handle = exchange.spawn_actor(lm).await;
                markets.insert(market_id, handle);
            }
        }
        tracing::info!(
            engine = binmatch_types::constants::ENGINE_NAME,
            version = binmatch_types::constants::VERSION,
            markets = exchange.load_report.markets,
            "exchange started"
        );
        Ok(exchange)
    }

    async fn spawn_actor(&self, lm: LoadedMarket) -> MarketHandle {
        let actor = MarketActor::new(
            lm.market,
            lm.book,
            lm.ledger,
            lm.next_sequence,
            Arc::clone(&self.config),
            Arc::clone(&self.gateway),
            self.events.clone(),
        );
        let (handle, task) = actor.spawn();
        self.tasks.lock().await.push(task);
        handle
    }

    /// The actor for `market_id`, started on first use. An actor that has
    /// stopped is replaced by one rebuilt from the store.
    async fn handle(&self, market_id: MarketId) -> Result<MarketHandle> {
        let restarting = match self.markets.read().await.get(&market_id) {
            Some(handle) if !handle.is_closed() => return Ok(handle.clone()),
            Some(_) => true,
            None => false,
        };
        if restarting {
            tracing::error!(
                market_id = %market_id,
                "market actor stopped, rebuilding from store"
            );
        }

        // Loaded outside the registry lock so other markets stay reachable.
        let (lm, report) = self
            .loader
            .load_one(market_id)
            .await?
            .ok_or(BinmatchError::MarketNotFound(market_id))?;

        let mut markets = self.markets.write().await;
        // Another caller may have started it while we were reading the store.
        if let Some(handle) = markets.get(&market_id) {
            if !handle.is_closed() {
                return Ok(handle.clone());
            }
        }
        let handle = self.spawn_actor(lm).await;
        markets.insert(market_id, handle.clone());
        tracing::info!(
            market_id = %market_id,
            orders = report.orders,
            skipped = report.skipped,
            positions = report.positions,
            restarted = restarting,
            "market actor started on demand"
        );
        Ok(handle)
    }

    /// Validate, match and persist one order.
    pub async fn place_order(&self, request: OrderRequest) -> Result<FillSummary> {
        self.handle(request.market_id).await?.place(request).await
    }

    /// Cancel a resting order on behalf of its owner.
    ///
    /// Unknown orders are `NotFound` and already filled or cancelled ones
    /// are `AlreadyTerminal`; neither is an error.
    pub async fn cancel_order(&self, order_id: OrderId, user_id: UserId) -> Result<CancelOutcome> {
        let Some(stored) = self.gateway.get_order(order_id).await? else {
            tracing::debug!(order_id = %order_id, "cancel of unknown order");
            return Ok(CancelOutcome::NotFound);
        };
        if stored.user_id != user_id {
            tracing::warn!(order_id = %order_id, user_id = %user_id, "cancel refused, not owner");
            return Err(BinmatchError::Forbidden(order_id));
        }
        if stored.status.is_terminal() {
            return Ok(CancelOutcome::AlreadyTerminal);
        }
        self.handle(stored.market_id)
            .await?
            .cancel(order_id, user_id)
            .await
    }

    pub async fn get_order_book(&self, market_id: MarketId) -> Result<BookSnapshot> {
        self.handle(market_id).await?.snapshot().await
    }

    /// Oracle YES price of a market.
    pub async fn get_market_price(&self, market_id: MarketId) -> Result<Decimal> {
        self.handle(market_id).await?.price().await
    }

    pub async fn get_position(
        &self,
        user_id: UserId,
        market_id: MarketId,
        outcome: Outcome,
    ) -> Result<Option<Position>> {
        self.handle(market_id).await?.position(user_id, outcome).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// Markets with a running actor.
    pub async fn markets(&self) -> Vec<MarketId> {
        let mut ids: Vec<MarketId> = self.markets.read().await.keys().copied().collect();
        ids.sort();
        ids
    }

    /// What startup rehydration found.
    #[must_use]
    pub fn load_report(&self) -> &LoadReport {
        &self.load_report
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Stop every actor after it drains its queue.
    pub async fn shutdown(self) {
        self.markets.write().await.clear();
        let tasks = std::mem::take(&mut *self.tasks.lock().await);
        for task in tasks {
            if let Err(err) = task.await {
                tracing::error!(error = %err, "market actor panicked");
            }
        }
        tracing::info!("exchange stopped");
    }
}
