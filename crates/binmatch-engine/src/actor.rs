//! One task per market.
//!
//! A [`MarketActor`] owns its market's `OrderBook`, `PositionLedger` and
//! cached `Market`, and processes [`Command`]s strictly in arrival order.
//! Callers talk to it through a cloneable [`MarketHandle`]; replies come
//! back on `oneshot` channels.
//!
//! ## Placement
//!
//! ```text
//! refresh market -> validate -> plan -> execute (book mutated)
//!     -> record_match
//!          ok:  commit ledger, apply stats, publish events, reply
//!          err: revert book, reply PersistenceFailure
//! ```
//!
//! Nothing else runs on the book between `execute` and the revert, so no
//! other order can observe a match that later fails to persist.

use std::sync::Arc;

use binmatch_matchcore::{
    Execution, MarketPriceOracle, OrderBook, PositionLedger, execute, plan_match,
};
use binmatch_types::{
    BinmatchError, BookSnapshot, CancelOutcome, EngineConfig, FillSummary, Market, MarketId,
    MarketStatsUpdate, MatchRecord, Order, OrderId, OrderRequest, Outcome, Position, Result,
    Trade, UserId,
};
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::{mpsc, oneshot};
use tracing::Instrument;

use crate::events::{EngineEvent, EventBus};
use crate::gateway::PersistenceGateway;
use crate::validation::validate_request;

/// Requests a market actor understands.
#[derive(Debug)]
pub enum Command {
    Place {
        request: OrderRequest,
        reply: oneshot::Sender<Result<FillSummary>>,
    },
    Cancel {
        order_id: OrderId,
        user_id: UserId,
        reply: oneshot::Sender<Result<CancelOutcome>>,
    },
    Snapshot {
        reply: oneshot::Sender<BookSnapshot>,
    },
    Price {
        reply: oneshot::Sender<Decimal>,
    },
    Position {
        user_id: UserId,
        outcome: Outcome,
        reply: oneshot::Sender<Option<Position>>,
    },
}

/// Cloneable sender side of a market actor's queue.
#[derive(Debug, Clone)]
pub struct MarketHandle {
    market_id: MarketId,
    tx: mpsc::Sender<Command>,
}

impl MarketHandle {
    #[must_use]
    pub fn market_id(&self) -> MarketId {
        self.market_id
    }

    /// `true` once the actor has stopped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| BinmatchError::EngineUnavailable(self.market_id))?;
        rx.await
            .map_err(|_| BinmatchError::EngineUnavailable(self.market_id))
    }

    pub async fn place(&self, request: OrderRequest) -> Result<FillSummary> {
        self.request(|reply| Command::Place { request, reply }).await?
    }

    pub async fn cancel(&self, order_id: OrderId, user_id: UserId) -> Result<CancelOutcome> {
        self.request(|reply| Command::Cancel {
            order_id,
            user_id,
            reply,
        })
        .await?
    }

    pub async fn snapshot(&self) -> Result<BookSnapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub async fn price(&self) -> Result<Decimal> {
        self.request(|reply| Command::Price { reply }).await
    }

    pub async fn position(&self, user_id: UserId, outcome: Outcome) -> Result<Option<Position>> {
        self.request(|reply| Command::Position {
            user_id,
            outcome,
            reply,
        })
        .await
    }
}

/// Owner of one market's in-memory state.
pub struct MarketActor {
    market: Market,
    book: OrderBook,
    ledger: PositionLedger,
    next_sequence: u64,
    oracle: MarketPriceOracle,
    config: Arc<EngineConfig>,
    gateway: Arc<dyn PersistenceGateway>,
    events: EventBus,
}

impl MarketActor {
    #[must_use]
    pub fn new(
        market: Market,
        book: OrderBook,
        ledger: PositionLedger,
        next_sequence: u64,
        config: Arc<EngineConfig>,
        gateway: Arc<dyn PersistenceGateway>,
        events: EventBus,
    ) -> Self {
        Self {
            oracle: MarketPriceOracle::new(config.oracle.clone()),
            market,
            book,
            ledger,
            next_sequence,
            config,
            gateway,
            events,
        }
    }

    /// Start the actor on the current runtime and return its handle.
    pub fn spawn(self) -> (MarketHandle, tokio::task::JoinHandle<()>) {
        let market_id = self.market.id;
        let (tx, rx) = mpsc::channel(self.config.command_buffer);
        let span = tracing::info_span!("market", market_id = %market_id);
        let task = tokio::spawn(self.run(rx).instrument(span));
        (MarketHandle { market_id, tx }, task)
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        tracing::info!(
            resting = self.book.order_count(),
            positions = self.ledger.len(),
            "market actor started"
        );
        while let Some(command) = rx.recv().await {
            self.handle(command).await;
        }
        tracing::info!("market actor stopped");
    }

    async fn handle(&mut self, command: Command) {
        // A dropped reply receiver means the caller gave up; the work is done regardless.
        match command {
            Command::Place { request, reply } => {
                let result = self.place(request).await;
                let _ = reply.send(result);
            }
            Command::Cancel {
                order_id,
                user_id,
                reply,
            } => {
                let result = self.cancel(order_id, user_id).await;
                let _ = reply.send(result);
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.book.snapshot());
            }
            Command::Price { reply } => {
                let _ = reply.send(self.current_price());
            }
            Command::Position {
                user_id,
                outcome,
                reply,
            } => {
                let _ = reply.send(self.ledger.get(user_id, outcome).cloned());
            }
        }
    }

    fn current_price(&self) -> Decimal {
        self.oracle.price(&self.book, self.market.last_traded_price)
    }

    async fn refresh_market(&mut self) -> Result<()> {
        let market_id = self.market.id;
        match self.gateway.get_market(market_id).await {
            Ok(Some(market)) => {
                self.market = market;
                Ok(())
            }
            Ok(None) => Err(BinmatchError::MarketNotFound(market_id)),
            Err(err) => Err(into_persistence(err)),
        }
    }

    async fn place(&mut self, request: OrderRequest) -> Result<FillSummary> {
        self.refresh_market().await?;
        let now = Utc::now();
        if let Err(err) = validate_request(&request, Some(&self.market), now, &self.config) {
            tracing::warn!(user_id = %request.user_id, error = %err, "order rejected");
            return Err(err);
        }

        let taker = Order::from_request(&request, self.next_sequence, now);
        self.next_sequence += 1;

        let plan = match plan_match(&self.book, &taker) {
            Ok(plan) => plan,
            Err(err) => {
                tracing::warn!(order_id = %taker.id, error = %err, "order rejected");
                return Err(err);
            }
        };
        let Execution {
            taker,
            trades,
            maker_fills,
            undo,
        } = execute(&mut self.book, taker, &plan, &self.config.fees, now)?;

        let (positions, market_stats, next_market) = match self.settle(&trades) {
            Ok(settled) => settled,
            Err(err) => {
                self.book.revert(undo);
                tracing::error!(
                    order_id = %taker.id,
                    error = %err,
                    "match cannot be recorded, book reverted"
                );
                return Err(err);
            }
        };
        let record = MatchRecord {
            taker,
            maker_fills,
            trades,
            positions,
            market_stats,
        };

        if let Err(err) = self.gateway.record_match(&record).await {
            self.book.revert(undo);
            tracing::error!(
                order_id = %record.taker.id,
                trades = record.trades.len(),
                error = %err,
                "failed to persist match, book reverted"
            );
            return Err(into_persistence(err));
        }

        let MatchRecord {
            taker,
            trades,
            positions,
            ..
        } = record;
        self.ledger.commit(positions);
        self.market = next_market;

        tracing::info!(
            order_id = %taker.id,
            user_id = %taker.user_id,
            outcome = %taker.outcome,
            order_type = %taker.order_type,
            size = %taker.original_size,
            matched = %taker.filled_size,
            status = %taker.status,
            "order accepted"
        );
        self.publish_accepted(&taker, &trades);

        Ok(FillSummary::from_trades(
            taker.id,
            taker.status,
            taker.remaining_size,
            trades,
        ))
    }

    /// Positions, statistics and market state as they will be once `trades`
    /// are recorded. Nothing is changed here.
    fn settle(
        &self,
        trades: &[Trade],
    ) -> Result<(Vec<Position>, Option<MarketStatsUpdate>, Market)> {
        let positions = self.ledger.project(trades)?;
        let market_stats = self.stats_for(trades)?;
        let mut market = self.market.clone();
        if let Some(stats) = &market_stats {
            market.apply_stats(stats)?;
        }
        Ok((positions, market_stats, market))
    }

    /// Statistics for the trades of one order, with the oracle price taken
    /// from the book as it stands after the match.
    fn stats_for(&self, trades: &[Trade]) -> Result<Option<MarketStatsUpdate>> {
        let Some(last) = trades.last() else {
            return Ok(None);
        };
        let last_traded_price = last.yes_price();
        let mut update = MarketStatsUpdate {
            market_id: self.market.id,
            volume_delta: Decimal::ZERO,
            yes_volume_delta: Decimal::ZERO,
            no_volume_delta: Decimal::ZERO,
            last_traded_price,
            yes_price: Decimal::ZERO,
            no_price: Decimal::ZERO,
        };
        for trade in trades {
            tracing::debug!(
                trade_id = %trade.id,
                maker_order_id = %trade.maker_order_id,
                price = %trade.price,
                size = %trade.size,
                "fill"
            );
            let (yes_notional, no_notional) = match trade.outcome {
                Outcome::Yes => (trade.notional(), trade.maker_notional()),
                Outcome::No => (trade.maker_notional(), trade.notional()),
            };
            update.volume_delta = checked_sum(update.volume_delta, trade.size)?;
            update.yes_volume_delta = checked_sum(update.yes_volume_delta, yes_notional)?;
            update.no_volume_delta = checked_sum(update.no_volume_delta, no_notional)?;
        }
        update.yes_price = self.oracle.price(&self.book, Some(last_traded_price));
        update.no_price = Decimal::ONE - update.yes_price;
        Ok(Some(update))
    }

    fn publish_accepted(&self, taker: &Order, trades: &[Trade]) {
        self.events.publish(EngineEvent::OrderAccepted {
            market_id: taker.market_id,
            order_id: taker.id,
            user_id: taker.user_id,
            outcome: taker.outcome,
            status: taker.status,
        });
        for trade in trades {
            tracing::info!(
                trade_id = %trade.id,
                maker_user_id = %trade.maker_user_id,
                taker_user_id = %trade.taker_user_id,
                outcome = %trade.outcome,
                price = %trade.price,
                size = %trade.size,
                "trade executed"
            );
            self.events.publish(EngineEvent::TradeExecuted {
                trade: trade.clone(),
            });
        }
        self.publish_book();
    }

    fn publish_book(&self) {
        self.events.publish(EngineEvent::BookUpdated {
            market_id: self.market.id,
            best_bid: self.book.best_bid(),
            best_ask: self.book.best_ask(),
            price: self.current_price(),
        });
    }

    async fn cancel(&mut self, order_id: OrderId, user_id: UserId) -> Result<CancelOutcome> {
        let Some(resting) = self.book.get(&order_id) else {
            // Filled, cancelled, or never rested here.
            tracing::debug!(order_id = %order_id, "cancel of non-resting order");
            return Ok(CancelOutcome::AlreadyTerminal);
        };
        if resting.user_id != user_id {
            tracing::warn!(order_id = %order_id, user_id = %user_id, "cancel refused, not owner");
            return Err(BinmatchError::Forbidden(order_id));
        }

        if let Err(err) = self.gateway.cancel_order(order_id).await {
            tracing::error!(order_id = %order_id, error = %err, "failed to persist cancel");
            return Err(into_persistence(err));
        }
        let removed = self.book.remove(&order_id);
        tracing::info!(
            order_id = %order_id,
            user_id = %user_id,
            remaining = ?removed.as_ref().map(|o| o.remaining_size),
            "order cancelled"
        );

        self.events.publish(EngineEvent::OrderCancelled {
            market_id: self.market.id,
            order_id,
            user_id,
        });
        self.publish_book();
        Ok(CancelOutcome::Cancelled)
    }
}

fn checked_sum(total: Decimal, delta: Decimal) -> Result<Decimal> {
    total
        .checked_add(delta)
        .ok_or_else(|| BinmatchError::overflow("trade volume"))
}

/// Store errors surface to callers as persistence failures.
fn into_persistence(err: BinmatchError) -> BinmatchError {
    match err {
        BinmatchError::PersistenceFailure { .. } => err,
        other => BinmatchError::persistence(other.to_string()),
    }
}
