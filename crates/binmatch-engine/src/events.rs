//! Domain events published by the market actors.
//!
//! Fan-out is a `tokio::sync::broadcast` channel: every subscriber sees
//! every event sent after it subscribed. Slow subscribers lag and lose
//! the oldest events, they never block matching.

use binmatch_types::{MarketId, OrderId, OrderStatus, Outcome, Trade, UserId};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// An order passed validation and was durably recorded.
    OrderAccepted {
        market_id: MarketId,
        order_id: OrderId,
        user_id: UserId,
        outcome: Outcome,
        status: OrderStatus,
    },
    TradeExecuted { trade: Trade },
    OrderCancelled {
        market_id: MarketId,
        order_id: OrderId,
        user_id: UserId,
    },
    /// Top of book and oracle price after a change.
    BookUpdated {
        market_id: MarketId,
        best_bid: Decimal,
        best_ask: Decimal,
        price: Decimal,
    },
}

impl EngineEvent {
    #[must_use]
    pub fn market_id(&self) -> MarketId {
        match self {
            Self::OrderAccepted { market_id, .. }
            | Self::OrderCancelled { market_id, .. }
            | Self::BookUpdated { market_id, .. } => *market_id,
            Self::TradeExecuted { trade } => trade.market_id,
        }
    }
}

/// Cloneable publisher side of the event channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    /// Send to all current subscribers. Having none is not an error.
    pub fn publish(&self, event: EngineEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("event dropped, no subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_in_order() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let market_id = MarketId::new();
        let order_id = OrderId::new();
        let user_id = UserId::new();

        bus.publish(EngineEvent::OrderCancelled {
            market_id,
            order_id,
            user_id,
        });
        bus.publish(EngineEvent::BookUpdated {
            market_id,
            best_bid: Decimal::ZERO,
            best_ask: Decimal::ZERO,
            price: Decimal::new(5, 1),
        });

        let first = rx.recv().await.unwrap();
        assert!(matches!(first, EngineEvent::OrderCancelled { .. }));
        assert_eq!(first.market_id(), market_id);
        assert!(matches!(rx.recv().await.unwrap(), EngineEvent::BookUpdated { .. }));
    }

    #[test]
    fn publish_without_subscribers_is_fine() {
        let bus = EventBus::new(1);
        bus.publish(EngineEvent::OrderCancelled {
            market_id: MarketId::new(),
            order_id: OrderId::new(),
            user_id: UserId::new(),
        });
    }

    #[test]
    fn serializes_with_type_tag() {
        let event = EngineEvent::OrderCancelled {
            market_id: MarketId::from_bytes([1; 16]),
            order_id: OrderId::from_bytes([2; 16]),
            user_id: UserId::from_bytes([3; 16]),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "order_cancelled");
    }
}
