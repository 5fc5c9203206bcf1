//! The complementary order book for a single binary market.
//!
//! Both sides hold buy orders: the YES side holds bids for YES shares, the
//! NO side holds bids for NO shares. A NO bid at `q` is an offer to sell
//! YES at `1 - q`, so the two sides cross when their prices sum to 1 or
//! more.
//!
//! Each side is a `BTreeMap<Reverse<Decimal>, PriceLevel>` -- highest price
//! first, which is the best price for a taker coming from the other side.
//! An auxiliary `HashMap<OrderId, (Outcome, Price)>` enables O(log N)
//! removal.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use binmatch_types::*;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::price_level::PriceLevel;

type Side = BTreeMap<Reverse<Decimal>, PriceLevel>;

/// The order book for a single market.
#[derive(Debug)]
pub struct OrderBook {
    /// The market this book serves.
    pub market_id: MarketId,
    /// YES bids: highest price first.
    yes: Side,
    /// NO bids: highest price first.
    no: Side,
    /// Fast lookup: `OrderId -> (outcome, price)`.
    index: HashMap<OrderId, (Outcome, Decimal)>,
}

impl OrderBook {
    /// Create a new empty order book for the given market.
    #[must_use]
    pub fn new(market_id: MarketId) -> Self {
        Self {
            market_id,
            yes: BTreeMap::new(),
            no: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    fn side(&self, outcome: Outcome) -> &Side {
        match outcome {
            Outcome::Yes => &self.yes,
            Outcome::No => &self.no,
        }
    }

    fn side_mut(&mut self, outcome: Outcome) -> &mut Side {
        match outcome {
            Outcome::Yes => &mut self.yes,
            Outcome::No => &mut self.no,
        }
    }

    // =================================================================
    // Insertion / removal
    // =================================================================

    /// Add a resting limit order behind all orders already at its price.
    pub fn insert(&mut self, order: Order) -> Result<()> {
        if order.market_id != self.market_id {
            return Err(BinmatchError::InvalidOrder {
                reason: format!(
                    "order {} belongs to {}, not {}",
                    order.id, order.market_id, self.market_id
                ),
            });
        }
        let Some(price) = order.price else {
            return Err(BinmatchError::InvalidPrice {
                reason: format!("resting order {} has no limit price", order.id),
            });
        };
        if order.remaining_size <= Decimal::ZERO || !order.is_active() {
            return Err(BinmatchError::InvalidOrder {
                reason: format!("order {} has nothing left to rest", order.id),
            });
        }
        if self.index.contains_key(&order.id) {
            return Err(BinmatchError::DuplicateOrder(order.id));
        }

        self.index.insert(order.id, (order.outcome, price));
        self.side_mut(order.outcome)
            .entry(Reverse(price))
            .or_insert_with(|| PriceLevel::new(price))
            .push_back(order);
        Ok(())
    }

    /// Remove an order from whichever side holds it.
    ///
    /// Returns `None` if the order is not resting; removing twice is fine.
    pub fn remove(&mut self, order_id: &OrderId) -> Option<Order> {
        let (outcome, price) = self.index.remove(order_id)?;
        let side = self.side_mut(outcome);
        let level = side.get_mut(&Reverse(price))?;
        let order = level.take(order_id);
        if level.is_empty() {
            side.remove(&Reverse(price));
        }
        order
    }

    // =================================================================
    // Fills (driven by the matcher)
    // =================================================================

    /// Fill `size` of a resting order, dropping it from the book once it
    /// is exhausted. Returns the order as it was before the fill so the
    /// caller can undo with [`OrderBook::restore`].
    pub fn apply_fill(
        &mut self,
        order_id: &OrderId,
        size: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Order> {
        let (outcome, price) = *self
            .index
            .get(order_id)
            .ok_or(BinmatchError::OrderNotFound(*order_id))?;
        let side = self.side_mut(outcome);
        let level = side
            .get_mut(&Reverse(price))
            .ok_or(BinmatchError::OrderNotFound(*order_id))?;
        let order = level
            .get_mut(order_id)
            .ok_or(BinmatchError::OrderNotFound(*order_id))?;

        if size <= Decimal::ZERO || size > order.remaining_size {
            return Err(BinmatchError::Internal(format!(
                "fill of {size} against order {order_id} with {} remaining",
                order.remaining_size
            )));
        }

        let prior = order.clone();
        order.fill(size, now);
        let exhausted = order.is_filled();

        if exhausted {
            level.take(order_id);
            if level.is_empty() {
                side.remove(&Reverse(price));
            }
            self.index.remove(order_id);
        }
        Ok(prior)
    }

    /// Put an order back exactly as given.
    ///
    /// If it is still resting its state is overwritten in place; otherwise
    /// it goes back to the *front* of its level. Restoring fills in reverse
    /// order therefore recreates the original queue.
    pub fn restore(&mut self, prior: Order) {
        let id = prior.id;
        if let Some((outcome, price)) = self.index.get(&id).copied() {
            if let Some(existing) = self
                .side_mut(outcome)
                .get_mut(&Reverse(price))
                .and_then(|level| level.get_mut(&id))
            {
                *existing = prior;
                return;
            }
        }
        let price = prior.limit_price();
        let outcome = prior.outcome;
        self.index.insert(id, (outcome, price));
        self.side_mut(outcome)
            .entry(Reverse(price))
            .or_insert_with(|| PriceLevel::new(price))
            .push_front(prior);
    }

    // =================================================================
    // Queries
    // =================================================================

    /// Resting orders a taker on `outcome` would trade against,
    /// best price first, then oldest first.
    pub fn best_opposite(&self, outcome: Outcome) -> impl Iterator<Item = &Order> {
        self.resting(outcome.opposite())
    }

    /// Resting orders on `outcome`'s own side in book order.
    pub fn resting(&self, outcome: Outcome) -> impl Iterator<Item = &Order> {
        self.side(outcome)
            .values()
            .flat_map(|level| level.orders.iter())
    }

    /// Price levels of one side, best first.
    pub fn levels(&self, outcome: Outcome) -> impl Iterator<Item = &PriceLevel> {
        self.side(outcome).values()
    }

    /// Highest resting price on one side, `None` if empty.
    #[must_use]
    pub fn best_price(&self, outcome: Outcome) -> Option<Decimal> {
        self.side(outcome).keys().next().map(|r| r.0)
    }

    /// Best YES bid, or 0 when the YES side is empty ("no quote").
    #[must_use]
    pub fn best_bid(&self) -> Decimal {
        self.best_price(Outcome::Yes).unwrap_or(Decimal::ZERO)
    }

    /// Best YES ask, `1 - best NO bid`, or 0 when the NO side is empty.
    #[must_use]
    pub fn best_ask(&self) -> Decimal {
        self.best_price(Outcome::No)
            .map_or(Decimal::ZERO, |q| Decimal::ONE - q)
    }

    /// Total resting size on one side, saturating at `Decimal::MAX`. No
    /// order can ask for more than that, so fillability checks stay exact.
    #[must_use]
    pub fn side_size(&self, outcome: Outcome) -> Decimal {
        self.side(outcome)
            .values()
            .map(PriceLevel::total_size)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }

    #[must_use]
    pub fn get(&self, order_id: &OrderId) -> Option<&Order> {
        let (outcome, price) = self.index.get(order_id)?;
        self.side(*outcome)
            .get(&Reverse(*price))?
            .orders
            .iter()
            .find(|o| o.id == *order_id)
    }

    /// Check if an order is resting in the book.
    #[must_use]
    pub fn contains(&self, order_id: &OrderId) -> bool {
        self.index.contains_key(order_id)
    }

    /// Total number of resting orders.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.index.len()
    }

    /// Number of distinct price levels on one side.
    #[must_use]
    pub fn level_count(&self, outcome: Outcome) -> usize {
        self.side(outcome).len()
    }

    /// Returns `true` if the book has no orders on either side.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Every resting order on both sides, in book order.
    #[must_use]
    pub fn snapshot(&self) -> BookSnapshot {
        BookSnapshot {
            market_id: self.market_id,
            yes: self.resting(Outcome::Yes).map(BookEntry::from).collect(),
            no: self.resting(Outcome::No).map(BookEntry::from).collect(),
        }
    }

    /// Aggregated size per price for the best `max_levels` levels of one side.
    #[must_use]
    pub fn depth(&self, outcome: Outcome, max_levels: usize) -> Vec<DepthLevel> {
        self.levels(outcome)
            .take(max_levels)
            .map(|level| DepthLevel {
                price: level.price,
                size: level.total_size(),
                orders: level.len(),
            })
            .collect()
    }
}
