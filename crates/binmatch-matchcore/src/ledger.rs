//! Weighted-average-cost position ledger for one market.
//!
//! Every trade gives the taker `size` shares of `trade.outcome` at
//! `trade.price`, and the maker `size` shares of the opposite outcome at
//! `1 - trade.price`. Shares are only ever added.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use binmatch_types::{MarketId, Outcome, Position, Result, Trade, UserId};
use rust_decimal::Decimal;

/// `(UserId, Outcome) -> Position` for a single market.
#[derive(Debug)]
pub struct PositionLedger {
    pub market_id: MarketId,
    positions: HashMap<(UserId, Outcome), Position>,
}

impl PositionLedger {
    #[must_use]
    pub fn new(market_id: MarketId) -> Self {
        Self {
            market_id,
            positions: HashMap::new(),
        }
    }

    /// Seed the ledger with stored positions. Rows for other markets are
    /// ignored; returns how many were loaded.
    pub fn load(&mut self, positions: impl IntoIterator<Item = Position>) -> usize {
        let mut loaded = 0;
        for position in positions {
            if position.market_id != self.market_id {
                tracing::warn!(
                    market_id = %self.market_id,
                    foreign = %position.market_id,
                    "ignoring position for another market"
                );
                continue;
            }
            self.positions.insert(position.key(), position);
            loaded += 1;
        }
        loaded
    }

    /// Add `size` shares at `price` to the user's position, opening it if
    /// this is their first fill.
    pub fn apply_fill(
        &mut self,
        user_id: UserId,
        outcome: Outcome,
        size: Decimal,
        price: Decimal,
    ) -> Result<&Position> {
        let market_id = self.market_id;
        match self.positions.entry((user_id, outcome)) {
            Entry::Occupied(entry) => {
                let position = entry.into_mut();
                position.add(size, price)?;
                Ok(position)
            }
            Entry::Vacant(entry) => Ok(entry.insert(Position::opened(
                user_id, market_id, outcome, size, price,
            ))),
        }
    }

    /// Apply both legs of a trade, or neither.
    pub fn apply_trade(&mut self, trade: &Trade) -> Result<()> {
        let positions = self.project(std::slice::from_ref(trade))?;
        self.commit(positions);
        Ok(())
    }

    /// Final positions for every `(user, outcome)` the trades touch, as they
    /// would be after applying them, without changing the ledger.
    ///
    /// Returned in first-touch order.
    ///
    /// # Errors
    /// `Internal` if a position total would overflow.
    pub fn project(&self, trades: &[Trade]) -> Result<Vec<Position>> {
        let mut staged: Vec<Position> = Vec::new();
        for trade in trades {
            for (user, outcome, size, price) in legs(trade) {
                if let Some(pos) = staged
                    .iter_mut()
                    .find(|p| p.user_id == user && p.outcome == outcome)
                {
                    pos.add(size, price)?;
                    continue;
                }
                let next = match self.positions.get(&(user, outcome)) {
                    Some(existing) => {
                        let mut pos = existing.clone();
                        pos.add(size, price)?;
                        pos
                    }
                    None => Position::opened(user, self.market_id, outcome, size, price),
                };
                staged.push(next);
            }
        }
        Ok(staged)
    }

    /// Install positions produced by [`PositionLedger::project`].
    pub fn commit(&mut self, positions: Vec<Position>) {
        for position in positions {
            self.positions.insert(position.key(), position);
        }
    }

    #[must_use]
    pub fn get(&self, user_id: UserId, outcome: Outcome) -> Option<&Position> {
        self.positions.get(&(user_id, outcome))
    }

    /// Both outcome positions of a user, YES first.
    #[must_use]
    pub fn positions_for_user(&self, user_id: UserId) -> Vec<&Position> {
        [Outcome::Yes, Outcome::No]
            .into_iter()
            .filter_map(|outcome| self.get(user_id, outcome))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// `(user, outcome, size, price)` for the taker and maker legs of a trade.
fn legs(trade: &Trade) -> [(UserId, Outcome, Decimal, Decimal); 2] {
    [
        (trade.taker_user_id, trade.outcome, trade.size, trade.price),
        (
            trade.maker_user_id,
            trade.maker_outcome(),
            trade.size,
            trade.maker_price(),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use binmatch_types::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::*;

    fn cents(n: i64) -> Decimal {
        Decimal::new(n, 2)
    }

    fn dec(n: i64) -> Decimal {
        Decimal::new(n, 0)
    }

    fn market() -> MarketId {
        MarketId::from_bytes([1; 16])
    }

    fn trade(taker: UserId, maker: UserId, outcome: Outcome, price: Decimal, size: i64) -> Trade {
        let taker_order = OrderId::new();
        Trade {
            id: TradeId::deterministic(taker_order, 0),
            market_id: market(),
            maker_order_id: OrderId::new(),
            taker_order_id: Some(taker_order),
            maker_user_id: maker,
            taker_user_id: taker,
            outcome,
            price,
            size: dec(size),
            fee: Decimal::ZERO,
            maker_fee: Decimal::ZERO,
            taker_fee: Decimal::ZERO,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn first_fill_opens_position() {
        let mut ledger = PositionLedger::new(market());
        let user = UserId::new();
        let pos = ledger.apply_fill(user, Outcome::Yes, dec(10), cents(60)).unwrap();
        assert_eq!(pos.shares, dec(10));
        assert_eq!(pos.avg_price, cents(60));
        assert_eq!(pos.total_cost, dec(6));
    }

    #[test]
    fn subsequent_fills_average() {
        let mut ledger = PositionLedger::new(market());
        let user = UserId::new();
        ledger.apply_fill(user, Outcome::No, dec(10), cents(40)).unwrap();
        let pos = ledger.apply_fill(user, Outcome::No, dec(30), cents(20)).unwrap();
        assert_eq!(pos.shares, dec(40));
        assert_eq!(pos.total_cost, dec(10));
        assert_eq!(pos.avg_price, Decimal::new(25, 2));
        assert_eq!(pos.total_cost, pos.shares * pos.avg_price);
    }

    #[test]
    fn trade_credits_both_legs() {
        let mut ledger = PositionLedger::new(market());
        let taker = UserId::new();
        let maker = UserId::new();
        ledger
            .apply_trade(&trade(taker, maker, Outcome::No, cents(40), 10))
            .unwrap();

        let t = ledger.get(taker, Outcome::No).unwrap();
        assert_eq!((t.shares, t.avg_price), (dec(10), cents(40)));
        let m = ledger.get(maker, Outcome::Yes).unwrap();
        assert_eq!((m.shares, m.avg_price), (dec(10), cents(60)));
        assert!(ledger.get(taker, Outcome::Yes).is_none());
    }

    #[test]
    fn project_does_not_mutate_and_matches_apply() {
        let mut ledger = PositionLedger::new(market());
        let taker = UserId::new();
        let maker_a = UserId::new();
        let maker_b = UserId::new();
        ledger.apply_fill(taker, Outcome::Yes, dec(5), cents(50)).unwrap();

        let trades = vec![
            trade(taker, maker_a, Outcome::Yes, cents(55), 5),
            trade(taker, maker_b, Outcome::Yes, cents(60), 10),
        ];
        let projected = ledger.project(&trades).unwrap();
        assert_eq!(projected.len(), 3);
        assert_eq!(ledger.get(taker, Outcome::Yes).unwrap().shares, dec(5));

        let taker_pos = projected
            .iter()
            .find(|p| p.user_id == taker && p.outcome == Outcome::Yes)
            .unwrap();
        assert_eq!(taker_pos.shares, dec(20));
        // 2.50 + 2.75 + 6.00
        assert_eq!(taker_pos.total_cost, Decimal::new(1125, 2));

        let mut applied = PositionLedger::new(market());
        applied.apply_fill(taker, Outcome::Yes, dec(5), cents(50)).unwrap();
        for t in &trades {
            applied.apply_trade(t).unwrap();
        }
        for p in &projected {
            assert_eq!(applied.get(p.user_id, p.outcome), Some(p));
        }

        ledger.commit(projected);
        assert_eq!(ledger.get(taker, Outcome::Yes).unwrap().shares, dec(20));
    }

    #[test]
    fn overflowing_trade_changes_nothing() {
        let mut ledger = PositionLedger::new(market());
        let taker = UserId::new();
        let maker = UserId::new();
        ledger.load([Position::opened(
            maker,
            market(),
            Outcome::Yes,
            Decimal::MAX,
            cents(10),
        )]);

        let trade = trade(taker, maker, Outcome::No, cents(40), 1);
        assert!(matches!(
            ledger.project(std::slice::from_ref(&trade)),
            Err(BinmatchError::Internal(_))
        ));
        assert!(ledger.apply_trade(&trade).is_err());
        // The taker leg alone would have applied; it must not have.
        assert!(ledger.get(taker, Outcome::No).is_none());
        assert_eq!(ledger.get(maker, Outcome::Yes).unwrap().shares, Decimal::MAX);
    }

    #[test]
    fn load_skips_foreign_markets() {
        let mut ledger = PositionLedger::new(market());
        let user = UserId::new();
        let rows = vec![
            Position::opened(user, market(), Outcome::Yes, dec(1), cents(50)),
            Position::opened(user, MarketId::from_bytes([9; 16]), Outcome::Yes, dec(1), cents(50)),
        ];
        assert_eq!(ledger.load(rows), 1);
        assert_eq!(ledger.positions_for_user(user).len(), 1);
    }
}
