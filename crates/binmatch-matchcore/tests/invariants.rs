//! Integration test: book and ledger invariants under random order flow.
//!
//! Thousands of seeded limit and market orders are pushed through one
//! book; after every step the size, price and share-conservation
//! invariants must still hold.

use std::collections::HashMap;

use binmatch_matchcore::{MarketPriceOracle, OrderBook, PositionLedger, match_order};
use binmatch_types::*;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

fn market() -> MarketId {
    MarketId::from_bytes([1; 16])
}

fn random_order(rng: &mut StdRng, users: &[UserId], sequence: u64) -> Order {
    let user = users[rng.gen_range(0..users.len())];
    let outcome = Outcome::from(rng.gen_bool(0.5));
    let size = Decimal::new(rng.gen_range(1..=50), 0);
    let request = if rng.gen_bool(0.15) {
        OrderRequest::market(user, market(), outcome, size)
    } else {
        let price = Decimal::new(rng.gen_range(1..=99), 2);
        OrderRequest::limit(user, market(), outcome, price, size)
    };
    Order::from_request(&request, sequence, Utc::now())
}

fn assert_book_sound(book: &OrderBook) {
    for outcome in [Outcome::Yes, Outcome::No] {
        let mut last_price: Option<Decimal> = None;
        for order in book.resting(outcome) {
            assert!(order.is_active(), "resting order must be active");
            assert!(order.sizes_consistent(), "filled + remaining == original");
            assert!(order.remaining_size > Decimal::ZERO);
            let price = order.limit_price();
            if let Some(prev) = last_price {
                assert!(price <= prev, "levels must be best price first");
            }
            last_price = Some(price);
        }
    }
    // A YES bid and a NO bid summing to 1 or more would have traded.
    if let (Some(yes), Some(no)) = (
        book.best_price(Outcome::Yes),
        book.best_price(Outcome::No),
    ) {
        assert!(yes + no < Decimal::ONE, "book left crossed: {yes} + {no}");
    }
}

#[test]
fn random_flow_preserves_invariants() {
    let mut rng = StdRng::seed_from_u64(0x00b1_4a27);
    let users: Vec<UserId> = (0..8).map(|_| UserId::new()).collect();
    let fees = FeeConfig::default();
    let oracle = MarketPriceOracle::default();

    let mut book = OrderBook::new(market());
    let mut ledger = PositionLedger::new(market());
    let mut originals: HashMap<OrderId, Decimal> = HashMap::new();
    let mut filled_against: HashMap<OrderId, Decimal> = HashMap::new();
    let mut last_traded = None;

    for seq in 0..3_000u64 {
        let order = random_order(&mut rng, &users, seq);
        originals.insert(order.id, order.original_size);
        let before = book.snapshot();

        let execution = match match_order(&mut book, order, &fees, Utc::now()) {
            Ok(execution) => execution,
            Err(BinmatchError::UnfillableMarketOrder { requested, available }) => {
                assert!(available < requested);
                assert_eq!(book.snapshot(), before, "rejected market order changed the book");
                continue;
            }
            Err(other) => panic!("unexpected error: {other}"),
        };

        assert!(execution.taker.sizes_consistent());
        for trade in &execution.trades {
            assert!(trade.price > Decimal::ZERO && trade.price < Decimal::ONE);
            assert!(trade.size > Decimal::ZERO);
            assert_eq!(trade.price + trade.maker_price(), Decimal::ONE);
            assert_eq!(trade.fee, trade.notional() * fees.platform_fee_rate);
            *filled_against.entry(trade.maker_order_id).or_default() += trade.size;
            last_traded = Some(trade.yes_price());
        }

        let projected = ledger.project(&execution.trades).unwrap();
        ledger.commit(projected);

        assert_book_sound(&book);
        let price = oracle.price(&book, last_traded);
        assert!(price > Decimal::ZERO && price < Decimal::ONE);
    }

    for (maker, filled) in &filled_against {
        assert!(
            *filled <= originals[maker],
            "maker {maker} filled {filled} beyond its size"
        );
    }

    // Every trade mints one YES share and one NO share.
    let mut yes_shares = Decimal::ZERO;
    let mut no_shares = Decimal::ZERO;
    for user in &users {
        for pos in ledger.positions_for_user(*user) {
            assert!(pos.shares >= Decimal::ZERO);
            let drift = (pos.total_cost - pos.shares * pos.avg_price).abs();
            assert!(drift < Decimal::new(1, 12), "cost basis drifted by {drift}");
            match pos.outcome {
                Outcome::Yes => yes_shares += pos.shares,
                Outcome::No => no_shares += pos.shares,
            }
        }
    }
    assert_eq!(yes_shares, no_shares);
    assert!(yes_shares > Decimal::ZERO, "seeded flow should produce trades");
}

#[test]
fn rested_remainder_sits_behind_existing_level() {
    let mut book = OrderBook::new(market());
    let fees = FeeConfig::zero();
    let first = Order::dummy_limit(Outcome::Yes, Decimal::new(60, 2), Decimal::TEN);
    let first_id = first.id;
    book.insert(first).unwrap();

    // Partially crosses nothing, rests at the same YES price.
    let second = Order::dummy_limit(Outcome::Yes, Decimal::new(60, 2), Decimal::TEN);
    let second_id = second.id;
    let exec = match_order(&mut book, second, &fees, Utc::now()).unwrap();
    assert!(exec.rested());

    let ids: Vec<OrderId> = book.resting(Outcome::Yes).map(|o| o.id).collect();
    assert_eq!(ids, vec![first_id, second_id]);
}
