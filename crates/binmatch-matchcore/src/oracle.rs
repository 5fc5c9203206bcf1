//! Single displayable YES price for a market.

use binmatch_types::{OracleConfig, Outcome};
use rust_decimal::Decimal;

use crate::OrderBook;

/// Derives a market price from the top of the book.
///
/// - both sides empty: the uninformed prior
/// - one side empty, or `ask - bid` wider than `max_spread`: the last
///   traded price, or the prior if the market never traded
/// - otherwise the midpoint of bid and ask
#[derive(Debug, Clone, Default)]
pub struct MarketPriceOracle {
    config: OracleConfig,
}

impl MarketPriceOracle {
    #[must_use]
    pub fn new(config: OracleConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn price(&self, book: &OrderBook, last_traded: Option<Decimal>) -> Decimal {
        let fallback = last_traded.unwrap_or(self.config.uninformed_price);

        let has_yes = book.best_price(Outcome::Yes).is_some();
        let has_no = book.best_price(Outcome::No).is_some();
        match (has_yes, has_no) {
            (false, false) => self.config.uninformed_price,
            (true, true) => {
                let bid = book.best_bid();
                let ask = book.best_ask();
                if ask - bid > self.config.max_spread {
                    fallback
                } else {
                    (bid + ask) / Decimal::TWO
                }
            }
            _ => fallback,
        }
    }

    /// `ask - bid`, or `None` unless both sides quote.
    #[must_use]
    pub fn spread(book: &OrderBook) -> Option<Decimal> {
        book.best_price(Outcome::Yes)?;
        book.best_price(Outcome::No)?;
        Some(book.best_ask() - book.best_bid())
    }
}

#[cfg(test)]
mod tests {
    use binmatch_types::*;

    use super::*;

    fn cents(n: i64) -> Decimal {
        Decimal::new(n, 2)
    }

    fn book_with(yes: &[i64], no: &[i64]) -> OrderBook {
        let mut book = OrderBook::new(MarketId::from_bytes([1; 16]));
        for &p in yes {
            book.insert(Order::dummy_limit(Outcome::Yes, cents(p), Decimal::TEN))
                .unwrap();
        }
        for &p in no {
            book.insert(Order::dummy_limit(Outcome::No, cents(p), Decimal::TEN))
                .unwrap();
        }
        book
    }

    #[test]
    fn empty_book_is_uninformed() {
        let oracle = MarketPriceOracle::default();
        let book = book_with(&[], &[]);
        assert_eq!(oracle.price(&book, Some(cents(80))), cents(50));
    }

    #[test]
    fn one_sided_book_uses_last_trade_or_prior() {
        let oracle = MarketPriceOracle::default();
        let book = book_with(&[60], &[]);
        assert_eq!(oracle.price(&book, None), cents(50));
        assert_eq!(oracle.price(&book, Some(cents(42))), cents(42));

        let book = book_with(&[], &[30]);
        assert_eq!(oracle.price(&book, Some(cents(71))), cents(71));
    }

    #[test]
    fn tight_spread_is_midpoint() {
        let oracle = MarketPriceOracle::default();
        // bid 0.55, ask 1 - 0.40 = 0.60
        let book = book_with(&[55, 50], &[40]);
        assert_eq!(MarketPriceOracle::spread(&book), Some(cents(5)));
        assert_eq!(oracle.price(&book, Some(cents(10))), Decimal::new(575, 3));
    }

    #[test]
    fn spread_at_threshold_still_midpoint() {
        let oracle = MarketPriceOracle::default();
        // bid 0.50, ask 0.60
        let book = book_with(&[50], &[40]);
        assert_eq!(oracle.price(&book, Some(cents(10))), cents(55));
    }

    #[test]
    fn wide_spread_falls_back() {
        let oracle = MarketPriceOracle::default();
        // bid 0.30, ask 0.80
        let book = book_with(&[30], &[20]);
        assert_eq!(oracle.price(&book, Some(cents(65))), cents(65));
        assert_eq!(oracle.price(&book, None), cents(50));
    }

    #[test]
    fn configurable_threshold() {
        let oracle = MarketPriceOracle::new(OracleConfig {
            max_spread: cents(60),
            uninformed_price: cents(50),
        });
        let book = book_with(&[30], &[20]);
        assert_eq!(oracle.price(&book, Some(cents(65))), cents(55));
    }
}
