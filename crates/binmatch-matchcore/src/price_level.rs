//! FIFO queue of resting orders sharing one price.

use std::collections::VecDeque;

use binmatch_types::{Order, OrderId};
use rust_decimal::Decimal;

/// Orders at one price on one side of the book. The front of `orders` is
/// the oldest order and trades first.
#[derive(Debug, Clone)]
pub struct PriceLevel {
    pub price: Decimal,
    pub orders: VecDeque<Order>,
}

impl PriceLevel {
    #[must_use]
    pub fn new(price: Decimal) -> Self {
        Self {
            price,
            orders: VecDeque::new(),
        }
    }

    /// Queue a newly resting order behind everything already here.
    pub fn push_back(&mut self, order: Order) {
        self.orders.push_back(order);
    }

    /// Re-queue an order ahead of everything here. Only used to undo a
    /// fill that exhausted it.
    pub fn push_front(&mut self, order: Order) {
        self.orders.push_front(order);
    }

    #[must_use]
    pub fn front(&self) -> Option<&Order> {
        self.orders.front()
    }

    /// Shares still open at this price, saturating at `Decimal::MAX`.
    #[must_use]
    pub fn total_size(&self) -> Decimal {
        self.orders
            .iter()
            .map(|o| o.remaining_size)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }

    pub fn get_mut(&mut self, order_id: &OrderId) -> Option<&mut Order> {
        self.orders.iter_mut().find(|o| o.id == *order_id)
    }

    /// Take an order out of the queue wherever it sits.
    pub fn take(&mut self, order_id: &OrderId) -> Option<Order> {
        let at = self.orders.iter().position(|o| o.id == *order_id)?;
        self.orders.remove(at)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }
}

#[cfg(test)]
mod tests {
    use binmatch_types::*;

    use super::*;

    fn order(size: i64) -> Order {
        Order::dummy_limit(Outcome::No, Decimal::new(35, 2), Decimal::new(size, 0))
    }

    #[test]
    fn oldest_is_at_front() {
        let mut level = PriceLevel::new(Decimal::new(35, 2));
        let first = order(1);
        let first_id = first.id;
        level.push_back(first);
        level.push_back(order(1));

        assert_eq!(level.len(), 2);
        assert_eq!(level.front().map(|o| o.id), Some(first_id));
    }

    #[test]
    fn push_front_jumps_the_queue() {
        let mut level = PriceLevel::new(Decimal::new(35, 2));
        level.push_back(order(1));
        let restored = order(2);
        let restored_id = restored.id;
        level.push_front(restored);
        assert_eq!(level.front().map(|o| o.id), Some(restored_id));
    }

    #[test]
    fn total_size_sums_remaining() {
        let mut level = PriceLevel::new(Decimal::new(35, 2));
        let mut partly = order(5);
        partly.fill(Decimal::TWO, chrono::Utc::now());
        level.push_back(partly);
        level.push_back(order(3));
        assert_eq!(level.total_size(), Decimal::new(6, 0));
    }

    #[test]
    fn total_size_saturates() {
        let mut level = PriceLevel::new(Decimal::new(35, 2));
        level.push_back(order(1));
        let mut huge = order(1);
        huge.original_size = Decimal::MAX;
        huge.remaining_size = Decimal::MAX;
        level.push_back(huge);
        assert_eq!(level.total_size(), Decimal::MAX);
    }

    #[test]
    fn take_from_middle() {
        let mut level = PriceLevel::new(Decimal::new(35, 2));
        let ids: Vec<OrderId> = (0..3)
            .map(|_| {
                let o = order(1);
                let id = o.id;
                level.push_back(o);
                id
            })
            .collect();

        assert_eq!(level.take(&ids[1]).map(|o| o.id), Some(ids[1]));
        let left: Vec<OrderId> = level.orders.iter().map(|o| o.id).collect();
        assert_eq!(left, vec![ids[0], ids[2]]);
        assert!(level.take(&OrderId::new()).is_none());
    }

    #[test]
    fn empty_level() {
        let level = PriceLevel::new(Decimal::new(35, 2));
        assert!(level.is_empty());
        assert_eq!(level.total_size(), Decimal::ZERO);
        assert!(level.front().is_none());
    }
}
