//! Price-time priority matching for binary markets.
//!
//! Matching happens in two steps so the caller can decide when state
//! changes become visible:
//!
//! ```text
//! plan_match(&OrderBook, &Order)        -> MatchPlan   (read-only)
//! execute(&mut OrderBook, Order, plan)  -> Execution   (mutates the book)
//! OrderBook::revert(execution.undo)                    (compensates)
//! ```
//!
//! ## Compatibility
//!
//! An incoming order on outcome O with limit P trades against a resting
//! order on the other outcome at Rp iff `Rp + P >= 1`: the taker pays
//! `1 - Rp`, never more than its limit. Execution is always at the maker's
//! resting price. Market orders accept every resting price but must be
//! fillable in full, otherwise nothing happens.

use binmatch_types::{
    BinmatchError, FeeConfig, Order, OrderFill, OrderId, OrderStatus, OrderType, Result, Trade,
    TradeId, UserId,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::OrderBook;

/// One fill the planner intends to execute.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedFill {
    pub maker_order_id: OrderId,
    pub maker_user_id: UserId,
    /// The maker's resting price on the opposite outcome.
    pub maker_price: Decimal,
    pub size: Decimal,
}

impl PlannedFill {
    /// What the taker pays per share.
    #[must_use]
    pub fn taker_price(&self) -> Decimal {
        Decimal::ONE - self.maker_price
    }
}

/// The result of walking the book for one incoming order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchPlan {
    pub fills: Vec<PlannedFill>,
    pub matched: Decimal,
    pub unfilled: Decimal,
}

/// Walk the opposite side of the book for `taker` without mutating it.
///
/// # Errors
/// [`BinmatchError::UnfillableMarketOrder`] if `taker` is a market order and
/// the opposite side holds less than its full size.
pub fn plan_match(book: &OrderBook, taker: &Order) -> Result<MatchPlan> {
    let opposite = taker.outcome.opposite();

    if taker.order_type == OrderType::Market {
        let available = book.side_size(opposite);
        if available < taker.remaining_size {
            return Err(BinmatchError::UnfillableMarketOrder {
                requested: taker.remaining_size,
                available,
            });
        }
    }

    let mut plan = MatchPlan {
        unfilled: taker.remaining_size,
        ..MatchPlan::default()
    };

    for maker in book.best_opposite(taker.outcome) {
        if plan.unfilled.is_zero() {
            break;
        }
        let maker_price = maker.limit_price();
        // Book order: once one resting price is unacceptable, all later ones are too.
        if !taker.accepts_resting_price(maker_price) {
            break;
        }

        let size = plan.unfilled.min(maker.remaining_size);
        tracing::trace!(
            taker = %taker.id,
            maker = %maker.id,
            %maker_price,
            %size,
            "planned fill"
        );
        plan.fills.push(PlannedFill {
            maker_order_id: maker.id,
            maker_user_id: maker.user_id,
            maker_price,
            size,
        });
        plan.matched += size;
        plan.unfilled -= size;
    }

    Ok(plan)
}

/// Everything needed to undo an [`Execution`] on the book.
#[derive(Debug, Clone, Default)]
pub struct BookUndo {
    /// Maker orders as they were before each fill, in fill order.
    priors: Vec<Order>,
    /// The taker's remainder, if it was left resting.
    rested: Option<OrderId>,
}

impl OrderBook {
    /// Undo an execution, restoring every consumed maker at its original
    /// queue position and withdrawing the taker's resting remainder.
    pub fn revert(&mut self, undo: BookUndo) {
        if let Some(id) = undo.rested {
            self.remove(&id);
        }
        for prior in undo.priors.into_iter().rev() {
            self.restore(prior);
        }
    }
}

/// The outcome of applying a plan to the book.
#[derive(Debug, Clone)]
pub struct Execution {
    /// The taker order after all fills.
    pub taker: Order,
    pub trades: Vec<Trade>,
    pub maker_fills: Vec<OrderFill>,
    pub undo: BookUndo,
}

impl Execution {
    #[must_use]
    pub fn matched(&self) -> Decimal {
        self.trades.iter().map(|t| t.size).sum()
    }

    /// `true` if the taker's remainder was added to the book.
    #[must_use]
    pub fn rested(&self) -> bool {
        self.undo.rested.is_some()
    }
}

/// Apply `plan` to `book`: fill makers, build trades, rest any limit
/// remainder. On error the book is left exactly as it was.
pub fn execute(
    book: &mut OrderBook,
    mut taker: Order,
    plan: &MatchPlan,
    fees: &FeeConfig,
    now: DateTime<Utc>,
) -> Result<Execution> {
    let mut undo = BookUndo::default();
    let mut trades = Vec::with_capacity(plan.fills.len());
    let mut maker_fills = Vec::with_capacity(plan.fills.len());

    for (seq, fill) in (0u64..).zip(&plan.fills) {
        let prior = match book.apply_fill(&fill.maker_order_id, fill.size, now) {
            Ok(prior) => prior,
            Err(err) => {
                book.revert(undo);
                return Err(err);
            }
        };
        let new_status = if prior.remaining_size == fill.size {
            OrderStatus::Filled
        } else {
            prior.status
        };
        undo.priors.push(prior);

        taker.fill(fill.size, now);
        let trade = build_trade(&taker, fill, seq, fees, now);
        maker_fills.push(OrderFill {
            order_id: fill.maker_order_id,
            filled_delta: fill.size,
            new_status,
        });
        trades.push(trade);
    }

    if taker.remaining_size > Decimal::ZERO {
        match taker.order_type {
            OrderType::Limit => {
                if let Err(err) = book.insert(taker.clone()) {
                    book.revert(undo);
                    return Err(err);
                }
                undo.rested = Some(taker.id);
            }
            OrderType::Market => {
                book.revert(undo);
                return Err(BinmatchError::UnfillableMarketOrder {
                    requested: taker.original_size,
                    available: taker.filled_size,
                });
            }
        }
    }

    Ok(Execution {
        taker,
        trades,
        maker_fills,
        undo,
    })
}

/// Plan and execute in one step.
pub fn match_order(
    book: &mut OrderBook,
    taker: Order,
    fees: &FeeConfig,
    now: DateTime<Utc>,
) -> Result<Execution> {
    let plan = plan_match(book, &taker)?;
    execute(book, taker, &plan, fees, now)
}

fn build_trade(
    taker: &Order,
    fill: &PlannedFill,
    seq: u64,
    fees: &FeeConfig,
    now: DateTime<Utc>,
) -> Trade {
    let price = fill.taker_price();
    let notional = price * fill.size;
    let maker_notional = fill.maker_price * fill.size;
    Trade {
        id: TradeId::deterministic(taker.id, seq),
        market_id: taker.market_id,
        maker_order_id: fill.maker_order_id,
        taker_order_id: Some(taker.id),
        maker_user_id: fill.maker_user_id,
        taker_user_id: taker.user_id,
        outcome: taker.outcome,
        price,
        size: fill.size,
        fee: notional * fees.platform_fee_rate,
        maker_fee: maker_notional * fees.maker_fee_rate,
        taker_fee: notional * fees.taker_fee_rate,
        created_at: now,
    }
}
