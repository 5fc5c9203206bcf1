//! # binmatch-matchcore
//!
//! **Pure synchronous matching core for binary YES/NO markets.**
//!
//! Everything here is in-memory and single-threaded; the engine crate
//! serializes access per market. It has:
//!
//! - **Complementary book**: YES and NO bids cross when their prices sum to 1
//! - **Price-time priority**: best price first, FIFO within a level
//! - **Plan / execute / revert**: book changes can be undone exactly
//! - **Position ledger**: weighted-average cost per user and outcome
//! - **Price oracle**: midpoint with last-trade fallback

pub mod ledger;
pub mod matcher;
pub mod oracle;
pub mod orderbook;
pub mod price_level;

pub use ledger::PositionLedger;
pub use matcher::{
    BookUndo, Execution, MatchPlan, PlannedFill, execute, match_order, plan_match,
};
pub use oracle::MarketPriceOracle;
pub use orderbook::OrderBook;
pub use price_level::PriceLevel;
