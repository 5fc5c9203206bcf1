//! # binmatch-types
//!
//! Shared types, errors, and configuration for the **binmatch**
//! binary-outcome matching core.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`OrderId`], [`UserId`], [`MarketId`], [`TradeId`]
//! - **Order model**: [`Order`], [`OrderRequest`], [`Outcome`], [`OrderType`], [`OrderStatus`]
//! - **Trade model**: [`Trade`]
//! - **Positions**: [`Position`]
//! - **Markets**: [`Market`], [`MarketStatus`], [`MarketStatsUpdate`]
//! - **Book views**: [`BookSnapshot`], [`BookEntry`], [`DepthLevel`]
//! - **Results**: [`FillSummary`], [`CancelOutcome`], [`MatchRecord`]
//! - **Configuration**: [`EngineConfig`], [`FeeConfig`], [`OracleConfig`]
//! - **Errors**: [`BinmatchError`] with `BM_ERR_` prefix codes

pub mod book;
pub mod config;
pub mod constants;
pub mod error;
pub mod fill;
pub mod ids;
pub mod market;
pub mod order;
pub mod position;
pub mod record;
pub mod trade;

// Re-export all primary types at crate root for ergonomic imports:
//   use binmatch_types::{Order, Outcome, Trade, ...};

pub use book::*;
pub use config::*;
pub use error::*;
pub use fill::*;
pub use ids::*;
pub use market::*;
pub use order::*;
pub use position::*;
pub use record::*;
pub use trade::*;

// Constants are accessed via `binmatch_types::constants::FOO`
// (not re-exported to avoid name collisions).
