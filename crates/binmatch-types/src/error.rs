//! Error types for the binmatch matching core.
//!
//! All errors use the `BM_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Order validation errors
//! - 2xx: Order lookup / ownership errors
//! - 5xx: Matching errors
//! - 6xx: Persistence errors
//! - 9xx: General / internal errors

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{MarketId, MarketStatus, OrderId};

/// Central error enum for all binmatch operations.
#[derive(Debug, Error)]
pub enum BinmatchError {
    // =================================================================
    // Validation Errors (1xx)
    // =================================================================
    /// The market does not exist in the store.
    #[error("BM_ERR_100: Market not found: {0}")]
    MarketNotFound(MarketId),

    /// The market exists but is not accepting orders.
    #[error("BM_ERR_101: Market {market_id} is not active (status {status})")]
    MarketInactive {
        market_id: MarketId,
        status: MarketStatus,
    },

    /// The market's end date has passed.
    #[error("BM_ERR_102: Market {0} has ended")]
    MarketEnded(MarketId),

    /// Limit price missing, outside `(0, 1)` or too precise.
    #[error("BM_ERR_103: Invalid price: {reason}")]
    InvalidPrice { reason: String },

    /// Size is zero, negative or above the configured maximum.
    #[error("BM_ERR_104: Invalid size: {size}")]
    InvalidSize { size: Decimal },

    /// Any other structural problem with an order.
    #[error("BM_ERR_105: Invalid order: {reason}")]
    InvalidOrder { reason: String },

    /// An order with this ID is already resting.
    #[error("BM_ERR_106: Order already exists: {0}")]
    DuplicateOrder(OrderId),

    // =================================================================
    // Order Lookup Errors (2xx)
    // =================================================================
    /// The requested order is not known.
    #[error("BM_ERR_200: Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The order belongs to a different user.
    #[error("BM_ERR_201: Order {0} is owned by another user")]
    Forbidden(OrderId),

    // =================================================================
    // Matching Errors (5xx)
    // =================================================================
    /// A market order could not be filled completely from resting depth.
    #[error(
        "BM_ERR_500: Cannot completely fill market order: requested {requested}, available {available}"
    )]
    UnfillableMarketOrder {
        requested: Decimal,
        available: Decimal,
    },

    // =================================================================
    // Persistence Errors (6xx)
    // =================================================================
    /// The durable store rejected or failed a write.
    #[error("BM_ERR_600: Persistence failure: {reason}")]
    PersistenceFailure { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// The market's matching task is gone or not accepting commands.
    #[error("BM_ERR_900: Engine unavailable for {0}")]
    EngineUnavailable(MarketId),

    /// Unrecoverable internal error.
    #[error("BM_ERR_901: Internal error: {0}")]
    Internal(String),

    /// Configuration error (invalid config file, bad values, etc.).
    #[error("BM_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// Serialization / deserialization error.
    #[error("BM_ERR_903: Serialization error: {0}")]
    Serialization(String),

    /// I/O error.
    #[error("BM_ERR_904: I/O error: {0}")]
    Io(String),
}

impl BinmatchError {
    /// Shorthand for a persistence failure.
    pub fn persistence(reason: impl Into<String>) -> Self {
        Self::PersistenceFailure {
            reason: reason.into(),
        }
    }

    /// An accumulator left the representable range.
    pub fn overflow(what: &str) -> Self {
        Self::Internal(format!("arithmetic overflow in {what}"))
    }

    /// The caller's request was refused; nothing changed. Maps to 4xx.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::MarketNotFound(_)
                | Self::MarketInactive { .. }
                | Self::MarketEnded(_)
                | Self::InvalidPrice { .. }
                | Self::InvalidSize { .. }
                | Self::InvalidOrder { .. }
                | Self::DuplicateOrder(_)
                | Self::OrderNotFound(_)
                | Self::Forbidden(_)
                | Self::UnfillableMarketOrder { .. }
        )
    }

    /// The core failed to process the request. Maps to 5xx.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !self.is_rejection()
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, BinmatchError>;

impl From<std::io::Error> for BinmatchError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for BinmatchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
