//! Admission checks for incoming orders.
//!
//! Runs before anything touches the book and fails fast with the first
//! violation. No side effects.

use binmatch_types::{
    BinmatchError, EngineConfig, Market, MarketStatus, OrderRequest, OrderType, Result,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Check `request` against its market and the engine limits.
///
/// # Errors
/// The first failing check, in this order: market existence, market
/// status, end date, size, price.
pub fn validate_request(
    request: &OrderRequest,
    market: Option<&Market>,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> Result<()> {
    let market = market.ok_or(BinmatchError::MarketNotFound(request.market_id))?;
    if market.id != request.market_id {
        return Err(BinmatchError::InvalidOrder {
            reason: format!(
                "request for {} routed to market {}",
                request.market_id, market.id
            ),
        });
    }
    if market.status != MarketStatus::Active {
        return Err(BinmatchError::MarketInactive {
            market_id: market.id,
            status: market.status,
        });
    }
    if market.end_date <= now {
        return Err(BinmatchError::MarketEnded(market.id));
    }

    if request.size <= Decimal::ZERO || request.size > config.max_order_size {
        return Err(BinmatchError::InvalidSize { size: request.size });
    }

    if request.order_type == OrderType::Limit {
        validate_price(request.price, config.max_price_scale)?;
    }
    Ok(())
}

fn validate_price(price: Option<Decimal>, max_scale: u32) -> Result<()> {
    let price = price.ok_or_else(|| BinmatchError::InvalidPrice {
        reason: "limit order requires a price".into(),
    })?;
    if price <= Decimal::ZERO || price >= Decimal::ONE {
        return Err(BinmatchError::InvalidPrice {
            reason: format!("{price} is outside (0, 1)"),
        });
    }
    // 0.6000 and 0.6 are the same price.
    if price.normalize().scale() > max_scale {
        return Err(BinmatchError::InvalidPrice {
            reason: format!("{price} has more than {max_scale} decimal places"),
        });
    }
    Ok(())
}
