//! Configuration types for the matching engine.
//!
//! Every field has a default, so an empty JSON object is a valid config.

use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{BinmatchError, Result, constants};

/// Fee rates applied to each trade. All rates are fractions of notional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeConfig {
    /// Flat platform fee on the taker notional (0.02 = 2%).
    pub platform_fee_rate: Decimal,
    /// Charged on the maker leg's notional.
    pub maker_fee_rate: Decimal,
    /// Charged on the taker leg's notional.
    pub taker_fee_rate: Decimal,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            platform_fee_rate: Decimal::new(constants::DEFAULT_PLATFORM_FEE_BPS, 4),
            maker_fee_rate: Decimal::ZERO,
            taker_fee_rate: Decimal::ZERO,
        }
    }
}

impl FeeConfig {
    /// No fees at all.
    #[must_use]
    pub fn zero() -> Self {
        Self {
            platform_fee_rate: Decimal::ZERO,
            maker_fee_rate: Decimal::ZERO,
            taker_fee_rate: Decimal::ZERO,
        }
    }
}

/// Parameters of the market price oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Spreads wider than this fall back to the last traded price.
    pub max_spread: Decimal,
    /// Price reported when nothing better is known.
    pub uninformed_price: Decimal,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            max_spread: Decimal::new(constants::DEFAULT_MAX_SPREAD_CENTS, 2),
            uninformed_price: Decimal::new(5, 1),
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub fees: FeeConfig,
    pub oracle: OracleConfig,
    /// Maximum decimal places on a limit price.
    pub max_price_scale: u32,
    /// Largest size a single order may carry.
    pub max_order_size: Decimal,
    /// Capacity of each market's command queue.
    pub command_buffer: usize,
    /// Capacity of the domain event broadcast channel.
    pub event_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fees: FeeConfig::default(),
            oracle: OracleConfig::default(),
            max_price_scale: constants::MAX_PRICE_SCALE,
            max_order_size: Decimal::new(constants::DEFAULT_MAX_ORDER_SIZE, 0),
            command_buffer: constants::DEFAULT_COMMAND_BUFFER,
            event_buffer: constants::DEFAULT_EVENT_BUFFER,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| BinmatchError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Reject values the engine cannot operate with.
    pub fn validate(&self) -> Result<()> {
        let rates = [
            ("platform_fee_rate", self.fees.platform_fee_rate),
            ("maker_fee_rate", self.fees.maker_fee_rate),
            ("taker_fee_rate", self.fees.taker_fee_rate),
        ];
        for (name, rate) in rates {
            if rate.is_sign_negative() || rate >= Decimal::ONE {
                return Err(BinmatchError::Configuration(format!(
                    "{name} must be in [0, 1), got {rate}"
                )));
            }
        }
        if self.oracle.max_spread <= Decimal::ZERO || self.oracle.max_spread >= Decimal::ONE {
            return Err(BinmatchError::Configuration(format!(
                "oracle.max_spread must be in (0, 1), got {}",
                self.oracle.max_spread
            )));
        }
        if self.oracle.uninformed_price <= Decimal::ZERO
            || self.oracle.uninformed_price >= Decimal::ONE
        {
            return Err(BinmatchError::Configuration(format!(
                "oracle.uninformed_price must be in (0, 1), got {}",
                self.oracle.uninformed_price
            )));
        }
        if self.max_price_scale == 0 || self.max_price_scale > 8 {
            return Err(BinmatchError::Configuration(format!(
                "max_price_scale must be in 1..=8, got {}",
                self.max_price_scale
            )));
        }
        if self.max_order_size <= Decimal::ZERO {
            return Err(BinmatchError::Configuration(format!(
                "max_order_size must be positive, got {}",
                self.max_order_size
            )));
        }
        if self.command_buffer == 0 || self.event_buffer == 0 {
            return Err(BinmatchError::Configuration(
                "command_buffer and event_buffer must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
