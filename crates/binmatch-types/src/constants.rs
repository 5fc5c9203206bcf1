//! System-wide constants for the binmatch matching core.

/// Maximum decimal places accepted on a limit price.
pub const MAX_PRICE_SCALE: u32 = 4;

/// Default flat platform fee, in basis points of taker notional.
pub const DEFAULT_PLATFORM_FEE_BPS: i64 = 200;

/// Spread above which the book midpoint is not trusted, in hundredths.
pub const DEFAULT_MAX_SPREAD_CENTS: i64 = 10;

/// Default per-market command queue capacity.
pub const DEFAULT_COMMAND_BUFFER: usize = 1024;

/// Default domain event broadcast capacity.
pub const DEFAULT_EVENT_BUFFER: usize = 4096;

/// Default cap on the size of a single order, in shares.
pub const DEFAULT_MAX_ORDER_SIZE: i64 = 1_000_000_000;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "binmatch";
