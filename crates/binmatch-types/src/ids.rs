//! Identifiers used throughout binmatch.
//!
//! Entity IDs are UUIDv7, so they sort by creation time. Trade IDs are
//! derived from the taker order and fill sequence so that replaying the
//! same match yields the same IDs.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Fresh time-ordered ID.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            #[must_use]
            pub fn from_bytes(bytes: [u8; 16]) -> Self {
                Self(Uuid::from_bytes(bytes))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

uuid_id!(
    /// An order, resting or not.
    OrderId,
    ""
);
uuid_id!(
    /// The account that owns orders and positions.
    UserId,
    ""
);
uuid_id!(
    /// A binary-outcome market.
    MarketId,
    "mkt:"
);
uuid_id!(TradeId, "");

impl OrderId {
    /// Milliseconds since the UNIX epoch embedded in a UUIDv7.
    #[must_use]
    pub fn timestamp_ms(&self) -> u64 {
        let b = self.0.as_bytes();
        u64::from_be_bytes([0, 0, b[0], b[1], b[2], b[3], b[4], b[5]])
    }
}

impl TradeId {
    /// The `fill_sequence`-th fill of `taker_order_id` always gets the same
    /// ID, so a store can recognise a re-submitted match.
    #[must_use]
    pub fn deterministic(taker_order_id: OrderId, fill_sequence: u64) -> Self {
        use sha2::{Digest, Sha256};

        let digest = Sha256::new()
            .chain_update(b"binmatch:trade_id:v1:")
            .chain_update(taker_order_id.0.as_bytes())
            .chain_update(fill_sequence.to_le_bytes())
            .finalize();
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest[..16]);
        Self(Uuid::from_bytes(bytes))
    }
}
