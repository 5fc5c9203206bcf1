//! # binmatch-engine
//!
//! **Async shell around the binmatch matching core.**
//!
//! Each market runs as its own tokio task that owns the market's book and
//! position ledger, so orders for one market are matched strictly in
//! arrival order while markets proceed in parallel.
//!
//! ```text
//! Exchange ──► MarketHandle ──mpsc──► MarketActor ──► PersistenceGateway
//!                                        │
//!                                        └──broadcast──► EngineEvent subscribers
//! ```
//!
//! - [`Exchange`]: public API and actor registry
//! - [`PersistenceGateway`]: the store seam, [`InMemoryGateway`] for tests
//! - [`BookLoader`]: startup rehydration
//! - [`logging::init_tracing`]: subscriber setup

pub mod actor;
pub mod events;
pub mod exchange;
pub mod gateway;
pub mod loader;
pub mod logging;
pub mod memory;
pub mod validation;

pub use actor::{Command, MarketActor, MarketHandle};
pub use events::{EngineEvent, EventBus};
pub use exchange::Exchange;
pub use gateway::PersistenceGateway;
pub use loader::{BookLoader, LoadReport, LoadedMarket};
pub use memory::InMemoryGateway;
pub use validation::validate_request;
