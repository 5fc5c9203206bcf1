//! Tracing initialisation for processes embedding the engine.
//!
//! [`init_tracing`] installs a global subscriber with two modes:
//! - **JSON** (`json = true`): one object per line with nanosecond
//!   timestamps, for log aggregation.
//! - **Pretty** (`json = false`): human-readable output for local runs.
//!
//! Both honour `RUST_LOG` (e.g. `RUST_LOG=binmatch_engine=debug`) and
//! default to `info`. Market actors log inside a `market` span carrying
//! `market_id`, so every line from a market can be filtered on it.

use std::fmt;

use binmatch_types::{BinmatchError, Result};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Install the global tracing subscriber.
///
/// # Errors
/// [`BinmatchError::Configuration`] if a global subscriber is already set.
pub fn init_tracing(json: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if json {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_timer(NanosecondTimer)
            .with_target(true)
            .with_current_span(true)
            .with_span_events(FmtSpan::CLOSE);
        registry.with(json_layer).try_init()
    } else {
        let pretty_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(false);
        registry.with(pretty_layer).try_init()
    };

    installed.map_err(|e| BinmatchError::Configuration(format!("tracing already initialised: {e}")))
}

/// RFC 3339 UTC timestamps with nanosecond precision.
#[derive(Debug, Clone)]
struct NanosecondTimer;

impl tracing_subscriber::fmt::time::FormatTime for NanosecondTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> fmt::Result {
        write!(w, "{}", chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.9fZ"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_an_error() {
        // The global slot can be taken once per process.
        let _ = init_tracing(true);
        let second = init_tracing(false);
        assert!(matches!(second, Err(BinmatchError::Configuration(_))));
    }
}
