//! # Logging
//!
//! Tracing subscriber setup for the binary. Library code only emits events;
//! without a subscriber they are dropped.

use tracing::warn;

/// Default filter when `RUST_LOG` is unset
const DEFAULT_FILTER: &str = "apim_sync=info";

/// Install the `fmt` subscriber filtered by `RUST_LOG`
pub fn init() {
    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_FILTER.into()),
        )
        .with_target(false)
        .try_init()
    {
        // Embedding applications may have installed their own subscriber
        warn!("Tracing subscriber init returned error (may already be initialized): {}", e);
    }
}
