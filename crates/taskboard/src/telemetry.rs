#![forbid(unsafe_code)]

//! JSON log output for hosts without their own subscriber.
//!
//! ```rust,ignore
//! taskboard::telemetry::init()?;
//! // RUST_LOG=taskboard_reconcile=debug shows every optimistic write.
//! ```

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::Result;

/// Directive used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_DIRECTIVE: &str = "info";

/// Install a global JSON subscriber filtered by `RUST_LOG`.
pub fn init() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    install(filter)
}

/// Install a global JSON subscriber with an explicit filter directive.
pub fn init_with_filter(directive: &str) -> Result<()> {
    install(EnvFilter::new(directive))
}

fn install(filter: EnvFilter) -> Result<()> {
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json())
        .try_init()?;
    Ok(())
}
