//! Tracing setup shared by demos and tests.
//!
//! The engine itself only *emits* `tracing` events; installing a
//! subscriber is the embedding application's choice. This module offers
//! the standard stack for when the application has no opinion: an
//! env-filtered fmt layer plus a [`tracing_error::ErrorLayer`] so span
//! context is captured alongside errors.

use tracing_error::ErrorLayer;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset.
const DEFAULT_DIRECTIVES: &str = "warn,loomflow=info";

/// Install the default subscriber stack.
///
/// Honors `RUST_LOG` when set, otherwise falls back to
/// `warn,loomflow=info`. Safe to call more than once; later calls are
/// no-ops, which lets every test init unconditionally.
pub fn init() {
    init_with_directives(DEFAULT_DIRECTIVES);
}

/// Install the default subscriber stack with explicit fallback directives.
pub fn init_with_directives(directives: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directives))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_span_events(FmtSpan::CLOSE),
        )
        .with(ErrorLayer::default())
        .try_init();
}
