//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global tracing subscriber
//! - Derive the default filter from the configured level
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configuration file
//! - Human-readable `fmt` output; log shipping is left to the process supervisor

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub fn default_filter(level: &str) -> String {
    format!("sitetree={level},tower_http={level}")
}

/// Install the global subscriber. Call once, before anything logs.
pub fn init_logging(level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(level).into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
