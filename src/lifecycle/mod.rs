//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     trigger() → every subscriber (server, limiter tickers, watcher loop) stops
//!
//! Signals (signals.rs):
//!     Ctrl+C / SIGTERM → Shutdown::trigger
//! ```
//!
//! # Design Decisions
//! - Ordered startup in the binary: config, logging, first compile, listener
//! - In-flight requests finish on the snapshot they started with

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::shutdown_on_signal;
