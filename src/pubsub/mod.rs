//! Process-local publish/subscribe between content compiled in different
//! parts of the tree.
//!
//! # Data Flow
//! ```text
//! compile pass starts → Broker::new()
//!     content/handler code calls subscribe(key, fn) and publish(key, data)
//!     → publishes are retained (last value per key wins)
//! compile pass ends → ready()
//!     → every subscriber receives its key's retained value once
//!     → later publishes deliver inline
//! ```
//!
//! # Design Decisions
//! - Delivery is decoupled from traversal order: nothing is delivered
//!   before `ready()`
//! - One broker per compile pass, dropped with it

pub mod broker;

pub use broker::Broker;
