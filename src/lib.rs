//! Sitetree: a content directory compiled into a template tree and served
//! over HTTP.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌───────────────────────────────────────────────────────┐
//!                 │                       SITETREE                        │
//!                 │                                                       │
//!  Content dir ───┼─▶ vfs ──▶ compiler ──▶ Dir tree ──▶ reload::Site      │
//!                 │            │   ▲                      (ArcSwap)       │
//!                 │            ▼   │                         │            │
//!                 │         content  pubsub                  │            │
//!                 │       processors broker                  ▼            │
//!  Request ───────┼─▶ http server ──────────────────────▶ routing ────────┼──▶ Response
//!                 │     │                                                 │
//!                 │     └─▶ /reload, /git-reload ──▶ reload::Reloader     │
//!                 │                                  (limiters, git)      │
//!                 │                                                       │
//!                 │  Cross-cutting: config, observability, lifecycle      │
//!                 └───────────────────────────────────────────────────────┘
//! ```

// Content pipeline
pub mod compiler;
pub mod content;
pub mod pubsub;
pub mod routing;
pub mod vfs;

// Serving
pub mod http;
pub mod reload;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use compiler::{compile, Compiled, Config, Dir, ErrorRecord};
pub use config::SiteConfig;
pub use http::{AppState, HttpServer};
pub use lifecycle::Shutdown;
pub use reload::{Reloader, Site};
