//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID, request span)
//!     → /errors, /reload, /git-reload → handlers.rs (auth.rs checks the secret)
//!     → anything else → content router on the blocking pool
//!     → Send to client
//! ```

pub mod auth;
pub mod handlers;
pub mod request;
pub mod server;

pub use request::{RequestUuid, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
