//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → request.rs (clean path, split into segments)
//!     → router.rs (walk the compiled Dir tree)
//!         → each Dir's handler: Continue or Stop(response)
//!         → next segment names a subdir: descend
//!         → last segment names a static file: static_files.rs
//!         → otherwise 404
//! ```
//!
//! # Design Decisions
//! - The tree is immutable at runtime; routing takes no locks
//! - Handlers see the full remaining path, so a handler can claim a whole
//!   subtree or only fire when the path is fully consumed
//! - Handler generators run at compile time, after the owning directory's
//!   subtree is complete

pub mod blog;
pub mod handler;
pub mod redirect;
pub mod request;
pub mod router;
pub mod static_files;
pub mod template;

pub use blog::BlogGenerator;
pub use handler::{Flow, Handler, HandlerError, HandlerGenerator};
pub use redirect::RedirectGenerator;
pub use request::RequestContext;
pub use router::route;
pub use template::{Entry, TemplateHandler};
